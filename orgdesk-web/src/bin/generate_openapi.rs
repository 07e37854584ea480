//! Write the OpenAPI specification to `orgdesk-web/docs/openapi.json`

use orgdesk_web::openapi::{get_openapi_json, ApiDoc};
use std::fs;
use std::path::Path;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let docs_dir = Path::new("orgdesk-web/docs");
    if !docs_dir.exists() {
        fs::create_dir_all(docs_dir)?;
    }

    let json_path = docs_dir.join("openapi.json");
    fs::write(&json_path, get_openapi_json()?)?;
    println!("Generated: {}", json_path.display());

    let compact_path = docs_dir.join("openapi.compact.json");
    fs::write(&compact_path, serde_json::to_string(&ApiDoc::openapi())?)?;
    println!("Generated: {}", compact_path.display());

    Ok(())
}
