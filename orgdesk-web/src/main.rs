//! Orgdesk Web Server
//!
//! Organization-scoped access control behind a JSON API and server-rendered
//! pages.

use anyhow::Context;
use clap::Parser;
use orgdesk_core::OrgdeskConfig;
use orgdesk_web::{init_logging, server::OrgdeskServerBuilder};
use std::path::PathBuf;
use tracing::info;

/// Orgdesk Web Server
#[derive(Parser, Debug)]
#[command(name = "orgdesk-web")]
#[command(about = "Organization-scoped access control server")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// SQLite database URL, e.g. sqlite://orgdesk.db?mode=rwc
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Command line flags win over the file and the environment
    fn apply(self, config: &mut OrgdeskConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.dev {
            config.server.dev_mode = true;
        }
        if let Some(url) = self.database_url {
            config.database.url = Some(url);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let mut config =
        OrgdeskConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);

    init_logging(&config.logging)?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        dev_mode = config.server.dev_mode,
        "Building server"
    );

    let server = OrgdeskServerBuilder::new()
        .config(config)
        .build()
        .await
        .context("Failed to build server")?;

    server.start().await.context("Server failed")?;
    Ok(())
}
