//! Integration test helpers
//!
//! Spawns the full application on a random port with an in-memory database
//! and a seeded `superadmin`.

#![allow(dead_code)]

use orgdesk_core::{BootstrapAdmin, OrgdeskConfig};
use serde_json::{json, Value};
use std::sync::LazyLock;
use tokio::net::TcpListener;
use uuid::Uuid;

pub const ROOT_USERNAME: &str = "root";
pub const ROOT_PASSWORD: &str = "root_password_123";

// Initialize tracing once for all tests
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

/// A running application
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub cookie_name: String,
}

/// A registered account with its tokens
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn test_config() -> OrgdeskConfig {
    let mut config = OrgdeskConfig::default();
    config.server.dev_mode = true;
    config.auth.bootstrap_admin = Some(BootstrapAdmin {
        username: ROOT_USERNAME.to_string(),
        email: "root@example.com".to_string(),
        password: ROOT_PASSWORD.to_string(),
    });
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_config(test_config()).await
}

pub async fn spawn_app_with_config(config: OrgdeskConfig) -> TestApp {
    LazyLock::force(&TRACING);

    let cookie_name = config.auth.session_cookie_name.clone();
    let state = orgdesk_web::AppState::new(config).await.unwrap();
    let app = orgdesk_web::create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        port,
        api_client: client,
        cookie_name,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        self.send(self.api_client.get(self.url(path)), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        self.send(self.api_client.delete(self.url(path)), token).await
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> reqwest::Response {
        self.send(self.api_client.post(self.url(path)).json(body), token)
            .await
    }

    pub async fn put_json(&self, path: &str, token: Option<&str>, body: &Value) -> reqwest::Response {
        self.send(self.api_client.put(self.url(path)).json(body), token)
            .await
    }

    pub async fn patch_json(&self, path: &str, token: Option<&str>, body: &Value) -> reqwest::Response {
        self.send(self.api_client.patch(self.url(path)).json(body), token)
            .await
    }

    /// Page request carrying the session cookie instead of a bearer header
    pub async fn get_page(&self, path: &str, session: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.get(self.url(path));
        if let Some(session) = session {
            request = request.header("cookie", format!("{}={}", self.cookie_name, session));
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn send(&self, request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::Response {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request.send().await.expect("Failed to execute request.")
    }

    /// Register a fresh account; usernames are suffixed to stay unique
    pub async fn register(&self, name: &str) -> TestUser {
        let suffix = &Uuid::new_v4().to_string()[..8];
        let username = format!("{}_{}", name, suffix);
        let password = "test_password_123".to_string();

        let response = self
            .post_json(
                "/api/auth/register",
                None,
                &json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": password,
                    "display_name": name,
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201, "registration failed");
        let body: Value = response.json().await.unwrap();

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            username,
            password,
            access_token: body["access_token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Sign in as the seeded `superadmin`
    pub async fn login_root(&self) -> TestUser {
        let response = self
            .post_json(
                "/api/auth/login",
                None,
                &json!({ "username": ROOT_USERNAME, "password": ROOT_PASSWORD }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200, "root login failed");
        let body: Value = response.json().await.unwrap();

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            username: ROOT_USERNAME.to_string(),
            password: ROOT_PASSWORD.to_string(),
            access_token: body["access_token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Set a global role as the seeded `superadmin`
    pub async fn grant_role(&self, user: &TestUser, role: &str) {
        let root = self.login_root().await;
        let response = self
            .put_json(
                &format!("/api/admin/users/{}/role", user.id),
                Some(&root.access_token),
                &json!({ "role": role }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200, "role change failed");
    }

    /// Create an organization and return its id
    pub async fn create_organization(&self, owner: &TestUser, slug: &str) -> String {
        let response = self
            .post_json(
                "/api/organizations",
                Some(&owner.access_token),
                &json!({ "name": slug.to_uppercase(), "slug": slug }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201, "organization create failed");
        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    /// Add a member and return the membership id
    pub async fn add_member(
        &self,
        manager: &TestUser,
        organization_id: &str,
        user: &TestUser,
        role: &str,
    ) -> String {
        let response = self
            .post_json(
                &format!("/api/organizations/{}/members", organization_id),
                Some(&manager.access_token),
                &json!({ "user_id": user.id, "role": role }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201, "add member failed");
        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

/// Read an error body and return its code
pub async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["code"].as_str().unwrap_or_default().to_string()
}

pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}
