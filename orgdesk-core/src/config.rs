//! Configuration loading and validation

use crate::error::{ErrorContext, OrgdeskError, OrgdeskResult};
use crate::types::{AuthConfig, BootstrapAdmin, OrgdeskConfig, ServerConfig};

use std::path::Path;

/// Secret used when none is configured; refused outside development mode
pub const DEV_JWT_SECRET: &str = "orgdesk-dev-secret-change-me";

const MIN_SECRET_LEN: usize = 32;
const MIN_BOOTSTRAP_PASSWORD_LEN: usize = 8;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 30,
            session_cookie_name: "orgdesk_session".to_string(),
            secure_cookies: false,
            bootstrap_admin: None,
        }
    }
}

impl ServerConfig {
    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl OrgdeskConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> OrgdeskResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OrgdeskError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: OrgdeskConfig = toml::from_str(&content).map_err(|e| OrgdeskError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> OrgdeskResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| OrgdeskError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| OrgdeskError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Load from an optional file, then overlay the process environment
    pub fn load(path: Option<&Path>) -> OrgdeskResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Overlay values from `ORGDESK_*`, `DATABASE_URL` and `JWT_SECRET`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ORGDESK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("ORGDESK_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dev_mode) = lookup("ORGDESK_DEV_MODE").and_then(|v| v.parse().ok()) {
            self.server.dev_mode = dev_mode;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(level) = lookup("ORGDESK_LOG_LEVEL") {
            self.logging.level = level;
        }

        let admin = (
            lookup("ORGDESK_ADMIN_USERNAME"),
            lookup("ORGDESK_ADMIN_EMAIL"),
            lookup("ORGDESK_ADMIN_PASSWORD"),
        );
        if let (Some(username), Some(email), Some(password)) = admin {
            self.auth.bootstrap_admin = Some(BootstrapAdmin {
                username,
                email,
                password,
            });
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> OrgdeskResult<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0", "Set server.port"));
        }

        if !self.server.dev_mode {
            if self.auth.jwt_secret == DEV_JWT_SECRET {
                return Err(invalid(
                    "auth.jwt_secret is the development default",
                    "Set JWT_SECRET or auth.jwt_secret",
                ));
            }
            if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
                return Err(invalid(
                    "auth.jwt_secret is too short",
                    "Use a secret of at least 32 bytes",
                ));
            }
        }

        if self.auth.access_token_ttl_minutes <= 0 || self.auth.refresh_token_ttl_days <= 0 {
            return Err(invalid(
                "token lifetimes must be positive",
                "Set auth.access_token_ttl_minutes and auth.refresh_token_ttl_days",
            ));
        }

        if self.auth.session_cookie_name.trim().is_empty() {
            return Err(invalid(
                "auth.session_cookie_name must not be empty",
                "Set auth.session_cookie_name",
            ));
        }

        if let Some(admin) = &self.auth.bootstrap_admin {
            if admin.password.len() < MIN_BOOTSTRAP_PASSWORD_LEN {
                return Err(invalid(
                    "bootstrap admin password is too short",
                    "Use at least 8 characters",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str, suggestion: &str) -> OrgdeskError {
    OrgdeskError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}
