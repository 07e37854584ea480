//! Orgdesk Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebError, WebResult};
use axum::serve;
use orgdesk_core::OrgdeskConfig;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main Orgdesk web server
pub struct OrgdeskServer {
    config: OrgdeskConfig,
    state: AppState,
}

impl OrgdeskServer {
    /// Create a new server, connecting the database and seeding the
    /// bootstrap administrator if one is configured
    pub async fn new(config: OrgdeskConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;

        Ok(Self { config, state })
    }

    /// Start the web server and run until Ctrl-C
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.server.address();

        info!("Starting Orgdesk Web Server");
        info!("Server address: http://{}", address);
        info!("Development mode: {}", self.config.server.dev_mode);
        if self.config.database.url.is_none() {
            warn!("No database configured, data lives in memory and is lost on exit");
        }

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server shut down gracefully");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &OrgdeskConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Builder for OrgdeskServer
pub struct OrgdeskServerBuilder {
    config: OrgdeskConfig,
}

impl OrgdeskServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: OrgdeskConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: OrgdeskConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Enable development mode
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.server.dev_mode = dev_mode;
        self
    }

    /// Set database URL
    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database.url = Some(database_url.into());
        self
    }

    /// Validate the configuration and build the server
    pub async fn build(self) -> WebResult<OrgdeskServer> {
        self.config.validate()?;
        OrgdeskServer::new(self.config).await
    }
}

impl Default for OrgdeskServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
