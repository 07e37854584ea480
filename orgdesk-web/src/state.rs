//! Application state shared by every handler
//!
//! All collaborators are injected here: the session resolver, the signing
//! keys and the stores behind the services.

use crate::{
    auth::{jwt::JwtService, session::JwtSessionResolver, users::UserService},
    database::{SqliteStore, IN_MEMORY_URL},
    WebError, WebResult,
};
use orgdesk_applications::{
    AccessDecisionEngine, MembershipStore, OrganizationService, OrganizationStore, SessionResolver,
};
use orgdesk_core::OrgdeskConfig;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<OrgdeskConfig>,
    /// Turns request credentials into an identity
    pub sessions: Arc<dyn SessionResolver>,
    /// Accounts and token issuance
    pub users: UserService,
    /// Organizations and members, gated by the access decision engine
    pub organizations: OrganizationService,
}

impl AppState {
    /// Connect the configured database and build every service on top of it
    pub async fn new(config: OrgdeskConfig) -> WebResult<Self> {
        let url = config
            .database
            .url
            .clone()
            .unwrap_or_else(|| IN_MEMORY_URL.to_string());
        let database = SqliteStore::connect(&url).await?;

        let state = Self::from_store(config, database);

        if let Some(admin) = &state.config.auth.bootstrap_admin {
            state
                .users
                .ensure_bootstrap_admin(admin)
                .await
                .map_err(|e| WebError::Config(format!("Failed to seed bootstrap admin: {}", e)))?;
        }

        info!("Application state initialized successfully");
        Ok(state)
    }

    /// Build state over an already connected store
    pub fn from_store(config: OrgdeskConfig, database: SqliteStore) -> Self {
        let jwt = JwtService::from_config(&config.auth);
        let store = Arc::new(database.clone());
        let organizations = OrganizationService::new(
            store.clone() as Arc<dyn OrganizationStore>,
            store as Arc<dyn MembershipStore>,
        );

        Self {
            config: Arc::new(config),
            sessions: Arc::new(JwtSessionResolver::new(jwt.clone(), database.clone())),
            users: UserService::new(database, jwt),
            organizations,
        }
    }

    /// Replace the organization service, e.g. to put a different membership
    /// store behind the access decision engine
    pub fn with_organizations(mut self, organizations: OrganizationService) -> Self {
        self.organizations = organizations;
        self
    }

    pub fn with_session_resolver(mut self, sessions: Arc<dyn SessionResolver>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn engine(&self) -> &AccessDecisionEngine {
        self.organizations.engine()
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.auth.session_cookie_name
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server", &self.config.server)
            .field("users", &self.users)
            .field("organizations", &self.organizations)
            .finish_non_exhaustive()
    }
}
