//! Caller identity and session resolution
//!
//! An [`Identity`] lives for one request. It is produced by a
//! [`SessionResolver`] from whatever credentials the request carried.

use super::roles::Role;
use async_trait::async_trait;
use orgdesk_core::OrgdeskResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Identity {
    /// Unique user identifier
    pub user_id: String,
    /// Global account role
    pub global_role: Role,
    /// Display name (optional)
    pub display_name: Option<String>,
    /// User email (optional)
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, global_role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            global_role,
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_elevated(&self) -> bool {
        self.global_role.is_elevated()
    }

    /// Short form for log fields
    pub fn summary(&self) -> String {
        format!("{}({})", self.user_id, self.global_role)
    }
}

/// Raw credentials lifted off a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// `Authorization: Bearer <token>`
    pub bearer_token: Option<String>,
    /// Session cookie value
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            session_token: None,
        }
    }

    pub fn session(token: impl Into<String>) -> Self {
        Self {
            bearer_token: None,
            session_token: Some(token.into()),
        }
    }

    /// The token to verify; a bearer header wins over the cookie
    pub fn token(&self) -> Option<&str> {
        self.bearer_token
            .as_deref()
            .or(self.session_token.as_deref())
            .filter(|token| !token.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.token().is_none()
    }
}

/// Turns request credentials into an identity
///
/// `Ok(None)` means the request is not authenticated. `Err` is reserved for
/// infrastructure failures while resolving.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, credentials: &Credentials) -> OrgdeskResult<Option<Identity>>;
}

/// Fixed token → identity table for tests and local development
#[derive(Debug, Clone, Default)]
pub struct StaticSessionResolver {
    sessions: HashMap<String, Identity>,
}

impl StaticSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.sessions.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve(&self, credentials: &Credentials) -> OrgdeskResult<Option<Identity>> {
        Ok(credentials
            .token()
            .and_then(|token| self.sessions.get(token))
            .cloned())
    }
}
