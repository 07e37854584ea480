//! Session resolution from JWT access tokens

use super::jwt::{JwtService, TokenType};
use crate::database::SqliteStore;
use async_trait::async_trait;
use orgdesk_applications::{Credentials, Identity, SessionResolver};
use orgdesk_core::OrgdeskResult;
use tracing::{debug, warn};

/// Verifies an access token, then reloads the account it names
///
/// Reading the stored row on every request makes role changes and deleted
/// accounts take effect without waiting for the token to expire.
#[derive(Debug, Clone)]
pub struct JwtSessionResolver {
    jwt: JwtService,
    users: SqliteStore,
}

impl JwtSessionResolver {
    pub fn new(jwt: JwtService, users: SqliteStore) -> Self {
        Self { jwt, users }
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, credentials: &Credentials) -> OrgdeskResult<Option<Identity>> {
        let Some(token) = credentials.token() else {
            return Ok(None);
        };

        let claims = match self.jwt.verify_typed(token, TokenType::Access) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejecting session token: {}", e);
                return Ok(None);
            }
        };

        let Some(user) = self.users.get_user_by_id(&claims.sub).await? else {
            debug!(user_id = %claims.sub, "Session names an unknown user");
            return Ok(None);
        };

        match user.to_identity() {
            Some(identity) => Ok(Some(identity)),
            None => {
                warn!(
                    user_id = %user.id,
                    stored_role = %user.role,
                    "User has an unrecognized role, treating as unauthenticated"
                );
                Ok(None)
            }
        }
    }
}
