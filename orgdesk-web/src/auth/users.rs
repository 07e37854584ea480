//! User accounts and authentication

use super::jwt::{AuthError, JwtService, TokenPair, TokenType};
use crate::database::SqliteStore;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use orgdesk_applications::{
    auth::{authorize, is_allowed_role, SUPERADMIN_ONLY},
    ApplicationError, ApplicationResult, DenialReason, Identity, Role, ELEVATED_ROLES,
};
use orgdesk_core::{BootstrapAdmin, OrgdeskError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

/// User registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// User login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Global role change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// User registration/login response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserInfo,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Public user information
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Stored global role
    #[schema(example = "user")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Stored user with password hash
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    /// Role as stored; see [`UserData::global_role`]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl UserData {
    /// Create new user with hashed password
    pub fn new(
        username: String,
        email: String,
        password: &str,
        display_name: Option<String>,
        role: Role,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            display_name,
            password_hash: hash_password(password)?,
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    /// The parsed global role; `None` when the stored value is unrecognized
    pub fn global_role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    /// Request identity for this account; fails closed on an unknown role
    pub fn to_identity(&self) -> Option<Identity> {
        let role = self.global_role()?;
        let identity = Identity::new(self.id.clone(), role).with_email(self.email.clone());
        Some(match &self.display_name {
            Some(name) => identity.with_display_name(name.clone()),
            None => identity.with_display_name(self.username.clone()),
        })
    }

    pub fn to_user_info(&self) -> UserInfo {
        UserInfo {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
        }
    }
}

/// Account operations over the SQLite user table
#[derive(Debug, Clone)]
pub struct UserService {
    store: SqliteStore,
    jwt: JwtService,
}

impl UserService {
    pub fn new(store: SqliteStore, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Register a new account; self-registration always gets role `user`
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();

        if username.is_empty() || email.is_empty() || request.password.is_empty() {
            debug!("Registration failed: missing credentials");
            return Err(AuthError::MissingCredentials);
        }
        if !email.contains('@') {
            return Err(AuthError::MissingCredentials);
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let display_name = request
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        let user = UserData::new(username, email, &request.password, display_name, Role::User)?;

        self.store.insert_user(&user).await.map_err(user_store_error)?;
        info!(user_id = %user.id, username = %user.username, "Registered new user");

        self.respond(&user)
    }

    /// Authenticate with username and password
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self.authenticate(&request.username, &request.password).await?;
        self.respond(&user)
    }

    /// Check a username and password, returning the stored account
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserData, AuthError> {
        let user = self
            .store
            .get_user_by_username(username.trim())
            .await
            .map_err(user_store_error)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.verify_password(password) {
            warn!("Invalid password for user: {}", username);
            return Err(AuthError::InvalidCredentials);
        }
        if user.global_role().is_none() {
            warn!(user_id = %user.id, stored_role = %user.role, "Refusing login with unrecognized role");
            return Err(AuthError::InvalidCredentials);
        }

        debug!("User authenticated: {}", user.username);
        Ok(user)
    }

    /// Exchange a refresh token for a new pair, re-reading the account
    pub async fn refresh_token(&self, request: RefreshRequest) -> Result<TokenPair, AuthError> {
        let claims = self
            .jwt
            .verify_typed(&request.refresh_token, TokenType::Refresh)?;

        let user = self
            .store
            .get_user_by_id(&claims.sub)
            .await
            .map_err(user_store_error)?
            .ok_or(AuthError::InvalidCredentials)?;
        if user.global_role().is_none() {
            return Err(AuthError::InvalidCredentials);
        }

        self.jwt.generate_token_pair(&user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserData>, OrgdeskError> {
        self.store.get_user_by_id(user_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserInfo>, OrgdeskError> {
        Ok(self
            .store
            .list_users()
            .await?
            .iter()
            .map(UserData::to_user_info)
            .collect())
    }

    /// Change a user's global role
    ///
    /// The actor must be elevated and may not change their own role. Granting
    /// or revoking `superadmin` needs a `superadmin` actor.
    pub async fn update_user_role(
        &self,
        actor: &Identity,
        target_id: &str,
        role: Role,
    ) -> ApplicationResult<UserInfo> {
        authorize(Some(actor), Some(ELEVATED_ROLES)).into_result()?;
        if actor.user_id == target_id {
            debug!(actor = %actor.summary(), "Refusing to change own role");
            return Err(ApplicationError::Denied(DenialReason::Forbidden));
        }

        let target = self
            .store
            .get_user_by_id(target_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(format!("User {}", target_id)))?;

        let touches_superadmin =
            role == Role::SuperAdmin || target.global_role() == Some(Role::SuperAdmin);
        if touches_superadmin {
            authorize(Some(actor), Some(SUPERADMIN_ONLY)).into_result()?;
        }

        if !self.store.update_user_role(&target.id, role).await? {
            return Err(ApplicationError::not_found(format!("User {}", target_id)));
        }

        info!(
            actor = %actor.summary(),
            target = %target.id,
            from = %target.role,
            to = %role,
            "Global role changed"
        );

        let mut updated = target.to_user_info();
        updated.role = role.as_str().to_string();
        Ok(updated)
    }

    /// Seed a superadmin when the user table is empty; returns whether one
    /// was created
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<bool, AuthError> {
        let count = self.store.count_users().await.map_err(user_store_error)?;
        if count > 0 {
            debug!("Users exist, skipping bootstrap admin");
            return Ok(false);
        }
        if admin.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let user = UserData::new(
            admin.username.clone(),
            admin.email.clone(),
            &admin.password,
            Some("Administrator".to_string()),
            Role::SuperAdmin,
        )?;
        self.store.insert_user(&user).await.map_err(user_store_error)?;

        info!(username = %user.username, "Created bootstrap superadmin");
        Ok(true)
    }

    fn respond(&self, user: &UserData) -> Result<AuthResponse, AuthError> {
        Ok(AuthResponse {
            user: user.to_user_info(),
            tokens: self.jwt.generate_token_pair(user)?,
        })
    }
}

/// Whether `role` may see the user administration screens
pub fn can_administer_users(role: Role) -> bool {
    is_allowed_role(role, ELEVATED_ROLES)
}

fn user_store_error(error: OrgdeskError) -> AuthError {
    match error {
        OrgdeskError::Conflict { .. } => AuthError::AccountExists,
        other => {
            other.log();
            AuthError::Storage
        }
    }
}

/// Hash password using Argon2
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            warn!("Password hashing failed: {}", e);
            AuthError::PasswordHashing
        })
}

/// Verify password against hash; a malformed hash never verifies
fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
