//! JWT session tokens
//!
//! Signing keys belong to a [`JwtService`] value built from configuration and
//! carried in the application state.

use super::users::UserData;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use orgdesk_core::AuthConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::ErrorBody;

/// JWT signing and verification keys
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Global role at issue time; the resolver re-reads the stored role
    pub role: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
    pub token_type: TokenType,
}

/// Token type enumeration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl Claims {
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT token pair (access + refresh)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Credential and token failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Password too weak")]
    WeakPassword,
    #[error("Username or email already registered")]
    AccountExists,
    #[error("Token creation failed")]
    TokenCreation,
    #[error("Password hashing failed")]
    PasswordHashing,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token type")]
    InvalidTokenType,
    #[error("User store unavailable")]
    Storage,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::InvalidTokenType => StatusCode::UNAUTHORIZED,
            AuthError::MissingCredentials | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::AccountExists => StatusCode::CONFLICT,
            AuthError::TokenCreation | AuthError::PasswordHashing | AuthError::Storage => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::WeakPassword => "weak_password",
            AuthError::AccountExists => "account_exists",
            AuthError::TokenCreation => "token_creation_failed",
            AuthError::PasswordHashing => "password_hashing_failed",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidTokenType => "invalid_token_type",
            AuthError::Storage => "storage_unavailable",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::MissingCredentials => "Username, email and password are required",
            AuthError::WeakPassword => "Password must be at least 8 characters",
            AuthError::AccountExists => "Username or email is already registered",
            AuthError::TokenCreation => "Failed to create authentication token",
            AuthError::PasswordHashing => "Internal server error",
            AuthError::InvalidToken => "Invalid or malformed token",
            AuthError::TokenExpired => "Token has expired",
            AuthError::InvalidTokenType => "Invalid token type for this operation",
            AuthError::Storage => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Issues and verifies HS256 session tokens
#[derive(Clone)]
pub struct JwtService {
    keys: Arc<Keys>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            keys: Arc::new(Keys::new(secret)),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
        )
    }

    fn claims(&self, user: &UserData, token_type: TokenType) -> Claims {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };

        Claims {
            sub: user.id.clone(),
            role: user.role.clone(),
            name: user.display_name.clone(),
            email: Some(user.email.clone()),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding).map_err(|e| {
            warn!("Failed to encode JWT token: {}", e);
            AuthError::TokenCreation
        })
    }

    pub fn generate_access_token(&self, user: &UserData) -> Result<String, AuthError> {
        self.sign(&self.claims(user, TokenType::Access))
    }

    pub fn generate_refresh_token(&self, user: &UserData) -> Result<String, AuthError> {
        self.sign(&self.claims(user, TokenType::Refresh))
    }

    pub fn generate_token_pair(&self, user: &UserData) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.generate_access_token(user)?,
            refresh_token: self.generate_refresh_token(user)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify signature and expiry
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &self.keys.decoding, &validation).map_err(|e| {
            debug!("Token verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        let claims = token_data.claims;
        if claims.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// Verify a token and require it to be of `expected` type
    pub fn verify_typed(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.verify_token(token)?;
        if claims.token_type != expected {
            return Err(AuthError::InvalidTokenType);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgdesk_applications::Role;

    fn service() -> JwtService {
        JwtService::new(
            b"test-secret-test-secret-test-secret",
            Duration::minutes(5),
            Duration::days(1),
        )
    }

    fn user() -> UserData {
        UserData::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "password123",
            None,
            Role::User,
        )
        .unwrap()
    }

    #[test]
    fn access_tokens_verify() {
        let jwt = service();
        let user = user();
        let pair = jwt.generate_token_pair(&user).unwrap();
        assert_eq!(pair.expires_in, 300);

        let claims = jwt.verify_typed(&pair.access_token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let jwt = service();
        let pair = jwt.generate_token_pair(&user()).unwrap();

        assert!(matches!(
            jwt.verify_typed(&pair.refresh_token, TokenType::Access),
            Err(AuthError::InvalidTokenType)
        ));
        assert!(jwt
            .verify_typed(&pair.refresh_token, TokenType::Refresh)
            .is_ok());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let other = JwtService::new(
            b"another-secret-another-secret-xx",
            Duration::minutes(5),
            Duration::days(1),
        );
        let token = other.generate_access_token(&user()).unwrap();

        assert!(matches!(
            service().verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service().verify_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let jwt = JwtService::new(
            b"test-secret-test-secret-test-secret",
            Duration::minutes(-10),
            Duration::days(1),
        );
        let token = jwt.generate_access_token(&user()).unwrap();

        assert!(matches!(
            jwt.verify_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn hashing_failures_are_internal_errors() {
        let error = AuthError::PasswordHashing;
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.code(), "password_hashing_failed");
        assert_ne!(error.code(), AuthError::TokenCreation.code());
    }
}
