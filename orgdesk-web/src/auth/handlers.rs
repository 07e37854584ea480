//! Authentication handlers for registration, login and token management

use super::{
    jwt::{AuthError, TokenPair},
    users::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UserInfo},
    Api, Authenticated,
};
use crate::{error::ErrorBody, ApiError, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use orgdesk_applications::Identity;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

/// Response to a logout call
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
    pub user_id: String,
}

/// User registration endpoint
///
/// New accounts always get the `user` role.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing fields or weak password", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    info!("User registration attempt: {}", request.username);

    let response = state.users.register(request).await?;

    info!("User registered successfully: {}", response.user.username);
    Ok((StatusCode::CREATED, Json(response)))
}

/// User login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    info!("User login attempt: {}", request.username);

    let response = state.users.login(request).await?;

    info!("User logged in successfully: {}", response.user.username);
    Ok(Json(response))
}

/// Token refresh endpoint
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorBody)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let tokens = state.users.refresh_token(request).await?;

    info!("Token refreshed successfully");
    Ok(Json(tokens))
}

/// Current user information
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The signed-in user", body = UserInfo),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Authenticated(identity, _): Authenticated<Api>,
) -> Result<Json<UserInfo>, ApiError> {
    let user = state
        .users
        .get_user(&identity.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", identity.user_id)))?;

    Ok(Json(user.to_user_info()))
}

/// Logout endpoint
///
/// Tokens are stateless; this clears the session cookie and clients discard
/// their bearer tokens.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed out", body = LogoutResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn logout_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Authenticated(identity, _): Authenticated<Api>,
) -> (CookieJar, Json<LogoutResponse>) {
    info!("User logout: {}", identity.user_id);

    (
        clear_session_cookie(jar, state.cookie_name()),
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
            user_id: identity.user_id,
        }),
    )
}

/// Set the session cookie carrying an access token
pub fn set_session_cookie(jar: CookieJar, state: &AppState, token: String) -> CookieJar {
    let cookie = Cookie::build((state.cookie_name().to_string(), token))
        .path("/")
        .http_only(true)
        .same_site(axum_extra::extract::cookie::SameSite::Lax)
        .secure(state.config.auth.secure_cookies);
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: CookieJar, cookie_name: &str) -> CookieJar {
    jar.remove(Cookie::build(cookie_name.to_string()).path("/"))
}

/// Label shown for a signed-in identity
pub fn display_name(identity: &Identity) -> &str {
    identity
        .display_name
        .as_deref()
        .unwrap_or(identity.user_id.as_str())
}
