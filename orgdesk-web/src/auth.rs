//! Route guards
//!
//! Every protected handler takes one of these extractors. They resolve the
//! caller, ask the access decision engine, and enact a denial before the
//! handler body runs. The context marker decides how a denial looks:
//! [`Api`] answers with a status code and JSON body, [`Page`] redirects.

pub mod handlers;
pub mod jwt;
pub mod session;
pub mod users;

#[cfg(test)]
mod tests;

use crate::{templates, ApiError, AppState};
use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};
use orgdesk_applications::{
    auth::SUPERADMIN_ONLY, Credentials, DenialReason, Identity, OrganizationContext, Role,
    ELEVATED_ROLES,
};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// How a guard enacts a denial
pub trait GuardContext: Send + Sync + 'static {
    fn reject(reason: DenialReason) -> Response;
}

/// JSON API routes
#[derive(Debug, Clone, Copy)]
pub struct Api;

/// Server-rendered pages
#[derive(Debug, Clone, Copy)]
pub struct Page;

impl GuardContext for Api {
    fn reject(reason: DenialReason) -> Response {
        ApiError::Denied(reason).into_response()
    }
}

impl GuardContext for Page {
    fn reject(reason: DenialReason) -> Response {
        match reason {
            DenialReason::Unauthenticated => Redirect::to(LOGIN_PATH).into_response(),
            DenialReason::Forbidden
            | DenialReason::NotAMember
            | DenialReason::CannotRemoveOwner => Redirect::to(UNAUTHORIZED_PATH).into_response(),
            DenialReason::LookupFailed => {
                templates::error_page(StatusCode::INTERNAL_SERVER_ERROR, reason.message())
            }
        }
    }
}

/// Lift bearer and cookie credentials off a request
pub fn extract_credentials(headers: &HeaderMap, cookie_name: &str) -> Credentials {
    let bearer_token = headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string());

    let session_token = CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string());

    Credentials {
        bearer_token,
        session_token,
    }
}

/// Resolve the caller; a resolver failure is a failed lookup
async fn resolve_identity(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<Identity>, DenialReason> {
    let credentials = extract_credentials(&parts.headers, state.cookie_name());
    if credentials.is_empty() {
        return Ok(None);
    }

    state.sessions.resolve(&credentials).await.map_err(|e| {
        e.log();
        DenialReason::LookupFailed
    })
}

/// Run the global-role gate and hand back the admitted identity
async fn admit<C: GuardContext>(
    parts: &Parts,
    state: &AppState,
    required_roles: Option<&[Role]>,
) -> Result<Identity, Response> {
    let identity = resolve_identity(parts, state).await.map_err(C::reject)?;

    state
        .engine()
        .authorize(identity.as_ref(), required_roles)
        .into_result()
        .map_err(|reason| {
            debug!(reason = %reason, path = %parts.uri.path(), "Access denied");
            C::reject(reason)
        })?;

    identity.ok_or_else(|| C::reject(DenialReason::Unauthenticated))
}

/// Any authenticated caller
#[derive(Debug, Clone)]
pub struct Authenticated<C = Api>(pub Identity, pub PhantomData<C>);

impl<C> Authenticated<C> {
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

impl<S, C> FromRequestParts<S> for Authenticated<C>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    C: GuardContext,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let identity = admit::<C>(parts, &state, None).await?;
        Ok(Self(identity, PhantomData))
    }
}

/// `superadmin` or `admin`
#[derive(Debug, Clone)]
pub struct RequireAdmin<C = Api>(pub Identity, pub PhantomData<C>);

impl<S, C> FromRequestParts<S> for RequireAdmin<C>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    C: GuardContext,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let identity = admit::<C>(parts, &state, Some(ELEVATED_ROLES)).await?;
        Ok(Self(identity, PhantomData))
    }
}

/// `superadmin` only
///
/// No built-in route needs it: granting `superadmin` goes through the admin
/// role endpoint, which checks the actor itself. Routes added on top of
/// [`crate::routes::api_routes`] use this guard for superadmin-only work.
#[derive(Debug, Clone)]
pub struct RequireSuperAdmin<C = Api>(pub Identity, pub PhantomData<C>);

impl<S, C> FromRequestParts<S> for RequireSuperAdmin<C>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    C: GuardContext,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let identity = admit::<C>(parts, &state, Some(SUPERADMIN_ONLY)).await?;
        Ok(Self(identity, PhantomData))
    }
}

/// Access to the organization named by the `{organization_id}` path segment
#[derive(Debug, Clone)]
pub struct OrganizationAccess<C = Api>(pub OrganizationContext, pub PhantomData<C>);

impl<C> OrganizationAccess<C> {
    pub fn context(&self) -> &OrganizationContext {
        &self.0
    }
}

impl<S, C> FromRequestParts<S> for OrganizationAccess<C>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    C: GuardContext,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let organization_id = params
            .get("organization_id")
            .cloned()
            .ok_or_else(|| (StatusCode::BAD_REQUEST, "Missing organization id").into_response())?;

        let state = AppState::from_ref(state);
        let identity = resolve_identity(parts, &state).await.map_err(C::reject)?;

        let context = state
            .organizations
            .authorize(identity.as_ref(), &organization_id)
            .await
            .map_err(|error| {
                let reason = error.denial().unwrap_or(DenialReason::LookupFailed);
                debug!(
                    reason = %reason,
                    organization_id = %organization_id,
                    "Organization access denied"
                );
                C::reject(reason)
            })?;

        Ok(Self(context, PhantomData))
    }
}

/// The caller if one is signed in; never rejects
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(MaybeIdentity(
            resolve_identity(parts, &state).await.unwrap_or(None),
        ))
    }
}
