//! Server-rendered page handlers
//!
//! Page guards redirect instead of answering with a status: unauthenticated
//! callers go to the sign-in form, denied callers to the unauthorized page.

use crate::{
    auth::{
        handlers::{clear_session_cookie, display_name, set_session_cookie},
        jwt::AuthError,
        users::can_administer_users,
        Authenticated, GuardContext, MaybeIdentity, OrganizationAccess, Page, RequireAdmin,
        LOGIN_PATH,
    },
    templates::{
        self, AdminUsersTemplate, DashboardTemplate, LoginTemplate, MemberRow,
        OrganizationRow, OrganizationTemplate, UnauthorizedTemplate,
    },
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use orgdesk_applications::{ApplicationError, ListingScope};
use serde::Deserialize;
use tracing::{info, warn};

pub const DASHBOARD_PATH: &str = "/dashboard";

/// Sign-in form fields
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Turn a service failure into a page response
fn page_error(error: ApplicationError) -> Response {
    match error {
        ApplicationError::Denied(reason) => Page::reject(reason),
        ApplicationError::NotFound { message } => {
            templates::error_page(StatusCode::NOT_FOUND, &format!("{} was not found", message))
        }
        ApplicationError::Validation { message, .. } => {
            templates::error_page(StatusCode::BAD_REQUEST, &message)
        }
        ApplicationError::Conflict { message } => {
            templates::error_page(StatusCode::CONFLICT, &message)
        }
        ApplicationError::Core(error) => {
            error.log();
            templates::error_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

pub async fn root() -> Redirect {
    Redirect::to(DASHBOARD_PATH)
}

/// Sign-in form; signed-in callers go straight to the dashboard
pub async fn login_page(MaybeIdentity(identity): MaybeIdentity) -> Response {
    if identity.is_some() {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }
    templates::page(&LoginTemplate::new("", None))
}

/// Check the submitted credentials and start a cookie session
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state.users.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            return templates::render(
                StatusCode::UNAUTHORIZED,
                &LoginTemplate::new(
                    form.username,
                    Some("Invalid username or password".to_string()),
                ),
            );
        }
        Err(e) => {
            warn!("Sign-in failed: {}", e);
            return templates::error_page(e.status(), "Sign-in is unavailable right now");
        }
    };

    let token = match state.users.jwt().generate_access_token(&user) {
        Ok(token) => token,
        Err(e) => {
            warn!("Failed to issue session token: {}", e);
            return templates::error_page(e.status(), "Sign-in is unavailable right now");
        }
    };

    info!("User signed in: {}", user.username);
    (
        set_session_cookie(jar, &state, token),
        Redirect::to(DASHBOARD_PATH),
    )
        .into_response()
}

/// End the cookie session
pub async fn logout_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    (
        clear_session_cookie(jar, state.cookie_name()),
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}

pub async fn unauthorized_page() -> Response {
    templates::render(StatusCode::FORBIDDEN, &UnauthorizedTemplate::new())
}

pub async fn dashboard(
    State(state): State<AppState>,
    Authenticated(identity, _): Authenticated<Page>,
) -> Response {
    let listing = match state
        .organizations
        .list_visible_organizations(Some(&identity))
        .await
    {
        Ok(listing) => listing,
        Err(e) => return page_error(e),
    };

    templates::page(&DashboardTemplate {
        title: "Dashboard - Orgdesk".to_string(),
        user_name: display_name(&identity).to_string(),
        role: identity.global_role.to_string(),
        show_all: listing.scope == ListingScope::All,
        can_administer: can_administer_users(identity.global_role),
        organizations: listing.organizations.iter().map(OrganizationRow::from).collect(),
    })
}

pub async fn organization_page(
    State(state): State<AppState>,
    OrganizationAccess(ctx, _): OrganizationAccess<Page>,
) -> Response {
    let organization = match state.organizations.get_organization(&ctx).await {
        Ok(organization) => organization,
        Err(e) => return page_error(e),
    };
    let members = match state.organizations.list_members(&ctx).await {
        Ok(members) => members,
        Err(e) => return page_error(e),
    };

    templates::page(&OrganizationTemplate {
        title: format!("{} - Orgdesk", organization.name),
        organization: OrganizationRow::from(&organization),
        effective_role: ctx.effective_role().to_string(),
        can_manage: ctx.can_manage_members(),
        members: members.iter().map(MemberRow::from).collect(),
    })
}

pub async fn admin_users_page(
    State(state): State<AppState>,
    RequireAdmin(_identity, _): RequireAdmin<Page>,
) -> Response {
    match state.users.list_users().await {
        Ok(users) => templates::page(&AdminUsersTemplate {
            title: "Users - Orgdesk".to_string(),
            users,
        }),
        Err(e) => page_error(e.into()),
    }
}
