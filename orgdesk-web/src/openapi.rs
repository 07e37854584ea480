//! OpenAPI specification for the Orgdesk API

use axum::response::Json;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::auth::{
    handlers::LogoutResponse,
    jwt::TokenPair,
    users::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UpdateRoleRequest, UserInfo},
};
use crate::error::ErrorBody;
use crate::handlers::{
    AddMemberRequest, CreateOrganizationRequest, HealthResponse, UpdateMemberRequest,
};
use orgdesk_applications::{
    ListingScope, Membership, OrgRole, Organization, OrganizationListing, Role,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Orgdesk API",
        version = "0.1.0",
        description = "Organization-scoped access control with global and per-organization roles",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,

        crate::auth::handlers::register_user,
        crate::auth::handlers::login_user,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::get_current_user,
        crate::auth::handlers::logout_user,

        crate::handlers::list_users,
        crate::handlers::update_user_role,

        crate::handlers::list_organizations,
        crate::handlers::create_organization,
        crate::handlers::get_organization,
        crate::handlers::delete_organization,

        crate::handlers::list_members,
        crate::handlers::add_member,
        crate::handlers::update_member,
        crate::handlers::remove_member,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            TokenPair,
            UserInfo,
            LogoutResponse,
            UpdateRoleRequest,
            Role,
            OrgRole,
            Organization,
            OrganizationListing,
            ListingScope,
            Membership,
            CreateOrganizationRequest,
            AddMemberRequest,
            UpdateMemberRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Registration, sign-in and tokens"),
        (name = "Admin", description = "Account administration for admin and superadmin"),
        (name = "Organizations", description = "Organizations visible to the caller"),
        (name = "Members", description = "Membership management within one organization"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Bearer token authentication
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Get the OpenAPI specification as pretty JSON
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Serve the OpenAPI specification
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
