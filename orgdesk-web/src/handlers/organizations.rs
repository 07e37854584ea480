//! Organization handlers

use super::types::CreateOrganizationRequest;
use crate::{
    auth::{Api, Authenticated, OrganizationAccess},
    error::ErrorBody,
    ApiError, AppState,
};
use axum::{extract::State, http::StatusCode, response::Json};
use orgdesk_applications::{Organization, OrganizationListing};

/// List the organizations visible to the caller
///
/// `superadmin` and `admin` see every organization; other users see the ones
/// they belong to.
#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "Organizations",
    responses(
        (status = 200, description = "Visible organizations", body = OrganizationListing),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    Authenticated(identity, _): Authenticated<Api>,
) -> Result<Json<OrganizationListing>, ApiError> {
    let listing = state
        .organizations
        .list_visible_organizations(Some(&identity))
        .await?;
    Ok(Json(listing))
}

/// Create an organization; the caller becomes its owner
#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Organizations",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = Organization),
        (status = 400, description = "Invalid name or slug", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 409, description = "Slug already taken", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_organization(
    State(state): State<AppState>,
    Authenticated(identity, _): Authenticated<Api>,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    let organization = state
        .organizations
        .create_organization(Some(&identity), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

#[utoipa::path(
    get,
    path = "/api/organizations/{organization_id}",
    tag = "Organizations",
    params(("organization_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "The organization", body = Organization),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not a member", body = ErrorBody),
        (status = 404, description = "No such organization", body = ErrorBody),
        (status = 500, description = "Membership lookup failed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_organization(
    State(state): State<AppState>,
    OrganizationAccess(ctx, _): OrganizationAccess<Api>,
) -> Result<Json<Organization>, ApiError> {
    Ok(Json(state.organizations.get_organization(&ctx).await?))
}

/// Delete an organization and all of its memberships
#[utoipa::path(
    delete,
    path = "/api/organizations/{organization_id}",
    tag = "Organizations",
    params(("organization_id" = String, Path, description = "Organization id")),
    responses(
        (status = 204, description = "Organization deleted"),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Only the owner or an administrator may delete", body = ErrorBody),
        (status = 404, description = "No such organization", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_organization(
    State(state): State<AppState>,
    OrganizationAccess(ctx, _): OrganizationAccess<Api>,
) -> Result<StatusCode, ApiError> {
    state.organizations.delete_organization(&ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
