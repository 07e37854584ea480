//! Member handlers for one organization

use super::types::{AddMemberRequest, UpdateMemberRequest};
use crate::{
    auth::{Api, OrganizationAccess},
    error::ErrorBody,
    ApiError, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use orgdesk_applications::{DenialReason, Membership};

#[utoipa::path(
    get,
    path = "/api/organizations/{organization_id}/members",
    tag = "Members",
    params(("organization_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Members of the organization", body = [Membership]),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not a member", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    OrganizationAccess(ctx, _): OrganizationAccess<Api>,
) -> Result<Json<Vec<Membership>>, ApiError> {
    Ok(Json(state.organizations.list_members(&ctx).await?))
}

/// Add an existing user to the organization
#[utoipa::path(
    post,
    path = "/api/organizations/{organization_id}/members",
    tag = "Members",
    params(("organization_id" = String, Path, description = "Organization id")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = Membership),
        (status = 400, description = "Invalid role", body = ErrorBody),
        (status = 403, description = "Caller cannot manage members", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 409, description = "Already a member", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    OrganizationAccess(ctx, _): OrganizationAccess<Api>,
    Json(request): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<Membership>), ApiError> {
    // Refuse before the user lookup so non-managers cannot probe accounts
    if !ctx.can_manage_members() {
        return Err(ApiError::Denied(DenialReason::Forbidden));
    }
    if state.users.get_user(&request.user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", request.user_id)));
    }

    let membership = state
        .organizations
        .add_member(&ctx, &request.user_id, request.role)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// Change a member's role
#[utoipa::path(
    patch,
    path = "/api/organizations/{organization_id}/members/{member_id}",
    tag = "Members",
    params(
        ("organization_id" = String, Path, description = "Organization id"),
        ("member_id" = String, Path, description = "Membership id")
    ),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Role updated", body = Membership),
        (status = 400, description = "Invalid role", body = ErrorBody),
        (status = 403, description = "Caller cannot manage members, or the target is the owner", body = ErrorBody),
        (status = 404, description = "No such member in this organization", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn update_member(
    State(state): State<AppState>,
    OrganizationAccess(ctx, _): OrganizationAccess<Api>,
    Path((_organization_id, member_id)): Path<(String, String)>,
    Json(request): Json<UpdateMemberRequest>,
) -> Result<Json<Membership>, ApiError> {
    let membership = state
        .organizations
        .update_member_role(&ctx, &member_id, request.role)
        .await?;
    Ok(Json(membership))
}

/// Remove a member; the owner can never be removed
#[utoipa::path(
    delete,
    path = "/api/organizations/{organization_id}/members/{member_id}",
    tag = "Members",
    params(
        ("organization_id" = String, Path, description = "Organization id"),
        ("member_id" = String, Path, description = "Membership id")
    ),
    responses(
        (status = 200, description = "The removed membership", body = Membership),
        (status = 403, description = "Caller cannot manage members", body = ErrorBody),
        (status = 404, description = "No such member in this organization", body = ErrorBody),
        (status = 409, description = "The owner cannot be removed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    OrganizationAccess(ctx, _): OrganizationAccess<Api>,
    Path((_organization_id, member_id)): Path<(String, String)>,
) -> Result<Json<Membership>, ApiError> {
    Ok(Json(state.organizations.remove_member(&ctx, &member_id).await?))
}
