//! Account administration handlers

use crate::{
    auth::{
        users::{UpdateRoleRequest, UserInfo},
        Api, RequireAdmin,
    },
    error::ErrorBody,
    ApiError, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};

/// List every account
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "All accounts", body = [UserInfo]),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Requires admin or superadmin", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_identity, _): RequireAdmin<Api>,
) -> Result<Json<Vec<UserInfo>>, ApiError> {
    Ok(Json(state.users.list_users().await?))
}

/// Change a user's global role
///
/// Granting or revoking `superadmin` needs a `superadmin` caller.
#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    tag = "Admin",
    params(("user_id" = String, Path, description = "User id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserInfo),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Caller may not make this change", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    RequireAdmin(identity, _): RequireAdmin<Api>,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    let user = state
        .users
        .update_user_role(&identity, &user_id, request.role)
        .await?;
    Ok(Json(user))
}
