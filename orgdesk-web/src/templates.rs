//! Server-rendered pages
//!
//! Templates live in `templates/` and are compiled in by Askama.

use crate::auth::users::UserInfo;
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use orgdesk_applications::{Membership, Organization};
use tracing::error;

/// Sign-in form
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub username: String,
    pub error: Option<String>,
}

/// Shown when a signed-in user is denied a page
#[derive(Template)]
#[template(path = "unauthorized.html")]
pub struct UnauthorizedTemplate {
    pub title: String,
}

/// Error page template
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub error_code: u16,
    pub error_message: String,
}

/// Landing page after sign-in
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub title: String,
    pub user_name: String,
    pub role: String,
    pub show_all: bool,
    pub can_administer: bool,
    pub organizations: Vec<OrganizationRow>,
}

/// One organization with its members
#[derive(Template)]
#[template(path = "organization.html")]
pub struct OrganizationTemplate {
    pub title: String,
    pub organization: OrganizationRow,
    pub effective_role: String,
    pub can_manage: bool,
    pub members: Vec<MemberRow>,
}

/// Account list for administrators
#[derive(Template)]
#[template(path = "admin_users.html")]
pub struct AdminUsersTemplate {
    pub title: String,
    pub users: Vec<UserInfo>,
}

pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

pub struct MemberRow {
    pub id: String,
    pub user_id: String,
    pub role: String,
    pub is_owner: bool,
}

impl From<&Organization> for OrganizationRow {
    fn from(organization: &Organization) -> Self {
        Self {
            id: organization.id.clone(),
            name: organization.name.clone(),
            slug: organization.slug.clone(),
            created_at: organization.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<&Membership> for MemberRow {
    fn from(member: &Membership) -> Self {
        Self {
            id: member.id.clone(),
            user_id: member.user_id.clone(),
            role: member.role.clone(),
            is_owner: member.is_owner(),
        }
    }
}

impl LoginTemplate {
    pub fn new(username: impl Into<String>, error: Option<String>) -> Self {
        Self {
            title: "Sign in - Orgdesk".to_string(),
            username: username.into(),
            error,
        }
    }
}

impl UnauthorizedTemplate {
    pub fn new() -> Self {
        Self {
            title: "Access denied - Orgdesk".to_string(),
        }
    }
}

impl Default for UnauthorizedTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorTemplate {
    pub fn new(error_code: u16, error_message: String) -> Self {
        Self {
            title: format!("Error {} - Orgdesk", error_code),
            error_code,
            error_message,
        }
    }
}

/// Render a template into an HTML response with the given status
pub fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!("Failed to render template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

pub fn page<T: Template>(template: &T) -> Response {
    render(StatusCode::OK, template)
}

pub fn error_page(status: StatusCode, message: &str) -> Response {
    render(status, &ErrorTemplate::new(status.as_u16(), message.to_string()))
}
