//! Route definitions for the Orgdesk web server

use crate::{auth, handlers, openapi, AppState};
use axum::{
    routing::{get, patch, post, put},
    Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
        // Authentication
        .route("/auth/register", post(auth::handlers::register_user))
        .route("/auth/login", post(auth::handlers::login_user))
        .route("/auth/refresh", post(auth::handlers::refresh_token))
        .route("/auth/me", get(auth::handlers::get_current_user))
        .route("/auth/logout", post(auth::handlers::logout_user))
        // Account administration
        .route("/admin/users", get(handlers::list_users))
        .route("/admin/users/{user_id}/role", put(handlers::update_user_role))
        // Organizations
        .route(
            "/organizations",
            get(handlers::list_organizations).post(handlers::create_organization),
        )
        .route(
            "/organizations/{organization_id}",
            get(handlers::get_organization).delete(handlers::delete_organization),
        )
        // Members
        .route(
            "/organizations/{organization_id}/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/organizations/{organization_id}/members/{member_id}",
            patch(handlers::update_member).delete(handlers::remove_member),
        )
}

/// Create server-rendered page routes
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            auth::LOGIN_PATH,
            get(handlers::login_page).post(handlers::login_submit),
        )
        .route("/logout", post(handlers::logout_page))
        .route(auth::UNAUTHORIZED_PATH, get(handlers::unauthorized_page))
        .route(handlers::DASHBOARD_PATH, get(handlers::dashboard))
        .route(
            "/dashboard/organizations/{organization_id}",
            get(handlers::organization_page),
        )
        .route("/admin/users", get(handlers::admin_users_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteStore;
    use axum::{body::Body, http::Request, http::StatusCode};
    use orgdesk_core::OrgdeskConfig;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let store = SqliteStore::in_memory().await.unwrap();
        AppState::from_store(OrgdeskConfig::default(), store)
    }

    #[tokio::test]
    async fn test_health_check_route() {
        let app = api_routes().with_state(test_state().await);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_organizations_require_credentials() {
        let app = api_routes().with_state(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/organizations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_root_redirects_to_dashboard() {
        let app = page_routes().with_state(test_state().await);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(response.headers()["location"], "/dashboard");
    }

    #[tokio::test]
    async fn test_dashboard_redirects_to_login() {
        let app = page_routes().with_state(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}
