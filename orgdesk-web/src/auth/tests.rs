//! Tests for the route guards

use super::*;
use crate::database::SqliteStore;
use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request},
    routing::get,
    Router,
};
use orgdesk_applications::{
    InMemoryStore, MembershipStore, NewOrganization, OrgRole, OrganizationService,
    OrganizationStore, StaticSessionResolver,
};
use orgdesk_core::OrgdeskConfig;
use std::sync::Arc;
use tower::ServiceExt;

const ALICE_TOKEN: &str = "alice-token";
const ADMIN_TOKEN: &str = "admin-token";
const ROOT_TOKEN: &str = "root-token";

fn resolver() -> StaticSessionResolver {
    StaticSessionResolver::new()
        .with_session(ALICE_TOKEN, Identity::new("alice", Role::User))
        .with_session(ADMIN_TOKEN, Identity::new("ada", Role::Admin))
        .with_session(ROOT_TOKEN, Identity::new("root", Role::SuperAdmin))
}

/// State with static sessions and an in-memory organization store
async fn create_test_state() -> (AppState, InMemoryStore) {
    let store = InMemoryStore::new();
    let organizations =
        OrganizationService::new(Arc::new(store.clone()), Arc::new(store.clone()));
    let state = AppState::from_store(
        OrgdeskConfig::default(),
        SqliteStore::in_memory().await.unwrap(),
    )
    .with_session_resolver(Arc::new(resolver()))
    .with_organizations(organizations);
    (state, store)
}

fn parts_with_headers(headers: HeaderMap) -> Parts {
    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/test")
        .body(Body::empty())
        .unwrap();
    *request.headers_mut() = headers;
    request.into_parts().0
}

fn headers_with_bearer_token(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

fn headers_with_cookie(name: &str, token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "cookie",
        HeaderValue::from_str(&format!("{}={}", name, token)).unwrap(),
    );
    headers
}

fn location(response: &Response) -> &str {
    response.headers()["location"].to_str().unwrap()
}

#[test]
fn test_credentials_from_bearer_and_cookie() {
    let credentials =
        extract_credentials(&headers_with_bearer_token("abc"), "orgdesk_session");
    assert_eq!(credentials.bearer_token.as_deref(), Some("abc"));
    assert!(credentials.session_token.is_none());

    let credentials =
        extract_credentials(&headers_with_cookie("orgdesk_session", "xyz"), "orgdesk_session");
    assert!(credentials.bearer_token.is_none());
    assert_eq!(credentials.session_token.as_deref(), Some("xyz"));

    let credentials =
        extract_credentials(&headers_with_cookie("other_cookie", "xyz"), "orgdesk_session");
    assert!(credentials.is_empty());
}

#[tokio::test]
async fn test_authenticated_with_bearer_token() {
    let (state, _) = create_test_state().await;
    let mut parts = parts_with_headers(headers_with_bearer_token(ALICE_TOKEN));

    let Authenticated(identity, _) = Authenticated::<Api>::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(identity.user_id, "alice");
}

#[tokio::test]
async fn test_authenticated_with_session_cookie() {
    let (state, _) = create_test_state().await;
    let mut parts = parts_with_headers(headers_with_cookie(state.cookie_name(), ALICE_TOKEN));

    let result = Authenticated::<Page>::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap().identity().user_id, "alice");
}

#[tokio::test]
async fn test_missing_credentials_api_vs_page() {
    let (state, _) = create_test_state().await;

    let mut parts = parts_with_headers(HeaderMap::new());
    let rejection = Authenticated::<Api>::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);

    let mut parts = parts_with_headers(HeaderMap::new());
    let rejection = Authenticated::<Page>::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&rejection), LOGIN_PATH);
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let (state, _) = create_test_state().await;
    let mut parts = parts_with_headers(headers_with_bearer_token("forged"));

    let rejection = Authenticated::<Api>::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_require_admin() {
    let (state, _) = create_test_state().await;

    let mut parts = parts_with_headers(headers_with_bearer_token(ALICE_TOKEN));
    let rejection = RequireAdmin::<Api>::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::FORBIDDEN);

    let mut parts = parts_with_headers(headers_with_bearer_token(ALICE_TOKEN));
    let rejection = RequireAdmin::<Page>::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(location(&rejection), UNAUTHORIZED_PATH);

    for token in [ADMIN_TOKEN, ROOT_TOKEN] {
        let mut parts = parts_with_headers(headers_with_bearer_token(token));
        assert!(RequireAdmin::<Api>::from_request_parts(&mut parts, &state)
            .await
            .is_ok());
    }
}

#[tokio::test]
async fn test_require_superadmin() {
    let (state, _) = create_test_state().await;

    let mut parts = parts_with_headers(headers_with_bearer_token(ADMIN_TOKEN));
    let rejection = RequireSuperAdmin::<Api>::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::FORBIDDEN);

    let mut parts = parts_with_headers(headers_with_bearer_token(ROOT_TOKEN));
    let RequireSuperAdmin(identity, _) =
        RequireSuperAdmin::<Api>::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
    assert_eq!(identity.global_role, Role::SuperAdmin);
}

#[tokio::test]
async fn test_maybe_identity_never_rejects() {
    let (state, _) = create_test_state().await;

    let mut parts = parts_with_headers(HeaderMap::new());
    let MaybeIdentity(identity) = MaybeIdentity::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert!(identity.is_none());

    let mut parts = parts_with_headers(headers_with_bearer_token(ADMIN_TOKEN));
    let MaybeIdentity(identity) = MaybeIdentity::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(identity.unwrap().user_id, "ada");
}

async fn org_role_api(OrganizationAccess(ctx, _): OrganizationAccess<Api>) -> String {
    ctx.effective_role().to_string()
}

async fn org_role_page(OrganizationAccess(ctx, _): OrganizationAccess<Page>) -> String {
    ctx.effective_role().to_string()
}

fn org_router(state: AppState) -> Router {
    Router::new()
        .route("/api/orgs/{organization_id}", get(org_role_api))
        .route("/orgs/{organization_id}", get(org_role_page))
        .with_state(state)
}

async fn call(app: &Router, uri: &str, token: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_organization_access() {
    let (state, store) = create_test_state().await;
    let (org, _) = store
        .create_organization(
            NewOrganization {
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                ..Default::default()
            },
            "bob",
        )
        .await
        .unwrap();
    let app = org_router(state);

    // Not a member
    let response = call(&app, &format!("/api/orgs/{}", org.id), Some(ALICE_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_string(response).await.contains("NOT_A_MEMBER"));

    let response = call(&app, &format!("/orgs/{}", org.id), Some(ALICE_TOKEN)).await;
    assert_eq!(location(&response), UNAUTHORIZED_PATH);

    // No credentials
    let response = call(&app, &format!("/api/orgs/{}", org.id), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = call(&app, &format!("/orgs/{}", org.id), None).await;
    assert_eq!(location(&response), LOGIN_PATH);

    // Elevated callers need no membership
    let response = call(&app, &format!("/api/orgs/{}", org.id), Some(ADMIN_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "admin");

    // Members get their stored role
    store
        .add_membership("alice", &org.id, OrgRole::Member)
        .await
        .unwrap();
    let response = call(&app, &format!("/api/orgs/{}", org.id), Some(ALICE_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "member");
}
