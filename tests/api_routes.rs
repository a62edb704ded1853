// Router-level tests for behavior decided before any database access:
// origin checks, authentication, id parsing and the fallback route.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use blog_api::{
    auth::{issue_token, TOKEN_COOKIE},
    config::{AuthConfig, DatabaseConfig, MediaConfig},
    db::Database,
    media::MediaClient,
    middleware::ALLOWED_ORIGINS,
    routes::create_router,
    state::AppState,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl: chrono::Duration::hours(1),
        cookie_ttl_days: 3,
        secure_cookies: false,
    }
}

// Nothing listens on port 9; any test that reaches the database would fail loudly.
fn app() -> Router {
    let database = Database::connect_lazy(DatabaseConfig {
        host: "127.0.0.1".to_string(),
        port: 9,
        database: "blog".to_string(),
        username: "blog".to_string(),
        password: "blog".to_string(),
        ssl_mode: "disable".to_string(),
        max_connections: 1,
        connection_timeout: Duration::from_secs(1),
    })
    .expect("pool should build without connecting");

    let media = MediaClient::from_config(&MediaConfig {
        cloud_name: "demo".to_string(),
        api_key: "key".to_string(),
        api_secret: "secret".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
    })
    .expect("media client should build");

    create_router(AppState {
        db: Arc::new(database),
        media: Arc::new(media),
        auth: Arc::new(auth_config()),
    })
}

async fn send(request: Request<Body>) -> Response {
    app().oneshot(request).await.expect("router is infallible")
}

async fn error_code(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("error body is JSON");
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn disallowed_origin_is_rejected_on_every_route_group() {
    for uri in ["/api/users", "/api/posts", "/api/posts/not-an-id", "/health"] {
        let response = send(
            Request::builder()
                .uri(uri)
                .header(header::ORIGIN, "https://attacker.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri {}", uri);
        assert_eq!(error_code(response).await, "CORS_REJECTED");
    }
}

#[tokio::test]
async fn preflight_for_allowed_origin_is_answered_without_handlers() {
    let response = send(
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/posts")
            .header(header::ORIGIN, ALLOWED_ORIGINS[1])
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGINS[1]
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}

#[tokio::test]
async fn unknown_route_returns_json_not_found() {
    let response = send(
        Request::builder()
            .uri("/api/comments")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(response).await, "NOT_FOUND");
}

#[tokio::test]
async fn malformed_ids_are_validation_errors() {
    for uri in ["/api/users/42", "/api/posts/not-a-uuid", "/api/posts?user_id=abc"] {
        let response = send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(error_code(response).await, "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let id = Uuid::new_v4();
    let cases = [
        (Method::GET, "/api/users/me".to_string()),
        (Method::POST, "/api/posts".to_string()),
        (Method::PUT, format!("/api/posts/{}", id)),
        (Method::DELETE, format!("/api/posts/{}", id)),
        (Method::PUT, format!("/api/users/{}", id)),
        (Method::DELETE, format!("/api/users/{}", id)),
    ];

    for (method, uri) in cases {
        let response = send(
            Request::builder()
                .method(method.clone())
                .uri(uri.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(error_code(response).await, "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn account_changes_are_limited_to_the_owner() {
    let caller = Uuid::new_v4();
    let someone_else = Uuid::new_v4();
    let token = issue_token(caller, &auth_config()).unwrap();

    let response = send(
        Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/users/{}", someone_else))
            .header(header::COOKIE, format!("{}={}", TOKEN_COOKIE, token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Mallory"}"#))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "FORBIDDEN");
}

#[tokio::test]
async fn register_validation_runs_before_storage() {
    let response = send(
        Request::builder()
            .method(Method::POST)
            .uri("/api/users/register")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Jane&email=not-an-email&password=secret1"))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let response = send(
        Request::builder()
            .method(Method::POST)
            .uri("/api/users/logout")
            .header(header::ORIGIN, ALLOWED_ORIGINS[0])
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("logout should set a removal cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with(&format!("{}=", TOKEN_COOKIE)));
    assert!(set_cookie.contains("Max-Age=0"));
}
