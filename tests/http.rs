//! HTTP surface tests: the assembled kernel driven request by request.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use groundwork::config::Env;
use groundwork::http::{AppContext, HttpKernel};
use groundwork::lifecycle::Application;

fn test_env() -> Env {
    Env::from_vars(
        [
            ("NODE_ENV", "test"),
            ("DB_URL", "postgres://localhost:5432/app"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            // Minimum bcrypt cost keeps the suite fast.
            ("BCRYPT_SALT_ROUNDS", "4"),
            // A port nothing listens on, so dev-proxy tests fail fast.
            ("VITE_SERVER_PORT", "59999"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string())),
    )
    .expect("test env should parse")
}

async fn test_router() -> Router {
    let mut app = Application::new(test_env());
    app.init().await.expect("init");
    app.boot().await.expect("boot");

    let ctx = AppContext::from_application(&app).expect("context");
    let mut kernel = HttpKernel::new(ctx);
    kernel.boot();
    kernel.router().expect("router")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn put_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.expect("response")
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn register(router: &Router, email: &str) -> Value {
    let response = send(
        router,
        post_json(
            "/api/auth/register",
            &json!({"email": email, "password": "correct-horse", "name": "Test User"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn health_returns_ok() {
    let router = test_router().await;
    let response = send(&router, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert!(body["uptime"].as_f64().is_some());
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn api_banner_is_served() {
    let router = test_router().await;
    let response = send(&router, get("/api")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("API"));
}

#[tokio::test]
async fn security_headers_are_attached() {
    let router = test_router().await;
    let response = send(&router, get("/health")).await;

    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
}

#[tokio::test]
async fn register_returns_user_and_tokens() {
    let router = test_router().await;
    let body = register(&router, "a@example.com").await;

    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["email"], "a@example.com");
    assert!(body["user"]["isActive"].as_bool().unwrap());
    assert!(body["tokens"]["accessToken"].as_str().is_some());
    assert!(body["tokens"]["refreshToken"].as_str().is_some());
}

#[tokio::test]
async fn duplicate_email_is_operational_conflict() {
    let router = test_router().await;
    register(&router, "a@example.com").await;

    let response = send(
        &router,
        post_json(
            "/api/auth/register",
            &json!({"email": "a@example.com", "password": "correct-horse", "name": "Other"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 409);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn register_with_invalid_email_is_rejected() {
    let router = test_router().await;
    let response = send(
        &router,
        post_json(
            "/api/auth/register",
            &json!({"email": "not-an-email", "password": "correct-horse", "name": "Test"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid email format");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let router = test_router().await;
    register(&router, "a@example.com").await;

    let response = send(
        &router,
        post_json(
            "/api/auth/login",
            &json!({"email": "a@example.com", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn profile_requires_bearer_token() {
    let router = test_router().await;
    let registered = register(&router, "a@example.com").await;
    let token = registered["tokens"]["accessToken"].as_str().unwrap();

    let response = send(&router, get("/api/auth/profile")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/profile")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "a@example.com");
}

#[tokio::test]
async fn refresh_rotates_and_consumes_tokens() {
    let router = test_router().await;
    let registered = register(&router, "a@example.com").await;
    let refresh_token = registered["tokens"]["refreshToken"].as_str().unwrap();

    let response = send(
        &router,
        post_json("/api/auth/refresh", &json!({"refreshToken": refresh_token})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert!(rotated["accessToken"].as_str().is_some());
    assert_ne!(rotated["refreshToken"], registered["tokens"]["refreshToken"]);

    // Replaying the consumed token fails.
    let response = send(
        &router,
        post_json("/api/auth/refresh", &json!({"refreshToken": refresh_token})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_and_password_change() {
    let router = test_router().await;
    let registered = register(&router, "a@example.com").await;
    let token = registered["tokens"]["accessToken"].as_str().unwrap();

    let response = send(
        &router,
        put_json("/api/auth/profile", token, &json!({"name": "Renamed"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["name"], "Renamed");

    let response = send(
        &router,
        put_json(
            "/api/auth/password",
            token,
            &json!({"currentPassword": "correct-horse", "newPassword": "even-better-horse"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works.
    let response = send(
        &router,
        post_json(
            "/api/auth/login",
            &json!({"email": "a@example.com", "password": "correct-horse"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &router,
        post_json(
            "/api/auth/login",
            &json!({"email": "a@example.com", "password": "even-better-horse"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_api_route_is_json_not_found() {
    let router = test_router().await;
    let response = send(&router, get("/api/widgets")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 404);
    assert!(body["error"].as_str().unwrap().contains("/api/widgets"));
}

#[tokio::test]
async fn credential_endpoints_are_rate_limited() {
    let router = test_router().await;

    let attempt = || {
        post_json(
            "/api/auth/login",
            &json!({"email": "a@example.com", "password": "wrong"}),
        )
    };

    for _ in 0..5 {
        let response = send(&router, attempt()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = send(&router, attempt()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(response.headers()["x-ratelimit-limit"], "5");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 429);
}

#[tokio::test]
async fn frontend_fallback_reports_missing_dev_server() {
    let router = test_router().await;
    let response = send(&router, get("/some/frontend/page")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Development server unavailable");
}
