mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use dictionary_api_server::create_app;

async fn app() -> Router {
    create_app(common::test_state().await)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Registers a fresh user and returns its access and refresh tokens.
async fn register(app: &Router) -> (String, String) {
    let (status, body) = send(
        app,
        post_json(
            "/api/v1/auth/register",
            json!({
                "email": format!("test_{}@example.com", Uuid::new_v4()),
                "password": "securepassword123"
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        body["data"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

async fn create_api_key(app: &Router, access: &str) -> String {
    let (status, body) = send(
        app,
        post_json("/api/v1/user/api-key", json!({"name": "tests"}), Some(access)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["api_key"]["key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;
    let (status, body) = send(&app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_readiness_without_external_stores() {
    let app = app().await;
    let (status, body) = send(&app, get("/ready", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"], "in-memory");
}

#[tokio::test]
async fn test_user_routes_require_bearer_token() {
    let app = app().await;

    let (status, _) = send(&app, get("/api/v1/user/usage", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, get("/api/v1/user/usage", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = app().await;
    let (_, refresh) = register(&app).await;

    let (status, _) = send(&app, get("/api/v1/user/me", Some(&refresh))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let app = app().await;
    let (_, refresh) = register(&app).await;

    let (status, body) = send(
        &app,
        post_json("/api/v1/auth/refresh", json!({"refresh_token": refresh}), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["data"]["refresh_token"].as_str().unwrap().to_string();

    // The old token was consumed by the rotation.
    let (status, _) = send(
        &app,
        post_json("/api/v1/auth/refresh", json!({"refresh_token": refresh}), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json("/api/v1/auth/logout", json!({"refresh_token": rotated}), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json("/api/v1/auth/refresh", json!({"refresh_token": rotated}), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_word_lookup_requires_api_key() {
    let app = app().await;

    let (status, body) = send(&app, get("/api/v1/words/serendipity", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "API key is required");

    let bogus = format!("oxf_{}", "A".repeat(43));
    let (status, _) = send(
        &app,
        get(&format!("/api/v1/words/serendipity?apikey={}", bogus), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_free_plan_quota_over_http() {
    let app = app().await;
    let (access, _) = register(&app).await;
    let key = create_api_key(&app, &access).await;

    for i in 1..=10 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/words/serendipity")
                    .header("x-api-key", &key)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {}", i);
        assert_eq!(
            response.headers()["x-quota-remaining"],
            (10 - i).to_string().as_str()
        );
    }

    let (status, body) = send(
        &app,
        get(&format!("/api/v1/words/serendipity?apikey={}", key), None),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["status"], 402);

    let (status, body) = send(&app, get("/api/v1/user/usage", Some(&access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "free");
    assert_eq!(body["daily_limit"], 10);
    assert_eq!(body["today"], 11);
    assert_eq!(body["total"], 11);

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/user/plan",
            json!({"change": "upgrade", "plan": "pro"}),
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        get(&format!("/api/v1/words/serendipity?apikey={}", key), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["part_of_speech"], "noun");
}

#[tokio::test]
async fn test_unknown_word_is_still_metered() {
    let app = app().await;
    let (access, _) = register(&app).await;
    let key = create_api_key(&app, &access).await;

    let (status, _) = send(
        &app,
        get(&format!("/api/v1/words/nonexistent?apikey={}", key), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, get("/api/v1/user/usage", Some(&access))).await;
    assert_eq!(body["today"], 1);
}

#[tokio::test]
async fn test_word_lookup_by_part_of_speech_and_id() {
    let app = app().await;
    let (access, _) = register(&app).await;
    let key = create_api_key(&app, &access).await;

    let (status, body) = send(
        &app,
        get(&format!("/api/v1/words/run?apikey={}&part_of_speech=verb", key), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], common::RUN_VERB_ID.to_string());

    let (_, body) = send(
        &app,
        get(&format!("/api/v1/words/run?apikey={}&part_of_speech=noun", key), None),
    )
    .await;
    assert_eq!(body["data"]["id"], common::RUN_NOUN_ID.to_string());

    let (status, body) = send(
        &app,
        get(&format!("/api/v1/words/id/{}?apikey={}", common::RUN_VERB_ID, key), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["part_of_speech"], "verb");
    assert_eq!(body["usage"]["today"], 3);

    let (status, _) = send(
        &app,
        get(&format!("/api/v1/words/run?apikey={}&part_of_speech=adverb", key), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_plan_change_is_rejected() {
    let app = app().await;
    let (access, _) = register(&app).await;

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/user/plan",
            json!({"change": "downgrade", "plan": "free"}),
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_key_lifecycle() {
    let app = app().await;
    let (access, _) = register(&app).await;

    let (status, _) = send(&app, get("/api/v1/user/api-key", Some(&access))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let key = create_api_key(&app, &access).await;

    let (status, _) = send(
        &app,
        post_json("/api/v1/user/api-key", json!({}), Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, get("/api/v1/user/api-key", Some(&access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_key"]["key"], key.as_str());

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/v1/user/api-key")
        .header("authorization", format!("Bearer {}", access))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        get(&format!("/api/v1/words/serendipity?apikey={}", key), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_box_action_flow() {
    let app = app().await;
    let (access, _) = register(&app).await;
    let word_id = Uuid::new_v4();

    let (status, body) = send(&app, get(&format!("/api/v1/box/{}", word_id), Some(&access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 0);
    assert_eq!(body["last_action"], "init");

    let (status, body) = send(&app, get("/api/v1/box/due", Some(&access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/box/action",
            json!({"word_id": word_id, "action_name": "level-up"}),
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 1);
    assert_eq!(body["last_action"], "level-up");

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/box/action",
            json!({"word_id": word_id, "action_name": "promote"}),
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported action type: promote");

    let (_, body) = send(&app, get("/api/v1/box/due", Some(&access))).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app().await;
    let _ = register(&app).await;

    let response = app.clone().oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("dictionary_tokens_issued_total 1"));
}
