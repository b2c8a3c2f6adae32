//! Integration tests driving the router over in-memory state.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::{Json, Router, routing::post};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;

use server::auth::{JwtIdentity, SessionClaims};
use server::{AppState, app};
use services::services::completion_api::CompletionApiClient;
use services::services::itinerary_generator::ItineraryGenerator;

const SESSION_SECRET: &str = "test-session-secret";

async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("parse sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect to in-memory sqlite");
    db::MIGRATOR.run(&pool).await.expect("migrations should succeed");
    pool
}

/// App wired to an in-memory database. The generator points at the given
/// base URL (or a dead default for tests that never reach it).
async fn test_app(completions_base_url: Option<String>) -> Router {
    let base_url =
        completions_base_url.unwrap_or_else(|| "http://127.0.0.1:9".to_string());
    let client = CompletionApiClient::new("test-key".to_string(), Some(base_url), None)
        .expect("build client");

    let state = AppState {
        pool: test_pool().await,
        identity: Arc::new(JwtIdentity::new(SESSION_SECRET)),
        generator: Arc::new(ItineraryGenerator::new(client)),
    };
    app(state)
}

fn session_token(user_id: &str) -> String {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        exp: 4102444800, // 2100-01-01
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .expect("encode session token")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", session_token(user)),
        );
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is JSON")
    };
    (status, value)
}

fn tokyo_trip_body() -> Value {
    json!({
        "title": "Tokyo Trip",
        "location": "Tokyo",
        "startDate": "2024-05-01T00:00:00Z",
        "endDate": "2024-05-04T00:00:00Z",
        "items": [
            {"day": 1, "time": "10:00", "activity": "Visit Senso-ji", "type": "sightseeing"}
        ]
    })
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let app = test_app(None).await;

    let (status, _) = send(&app, "GET", "/api/itineraries", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("GET")
        .uri("/api/itineraries")
        .header(header::AUTHORIZATION, "Bearer not-a-session-token")
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_fetch_round_trip() {
    let app = test_app(None).await;

    let (status, created) =
        send(&app, "POST", "/api/itineraries", Some("user-a"), Some(tokyo_trip_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("numeric id");
    assert_eq!(created["title"], "Tokyo Trip");
    assert_eq!(created["userId"], "user-a");
    assert!(created.get("items").is_none(), "create returns the bare itinerary");

    let (status, fetched) = send(
        &app,
        "GET",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = fetched["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["day"], 1);
    assert_eq!(items[0]["activity"], "Visit Senso-ji");
    assert_eq!(items[0]["type"], "sightseeing");
}

#[tokio::test]
async fn create_without_title_is_rejected_with_field() {
    let app = test_app(None).await;

    let mut body = tokyo_trip_body();
    body.as_object_mut().expect("object").remove("title");
    let (status, error) = send(&app, "POST", "/api/itineraries", Some("user-a"), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "title");
    assert!(error["message"].as_str().expect("message").contains("title"));
}

#[tokio::test]
async fn create_with_reversed_dates_is_rejected() {
    let app = test_app(None).await;

    let mut body = tokyo_trip_body();
    body["endDate"] = json!("2024-04-01T00:00:00Z");
    let (status, error) = send(&app, "POST", "/api/itineraries", Some("user-a"), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "endDate");
}

#[tokio::test]
async fn create_with_bad_item_reports_the_item_path() {
    let app = test_app(None).await;

    let mut body = tokyo_trip_body();
    body["items"] = json!([{"day": 1, "activity": "ok"}, {"day": 0, "activity": "bad day"}]);
    let (status, error) = send(&app, "POST", "/api/itineraries", Some("user-a"), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "items.1.day");
}

#[tokio::test]
async fn fetching_a_missing_itinerary_is_404() {
    let app = test_app(None).await;
    let (status, error) =
        send(&app, "GET", "/api/itineraries/9999", Some("user-a"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["message"], "Itinerary not found");
}

#[tokio::test]
async fn foreign_itinerary_is_forbidden_not_leaked() {
    let app = test_app(None).await;

    let (_, created) =
        send(&app, "POST", "/api/itineraries", Some("user-b"), Some(tokyo_trip_body())).await;
    let id = created["id"].as_i64().expect("numeric id");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("title").is_none(), "record must not leak");
}

#[tokio::test]
async fn listing_never_includes_other_users_trips() {
    let app = test_app(None).await;

    send(&app, "POST", "/api/itineraries", Some("user-a"), Some(tokyo_trip_body())).await;
    let mut other = tokyo_trip_body();
    other["title"] = json!("Osaka Trip");
    send(&app, "POST", "/api/itineraries", Some("user-b"), Some(other)).await;

    let (status, listed) = send(&app, "GET", "/api/itineraries", Some("user-a"), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Tokyo Trip");
}

#[tokio::test]
async fn update_applies_partial_and_missing_is_404() {
    let app = test_app(None).await;

    let (_, created) =
        send(&app, "POST", "/api/itineraries", Some("user-a"), Some(tokyo_trip_body())).await;
    let id = created["id"].as_i64().expect("numeric id");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        Some(json!({"title": "Tokyo & Hakone"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Tokyo & Hakone");
    assert_eq!(updated["location"], "Tokyo");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/itineraries/9999",
        Some("user-a"),
        Some(json!({"title": "Ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_of_foreign_itinerary_is_forbidden() {
    let app = test_app(None).await;

    let (_, created) =
        send(&app, "POST", "/api/itineraries", Some("user-b"), Some(tokyo_trip_body())).await;
    let id = created["id"].as_i64().expect("numeric id");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        Some(json!({"title": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_returns_204_then_fetch_is_404() {
    let app = test_app(None).await;

    let (_, created) =
        send(&app, "POST", "/api/itineraries", Some("user-a"), Some(tokyo_trip_body())).await;
    let id = created["id"].as_i64().expect("numeric id");

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null, "delete responds with an empty body");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn item_routes_add_and_remove_single_activities() {
    let app = test_app(None).await;

    let (_, created) =
        send(&app, "POST", "/api/itineraries", Some("user-a"), Some(tokyo_trip_body())).await;
    let id = created["id"].as_i64().expect("numeric id");

    let (status, item) = send(
        &app,
        "POST",
        &format!("/api/itineraries/{id}/items"),
        Some("user-a"),
        Some(json!({"day": 2, "time": "19:00", "activity": "Izakaya dinner", "type": "food"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item["id"].as_i64().expect("numeric id");
    assert_eq!(item["itineraryId"], id);

    // Another user cannot touch items through a foreign itinerary.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/itineraries/{id}/items/{item_id}"),
        Some("user-b"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/itineraries/{id}/items/{item_id}"),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, fetched) = send(
        &app,
        "GET",
        &format!("/api/itineraries/{id}"),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(fetched["items"].as_array().expect("items").len(), 1);
}

#[tokio::test]
async fn generate_with_out_of_range_days_is_rejected() {
    let app = test_app(None).await;

    let (status, error) = send(
        &app,
        "POST",
        "/api/ai/generate-itinerary",
        Some("user-a"),
        Some(json!({"location": "Tokyo", "days": 20, "startDate": "2024-05-01T00:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "days");
}

/// Serve a canned completion so generation runs without the real provider.
async fn spawn_completions_endpoint(content: String) -> String {
    let fake = Router::new().route(
        "/chat/completions",
        post(move || {
            let content = content.clone();
            async move {
                Json(json!({
                    "id": "cmpl-test",
                    "model": "gpt-5.1",
                    "choices": [{"message": {"content": content}, "finish_reason": "stop"}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 34}
                }))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, fake).await.expect("serve fake endpoint");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn generate_returns_the_models_draft() {
    let draft = json!({
        "title": "Three Days in Tokyo",
        "items": [
            {"day": 1, "time": "10:00", "activity": "Visit Senso-ji", "location": "Asakusa", "notes": "", "type": "sightseeing"}
        ]
    });
    let base_url = spawn_completions_endpoint(draft.to_string()).await;
    let app = test_app(Some(base_url)).await;

    let (status, generated) = send(
        &app,
        "POST",
        "/api/ai/generate-itinerary",
        Some("user-a"),
        Some(json!({"location": "Tokyo", "days": 3, "startDate": "2024-05-01T00:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(generated["title"], "Three Days in Tokyo");
    assert_eq!(generated["items"][0]["type"], "sightseeing");
}

#[tokio::test]
async fn generation_failure_is_a_generic_500() {
    let base_url = spawn_completions_endpoint("no json here, just vibes".to_string()).await;
    let app = test_app(Some(base_url)).await;

    let (status, error) = send(
        &app,
        "POST",
        "/api/ai/generate-itinerary",
        Some("user-a"),
        Some(json!({"location": "Tokyo", "days": 2, "startDate": "2024-05-01T00:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["message"], "Failed to generate itinerary");
}
