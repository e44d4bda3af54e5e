#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use threat_prediction_server::config::Config;
use threat_prediction_server::db::DbId;
use threat_prediction_server::middleware::jwt::generate_access_token;
use threat_prediction_server::models::api_key::CreateApiKeyRequest;
use threat_prediction_server::services::api_key_service;
use threat_prediction_server::services::model_client::ModelClient;
use threat_prediction_server::services::notifier::PredictionNotifier;
use threat_prediction_server::services::prediction_service::PredictionWriter;
use threat_prediction_server::state::AppState;
use threat_prediction_server::ws::ChannelRegistry;

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

// ---------------------------------------------------------------------------
// Stub model service
// ---------------------------------------------------------------------------

/// A stand-in for the inference service listening on an ephemeral port.
pub struct ModelStub {
    pub url: String,
    calls: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Value>>>,
}

impl ModelStub {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

/// Serve `POST /predict` answering `status` + `body` after `delay`.
pub async fn spawn_model_stub(status: StatusCode, body: Value, delay: Duration) -> ModelStub {
    let calls = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(Mutex::new(Vec::new()));

    let counter = calls.clone();
    let log = received.clone();
    let app = Router::new().route(
        "/predict",
        post(move |Json(payload): Json<Value>| {
            let counter = counter.clone();
            let log = log.clone();
            let body = body.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                log.lock().unwrap().push(payload);
                tokio::time::sleep(delay).await;
                (status, Json(body))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ModelStub {
        url: format!("http://{addr}"),
        calls,
        received,
    }
}

pub async fn model_returning(body: Value) -> ModelStub {
    spawn_model_stub(StatusCode::OK, body, Duration::ZERO).await
}

/// A base URL nothing listens on.
pub async fn unreachable_model_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Application wiring
// ---------------------------------------------------------------------------

pub fn test_config(model_url: &str, timeout_secs: u64) -> Config {
    Config {
        database_url: "postgres://unused-in-tests".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        server_port: 0,
        model_service_url: model_url.to_string(),
        model_timeout_secs: timeout_secs,
        model_version: "1.0".to_string(),
        db_max_connections: 5,
        jwt_expiry_mins: 15,
    }
}

/// Build the state used by the router, wired exactly as `main` wires it.
pub fn test_state(pool: PgPool, model_url: &str, timeout_secs: u64) -> AppState {
    let config = test_config(model_url, timeout_secs);
    let channels = Arc::new(ChannelRegistry::new());
    let model = ModelClient::new(&config.model_service_url, config.model_timeout()).unwrap();
    let writer = PredictionWriter::new(
        pool.clone(),
        model,
        PredictionNotifier::new(channels.clone()),
        config.model_timeout(),
        config.model_version.clone(),
    );

    AppState {
        pool,
        config: Arc::new(config),
        channels,
        writer,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with a fixed id.
pub async fn seed_user(pool: &PgPool, id: DbId) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, 'x') RETURNING id",
    )
    .bind(id)
    .bind(format!("user {id}"))
    .bind(format!("user{id}@example.com"))
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Create an API key for `user_id`, returning `(key_id, plaintext_secret)`.
pub async fn seed_api_key(pool: &PgPool, user_id: DbId, label: &str) -> (DbId, String) {
    let key = api_key_service::create_key(
        pool,
        user_id,
        CreateApiKeyRequest {
            label: Some(label.to_string()),
            expires_in_days: None,
        },
    )
    .await
    .unwrap();
    (key.id, key.key)
}

/// Insert a prediction row directly (read-side fixtures).
pub async fn insert_prediction(
    pool: &PgPool,
    user_id: DbId,
    api_key_id: DbId,
    label: &str,
    confidence: f64,
    created_at: DateTime<Utc>,
) -> DbId {
    sqlx::query_scalar(
        r#"
        INSERT INTO prediction_events (
            user_id, api_key_id, request_payload, prediction_label,
            confidence_score, risk_score, response_payload, model_version, created_at
        )
        VALUES ($1, $2, '{}'::jsonb, $3, $4, 0.5, '{}'::jsonb, '1.0', $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(api_key_id)
    .bind(label)
    .bind(confidence)
    .bind(created_at)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn token_for(user_id: DbId) -> String {
    generate_access_token(user_id, &format!("user{user_id}@example.com"), TEST_SECRET, 15).unwrap()
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn predict_request(api_key: &str, body: &Value) -> Request<Body> {
    Request::post("/api/predict")
        .header("content-type", "application/json")
        .header("x-api-key", api_key)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_token(uri: &str, user_id: DbId) -> Request<Body> {
    Request::get(uri)
        .header("authorization", format!("Bearer {}", token_for(user_id)))
        .body(Body::empty())
        .unwrap()
}
