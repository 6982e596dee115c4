//! In-process mock of the cache service's KV HTTP API, used by tests in
//! place of a real cache deployment.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

pub type Entries = Arc<RwLock<HashMap<String, String>>>;

#[derive(Deserialize)]
struct ScanParams {
    #[serde(default)]
    prefix: String,
}

#[derive(Serialize)]
struct ScanResponse {
    entries: HashMap<String, String>,
}

async fn get_key(
    State(entries): State<Entries>,
    Path(key): Path<String>,
) -> Result<String, StatusCode> {
    entries
        .read()
        .await
        .get(&key)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_key(State(entries): State<Entries>, Path(key): Path<String>, body: String) -> StatusCode {
    entries.write().await.insert(key, body);
    StatusCode::NO_CONTENT
}

async fn delete_key(State(entries): State<Entries>, Path(key): Path<String>) -> StatusCode {
    match entries.write().await.remove(&key) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn scan(
    State(entries): State<Entries>,
    Query(params): Query<ScanParams>,
) -> Json<ScanResponse> {
    let entries = entries
        .read()
        .await
        .iter()
        .filter(|(key, _)| key.starts_with(&params.prefix))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Json(ScanResponse { entries })
}

/// Binds an ephemeral port, serves the KV API from a background task, and
/// returns the base URL plus a handle on the backing map.
pub async fn spawn_kv_server() -> (String, Entries) {
    let entries: Entries = Arc::new(RwLock::new(HashMap::new()));

    let app = Router::new()
        .route("/v1/kv", get(scan))
        .route(
            "/v1/kv/{key}",
            get(get_key).put(put_key).delete(delete_key),
        )
        .with_state(entries.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), entries)
}

/// KV API double that rejects every request, for driving error paths.
pub async fn spawn_failing_kv_server() -> String {
    let app = Router::new().fallback(|| async { StatusCode::INTERNAL_SERVER_ERROR });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}
