//! Stub LeadsFlow backend for integration tests.
//!
//! Serves the `/api/leads` and `/api/settings` routes with axum on an
//! ephemeral port. The server runs on its own thread and runtime so both
//! blocking CLI tests and `#[tokio::test]`s can use it.

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

#[derive(Default)]
pub struct StubState {
    pub leads: Vec<Value>,
    pub settings: Map<String, Value>,
    /// Ids whose deletion is refused with 409.
    pub locked: HashSet<String>,
    /// Required bearer token, if any.
    pub token: Option<String>,
    pub requests: Vec<String>,
    next_id: usize,
}

type Shared = Arc<Mutex<StubState>>;

pub struct StubBackend {
    pub url: String,
    state: Shared,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubBackend {
    pub fn spawn(leads: Vec<Value>) -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState {
            leads,
            ..StubState::default()
        }));
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(state.clone());

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .unwrap();
            });
        });

        let addr = addr_rx.recv().unwrap();
        Self {
            url: format!("http://{}", addr),
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    pub fn lead_ids(&self) -> Vec<String> {
        self.state()
            .leads
            .iter()
            .filter_map(|l| l["id"].as_str().map(str::to_string))
            .collect()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn lead_json(id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": status,
        "created_at": "2026-01-10T12:00:00Z",
    })
}

fn failure(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "success": false, "error": { "code": code, "message": message } })),
    )
}

fn authorized(state: &StubState, headers: &HeaderMap) -> bool {
    match &state.token {
        None => true,
        Some(token) => headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", token)),
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/leads", get(list_leads).post(create_lead))
        .route("/api/leads/import", post(import_leads))
        .route("/api/leads/remove-duplicates", post(remove_duplicates))
        .route(
            "/api/leads/{id}",
            patch(update_lead).delete(delete_lead).get(get_lead),
        )
        .route("/api/settings", get(get_settings).put(save_settings))
        .with_state(state)
}

async fn list_leads(State(state): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state.requests.push("GET /api/leads".into());
    if !authorized(&state, &headers) {
        return failure(StatusCode::UNAUTHORIZED, "unauthorized", "missing token");
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "leads": state.leads })),
    )
}

async fn get_lead(State(state): State<Shared>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let state = state.lock().unwrap();
    match state.leads.iter().find(|l| l["id"] == id.as_str()) {
        Some(lead) => (StatusCode::OK, Json(json!({ "success": true, "lead": lead }))),
        None => failure(StatusCode::NOT_FOUND, "not_found", "lead not found"),
    }
}

fn new_record(state: &mut StubState, mut body: Value) -> Value {
    state.next_id += 1;
    body["id"] = json!(format!("srv-{}", state.next_id));
    body["created_at"] = json!("2026-02-01T09:00:00Z");
    state.leads.push(body.clone());
    body
}

async fn create_lead(State(state): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state.requests.push("POST /api/leads".into());
    let lead = new_record(&mut state, body);
    (StatusCode::CREATED, Json(json!({ "success": true, "lead": lead })))
}

async fn update_lead(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state.requests.push(format!("PATCH /api/leads/{}", id));
    let Some(lead) = state.leads.iter_mut().find(|l| l["id"] == id.as_str()) else {
        return failure(StatusCode::NOT_FOUND, "not_found", "lead not found");
    };
    if let (Some(target), Some(fields)) = (lead.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    let lead = lead.clone();
    (StatusCode::OK, Json(json!({ "success": true, "lead": lead })))
}

async fn delete_lead(State(state): State<Shared>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state.requests.push(format!("DELETE /api/leads/{}", id));
    if state.locked.contains(&id) {
        return failure(StatusCode::CONFLICT, "conflict", "lead is locked");
    }
    let before = state.leads.len();
    state.leads.retain(|l| l["id"] != id.as_str());
    if state.leads.len() == before {
        return failure(StatusCode::NOT_FOUND, "not_found", "lead not found");
    }
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn import_leads(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let rows = body["leads"].as_array().cloned().unwrap_or_default();
    let imported = rows.len();
    for row in rows {
        new_record(&mut state, row);
    }
    Json(json!({ "success": true, "imported": imported, "skipped": 0 }))
}

async fn remove_duplicates(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let mut seen = HashSet::new();
    let before = state.leads.len();
    state.leads.retain(|l| {
        let key = l["phone"]
            .as_str()
            .or_else(|| l["email"].as_str())
            .or_else(|| l["id"].as_str())
            .unwrap_or_default()
            .to_string();
        seen.insert(key)
    });
    let removed = before - state.leads.len();
    Json(json!({ "success": true, "removed": removed }))
}

async fn get_settings(State(state): State<Shared>) -> Json<Value> {
    let state = state.lock().unwrap();
    Json(json!({ "success": true, "settings": state.settings }))
}

async fn save_settings(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    if let Some(settings) = body["settings"].as_object() {
        state.settings = settings.clone();
    }
    Json(json!({ "success": true }))
}
