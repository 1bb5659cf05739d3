use std::net::SocketAddr;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;

use agentrun_types::TaskContext;

use crate::state::AppState;

/// Thin adapter: parse request, call Runtime, serialize response. One
/// function registers every route; handlers are free `async fn`s over
/// `State<AppState>`.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/tools", get(list_tools))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task))
        .route("/events", get(events))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = NormalizePathLayer::trim_trailing_slash().layer(app_router(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    tracing::info!(addr = %bound, "agentrun server listening");
    axum::serve(listener, ServiceExt::<Request<axum::body::Body>>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "build_id": option_env!("AGENTRUN_BUILD_ID").unwrap_or("dev"),
    }))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"tools": state.runtime.tools().list()}))
}

async fn list_tasks(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"tasks": state.runtime.list_tasks().await}))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.runtime.get_task(&id).await {
        Some(task) => (StatusCode::OK, Json(json!({"task": task}))),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "Task not found."}))),
    }
}

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    goal: String,
    #[serde(default)]
    context: Option<TaskContext>,
}

async fn create_task(State(state): State<AppState>, Json(body): Json<CreateTaskRequest>) -> impl IntoResponse {
    match state.runtime.create_task(body.goal, body.context).await {
        Ok(task) => (StatusCode::CREATED, Json(json!({"task": task}))),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({"error": e.to_string()})))
        }
    }
}

async fn events(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| events_stream(socket, state))
}

async fn events_stream(mut socket: WebSocket, state: AppState) {
    let snapshot = state.hub.snapshot().await.to_string();
    if socket.send(WsMessage::Text(snapshot.into())).await.is_err() {
        return;
    }

    let mut stream = BroadcastStream::new(state.hub.subscribe());
    loop {
        match stream.next().await {
            Some(Ok(event)) => {
                let payload = json!({"type": event.event_type, "payload": event.payload}).to_string();
                if socket.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            Some(Err(BroadcastStreamRecvError::Lagged(_))) => continue,
            None => break,
        }
    }
}
