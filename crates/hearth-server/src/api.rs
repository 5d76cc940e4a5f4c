use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use hearth_shared::constants::PROTOCOL_VERSION;
use hearth_shared::models::NotificationKind;
use hearth_shared::types::{NotificationId, UserId};
use hearth_store::NotificationEntry;

use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::hub::Hub;
use crate::ws::ws_upgrade;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 200;

#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub verifier: TokenVerifier,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/ws", get(ws_upgrade))
        .route("/presence", get(presence_roster))
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/activity", post(record_activity))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    protocol: &'static str,
    online: usize,
}

#[derive(Serialize)]
struct PresenceResponse {
    online: Vec<UserId>,
}

#[derive(Serialize)]
struct UnreadResponse {
    count: u64,
}

#[derive(Deserialize)]
struct ListParams {
    limit: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRequest {
    kind: NotificationKind,
    target_user_id: UserId,
    entity_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResponse {
    /// `None` when the activity produced no notification (self-activity).
    notification_id: Option<NotificationId>,
    signalled: usize,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        protocol: PROTOCOL_VERSION,
        online: state.hub.registry().connection_count().await,
    })
}

async fn presence_roster(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<PresenceResponse>, ServerError> {
    state.verifier.verify_bearer(&headers)?;
    Ok(Json(PresenceResponse {
        online: state.hub.roster().await,
    }))
}

async fn list_notifications(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<NotificationEntry>>, ServerError> {
    let caller = state.verifier.verify_bearer(&headers)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.hub.list_notifications(&caller.user_id, limit).await?))
}

async fn unread_count(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<UnreadResponse>, ServerError> {
    let caller = state.verifier.verify_bearer(&headers)?;
    Ok(Json(UnreadResponse {
        count: state.hub.unread_count(&caller.user_id).await?,
    }))
}

async fn mark_all_read(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let caller = state.verifier.verify_bearer(&headers)?;
    state.hub.mark_all_read(&caller.user_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn record_activity(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<ActivityRequest>,
) -> Result<Json<ActivityResponse>, ServerError> {
    let caller = state.verifier.verify_bearer(&headers)?;

    let outcome = state
        .hub
        .record_activity(&caller.user_id, req.kind, &req.target_user_id, req.entity_id)
        .await?;

    if let Some(outcome) = &outcome {
        info!(
            notification = %outcome.notification.id,
            kind = %req.kind,
            actor = %caller.user_id.short(),
            target = %req.target_user_id.short(),
            "Activity recorded"
        );
    }

    Ok(Json(ActivityResponse {
        notification_id: outcome.as_ref().map(|o| o.notification.id),
        signalled: outcome.map(|o| o.signalled).unwrap_or(0),
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP + WebSocket server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
