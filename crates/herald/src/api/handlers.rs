//! HTTP request handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use herald_protocol::Delivery;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint. Unauthenticated.
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Direct-dispatch response.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    /// Whether the command was handed to a live agent connection.
    pub delivered: bool,
}

/// Push a command to one identity's agent, bypassing rooms.
///
/// POST /api/agents/{identity}/command
///
/// The body is an arbitrary JSON command (typically produced by the command
/// interpretation service); its shape is not validated here. A missing or
/// dead connection is reported as `delivered: false`, never as an error —
/// the caller decides how to present that.
pub async fn dispatch_command(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    Json(command): Json<Value>,
) -> ApiResult<Json<DispatchResponse>> {
    let identity = identity.trim();
    if identity.is_empty() {
        return Err(ApiError::bad_request("identity must not be empty"));
    }

    let outcome = state.broker.dispatch_to_identity(identity, command);
    match outcome {
        Delivery::Delivered => info!("Dispatched command to agent {identity}"),
        Delivery::NotConnected => info!("No active connection for identity {identity}"),
    }

    Ok(Json(DispatchResponse {
        delivered: outcome.is_delivered(),
    }))
}

/// Connections snapshot.
#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub identities: Vec<String>,
    pub count: usize,
}

/// List connected identities. Diagnostic use only.
///
/// GET /api/connections
pub async fn list_connections(State(state): State<AppState>) -> Json<ConnectionsResponse> {
    let identities = state.broker.identities();
    let count = identities.len();
    Json(ConnectionsResponse { identities, count })
}

/// Rooms snapshot.
#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    /// Room code -> member count.
    pub rooms: BTreeMap<String, usize>,
}

/// List rooms and their member counts. Diagnostic use only.
///
/// GET /api/rooms
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomsResponse> {
    Json(RoomsResponse {
        rooms: state.broker.room_overview(),
    })
}
