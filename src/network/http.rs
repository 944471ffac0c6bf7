//! HTTP Room API
//!
//! JSON endpoints for room management:
//!
//! | Method & Path            | Success                                  |
//! |--------------------------|------------------------------------------|
//! | POST /room               | `{roomId, seed, success}`                |
//! | POST /room/{id}/join     | `{success, seed, you, playerId, players}`|
//! | GET  /room/{id}          | `{id, seed, players, createdAt}`         |
//!
//! Failures map to 404 (unknown room), 400 (room full), 500 (internal) with
//! an `{error}` body and no partial side effects.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::network::protocol::Seat;
use crate::network::room::{RoomError, RoomManager};

/// HTTP API configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".parse().expect("static addr") }
    }
}

// =============================================================================
// RESPONSE MODELS
// =============================================================================

/// Body of `POST /room`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    /// Minted 4-digit room code.
    pub room_id: String,
    /// Shared board seed.
    pub seed: u64,
    /// Always true on the success path.
    pub success: bool,
}

/// Body of `POST /room/{id}/join`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomResponse {
    /// Always true on the success path.
    pub success: bool,
    /// Shared board seed.
    pub seed: u64,
    /// Seat assigned to the joiner.
    pub you: Seat,
    /// Player id minted for the joiner; echoed in sync `Join`/`Action`.
    pub player_id: String,
    /// All seated player ids, in seat order.
    pub players: Vec<String>,
}

/// Body of `GET /room/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoResponse {
    /// Room code.
    pub id: String,
    /// Shared board seed.
    pub seed: u64,
    /// Seated player ids, in seat order.
    pub players: Vec<String>,
    /// Creation time (unix millis).
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// ERRORS
// =============================================================================

/// API error with its HTTP status mapping.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// 404.
    #[error("{0}")]
    NotFound(String),

    /// 400.
    #[error("{0}")]
    BadRequest(String),

    /// 500. The detail is logged, not leaked.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound => ApiError::NotFound("Room not found".to_string()),
            RoomError::RoomFull => ApiError::BadRequest("Room is full".to_string()),
            RoomError::CodesExhausted | RoomError::Generate(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("internal error: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /room
async fn create_room_handler(
    State(rooms): State<Arc<RoomManager>>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let created = rooms.create_room().await?;
    Ok(Json(CreateRoomResponse {
        room_id: created.room_id,
        seed: created.seed,
        success: true,
    }))
}

/// POST /room/{id}/join
async fn join_room_handler(
    State(rooms): State<Arc<RoomManager>>,
    Path(room_id): Path<String>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let joined = rooms.join_room(&room_id).await?;
    Ok(Json(JoinRoomResponse {
        success: true,
        seed: joined.seed,
        you: joined.seat,
        player_id: joined.player_id,
        players: joined.players,
    }))
}

/// GET /room/{id}
async fn room_info_handler(
    State(rooms): State<Arc<RoomManager>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfoResponse>, ApiError> {
    let status = rooms.room_status(&room_id).await?;
    Ok(Json(RoomInfoResponse {
        id: status.id,
        seed: status.seed,
        players: status.players,
        created_at: status.created_at,
    }))
}

/// Build the API router with all endpoints.
pub fn router(rooms: Arc<RoomManager>) -> Router {
    Router::new()
        .route("/room", post(create_room_handler))
        .route("/room/:room_id/join", post(join_room_handler))
        .route("/room/:room_id", get(room_info_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(rooms)
}

/// Bind and serve the HTTP API until the process stops.
pub async fn serve(config: HttpConfig, rooms: Arc<RoomManager>) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("http api listening on {}", config.bind_addr);
    axum::serve(listener, router(rooms)).await
}
