//! HTTP surface of the relay.
//!
//! | Route | Parameters | Room operation |
//! |---|---|---|
//! | `/join` | `id` | [`RoomHandle::join`] |
//! | `/leave` | `id` | [`RoomHandle::leave`] |
//! | `/send` | `id`, `message` | [`RoomHandle::send`] |
//! | `/messages` | `id` | [`RoomHandle::poll`] |
//!
//! Parameters travel in the query string and every route accepts GET and
//! POST. Empty parameters count as missing.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::RoomError;
use crate::room::RoomHandle;

const NO_NEW_MESSAGES: &str = "no new messages";

/// Builds the router for a running room. Polls wait for the room's
/// configured [`poll_timeout`](RoomHandle::poll_timeout).
pub fn router(room: RoomHandle) -> Router {
    Router::new()
        .route("/join", get(join).post(join))
        .route("/leave", get(leave).post(leave))
        .route("/send", get(send).post(send))
        .route("/messages", get(messages).post(messages))
        .layer(TraceLayer::new_for_http())
        .with_state(room)
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientParams {
    pub id: Option<String>,
    pub message: Option<String>,
}

impl ClientParams {
    fn client_id(self) -> Result<String, ApiError> {
        present(self.id).ok_or(ApiError::MissingClientId)
    }

    fn client_id_and_message(self) -> Result<(String, String), ApiError> {
        match (present(self.id), present(self.message)) {
            (Some(id), Some(message)) => Ok((id, message)),
            _ => Err(ApiError::MissingClientIdOrMessage),
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Body of a successful join, leave or send.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Ack {
    fn success(message: &'static str) -> Self {
        Self {
            status: "success",
            message,
            payload: None,
        }
    }
}

/// Body of a poll: either the delivered message or the empty notice.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PollReply {
    Delivered {
        status: &'static str,
        client: String,
        message: String,
    },
    Empty {
        message: &'static str,
    },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors returned by the handlers, rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Client ID is required")]
    MissingClientId,

    #[error("Client ID and message are required")]
    MissingClientIdOrMessage,

    #[error(transparent)]
    Room(#[from] RoomError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::MissingClientId | Self::MissingClientIdOrMessage => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Room(RoomError::DuplicateIdentifier(_)) => {
                (StatusCode::CONFLICT, "Client ID already exists".into())
            }
            Self::Room(RoomError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "Client not found".into())
            }
            Self::Room(RoomError::Closed(_)) => (StatusCode::GONE, "Client channel closed".into()),
            Self::Room(RoomError::Stopped) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "chat room is unavailable".into(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn join(
    State(room): State<RoomHandle>,
    Query(params): Query<ClientParams>,
) -> Result<Json<Ack>, ApiError> {
    let client_id = params.client_id()?;
    room.join(client_id).await?;
    Ok(Json(Ack::success("client joined the chat")))
}

async fn leave(
    State(room): State<RoomHandle>,
    Query(params): Query<ClientParams>,
) -> Result<Json<Ack>, ApiError> {
    let client_id = params.client_id()?;
    room.leave(client_id).await?;
    Ok(Json(Ack::success("client left the chat")))
}

async fn send(
    State(room): State<RoomHandle>,
    Query(params): Query<ClientParams>,
) -> Result<Json<Ack>, ApiError> {
    let (client_id, message) = params.client_id_and_message()?;
    let sent = room.send(client_id, message).await?;
    Ok(Json(Ack {
        payload: Some(sent.content().to_string()),
        ..Ack::success("message sent")
    }))
}

async fn messages(
    State(room): State<RoomHandle>,
    Query(params): Query<ClientParams>,
) -> Result<Json<PollReply>, ApiError> {
    let client_id = params.client_id()?;
    let reply = match room.poll(&client_id, room.poll_timeout()).await? {
        Some(message) => {
            info!(client_id = %client_id, sender = %message.sender_id(), "delivered message");
            PollReply::Delivered {
                status: "success",
                client: message.sender_id().to_string(),
                message: message.content().to_string(),
            }
        }
        None => {
            info!(client_id = %client_id, "no new messages");
            PollReply::Empty {
                message: NO_NEW_MESSAGES,
            }
        }
    };
    Ok(Json(reply))
}
