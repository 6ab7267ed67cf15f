// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PutEvents ingestion endpoint
//!
//! `POST /` takes a `PutEvents` body. The content type is not checked, so
//! SDK clients sending `application/x-amz-json-1.1` work unchanged.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ebl_adapters::{ChannelError, EntryChannel};
use ebl_core::{IdGen, PutEventsRequest, PutEventsResponse};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid PutEvents body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("failed to publish entries: {0}")]
    Publish(#[from] ChannelError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ServerError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "ValidationException"),
            ServerError::Publish(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalException"),
        };
        let body = Json(json!({ "__type": kind, "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Clone)]
struct AppState<Ch, G> {
    channel: Ch,
    ids: G,
}

/// Build the ingestion router (separated for testing)
pub fn router<Ch: EntryChannel, G: IdGen>(channel: Ch, ids: G, body_limit: usize) -> Router {
    Router::new()
        .route("/", post(put_events::<Ch, G>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState { channel, ids })
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn put_events<Ch: EntryChannel, G: IdGen>(
    State(state): State<AppState<Ch, G>>,
    body: Bytes,
) -> Result<Json<PutEventsResponse>, ServerError> {
    let request: PutEventsRequest = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "rejecting malformed PutEvents body");
        ServerError::InvalidBody(e)
    })?;

    let response = PutEventsResponse::accepted(&request.entries, &state.ids);
    info!(entries = request.entries.len(), "PutEvents accepted");

    state.channel.publish(request.entries).await?;
    Ok(Json(response))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
