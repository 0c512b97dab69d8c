//! HTTP front door: one streaming endpoint per learning mode.
//!
//! ```text
//! GET  /api/health
//! POST /api/generate-quiz
//! POST /api/generate-flashcards
//! POST /api/matching-game
//! ```
//!
//! Generation endpoints take `{ "files": [UploadedFile] }`, use the first file
//! only and answer with newline-delimited JSON: `element` events while the
//! model writes, then one `complete` or `error` line.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::app::failure_notice;
use crate::clients::FlexibleClient;
use crate::error::UploadError;
use crate::generator::ArtifactGenerator;
use crate::schema::{Artifact, FlashCard, MatchingSet, Question};
use crate::upload::{PdfDocument, UploadedFile};

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Request body ceiling. A 5 MiB PDF grows by a third as base64.
pub const BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Upload(_) => StatusCode::BAD_REQUEST,
            ServerError::Body(rejection) => rejection.status(),
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(target: "studygen::server", %status, error = %self, "request rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Router state injected into every handler.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub generator: Arc<ArtifactGenerator<FlexibleClient>>,
}

impl ServerState {
    pub fn new(generator: ArtifactGenerator<FlexibleClient>) -> Self {
        Self { generator: Arc::new(generator) }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/generate-quiz", post(generate::<Question>))
        .route("/api/generate-flashcards", post(generate::<FlashCard>))
        .route("/api/matching-game", post(generate::<MatchingSet>))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn run_server(bind: SocketAddr, state: ServerState, shutdown: CancellationToken) -> Result<(), ServerError> {
    let router = build_router(state);
    let listener = TcpListener::bind(bind).await?;
    info!(target: "studygen::server", %bind, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!(target: "studygen::server", "shut down");
    Ok(())
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST endpoints; `T` picks the artifact.
#[instrument(target = "studygen::server", skip_all, fields(kind = %T::KIND))]
async fn generate<T: Artifact>(
    State(state): State<ServerState>,
    request: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(request) = request?;
    let document = PdfDocument::from_first(&request.files)?;
    info!(name = %document.name, len = document.len(), files = request.files.len(), "generation requested");

    let generator = state.generator.clone();
    let lines = async_stream::stream! {
        let notice = failure_notice(T::KIND);
        let mut events = match generator.stream::<T>(document).await {
            Ok(events) => events,
            Err(e) => {
                error!(target: "studygen::server", kind = %T::KIND, error = %e, "generation could not start");
                yield ndjson_line(&json!({ "type": "error", "message": notice }));
                return;
            }
        };
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    let done = event.is_complete();
                    yield ndjson_line(&event);
                    if done {
                        break;
                    }
                }
                Err(e) => {
                    error!(target: "studygen::server", kind = %T::KIND, error = %e, "generation failed");
                    yield ndjson_line(&json!({ "type": "error", "message": notice }));
                    break;
                }
            }
        }
    };

    Ok((
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines.map(Ok::<_, Infallible>)),
    )
        .into_response())
}

fn ndjson_line<S: Serialize>(value: &S) -> Bytes {
    let mut line = serde_json::to_vec(value).unwrap_or_default();
    line.push(b'\n');
    Bytes::from(line)
}
