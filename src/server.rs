//! HTTP server for strategy retrieval and answering

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{RetrievalConfig, ServerConfig};
use crate::context_engine::{Retrieval, SharedContextEngine};
use crate::error::Error;
use crate::ingest::{IngestPipeline, IngestReport, SourceDocument};
use crate::types::{Answer, SituationalState};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: SharedContextEngine,
    pub ingest: Arc<IngestPipeline>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub state: Option<SituationalState>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    #[serde(flatten)]
    pub retrieval: Retrieval,
    pub context: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub documents: Vec<SourceDocument>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub source: String,
    pub chunks_indexed: usize,
    pub generation_enabled: bool,
    pub retrieval: RetrievalConfig,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Caller mistakes are 400, collaborator failures 502
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidState(_) | Error::Unrecognized { .. } => StatusCode::BAD_REQUEST,
        Error::CandidateSource { .. } | Error::Generation(_) | Error::Ingest(_) => {
            StatusCode::BAD_GATEWAY
        }
        Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(context: &str, err: Error) -> HandlerError {
    let status = status_for(&err);
    error!("{} failed ({}): {}", context, status, err);
    (
        status,
        Json(ErrorResponse {
            error: format!("{} failed", context),
            details: Some(err.to_string()),
        }),
    )
}

async fn retrieve_handler(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<RetrieveResponse>, HandlerError> {
    info!("Received retrieve request: question='{}'", req.question);

    let retrieval = state
        .engine
        .retrieve_with_filter(&req.question, req.state.as_ref())
        .await
        .map_err(|e| error_response("Retrieval", e))?;
    let context = state.engine.format_context(&retrieval.results);

    Ok(Json(RetrieveResponse { retrieval, context }))
}

async fn answer_handler(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<Answer>, HandlerError> {
    info!(
        "Received answer request: question='{}', round={:?}",
        req.question,
        req.state.as_ref().map(|s| s.round.as_str())
    );

    let answer = state
        .engine
        .answer(&req.question, req.state.as_ref())
        .await
        .map_err(|e| error_response("Answer", e))?;

    info!(
        "Answered with {} sources (grounding_only={})",
        answer.sources.len(),
        answer.grounding_only
    );
    Ok(Json(answer))
}

async fn ingest_handler(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestReport>, HandlerError> {
    info!("Received ingest request: {} documents", req.documents.len());

    let report = state
        .ingest
        .ingest(req.documents)
        .await
        .map_err(|e| error_response("Ingest", e))?;
    Ok(Json(report))
}

async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, HandlerError> {
    let chunks_indexed = state
        .ingest
        .count()
        .await
        .map_err(|e| error_response("Stats", e))?;

    Ok(Json(StatsResponse {
        source: state.engine.source_name().to_string(),
        chunks_indexed,
        generation_enabled: state.engine.generation_enabled(),
        retrieval: state.engine.retrieval_config().clone(),
    }))
}

/// Health check handler
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "tftcoach".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create and configure the HTTP server
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/retrieve", post(retrieve_handler))
        .route("/answer", post(answer_handler))
        .route("/ingest", post(ingest_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(state: AppState, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting tftcoach server on {}", addr);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&Error::InvalidState("level".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::CandidateSource {
                name: "memory",
                error: anyhow::anyhow!("down"),
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::Generation(anyhow::anyhow!("timeout"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::Config("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_question_request_state_optional() {
        let req: QuestionRequest = serde_json::from_str(r#"{"question": "리롤?"}"#).unwrap();
        assert!(req.state.is_none());

        let req: QuestionRequest = serde_json::from_str(
            r#"{"question": "q", "state": {"round": "3-2", "level": 6, "gold": 30, "hp": 70}}"#,
        )
        .unwrap();
        assert_eq!(req.state.unwrap().round, "3-2");
    }

    #[test]
    fn test_out_of_range_state_is_bad_request() {
        // out-of-range values must reach validation instead of failing to parse
        let req: QuestionRequest = serde_json::from_str(
            r#"{"question": "q", "state": {"round": "3-2", "level": 300, "gold": 30, "hp": 300}}"#,
        )
        .unwrap();
        let err = req.state.unwrap().validate().unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_index_read_failure_is_bad_gateway() {
        let err = Error::CandidateSource {
            name: "memory",
            error: anyhow::anyhow!("stats unavailable"),
        };
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);
    }
}
