use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::batch::{ScreeningEngine, ScreeningError};
use super::normalizer::RawRecord;
use crate::workflows::intake::RecordImporter;

/// Batch body: a bare array of records, `{"records": [...]}`, or
/// `{"csv": "..."}` holding a raw export.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchRequest {
    Records(Vec<RawRecord>),
    Wrapped { records: Vec<RawRecord> },
    Csv { csv: String },
}

/// Router exposing batch screening and the feature glossary.
pub fn screening_router(engine: Arc<ScreeningEngine>) -> Router {
    Router::new()
        .route("/api/v1/screening/batch", post(batch_handler))
        .route("/api/v1/screening/features/:name", get(feature_handler))
        .route("/api/v1/screening/schema", get(schema_handler))
        .with_state(engine)
}

pub(crate) async fn batch_handler(
    State(engine): State<Arc<ScreeningEngine>>,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response {
    let records = match request {
        BatchRequest::Records(records) | BatchRequest::Wrapped { records } => records,
        BatchRequest::Csv { csv } => match RecordImporter::from_reader(csv.as_bytes()) {
            Ok(records) => records,
            Err(error) => {
                let payload = json!({
                    "error": error.to_string(),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };

    let worker = Arc::clone(&engine);
    let result = match tokio::task::spawn_blocking(move || worker.process(&records)).await {
        Ok(result) => result,
        Err(error) => {
            let payload = json!({
                "error": format!("screening worker failed: {error}"),
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    };

    match result {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(ScreeningError::SchemaMismatch(error)) => {
            let payload = json!({
                "error": error.to_string(),
                "missing_columns": error.missing,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(ScreeningError::ModelUnavailable(error)) => {
            let payload = json!({
                "error": error.to_string(),
                "artifact": error.artifact,
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn feature_handler(
    State(engine): State<Arc<ScreeningEngine>>,
    Path(name): Path<String>,
) -> Response {
    match engine.schema().feature_for_column(&name) {
        Some(feature) => {
            let payload = json!({
                "name": feature.name,
                "description": feature.description,
                "aliases": feature.aliases,
                "directionality": feature.directionality,
                "definition": feature.kind,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        None => {
            let payload = json!({
                "error": format!("unknown feature '{name}'"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn schema_handler(State(engine): State<Arc<ScreeningEngine>>) -> Response {
    (StatusCode::OK, axum::Json(engine.schema().clone())).into_response()
}
