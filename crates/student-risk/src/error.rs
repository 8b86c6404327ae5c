use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::intake::IntakeError;
use crate::workflows::screening::{ModelUnavailableError, SchemaError, ScreeningError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Schema(SchemaError),
    Screening(ScreeningError),
    Intake(IntakeError),
    Serialization(serde_json::Error),
    UnknownFeature { name: String, known: Vec<String> },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Schema(err) => write!(f, "schema error: {}", err),
            AppError::Screening(err) => write!(f, "screening error: {}", err),
            AppError::Intake(err) => write!(f, "intake error: {}", err),
            AppError::Serialization(err) => write!(f, "serialization error: {}", err),
            AppError::UnknownFeature { name, known } => write!(
                f,
                "unknown feature '{}'; expected one of: {}",
                name,
                known.join(", ")
            ),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Schema(err) => Some(err),
            AppError::Screening(err) => Some(err),
            AppError::Intake(err) => Some(err),
            AppError::Serialization(err) => Some(err),
            AppError::UnknownFeature { .. } => None,
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Screening(ScreeningError::SchemaMismatch(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Screening(ScreeningError::ModelUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Intake(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownFeature { .. } => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Schema(_)
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<SchemaError> for AppError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<ScreeningError> for AppError {
    fn from(value: ScreeningError) -> Self {
        Self::Screening(value)
    }
}

impl From<ModelUnavailableError> for AppError {
    fn from(value: ModelUnavailableError) -> Self {
        Self::Screening(ScreeningError::ModelUnavailable(value))
    }
}

impl From<IntakeError> for AppError {
    fn from(value: IntakeError) -> Self {
        Self::Intake(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
