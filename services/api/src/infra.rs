use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use student_risk::config::EngineConfig;
use student_risk::error::AppError;
use student_risk::workflows::screening::{load_model, load_schema, ScreeningEngine};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Apply a command-line model override on top of the loaded configuration.
pub(crate) fn resolve_engine_config(
    mut config: EngineConfig,
    model: Option<PathBuf>,
) -> EngineConfig {
    if let Some(path) = model {
        config.model_path = path;
    }
    config
}

/// Load the artifact and bind it to the bundled student schema.
pub(crate) fn build_engine(config: &EngineConfig) -> Result<ScreeningEngine, AppError> {
    let schema = load_schema()?;
    let model = load_model(&config.model_path)?;
    let engine = ScreeningEngine::with_banding(schema, model, config.banding)?;
    info!(
        model = %config.model_path.display(),
        low_max = config.banding.low_max(),
        medium_max = config.banding.medium_max(),
        "screening engine ready"
    );
    Ok(engine)
}
