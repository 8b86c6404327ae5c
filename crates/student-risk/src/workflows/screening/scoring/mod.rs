mod banding;
mod model;

pub use banding::{Banding, RiskBand};
pub use model::{load_model, LogisticModel, ModelTerm};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::normalizer::{FeatureValue, NormalizedRecord};
use super::schema::Schema;

/// An already-fitted binary classifier.
pub trait PredictiveModel: Send + Sync {
    /// Feature names in the order `predict_probability` expects them.
    fn feature_order(&self) -> &[String];

    fn predict_probability(&self, features: &[FeatureValue]) -> f64;

    /// Non-negative importances aligned with `feature_order`, when the model
    /// exposes them.
    fn feature_importances(&self) -> Option<Vec<f64>>;
}

/// Shared, read-only handle to a loaded model and where it came from.
#[derive(Clone)]
pub struct ModelHandle {
    model: Arc<dyn PredictiveModel>,
    source: String,
}

impl ModelHandle {
    pub fn new(model: impl PredictiveModel + 'static, source: impl Into<String>) -> Self {
        Self {
            model: Arc::new(model),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn feature_order(&self) -> &[String] {
        self.model.feature_order()
    }

    pub fn predict_probability(&self, features: &[FeatureValue]) -> f64 {
        self.model.predict_probability(features)
    }

    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        self.model.feature_importances()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.source)
            .field("features", &self.model.feature_order().len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub probability: f64,
    pub risk_percent: f64,
    pub band: RiskBand,
}

/// Model plus banding, bound to a schema whose order the model matches.
#[derive(Debug, Clone)]
pub struct Scorer {
    model: ModelHandle,
    banding: Banding,
}

impl Scorer {
    pub fn new(
        model: ModelHandle,
        schema: &Schema,
        banding: Banding,
    ) -> Result<Self, ModelUnavailableError> {
        let expected = schema.feature_names();
        if model.feature_order() != expected.as_slice() {
            return Err(ModelUnavailableError {
                artifact: model.source().to_string(),
                fault: ModelFault::IncompatibleOrder {
                    expected: expected.iter().map(|name| name.to_string()).collect(),
                    found: model.feature_order().to_vec(),
                },
            });
        }
        Ok(Self { model, banding })
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn banding(&self) -> Banding {
        self.banding
    }

    pub fn score(&self, record: &NormalizedRecord) -> Result<ScoreResult, ModelUnavailableError> {
        let features = record
            .values_for(self.model.feature_order())
            .map_err(|feature| ModelUnavailableError {
                artifact: self.model.source().to_string(),
                fault: ModelFault::MissingInput(feature.to_string()),
            })?;
        let probability = self.model.predict_probability(&features);
        if !probability.is_finite() {
            return Err(ModelUnavailableError {
                artifact: self.model.source().to_string(),
                fault: ModelFault::NonFiniteOutput,
            });
        }

        let probability = probability.clamp(0.0, 1.0);
        let risk_percent = probability * 100.0;
        Ok(ScoreResult {
            probability,
            risk_percent,
            band: self.banding.band_for_percent(risk_percent),
        })
    }
}

/// The model cannot be used; fatal for a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("model '{artifact}' unavailable: {fault}")]
pub struct ModelUnavailableError {
    pub artifact: String,
    pub fault: ModelFault,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelFault {
    #[error("artifact could not be read: {0}")]
    Unreadable(String),
    #[error("artifact is not valid JSON: {0}")]
    Corrupt(String),
    #[error("artifact is inconsistent: {0}")]
    Invalid(String),
    #[error("feature order {found:?} does not match schema order {expected:?}")]
    IncompatibleOrder {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("record has no value for model feature '{0}'")]
    MissingInput(String),
    #[error("model produced a non-finite probability")]
    NonFiniteOutput,
}
