//! Logistic-regression artifact exported from the training notebook: a
//! standard scaler per numeric feature, one-hot coefficients per category,
//! and the fitted importances used for attribution.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ModelFault, ModelHandle, ModelUnavailableError, PredictiveModel};
use crate::workflows::screening::normalizer::FeatureValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    pub feature_order: Vec<String>,
    pub intercept: f64,
    pub terms: Vec<ModelTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importances: Option<Vec<f64>>,
}

/// Per-feature term, aligned with `feature_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelTerm {
    Numeric {
        mean: f64,
        scale: f64,
        coefficient: f64,
    },
    Categorical {
        coefficients: BTreeMap<String, f64>,
    },
}

impl ModelTerm {
    fn contribution(&self, value: &FeatureValue) -> f64 {
        match (self, value) {
            (
                ModelTerm::Numeric {
                    mean,
                    scale,
                    coefficient,
                },
                FeatureValue::Number(number),
            ) => coefficient * (number - mean) / scale,
            (ModelTerm::Categorical { coefficients }, value) => {
                // Categories the encoder never saw contribute nothing.
                coefficients
                    .get(value.to_string().as_str())
                    .copied()
                    .unwrap_or(0.0)
            }
            (ModelTerm::Numeric { .. }, FeatureValue::Category(_)) => 0.0,
        }
    }
}

impl LogisticModel {
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_order.is_empty() {
            return Err("feature_order is empty".to_string());
        }
        if self.terms.len() != self.feature_order.len() {
            return Err(format!(
                "{} terms for {} features",
                self.terms.len(),
                self.feature_order.len()
            ));
        }
        if !self.intercept.is_finite() {
            return Err("intercept is not finite".to_string());
        }

        for (name, term) in self.feature_order.iter().zip(&self.terms) {
            match term {
                ModelTerm::Numeric {
                    mean,
                    scale,
                    coefficient,
                } => {
                    if !(mean.is_finite() && coefficient.is_finite()) {
                        return Err(format!("term '{name}' has non-finite parameters"));
                    }
                    if !(scale.is_finite() && *scale > 0.0) {
                        return Err(format!("term '{name}' has non-positive scale {scale}"));
                    }
                }
                ModelTerm::Categorical { coefficients } => {
                    if coefficients.values().any(|weight| !weight.is_finite()) {
                        return Err(format!("term '{name}' has non-finite coefficients"));
                    }
                }
            }
        }

        Ok(())
    }
}

impl PredictiveModel for LogisticModel {
    fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    fn predict_probability(&self, features: &[FeatureValue]) -> f64 {
        let logit = self
            .terms
            .iter()
            .zip(features)
            .fold(self.intercept, |acc, (term, value)| {
                acc + term.contribution(value)
            });
        1.0 / (1.0 + (-logit).exp())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.importances.clone()
    }
}

/// Read and validate a JSON model artifact.
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelHandle, ModelUnavailableError> {
    let path = path.as_ref();
    let artifact = path.display().to_string();
    let unavailable = |fault| ModelUnavailableError {
        artifact: artifact.clone(),
        fault,
    };

    let raw = fs::read_to_string(path)
        .map_err(|err| unavailable(ModelFault::Unreadable(err.to_string())))?;
    let model: LogisticModel = serde_json::from_str(&raw)
        .map_err(|err| unavailable(ModelFault::Corrupt(err.to_string())))?;
    model
        .validate()
        .map_err(|reason| unavailable(ModelFault::Invalid(reason)))?;

    info!(
        artifact = %artifact,
        model = %model.name,
        features = model.feature_order.len(),
        exported_at = ?model.exported_at,
        "loaded scoring model"
    );

    Ok(ModelHandle::new(model, artifact))
}
