//! Decomposes a record's risk into per-feature contributions.
//!
//! Weights come from the model's global importances, renormalised to percent.
//! Direction and concern compare the record against the batch's
//! [`PopulationStats`]: numeric features by mean and percentile, categorical
//! features by the mean risk of their category relative to the whole batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalizer::{FeatureValue, NormalizedRecord};
use super::schema::{Directionality, FeatureSpec, Schema};
use super::scoring::ModelHandle;
use super::stats::PopulationStats;

const HIGH_PERCENTILE: f64 = 75.0;
const MEDIUM_PERCENTILE: f64 = 50.0;
const HIGH_RISK_RATIO: f64 = 1.5;
const MEDIUM_RISK_RATIO: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increases,
    Decreases,
    Unknown,
}

/// Severity attached to one feature value of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concern {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Concern::None => "no",
            Concern::Low => "low",
            Concern::Medium => "medium",
            Concern::High => "high",
            Concern::Critical => "critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub feature: String,
    pub value: FeatureValue,
    /// Share of the record's attributed importance, in percent.
    pub weight: f64,
    pub direction: Direction,
    pub concern: Concern,
}

/// Importances were unusable; weights are uniform and carry no direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("attribution degraded to uniform weights: {reason}")]
pub struct AttributionDegraded {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub contributions: Vec<Contribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<AttributionDegraded>,
}

/// Seam for swapping the importance-based approximation for an exact
/// explainer.
pub trait Attributor: Send + Sync {
    fn attribute(
        &self,
        record: &NormalizedRecord,
        model: &ModelHandle,
        stats: &PopulationStats,
        schema: &Schema,
    ) -> Attribution;
}

/// Global importances plus batch-relative direction and concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportanceAttributor;

impl Attributor for ImportanceAttributor {
    fn attribute(
        &self,
        record: &NormalizedRecord,
        model: &ModelHandle,
        stats: &PopulationStats,
        schema: &Schema,
    ) -> Attribution {
        let features = schema.features();
        let (weights, degraded) = match aligned_weights(model, schema) {
            Ok(weights) => (weights, None),
            Err(reason) => {
                let uniform = 100.0 / features.len() as f64;
                (
                    vec![uniform; features.len()],
                    Some(AttributionDegraded { reason }),
                )
            }
        };

        let mut contributions: Vec<Contribution> = features
            .iter()
            .zip(weights)
            .filter_map(|(feature, weight)| {
                let value = record.get(&feature.name)?.clone();
                let (direction, concern) = if degraded.is_some() {
                    (Direction::Unknown, Concern::None)
                } else {
                    assess(feature, &value, stats)
                };
                Some(Contribution {
                    feature: feature.name.clone(),
                    value,
                    weight,
                    direction,
                    concern,
                })
            })
            .collect();

        contributions.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        Attribution {
            contributions,
            degraded,
        }
    }
}

/// Attribute with the default importance-based attributor.
pub fn attribute(
    record: &NormalizedRecord,
    model: &ModelHandle,
    stats: &PopulationStats,
    schema: &Schema,
) -> Attribution {
    ImportanceAttributor.attribute(record, model, stats, schema)
}

/// Model importances re-ordered to the schema and scaled to sum to 100.
fn aligned_weights(model: &ModelHandle, schema: &Schema) -> Result<Vec<f64>, String> {
    let importances = model
        .feature_importances()
        .ok_or_else(|| "model exposes no feature importances".to_string())?;
    let order = model.feature_order();
    if importances.len() != order.len() {
        return Err(format!(
            "{} importances for {} model features",
            importances.len(),
            order.len()
        ));
    }

    let raw = schema
        .features()
        .iter()
        .map(|feature| {
            order
                .iter()
                .position(|name| *name == feature.name)
                .map(|index| importances[index])
                .ok_or_else(|| format!("model has no importance for '{}'", feature.name))
        })
        .collect::<Result<Vec<f64>, String>>()?;

    if let Some(bad) = raw.iter().find(|weight| !weight.is_finite() || **weight < 0.0) {
        return Err(format!("importance {bad} is negative or not finite"));
    }
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Err("importances sum to zero".to_string());
    }

    Ok(raw.into_iter().map(|weight| weight / total * 100.0).collect())
}

fn assess(
    feature: &FeatureSpec,
    value: &FeatureValue,
    stats: &PopulationStats,
) -> (Direction, Concern) {
    match value {
        FeatureValue::Number(number) => assess_numeric(feature, *number, stats),
        FeatureValue::Category(category) => assess_categorical(feature, category, stats),
    }
}

fn assess_numeric(
    feature: &FeatureSpec,
    value: f64,
    stats: &PopulationStats,
) -> (Direction, Concern) {
    let Some(numeric) = stats.numeric(&feature.name) else {
        return (Direction::Unknown, Concern::None);
    };
    if !numeric.has_variance() {
        return (Direction::Unknown, Concern::None);
    }

    let increases = match feature.directionality {
        Directionality::LowerIsWorse => value < numeric.mean,
        Directionality::HigherIsWorse | Directionality::Neutral => value > numeric.mean,
    };
    let direction = if increases {
        Direction::Increases
    } else {
        Direction::Decreases
    };

    let percentile = match feature.directionality {
        Directionality::HigherIsWorse => numeric.percentile_at_or_below(value),
        Directionality::LowerIsWorse => numeric.percentile_at_or_above(value),
        Directionality::Neutral => return (direction, Concern::Low),
    };
    let concern = if percentile >= HIGH_PERCENTILE {
        Concern::High
    } else if percentile >= MEDIUM_PERCENTILE {
        Concern::Medium
    } else {
        Concern::Low
    };

    (direction, concern)
}

fn assess_categorical(
    feature: &FeatureSpec,
    category: &str,
    stats: &PopulationStats,
) -> (Direction, Concern) {
    let population = stats.mean_outcome();
    let (direction, concern) = if population > 0.0 {
        let category_mean = stats
            .category_mean(&feature.name, category)
            .unwrap_or(population);
        let ratio = category_mean / population;
        let direction = if category_mean > population {
            Direction::Increases
        } else {
            Direction::Decreases
        };
        let concern = if ratio > HIGH_RISK_RATIO {
            Concern::High
        } else if ratio > MEDIUM_RISK_RATIO {
            Concern::Medium
        } else {
            Concern::Low
        };
        (direction, concern)
    } else {
        (Direction::Unknown, Concern::None)
    };

    if feature.is_critical_value(category) {
        (direction, Concern::Critical)
    } else {
        (direction, concern)
    }
}
