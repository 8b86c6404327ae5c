use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::screening::{
    Advisor, FactorRule, FeatureSpec, FeatureValue, LogisticModel, ModelHandle, ModelTerm,
    PredictiveModel, RawRecord, RuleTable, Schema, ScreeningEngine,
};

/// Three-feature schema: a stress scale, a diet category and a crisis flag.
pub(super) fn schema() -> Schema {
    Schema::new(
        "test-v1",
        vec![
            FeatureSpec::numeric("Pressure", 5.0)
                .with_range(0.0, 10.0)
                .higher_is_worse()
                .with_aliases(&["Stress Level"])
                .described("Perceived pressure, 0-10."),
            FeatureSpec::categorical("Diet", &["Healthy", "Moderate", "Unhealthy"], "Moderate")
                .with_synonyms(&[("poor", "Unhealthy"), ("good", "Healthy"), ("ok", "Moderate")])
                .described("Eating habits."),
            FeatureSpec::categorical("Crisis", &["Yes", "No"], "No")
                .with_synonyms(&[("sometimes", "Yes"), ("y", "Yes"), ("n", "No")])
                .with_critical_values(&["Yes"])
                .described("Reported crisis indicator."),
        ],
        vec!["id".to_string()],
    )
    .expect("test schema is valid")
}

pub(super) fn logistic_model() -> LogisticModel {
    let mut diet = BTreeMap::new();
    diet.insert("Healthy".to_string(), -0.8);
    diet.insert("Moderate".to_string(), 0.0);
    diet.insert("Unhealthy".to_string(), 0.8);
    let mut crisis = BTreeMap::new();
    crisis.insert("Yes".to_string(), 1.5);
    crisis.insert("No".to_string(), -0.5);

    LogisticModel {
        name: "test-logistic".to_string(),
        exported_at: None,
        feature_order: vec![
            "Pressure".to_string(),
            "Diet".to_string(),
            "Crisis".to_string(),
        ],
        intercept: 0.0,
        terms: vec![
            ModelTerm::Numeric {
                mean: 5.0,
                scale: 2.0,
                coefficient: 1.0,
            },
            ModelTerm::Categorical { coefficients: diet },
            ModelTerm::Categorical {
                coefficients: crisis,
            },
        ],
        importances: Some(vec![5.0, 3.0, 2.0]),
    }
}

pub(super) fn model() -> ModelHandle {
    ModelHandle::new(logistic_model(), "memory://test-logistic")
}

/// Constant-probability model for band and degradation checks.
pub(super) struct FixedModel {
    pub(super) order: Vec<String>,
    pub(super) probability: f64,
    pub(super) importances: Option<Vec<f64>>,
}

impl FixedModel {
    pub(super) fn new(probability: f64) -> Self {
        Self {
            order: schema()
                .feature_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            probability,
            importances: Some(vec![1.0, 1.0, 1.0]),
        }
    }

    pub(super) fn without_importances(mut self) -> Self {
        self.importances = None;
        self
    }

    pub(super) fn handle(self) -> ModelHandle {
        ModelHandle::new(self, "memory://fixed")
    }
}

impl PredictiveModel for FixedModel {
    fn feature_order(&self) -> &[String] {
        &self.order
    }

    fn predict_probability(&self, _features: &[FeatureValue]) -> f64 {
        self.probability
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.importances.clone()
    }
}

pub(super) fn rules_with_pressure() -> RuleTable {
    RuleTable::standard().with_rule(
        FactorRule::new("pressure", "Pressure Relief Plan")
            .for_features(&["Pressure"])
            .with_actions(&["Review workload with an advisor"]),
    )
}

pub(super) fn engine() -> ScreeningEngine {
    ScreeningEngine::new(schema(), model())
        .expect("model matches schema")
        .with_advisor(Advisor::new(rules_with_pressure()))
}

pub(super) fn shared_engine() -> Arc<ScreeningEngine> {
    Arc::new(engine())
}

pub(super) fn record(id: &str, pressure: f64, diet: &str) -> RawRecord {
    RawRecord::new()
        .with("id", id)
        .with("Pressure", pressure)
        .with("Diet", diet)
        .with("Crisis", "No")
}

/// Pressures 1..=9 with mixed diets; the last row is the stressed student.
pub(super) fn cohort() -> Vec<RawRecord> {
    vec![
        record("s-1", 1.0, "Healthy"),
        record("s-2", 2.0, "good"),
        record("s-3", 3.0, "Moderate"),
        record("s-4", 4.0, "Healthy"),
        record("s-5", 5.0, "ok"),
        record("s-6", 3.0, "Healthy"),
        record("s-7", 2.0, "Moderate"),
        record("s-8", 4.0, "Healthy"),
        record("s-9", 9.0, "poor"),
    ]
}

/// Pressures 1..=9 evenly, so the batch mean is exactly 5.0; the last row
/// reports pressure 9 with a "poor" diet.
pub(super) fn centred_cohort() -> Vec<RawRecord> {
    let diets = ["Healthy", "good", "Moderate", "Healthy", "ok", "Moderate", "Healthy", "good"];
    let mut rows: Vec<RawRecord> = diets
        .iter()
        .enumerate()
        .map(|(index, diet)| record(&format!("c-{}", index + 1), (index + 1) as f64, diet))
        .collect();
    rows.push(record("c-9", 9.0, "poor"));
    rows
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
