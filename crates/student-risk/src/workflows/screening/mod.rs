//! Student wellbeing screening: normalize raw questionnaire rows, score them
//! with a fitted classifier, attribute the score to features and turn the
//! result into prioritized guidance.

pub mod advisor;
pub mod attribution;
pub mod batch;
pub mod normalizer;
pub mod router;
pub mod schema;
pub mod scoring;
pub mod stats;
mod text;

#[cfg(test)]
mod tests;

pub use advisor::{
    Advisor, CriticalFlag, FactorRule, Priority, Recommendation, RecordFlags, RuleTable,
};
pub use attribution::{
    attribute, Attribution, AttributionDegraded, Attributor, Concern, Contribution, Direction,
    ImportanceAttributor,
};
pub use batch::{
    process_batch, BandCounts, BatchOutcome, BatchSummary, RowIssue, RowOutcome, ScreeningEngine,
    ScreeningError,
};
pub use normalizer::{
    check_columns, normalize, FeatureValue, FieldError, FieldIssue, NormalizedRecord, RawRecord,
    RawValue, SchemaMismatchError,
};
pub use router::screening_router;
pub use schema::{
    explain_feature, load_schema, Directionality, FeatureKind, FeatureSpec, Schema, SchemaError,
    ValidRange, STUDENT_SCHEMA_VERSION,
};
pub use scoring::{
    load_model, Banding, LogisticModel, ModelFault, ModelHandle, ModelTerm, ModelUnavailableError,
    PredictiveModel, RiskBand, ScoreResult, Scorer,
};
pub use stats::{NumericStats, PopulationStats};
