use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::advisor::{Advisor, RecordFlags, Recommendation};
use super::attribution::{AttributionDegraded, Attributor, Contribution, ImportanceAttributor};
use super::normalizer::{
    check_columns, normalize, FieldError, NormalizedRecord, RawRecord, SchemaMismatchError,
};
use super::schema::Schema;
use super::scoring::{Banding, ModelHandle, ModelUnavailableError, RiskBand, ScoreResult, Scorer};
use super::stats::PopulationStats;

/// Hard failures: the whole batch is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScreeningError {
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),
    #[error(transparent)]
    ModelUnavailable(#[from] ModelUnavailableError),
}

/// Soft, per-row problem reported alongside a successful result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowIssue {
    Field(FieldError),
    AttributionDegraded(AttributionDegraded),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    /// Zero-based position in the submitted batch.
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub normalized: NormalizedRecord,
    pub score: ScoreResult,
    pub contributions: Vec<Contribution>,
    pub degraded: bool,
    pub flags: RecordFlags,
    pub recommendations: Vec<Recommendation>,
    pub errors: Vec<RowIssue>,
}

impl RowOutcome {
    pub fn field_errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter_map(|issue| match issue {
            RowIssue::Field(error) => Some(error),
            RowIssue::AttributionDegraded(_) => None,
        })
    }

    pub fn contribution(&self, feature: &str) -> Option<&Contribution> {
        self.contributions
            .iter()
            .find(|contribution| contribution.feature == feature)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BandCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl BandCounts {
    fn record(&mut self, band: RiskBand) {
        match band {
            RiskBand::Low => self.low += 1,
            RiskBand::Medium => self.medium += 1,
            RiskBand::High => self.high += 1,
        }
    }
}

/// Batch-level overview metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub band_counts: BandCounts,
    pub average_risk_percent: f64,
    pub rows_with_warnings: usize,
    pub critical_flags: usize,
}

impl BatchSummary {
    fn from_rows(rows: &[RowOutcome]) -> Self {
        let mut band_counts = BandCounts::default();
        let mut total_risk = 0.0;
        let mut rows_with_warnings = 0;
        let mut critical_flags = 0;

        for row in rows {
            band_counts.record(row.score.band);
            total_risk += row.score.risk_percent;
            if !row.errors.is_empty() {
                rows_with_warnings += 1;
            }
            if row.flags.is_critical() {
                critical_flags += 1;
            }
        }

        let average_risk_percent = if rows.is_empty() {
            0.0
        } else {
            total_risk / rows.len() as f64
        };

        Self {
            rows: rows.len(),
            band_counts,
            average_risk_percent,
            rows_with_warnings,
            critical_flags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub rows: Vec<RowOutcome>,
    pub summary: BatchSummary,
}

/// Schema, scorer, attributor and advisor wired together for batch runs.
pub struct ScreeningEngine {
    schema: Schema,
    scorer: Scorer,
    attributor: Arc<dyn Attributor>,
    advisor: Advisor,
}

impl ScreeningEngine {
    pub fn new(schema: Schema, model: ModelHandle) -> Result<Self, ModelUnavailableError> {
        Self::with_banding(schema, model, Banding::standard())
    }

    pub fn with_banding(
        schema: Schema,
        model: ModelHandle,
        banding: Banding,
    ) -> Result<Self, ModelUnavailableError> {
        let scorer = Scorer::new(model, &schema, banding)?;
        Ok(Self {
            schema,
            scorer,
            attributor: Arc::new(ImportanceAttributor),
            advisor: Advisor::standard(),
        })
    }

    pub fn with_advisor(mut self, advisor: Advisor) -> Self {
        self.advisor = advisor;
        self
    }

    pub fn with_attributor(mut self, attributor: impl Attributor + 'static) -> Self {
        self.attributor = Arc::new(attributor);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    /// Normalize, score, attribute and advise every record. Row order is
    /// preserved; only a missing column or an unusable model fails the batch.
    pub fn process(&self, records: &[RawRecord]) -> Result<BatchOutcome, ScreeningError> {
        info!(
            rows = records.len(),
            model = %self.scorer.model().source(),
            "screening batch started"
        );

        if let Err(error) = check_columns(records, &self.schema) {
            warn!(missing = ?error.missing, "screening batch rejected");
            return Err(error.into());
        }

        let (normalized, field_errors): (Vec<NormalizedRecord>, Vec<Vec<FieldError>>) = records
            .par_iter()
            .map(|raw| normalize(raw, &self.schema))
            .unzip();

        let scores = normalized
            .par_iter()
            .map(|record| self.scorer.score(record))
            .collect::<Result<Vec<ScoreResult>, _>>()
            .map_err(|error| {
                warn!(%error, "screening batch aborted");
                error
            })?;

        let outcomes: Vec<f64> = scores.iter().map(|score| score.risk_percent).collect();
        let stats = PopulationStats::compute(&self.schema, &normalized, &outcomes);

        let rows: Vec<RowOutcome> = normalized
            .into_par_iter()
            .zip(field_errors.into_par_iter())
            .zip(scores.into_par_iter())
            .enumerate()
            .map(|(row, ((record, field_errors), score))| {
                self.assemble_row(row, record, field_errors, score, &stats)
            })
            .collect();

        let summary = BatchSummary::from_rows(&rows);
        info!(
            rows = summary.rows,
            warnings = summary.rows_with_warnings,
            low = summary.band_counts.low,
            medium = summary.band_counts.medium,
            high = summary.band_counts.high,
            critical = summary.critical_flags,
            "screening batch finished"
        );

        Ok(BatchOutcome { rows, summary })
    }

    fn assemble_row(
        &self,
        row: usize,
        record: NormalizedRecord,
        field_errors: Vec<FieldError>,
        score: ScoreResult,
        stats: &PopulationStats,
    ) -> RowOutcome {
        let attribution =
            self.attributor
                .attribute(&record, self.scorer.model(), stats, &self.schema);
        let flags = RecordFlags::from_record(&record, &self.schema);
        let recommendations = self
            .advisor
            .advise(&score, &attribution.contributions, &flags);

        let mut errors: Vec<RowIssue> = field_errors.into_iter().map(RowIssue::Field).collect();
        let degraded = attribution.degraded.is_some();
        if let Some(degraded) = attribution.degraded {
            debug!(row, reason = %degraded.reason, "attribution degraded");
            errors.push(RowIssue::AttributionDegraded(degraded));
        }

        RowOutcome {
            row,
            record_id: record.record_id.clone(),
            normalized: record,
            score,
            contributions: attribution.contributions,
            degraded,
            flags,
            recommendations,
            errors,
        }
    }
}

/// One-shot batch run with standard banding and rules.
pub fn process_batch(
    records: &[RawRecord],
    schema: &Schema,
    model: &ModelHandle,
) -> Result<BatchOutcome, ScreeningError> {
    let engine = ScreeningEngine::new(schema.clone(), model.clone()).map_err(|error| {
        warn!(%error, "screening batch aborted");
        error
    })?;
    engine.process(records)
}
