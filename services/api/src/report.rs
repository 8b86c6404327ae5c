use crate::infra::{build_engine, resolve_engine_config};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use student_risk::config::AppConfig;
use student_risk::error::AppError;
use student_risk::workflows::intake::RecordImporter;
use student_risk::workflows::screening::{
    explain_feature, load_schema, BatchOutcome, BatchSummary, RowOutcome,
};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV export with one student per row
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Model artifact to score with (defaults to RISK_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    /// Only print the N highest-risk rows
    #[arg(long)]
    pub(crate) top: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct ExplainArgs {
    /// Feature name or alias, e.g. "Academic Pressure"
    pub(crate) feature: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreReport {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) source: String,
    pub(crate) model: String,
    pub(crate) summary: BatchSummary,
    pub(crate) rows: Vec<RowOutcome>,
}

impl ScoreReport {
    pub(crate) fn new(
        source: String,
        model: String,
        outcome: BatchOutcome,
        top: Option<usize>,
    ) -> Self {
        let BatchOutcome { mut rows, summary } = outcome;
        if let Some(limit) = top {
            rows.sort_by(|a, b| b.score.risk_percent.total_cmp(&a.score.risk_percent));
            rows.truncate(limit);
        }

        Self {
            generated_at: Utc::now(),
            source,
            model,
            summary,
            rows,
        }
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let report = score_report(&args, config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn score_report(args: &ScoreArgs, config: AppConfig) -> Result<ScoreReport, AppError> {
    let engine_config = resolve_engine_config(config.engine, args.model.clone());
    let engine = build_engine(&engine_config)?;
    let records = RecordImporter::from_path(&args.csv)?;
    let outcome = engine.process(&records)?;

    Ok(ScoreReport::new(
        args.csv.display().to_string(),
        engine.scorer().model().source().to_string(),
        outcome,
        args.top,
    ))
}

pub(crate) fn run_explain(args: ExplainArgs) -> Result<(), AppError> {
    println!("{}", describe_feature(&args.feature)?);
    Ok(())
}

pub(crate) fn describe_feature(name: &str) -> Result<String, AppError> {
    let schema = load_schema()?;
    let description = explain_feature(name)?.ok_or_else(|| AppError::UnknownFeature {
        name: name.to_string(),
        known: schema
            .feature_names()
            .iter()
            .map(|feature| feature.to_string())
            .collect(),
    })?;
    let canonical = schema
        .feature_for_column(name)
        .map(|feature| feature.name.as_str())
        .unwrap_or(name);
    Ok(format!("{canonical}\n  {description}"))
}
