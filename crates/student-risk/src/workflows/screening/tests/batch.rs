use proptest::prelude::*;

use super::common::*;

use crate::workflows::screening::{
    process_batch, Concern, Direction, FeatureValue, FieldIssue, ModelFault, Priority,
    RawRecord, RiskBand, RowIssue, ScreeningEngine, ScreeningError,
};

#[test]
fn stressed_student_scenario() {
    let outcome = engine().process(&cohort()).expect("batch succeeds");
    let row = &outcome.rows[8];

    assert_eq!(row.record_id.as_deref(), Some("s-9"));
    assert_eq!(
        row.normalized.get("Diet"),
        Some(&FeatureValue::Category("Unhealthy".to_string()))
    );
    assert_eq!(row.score.band, RiskBand::High);

    let pressure = row.contribution("Pressure").expect("pressure attributed");
    assert_eq!(pressure.concern, Concern::High);
    assert_eq!(pressure.direction, Direction::Increases);

    let advice = row
        .recommendations
        .iter()
        .find(|r| r.rule == "pressure")
        .expect("pressure recommendation");
    assert!(advice.priority >= Priority::Medium);
    assert_eq!(row.recommendations[0].rule, "band_high");
}

#[test]
fn stressed_student_against_a_centred_cohort() {
    let outcome = engine().process(&centred_cohort()).expect("batch succeeds");

    let pressures: Vec<f64> = outcome
        .rows
        .iter()
        .filter_map(|row| row.normalized.get("Pressure")?.as_number())
        .collect();
    assert_eq!(pressures.iter().sum::<f64>() / pressures.len() as f64, 5.0);

    let row = outcome.rows.last().expect("stressed row");
    assert_eq!(row.record_id.as_deref(), Some("c-9"));
    assert_eq!(
        row.normalized.get("Diet"),
        Some(&FeatureValue::Category("Unhealthy".to_string()))
    );

    let pressure = row.contribution("Pressure").expect("pressure attributed");
    assert_eq!(pressure.concern, Concern::High);
    assert_eq!(pressure.direction, Direction::Increases);

    let advice = row
        .recommendations
        .iter()
        .find(|r| r.rule == "pressure")
        .expect("pressure recommendation");
    assert!(advice.priority >= Priority::Medium);
}

#[test]
fn bad_value_only_affects_its_own_row() {
    let mut rows = cohort();
    rows.push(record("s-10", 6.0, "Healthy"));
    rows[5] = record("s-6", 42.0, "Healthy");

    let outcome = engine().process(&rows).expect("batch succeeds");

    assert_eq!(outcome.rows.len(), 10);
    for (index, row) in outcome.rows.iter().enumerate() {
        assert_eq!(row.row, index);
        if index == 5 {
            let errors: Vec<_> = row.field_errors().collect();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].feature, "Pressure");
            assert_eq!(
                errors[0].issue,
                FieldIssue::OutOfRange {
                    min: 0.0,
                    max: 10.0
                }
            );
            assert_eq!(
                row.normalized.get("Pressure"),
                Some(&FeatureValue::Number(5.0))
            );
        } else {
            assert!(row.errors.is_empty(), "row {index}: {:?}", row.errors);
        }
    }
    assert_eq!(outcome.summary.rows_with_warnings, 1);
}

#[test]
fn empty_input_scores_safely_on_defaults() {
    let mut rows = cohort();
    rows.push(RawRecord::new().with("id", "blank"));

    let outcome = engine().process(&rows).expect("batch succeeds");
    let row = outcome.rows.last().expect("row present");

    assert_eq!(row.field_errors().count(), 3);
    assert_eq!(
        row.normalized.vector(),
        vec![
            FeatureValue::Number(5.0),
            FeatureValue::Category("Moderate".to_string()),
            FeatureValue::Category("No".to_string()),
        ]
    );
    assert!(row.score.probability.is_finite());
    assert!(!row.recommendations.is_empty());
}

#[test]
fn crisis_flag_precedes_everything() {
    let mut rows = cohort();
    rows.push(record("s-10", 3.0, "Healthy").with("Crisis", "y"));
    rows.push(record("s-11", 9.0, "poor").with("Crisis", "Yes"));

    let outcome = engine().process(&rows).expect("batch succeeds");

    let medium = &outcome.rows[9];
    assert_eq!(medium.score.band, RiskBand::Medium);
    assert_eq!(medium.recommendations[0].rule, "crisis_protocol");
    assert_eq!(medium.recommendations[0].priority, Priority::Emergency);

    let high = &outcome.rows[10];
    assert_eq!(high.recommendations[0].priority, Priority::Critical);
    assert_eq!(
        high.recommendations
            .iter()
            .filter(|r| r.rule == "crisis_protocol")
            .count(),
        1
    );
    assert_eq!(outcome.summary.critical_flags, 2);
}

#[test]
fn summary_counts_bands_and_average() {
    let outcome = engine().process(&cohort()).expect("batch succeeds");
    let summary = &outcome.summary;

    assert_eq!(summary.rows, 9);
    assert_eq!(
        summary.band_counts.low + summary.band_counts.medium + summary.band_counts.high,
        9
    );
    assert_eq!(summary.band_counts.high, 1);
    let average = outcome
        .rows
        .iter()
        .map(|row| row.score.risk_percent)
        .sum::<f64>()
        / 9.0;
    assert!((summary.average_risk_percent - average).abs() < 1e-9);
}

#[test]
fn missing_column_rejects_the_batch() {
    let rows = vec![RawRecord::new().with("Pressure", 3.0).with("Crisis", "No")];
    let error = engine().process(&rows).expect_err("diet column missing");
    match error {
        ScreeningError::SchemaMismatch(mismatch) => {
            assert_eq!(mismatch.missing, vec!["Diet".to_string()])
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn empty_batch_is_an_empty_outcome() {
    let outcome = engine().process(&[]).expect("empty batch");
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.summary.rows, 0);
    assert_eq!(outcome.summary.average_risk_percent, 0.0);
}

#[test]
fn process_batch_surfaces_model_faults() {
    let mut mismatched = FixedModel::new(0.5);
    mismatched.order.swap(0, 1);
    let error = process_batch(&cohort(), &schema(), &mismatched.handle())
        .expect_err("order mismatch");
    assert!(matches!(
        error,
        ScreeningError::ModelUnavailable(ref inner)
            if matches!(inner.fault, ModelFault::IncompatibleOrder { .. })
    ));

    let error = process_batch(&cohort(), &schema(), &FixedModel::new(f64::INFINITY).handle())
        .expect_err("non-finite output");
    assert!(matches!(
        error,
        ScreeningError::ModelUnavailable(ref inner) if inner.fault == ModelFault::NonFiniteOutput
    ));
}

#[test]
fn degraded_attribution_is_reported_per_row() {
    let engine = ScreeningEngine::new(schema(), FixedModel::new(0.5).without_importances().handle())
        .expect("order matches");
    let outcome = engine.process(&cohort()).expect("batch succeeds");

    for row in &outcome.rows {
        assert!(row.degraded);
        assert!(row
            .errors
            .iter()
            .any(|issue| matches!(issue, RowIssue::AttributionDegraded(_))));
        assert_eq!(row.recommendations[0].rule, "band_medium");
    }
}

#[test]
fn row_issues_serialize_with_kind_tags() {
    let mut rows = cohort();
    rows[0] = record("s-1", 99.0, "Healthy");
    let outcome = engine().process(&rows).expect("batch succeeds");
    let json = serde_json::to_value(&outcome.rows[0]).expect("serialize row");

    assert_eq!(json["errors"][0]["kind"], "field");
    assert_eq!(json["errors"][0]["feature"], "Pressure");
    assert_eq!(json["errors"][0]["issue"], "out_of_range");
    assert_eq!(json["errors"][0]["substituted"], 5.0);
    assert_eq!(json["score"]["band"], "low");
}

fn raw_row() -> impl Strategy<Value = RawRecord> {
    (
        -5.0f64..15.0,
        prop::sample::select(vec!["Healthy", "Moderate", "Unhealthy", "poor", "junk", ""]),
        prop::sample::select(vec!["Yes", "No", "sometimes", "maybe"]),
    )
        .prop_map(|(pressure, diet, crisis)| {
            RawRecord::new()
                .with("Pressure", pressure)
                .with("Diet", diet)
                .with("Crisis", crisis)
        })
}

proptest! {
    #[test]
    fn batches_are_deterministic(rows in prop::collection::vec(raw_row(), 1..40)) {
        let engine = engine();
        let first = engine.process(&rows).expect("batch succeeds");
        let second = engine.process(&rows).expect("batch succeeds");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn contribution_weights_sum_to_one_hundred(rows in prop::collection::vec(raw_row(), 1..40)) {
        let outcome = engine().process(&rows).expect("batch succeeds");
        prop_assert_eq!(outcome.rows.len(), rows.len());
        for row in &outcome.rows {
            let total: f64 = row.contributions.iter().map(|c| c.weight).sum();
            prop_assert!((total - 100.0).abs() < 1e-6, "total {}", total);
            prop_assert!(row.contributions.iter().all(|c| c.weight >= 0.0));
            prop_assert!(row
                .contributions
                .windows(2)
                .all(|pair| pair[0].weight >= pair[1].weight));
        }
    }
}
