use std::collections::BTreeMap;

use super::normalizer::{FeatureValue, NormalizedRecord};
use super::schema::Schema;

/// Distribution of one numeric feature across the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericStats {
    pub mean: f64,
    pub std_dev: f64,
    sorted: Vec<f64>,
}

impl NumericStats {
    fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let std_dev = if values.len() > 1 {
            let squares = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            (squares / (count - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            mean,
            std_dev,
            sorted: values,
        })
    }

    pub fn sample(&self) -> &[f64] {
        &self.sorted
    }

    pub fn has_variance(&self) -> bool {
        match (self.sorted.first(), self.sorted.last()) {
            (Some(min), Some(max)) => max > min,
            _ => false,
        }
    }

    /// Percent of the sample at or below `value`.
    pub fn percentile_at_or_below(&self, value: f64) -> f64 {
        let count = self.sorted.partition_point(|x| *x <= value);
        100.0 * count as f64 / self.sorted.len() as f64
    }

    /// Percent of the sample at or above `value`.
    pub fn percentile_at_or_above(&self, value: f64) -> f64 {
        let below = self.sorted.partition_point(|x| *x < value);
        100.0 * (self.sorted.len() - below) as f64 / self.sorted.len() as f64
    }
}

/// Reference aggregates for the current batch, computed once after scoring
/// and shared read-only by the attribution stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopulationStats {
    size: usize,
    mean_outcome: f64,
    numeric: BTreeMap<String, NumericStats>,
    categorical: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PopulationStats {
    /// `outcomes[i]` is the risk percent of `records[i]`.
    pub fn compute(schema: &Schema, records: &[NormalizedRecord], outcomes: &[f64]) -> Self {
        let size = records.len().min(outcomes.len());
        if size == 0 {
            return Self::default();
        }
        let records = &records[..size];
        let outcomes = &outcomes[..size];
        let mean_outcome = outcomes.iter().sum::<f64>() / size as f64;

        let mut numeric = BTreeMap::new();
        let mut categorical = BTreeMap::new();

        for feature in schema.features() {
            if feature.is_numeric() {
                let values = records
                    .iter()
                    .filter_map(|record| record.get(&feature.name))
                    .filter_map(FeatureValue::as_number)
                    .collect();
                if let Some(stats) = NumericStats::from_values(values) {
                    numeric.insert(feature.name.clone(), stats);
                }
            } else {
                let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
                for (record, outcome) in records.iter().zip(outcomes) {
                    let category = record
                        .get(&feature.name)
                        .and_then(FeatureValue::as_category);
                    if let Some(category) = category {
                        let entry = sums.entry(category.to_string()).or_insert((0.0, 0));
                        entry.0 += outcome;
                        entry.1 += 1;
                    }
                }
                let means = sums
                    .into_iter()
                    .map(|(category, (sum, count))| (category, sum / count as f64))
                    .collect();
                categorical.insert(feature.name.clone(), means);
            }
        }

        Self {
            size,
            mean_outcome,
            numeric,
            categorical,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn mean_outcome(&self) -> f64 {
        self.mean_outcome
    }

    pub fn numeric(&self, feature: &str) -> Option<&NumericStats> {
        self.numeric.get(feature)
    }

    /// Mean risk percent of the records holding `category`.
    pub fn category_mean(&self, feature: &str, category: &str) -> Option<f64> {
        self.categorical.get(feature)?.get(category).copied()
    }
}
