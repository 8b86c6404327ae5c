use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::schema::{ColumnRef, FeatureKind, FeatureSpec, Schema};
use super::text::{is_word_prefix, normalize_key, strip_quotes};

/// Untyped cell as it arrives from an upload or request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(text) => strip_quotes(text).is_empty(),
            RawValue::Bool(_) | RawValue::Number(_) => false,
        }
    }

    fn as_text(&self) -> String {
        match self {
            RawValue::Null => String::new(),
            RawValue::Bool(flag) => flag.to_string(),
            RawValue::Number(number) => format_number(*number),
            RawValue::Text(text) => strip_quotes(text).to_string(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        let number = match self {
            RawValue::Null => None,
            RawValue::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            RawValue::Number(number) => Some(*number),
            RawValue::Text(text) => strip_quotes(text).parse::<f64>().ok(),
        };
        number.filter(|value| value.is_finite())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One uploaded row keyed by its original column headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.0.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        )
    }
}

/// Typed value of a normalized feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(value) => Some(*value),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Category(value) => Some(value),
            FeatureValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(value) => write!(f, "{}", format_number(*value)),
            FeatureValue::Category(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedField {
    pub feature: String,
    pub value: FeatureValue,
}

/// A row coerced onto the schema: every feature present, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    fields: Vec<NormalizedField>,
}

impl NormalizedRecord {
    pub fn get(&self, feature: &str) -> Option<&FeatureValue> {
        self.fields
            .iter()
            .find(|field| field.feature == feature)
            .map(|field| &field.value)
    }

    pub fn fields(&self) -> &[NormalizedField] {
        &self.fields
    }

    /// Values in stored order. Records built by [`normalize`] store them in
    /// schema order.
    pub fn vector(&self) -> Vec<FeatureValue> {
        self.fields.iter().map(|field| field.value.clone()).collect()
    }

    /// Values looked up by name in the order given. `Err` carries the first
    /// name the record has no value for.
    pub fn values_for<'a>(&self, names: &'a [String]) -> Result<Vec<FeatureValue>, &'a str> {
        names
            .iter()
            .map(|name| self.get(name).cloned().ok_or(name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Why a field fell back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum FieldIssue {
    Missing,
    Unparseable,
    OutOfRange { min: f64, max: f64 },
    NotAllowed,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing => f.write_str("value missing"),
            FieldIssue::Unparseable => f.write_str("value is not a number"),
            FieldIssue::OutOfRange { min, max } => {
                write!(f, "value outside {}..={}", format_number(*min), format_number(*max))
            }
            FieldIssue::NotAllowed => f.write_str("value is not a recognised category"),
        }
    }
}

/// Soft, per-field problem. The row continues with `substituted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{feature}: {issue}; using default {substituted}")]
pub struct FieldError {
    pub feature: String,
    #[serde(flatten)]
    pub issue: FieldIssue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub substituted: FeatureValue,
}

/// Batch-fatal: whole feature columns are absent from the upload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("batch is missing required column(s): {}", missing.join(", "))]
pub struct SchemaMismatchError {
    pub missing: Vec<String>,
}

/// Verify every required feature column appears in at least one record.
pub fn check_columns(records: &[RawRecord], schema: &Schema) -> Result<(), SchemaMismatchError> {
    if records.is_empty() {
        return Ok(());
    }

    let mut seen = vec![false; schema.len()];
    for record in records {
        for column in record.columns() {
            if let Some(ColumnRef::Feature(index)) = schema.resolve_column(column) {
                seen[index] = true;
            }
        }
    }

    let missing: Vec<String> = schema
        .features()
        .iter()
        .zip(&seen)
        .filter(|(feature, present)| feature.required && !**present)
        .map(|(feature, _)| feature.name.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaMismatchError { missing })
    }
}

/// Coerce a raw row onto the schema. Never fails: every problem degrades to
/// the feature default and is reported as a [`FieldError`].
pub fn normalize(raw: &RawRecord, schema: &Schema) -> (NormalizedRecord, Vec<FieldError>) {
    let mut slots: Vec<Option<&RawValue>> = vec![None; schema.len()];
    let mut record_id = None;

    for (column, value) in raw.iter() {
        match schema.resolve_column(column) {
            Some(ColumnRef::Feature(index)) => {
                let slot = &mut slots[index];
                if slot.map_or(true, RawValue::is_blank) {
                    *slot = Some(value);
                }
            }
            Some(ColumnRef::Identifier) if record_id.is_none() && !value.is_blank() => {
                record_id = Some(value.as_text());
            }
            _ => {}
        }
    }

    let mut errors = Vec::new();
    let fields = schema
        .features()
        .iter()
        .zip(slots)
        .map(|(feature, raw_value)| {
            let value = match normalize_field(feature, raw_value) {
                Ok(value) => value,
                Err((issue, raw)) => {
                    let substituted = default_value(feature);
                    errors.push(FieldError {
                        feature: feature.name.clone(),
                        issue,
                        raw,
                        substituted: substituted.clone(),
                    });
                    substituted
                }
            };
            NormalizedField {
                feature: feature.name.clone(),
                value,
            }
        })
        .collect();

    (NormalizedRecord { record_id, fields }, errors)
}

fn default_value(feature: &FeatureSpec) -> FeatureValue {
    match &feature.kind {
        FeatureKind::Numeric { default, .. } => FeatureValue::Number(*default),
        FeatureKind::Categorical { default, .. } => FeatureValue::Category(default.clone()),
    }
}

fn normalize_field(
    feature: &FeatureSpec,
    raw: Option<&RawValue>,
) -> Result<FeatureValue, (FieldIssue, Option<String>)> {
    let raw = match raw {
        Some(value) if !value.is_blank() => value,
        _ => return Err((FieldIssue::Missing, None)),
    };

    match &feature.kind {
        FeatureKind::Numeric { valid_range, .. } => {
            let number = raw
                .as_number()
                .ok_or_else(|| (FieldIssue::Unparseable, Some(raw.as_text())))?;
            match valid_range {
                Some(range) if !range.contains(number) => Err((
                    FieldIssue::OutOfRange {
                        min: range.min,
                        max: range.max,
                    },
                    Some(raw.as_text()),
                )),
                _ => Ok(FeatureValue::Number(number)),
            }
        }
        FeatureKind::Categorical {
            allowed_values,
            synonyms,
            ..
        } => {
            let text = raw.as_text();
            resolve_category(&text, allowed_values, synonyms)
                .map(|canonical| FeatureValue::Category(canonical.to_string()))
                .ok_or((FieldIssue::NotAllowed, Some(text)))
        }
    }
}

/// Single-letter codes such as "n" only match exactly; as prefixes they would
/// swallow answers like "N/A".
const MIN_PREFIX_CHARS: usize = 2;

/// Map free text onto an allowed category: exact allowed value, then exact
/// synonym, then the longest allowed value or synonym that prefixes the
/// input at a word boundary. All comparisons are case-insensitive.
fn resolve_category<'a>(
    input: &str,
    allowed_values: &'a [String],
    synonyms: &'a BTreeMap<String, String>,
) -> Option<&'a str> {
    let key = normalize_key(input);

    if let Some(allowed) = allowed_values
        .iter()
        .find(|allowed| normalize_key(allowed) == key)
    {
        return Some(allowed);
    }

    if let Some((_, canonical)) = synonyms.iter().find(|(raw, _)| normalize_key(raw) == key) {
        return Some(canonical);
    }

    let patterns = allowed_values
        .iter()
        .map(|allowed| (normalize_key(allowed), allowed))
        .chain(
            synonyms
                .iter()
                .map(|(raw, canonical)| (normalize_key(raw), canonical)),
        );

    let mut best: Option<(usize, &'a String)> = None;
    for (pattern, canonical) in patterns {
        let significant = pattern.chars().filter(|c| c.is_alphanumeric()).count();
        if significant < MIN_PREFIX_CHARS || !is_word_prefix(&key, &pattern) {
            continue;
        }
        if best.map_or(true, |(length, _)| pattern.len() > length) {
            best = Some((pattern.len(), canonical));
        }
    }

    best.map(|(_, canonical)| canonical.as_str())
}
