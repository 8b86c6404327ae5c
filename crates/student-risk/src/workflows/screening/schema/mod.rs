//! Canonical feature contract shared by the normalizer, the scorer, and the
//! attribution stage. Feature order is significant: it must match the order
//! the scoring artifact was fit on.

mod catalog;

pub use catalog::{explain_feature, load_schema, STUDENT_SCHEMA_VERSION};

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::text::normalize_key;

/// Which way a numeric feature pushes risk as its value grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directionality {
    HigherIsWorse,
    LowerIsWorse,
    #[default]
    Neutral,
}

/// Inclusive bounds for a numeric feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Kind-specific validation and coercion rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric {
        default: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        valid_range: Option<ValidRange>,
    },
    Categorical {
        allowed_values: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        synonyms: BTreeMap<String, String>,
        default: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        critical_values: Vec<String>,
    },
}

/// One input column of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
    #[serde(default = "column_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub directionality: Directionality,
}

fn column_required() -> bool {
    true
}

impl FeatureSpec {
    pub fn numeric(name: impl Into<String>, default: f64) -> Self {
        Self::with_kind(
            name,
            FeatureKind::Numeric {
                default,
                valid_range: None,
            },
        )
    }

    pub fn categorical(name: impl Into<String>, allowed: &[&str], default: &str) -> Self {
        Self::with_kind(
            name,
            FeatureKind::Categorical {
                allowed_values: allowed.iter().map(|value| value.to_string()).collect(),
                synonyms: BTreeMap::new(),
                default: default.to_string(),
                critical_values: Vec::new(),
            },
        )
    }

    fn with_kind(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            aliases: Vec::new(),
            description: String::new(),
            directionality: Directionality::Neutral,
        }
    }

    /// Restrict a numeric feature to `min..=max`. No-op for categorical features.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        if let FeatureKind::Numeric { valid_range, .. } = &mut self.kind {
            *valid_range = Some(ValidRange { min, max });
        }
        self
    }

    pub fn with_synonyms(mut self, pairs: &[(&str, &str)]) -> Self {
        if let FeatureKind::Categorical { synonyms, .. } = &mut self.kind {
            for (raw, canonical) in pairs {
                synonyms.insert(raw.to_string(), canonical.to_string());
            }
        }
        self
    }

    pub fn with_critical_values(mut self, values: &[&str]) -> Self {
        if let FeatureKind::Categorical {
            critical_values, ..
        } = &mut self.kind
        {
            critical_values.extend(values.iter().map(|value| value.to_string()));
        }
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases
            .extend(aliases.iter().map(|alias| alias.to_string()));
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn higher_is_worse(mut self) -> Self {
        self.directionality = Directionality::HigherIsWorse;
        self
    }

    pub fn lower_is_worse(mut self) -> Self {
        self.directionality = Directionality::LowerIsWorse;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, FeatureKind::Numeric { .. })
    }

    pub fn is_critical_value(&self, value: &str) -> bool {
        match &self.kind {
            FeatureKind::Categorical {
                critical_values, ..
            } => critical_values.iter().any(|critical| critical == value),
            FeatureKind::Numeric { .. } => false,
        }
    }

    fn column_keys(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(normalize_key(&self.name))
            .chain(self.aliases.iter().map(|alias| normalize_key(alias)))
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidFeature {
            feature: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }

        match &self.kind {
            FeatureKind::Numeric {
                default,
                valid_range,
            } => {
                if !default.is_finite() {
                    return Err(invalid(format!("default {default} is not finite")));
                }
                if let Some(range) = valid_range {
                    if !(range.min <= range.max) {
                        return Err(invalid(format!(
                            "range {}..={} is empty",
                            range.min, range.max
                        )));
                    }
                    if !range.contains(*default) {
                        return Err(invalid(format!(
                            "default {default} outside {}..={}",
                            range.min, range.max
                        )));
                    }
                }
            }
            FeatureKind::Categorical {
                allowed_values,
                synonyms,
                default,
                critical_values,
            } => {
                if allowed_values.is_empty() {
                    return Err(invalid("no allowed values".to_string()));
                }
                if !allowed_values.contains(default) {
                    return Err(invalid(format!("default '{default}' is not allowed")));
                }
                if let Some((raw, target)) = synonyms
                    .iter()
                    .find(|(_, target)| !allowed_values.contains(*target))
                {
                    return Err(invalid(format!(
                        "synonym '{raw}' maps to unknown value '{target}'"
                    )));
                }
                if let Some(value) = critical_values
                    .iter()
                    .find(|value| !allowed_values.contains(*value))
                {
                    return Err(invalid(format!("critical value '{value}' is not allowed")));
                }
            }
        }

        Ok(())
    }
}

/// Where a raw column header lands in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnRef {
    Feature(usize),
    Identifier,
}

/// Ordered, validated feature contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDocument")]
pub struct Schema {
    version: String,
    features: Vec<FeatureSpec>,
    identifier_columns: Vec<String>,
    #[serde(skip)]
    columns: HashMap<String, ColumnRef>,
}

#[derive(Deserialize)]
struct SchemaDocument {
    version: String,
    features: Vec<FeatureSpec>,
    #[serde(default)]
    identifier_columns: Vec<String>,
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = SchemaError;

    fn try_from(document: SchemaDocument) -> Result<Self, Self::Error> {
        Schema::new(document.version, document.features, document.identifier_columns)
    }
}

impl Schema {
    pub fn new(
        version: impl Into<String>,
        features: Vec<FeatureSpec>,
        identifier_columns: Vec<String>,
    ) -> Result<Self, SchemaError> {
        if features.is_empty() {
            return Err(SchemaError::NoFeatures);
        }

        let mut columns = HashMap::new();
        for (index, feature) in features.iter().enumerate() {
            feature.validate()?;
            for key in feature.column_keys() {
                if columns.insert(key.clone(), ColumnRef::Feature(index)).is_some() {
                    return Err(SchemaError::DuplicateColumn(key));
                }
            }
        }
        for column in &identifier_columns {
            let key = normalize_key(column);
            match columns.get(&key) {
                Some(ColumnRef::Feature(_)) => return Err(SchemaError::DuplicateColumn(key)),
                _ => {
                    columns.insert(key, ColumnRef::Identifier);
                }
            }
        }

        Ok(Self {
            version: version.into(),
            features,
            identifier_columns,
            columns,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features
            .iter()
            .map(|feature| feature.name.as_str())
            .collect()
    }

    pub fn identifier_columns(&self) -> &[String] {
        &self.identifier_columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|feature| feature.name == name)
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|feature| feature.name == name)
    }

    /// Resolve a header that may use different casing, underscores, or an alias.
    pub fn feature_for_column(&self, column: &str) -> Option<&FeatureSpec> {
        match self.resolve_column(column)? {
            ColumnRef::Feature(index) => self.features.get(index),
            ColumnRef::Identifier => None,
        }
    }

    pub fn is_identifier(&self, column: &str) -> bool {
        self.resolve_column(column) == Some(ColumnRef::Identifier)
    }

    pub(crate) fn resolve_column(&self, column: &str) -> Option<ColumnRef> {
        self.columns.get(&normalize_key(column)).copied()
    }
}

/// Reasons a schema definition is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema declares no features")]
    NoFeatures,
    #[error("feature name must not be blank")]
    EmptyName,
    #[error("column '{0}' is declared more than once")]
    DuplicateColumn(String),
    #[error("feature '{feature}' is invalid: {reason}")]
    InvalidFeature { feature: String, reason: String },
}
