mod rules;

pub use rules::{FactorRule, RuleTable};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::attribution::{Concern, Contribution, Direction};
use super::normalizer::NormalizedRecord;
use super::schema::Schema;
use super::scoring::{RiskBand, ScoreResult};

/// Ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Standard,
    Medium,
    High,
    Urgent,
    Emergency,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rule: String,
    pub title: String,
    pub priority: Priority,
    pub rationale: String,
    pub actions: Vec<String>,
}

/// A categorical feature holding one of its designated critical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalFlag {
    pub feature: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFlags {
    pub critical: Vec<CriticalFlag>,
}

impl RecordFlags {
    pub fn from_record(record: &NormalizedRecord, schema: &Schema) -> Self {
        let critical = schema
            .features()
            .iter()
            .filter_map(|feature| {
                let value = record.get(&feature.name)?.as_category()?;
                feature.is_critical_value(value).then(|| CriticalFlag {
                    feature: feature.name.clone(),
                    value: value.to_string(),
                })
            })
            .collect();
        Self { critical }
    }

    pub fn is_critical(&self) -> bool {
        !self.critical.is_empty()
    }
}

/// Maps band, elevated factors and critical flags to guidance.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisor {
    rules: RuleTable,
}

impl Default for Advisor {
    fn default() -> Self {
        Self::standard()
    }
}

impl Advisor {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn standard() -> Self {
        Self::new(RuleTable::standard())
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn advise(
        &self,
        score: &ScoreResult,
        contributions: &[Contribution],
        flags: &RecordFlags,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if flags.is_critical() {
            recommendations.push(crisis_recommendation(score, flags));
        }

        recommendations.push(band_recommendation(score));

        let mut fired = BTreeSet::new();
        for contribution in contributions {
            if contribution.concern < Concern::Medium || contribution.concern == Concern::Critical {
                continue;
            }
            let Some(rule) = self.rules.rule_for(&contribution.feature) else {
                continue;
            };
            if !fired.insert(rule.key.as_str()) {
                continue;
            }
            recommendations.push(Recommendation {
                rule: rule.key.clone(),
                title: rule.title.clone(),
                priority: Priority::Medium,
                rationale: factor_rationale(contribution),
                actions: rule.actions.clone(),
            });
        }

        let has_high_concern = contributions
            .iter()
            .any(|contribution| contribution.concern >= Concern::High);
        if score.band != RiskBand::Low && !has_high_concern {
            recommendations.push(comprehensive_assessment(score));
        }

        // Stable: equal priorities keep generation order.
        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
        recommendations
    }
}

fn crisis_recommendation(score: &ScoreResult, flags: &RecordFlags) -> Recommendation {
    let priority = if score.band == RiskBand::High {
        Priority::Critical
    } else {
        Priority::Emergency
    };
    let reported = flags
        .critical
        .iter()
        .map(|flag| format!("{} = {}", flag.feature, flag.value))
        .collect::<Vec<_>>()
        .join("; ");

    Recommendation {
        rule: "crisis_protocol".to_string(),
        title: "CRITICAL: Suicide Risk Protocol".to_string(),
        priority,
        rationale: format!("critical indicator reported ({reported}); immediate action required"),
        actions: strings(&[
            "Activate crisis intervention protocol immediately",
            "Do not leave student alone",
            "Contact crisis team/911 if necessary",
            "Ensure 24/7 support contact information",
            "Mandatory follow-up within 24 hours",
        ]),
    }
}

fn band_recommendation(score: &ScoreResult) -> Recommendation {
    let rationale = format!(
        "{} risk band at {:.1}% predicted risk",
        score.band.label(),
        score.risk_percent
    );
    match score.band {
        RiskBand::High => Recommendation {
            rule: "band_high".to_string(),
            title: "Immediate Professional Intervention".to_string(),
            priority: Priority::Urgent,
            rationale,
            actions: strings(&[
                "Schedule appointment with campus counselor within 48 hours",
                "Provide crisis hotline contact information",
                "Implement weekly check-ins",
                "Consider temporary academic accommodations",
            ]),
        },
        RiskBand::Medium => Recommendation {
            rule: "band_medium".to_string(),
            title: "Enhanced Support & Monitoring".to_string(),
            priority: Priority::High,
            rationale,
            actions: strings(&[
                "Schedule counseling appointment within 1-2 weeks",
                "Provide mental health resource packet",
                "Bi-weekly wellness check-ins",
                "Connect with peer support programs",
            ]),
        },
        RiskBand::Low => Recommendation {
            rule: "band_low".to_string(),
            title: "Preventive Care & Wellness".to_string(),
            priority: Priority::Standard,
            rationale,
            actions: strings(&[
                "Provide general wellness resources",
                "Encourage participation in campus activities",
                "Monthly wellness check-ins",
                "Stress management workshop information",
            ]),
        },
    }
}

fn comprehensive_assessment(score: &ScoreResult) -> Recommendation {
    let priority = if score.band == RiskBand::High {
        Priority::High
    } else {
        Priority::Medium
    };
    Recommendation {
        rule: "comprehensive_assessment".to_string(),
        title: "Comprehensive Wellbeing Assessment".to_string(),
        priority,
        rationale: format!(
            "{} risk without a single dominant factor",
            score.band.label()
        ),
        actions: strings(&[
            "Schedule a full intake interview with a counselor",
            "Review recent academic and attendance records",
            "Screen for factors outside the current questionnaire",
        ]),
    }
}

fn factor_rationale(contribution: &Contribution) -> String {
    let direction = match contribution.direction {
        Direction::Increases => "raises",
        Direction::Decreases => "lowers",
        Direction::Unknown => "has an unclear effect on",
    };
    format!(
        "{} is {} ({} concern); it {} risk and carries {:.1}% of the attributed weight",
        contribution.feature,
        contribution.value,
        contribution.concern,
        direction,
        contribution.weight
    )
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
