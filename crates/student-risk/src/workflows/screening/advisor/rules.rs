use serde::{Deserialize, Serialize};

/// Factor rule: fires when any of `features` carries elevated concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRule {
    pub key: String,
    pub features: Vec<String>,
    pub title: String,
    pub actions: Vec<String>,
}

impl FactorRule {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            features: Vec::new(),
            title: title.into(),
            actions: Vec::new(),
        }
    }

    pub fn for_features(mut self, features: &[&str]) -> Self {
        self.features
            .extend(features.iter().map(|feature| feature.to_string()));
        self
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions
            .extend(actions.iter().map(|action| action.to_string()));
        self
    }

    pub(crate) fn matches(&self, feature: &str) -> bool {
        self.features.iter().any(|candidate| candidate == feature)
    }
}

/// Ordered rule registry. Data, not code: callers may extend or replace it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    rules: Vec<FactorRule>,
}

impl RuleTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: FactorRule) -> Self {
        self.register(rule);
        self
    }

    /// Replaces any rule already registered under the same key.
    pub fn register(&mut self, rule: FactorRule) {
        match self.rules.iter_mut().find(|existing| existing.key == rule.key) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn rule_for(&self, feature: &str) -> Option<&FactorRule> {
        self.rules.iter().find(|rule| rule.matches(feature))
    }

    pub fn rules(&self) -> &[FactorRule] {
        &self.rules
    }

    /// Support programmes for the student wellbeing schema.
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(
                FactorRule::new("sleep", "Sleep Optimization Program")
                    .for_features(&["Sleep Duration"])
                    .with_actions(&[
                        "Sleep hygiene education and resources",
                        "Sleep diary tracking for 2 weeks",
                        "Environmental sleep assessment",
                        "Consider referral to sleep specialist",
                    ]),
            )
            .with_rule(
                FactorRule::new("academic_load", "Academic Stress Management")
                    .for_features(&["Academic Pressure", "Work/Study Hours"])
                    .with_actions(&[
                        "Academic advisor consultation",
                        "Time management skills workshop",
                        "Study skills assessment",
                        "Consider course load adjustment",
                    ]),
            )
            .with_rule(
                FactorRule::new("financial", "Financial Support Services")
                    .for_features(&["Financial Stress"])
                    .with_actions(&[
                        "Financial aid office consultation",
                        "Emergency financial assistance assessment",
                        "Work-study opportunity exploration",
                        "Financial literacy workshop",
                    ]),
            )
            .with_rule(
                FactorRule::new("academic_performance", "Academic Support Services")
                    .for_features(&["CGPA", "Study Satisfaction"])
                    .with_actions(&[
                        "Academic success center referral",
                        "Tutoring services evaluation",
                        "Learning assessment if needed",
                        "Academic recovery planning",
                    ]),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_rules_with_the_same_key() {
        let mut table = RuleTable::standard();
        let count = table.rules().len();
        table.register(
            FactorRule::new("sleep", "Sleep Clinic Referral").for_features(&["Sleep Duration"]),
        );
        assert_eq!(table.rules().len(), count);
        assert_eq!(
            table.rule_for("Sleep Duration").map(|rule| rule.title.as_str()),
            Some("Sleep Clinic Referral")
        );
        assert!(table.rule_for("Gender").is_none());
    }
}
