use std::sync::OnceLock;

use super::{FeatureSpec, Schema, SchemaError};

pub const STUDENT_SCHEMA_VERSION: &str = "student-depression-v1";

static STUDENT_SCHEMA: OnceLock<Result<Schema, SchemaError>> = OnceLock::new();

const YES_SYNONYMS: &[(&str, &str)] = &[
    ("y", "Yes"),
    ("true", "Yes"),
    ("1", "Yes"),
    ("sometimes", "Yes"),
    ("often", "Yes"),
    ("n", "No"),
    ("false", "No"),
    ("0", "No"),
    ("never", "No"),
];

const DEGREES: &[&str] = &[
    "Class 12", "BA", "BSc", "B.Com", "BCA", "BBA", "B.Tech", "BE", "B.Arch", "B.Ed", "B.Pharm",
    "BHM", "LLB", "MBBS", "MA", "MSc", "M.Com", "MCA", "MBA", "M.Tech", "ME", "M.Ed", "M.Pharm",
    "MHM", "LLM", "MD", "PhD", "Others",
];

/// The feature contract of the bundled student depression model, in fit order.
pub fn load_schema() -> Result<Schema, SchemaError> {
    student_schema().cloned()
}

/// Human-readable description of a feature, looked up by name or alias.
/// `Ok(None)` means the name matches no feature.
pub fn explain_feature(name: &str) -> Result<Option<&'static str>, SchemaError> {
    let schema = student_schema()?;
    Ok(schema
        .feature_for_column(name)
        .map(|feature| feature.description.as_str()))
}

fn student_schema() -> Result<&'static Schema, SchemaError> {
    STUDENT_SCHEMA
        .get_or_init(build_student_schema)
        .as_ref()
        .map_err(Clone::clone)
}

fn build_student_schema() -> Result<Schema, SchemaError> {
    let features = vec![
        FeatureSpec::categorical("Gender", &["Male", "Female"], "Male")
            .with_synonyms(&[("m", "Male"), ("man", "Male"), ("f", "Female"), ("woman", "Female")])
            .with_aliases(&["Sex"])
            .described("Self-reported gender of the student."),
        FeatureSpec::numeric("Age", 22.0)
            .with_range(15.0, 60.0)
            .described("Age of the student in years."),
        FeatureSpec::numeric("Academic Pressure", 3.0)
            .with_range(0.0, 5.0)
            .higher_is_worse()
            .with_aliases(&["Pressure", "Study Pressure"])
            .described(
                "Perceived academic pressure on a 0-5 scale. Higher values indicate heavier \
                 workload, deadlines, and performance expectations.",
            ),
        FeatureSpec::numeric("CGPA", 7.5)
            .with_range(0.0, 10.0)
            .lower_is_worse()
            .with_aliases(&["GPA", "Cumulative GPA"])
            .described("Cumulative grade point average on a 10-point scale."),
        FeatureSpec::numeric("Study Satisfaction", 3.0)
            .with_range(0.0, 5.0)
            .lower_is_worse()
            .described("Satisfaction with current studies on a 0-5 scale."),
        FeatureSpec::categorical(
            "Sleep Duration",
            &["Less than 5 hours", "5-6 hours", "7-8 hours", "More than 8 hours"],
            "7-8 hours",
        )
        .with_synonyms(&[
            ("<5", "Less than 5 hours"),
            ("less than 5", "Less than 5 hours"),
            ("under 5 hours", "Less than 5 hours"),
            ("5 to 6", "5-6 hours"),
            ("5-6", "5-6 hours"),
            ("7 to 8", "7-8 hours"),
            ("7-8", "7-8 hours"),
            ("8+", "More than 8 hours"),
            (">8", "More than 8 hours"),
            ("more than 8", "More than 8 hours"),
            ("over 8 hours", "More than 8 hours"),
        ])
        .with_aliases(&["Sleep", "Sleep Hours"])
        .described("Typical nightly sleep, bucketed into ranges."),
        FeatureSpec::categorical("Dietary Habits", &["Healthy", "Moderate", "Unhealthy"], "Moderate")
            .with_synonyms(&[
                ("good", "Healthy"),
                ("balanced", "Healthy"),
                ("average", "Moderate"),
                ("okay", "Moderate"),
                ("fair", "Moderate"),
                ("poor", "Unhealthy"),
                ("bad", "Unhealthy"),
                ("junk", "Unhealthy"),
            ])
            .with_aliases(&["Diet"])
            .described("Overall quality of the student's eating habits."),
        FeatureSpec::categorical("Degree", DEGREES, "Others")
            .with_synonyms(&[
                ("12th", "Class 12"),
                ("btech", "B.Tech"),
                ("b tech", "B.Tech"),
                ("bcom", "B.Com"),
                ("mtech", "M.Tech"),
                ("mcom", "M.Com"),
                ("bachelor of science", "BSc"),
                ("master of science", "MSc"),
                ("doctorate", "PhD"),
                ("other", "Others"),
            ])
            .with_aliases(&["Program"])
            .described("Degree programme the student is enrolled in."),
        FeatureSpec::categorical("Have you ever had suicidal thoughts ?", &["Yes", "No"], "No")
            .with_synonyms(YES_SYNONYMS)
            .with_critical_values(&["Yes"])
            .with_aliases(&[
                "Have you ever had suicidal thoughts?",
                "Suicidal Thoughts",
            ])
            .described(
                "Whether the student has ever reported suicidal thoughts. A positive answer \
                 triggers the crisis protocol regardless of the overall score.",
            ),
        FeatureSpec::numeric("Work/Study Hours", 6.0)
            .with_range(0.0, 24.0)
            .higher_is_worse()
            .with_aliases(&["Work Study Hours", "Study Hours"])
            .described("Hours per day spent on work and study combined."),
        FeatureSpec::numeric("Financial Stress", 3.0)
            .with_range(1.0, 5.0)
            .higher_is_worse()
            .described("Perceived financial stress on a 1-5 scale."),
        FeatureSpec::categorical("Family History of Mental Illness", &["Yes", "No"], "No")
            .with_synonyms(YES_SYNONYMS)
            .with_aliases(&["Family History"])
            .described("Whether a close relative has a history of mental illness."),
    ];

    Schema::new(
        STUDENT_SCHEMA_VERSION,
        features,
        ["id", "student_id", "Student ID"]
            .iter()
            .map(|column| column.to_string())
            .collect(),
    )
}
