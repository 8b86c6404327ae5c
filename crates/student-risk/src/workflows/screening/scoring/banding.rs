use serde::{Deserialize, Serialize};

/// Discrete risk category derived from the model probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        }
    }
}

/// Upper bounds (inclusive, percent scale) of the Low and Medium bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Banding {
    low_max: f64,
    medium_max: f64,
}

impl Banding {
    pub const STANDARD_LOW_MAX: f64 = 30.0;
    pub const STANDARD_MEDIUM_MAX: f64 = 70.0;

    pub fn standard() -> Self {
        Self {
            low_max: Self::STANDARD_LOW_MAX,
            medium_max: Self::STANDARD_MEDIUM_MAX,
        }
    }

    /// `None` unless `0 <= low_max < medium_max <= 100`.
    pub fn new(low_max: f64, medium_max: f64) -> Option<Self> {
        let valid = low_max.is_finite()
            && medium_max.is_finite()
            && low_max >= 0.0
            && low_max < medium_max
            && medium_max <= 100.0;
        valid.then_some(Self {
            low_max,
            medium_max,
        })
    }

    pub fn low_max(&self) -> f64 {
        self.low_max
    }

    pub fn medium_max(&self) -> f64 {
        self.medium_max
    }

    pub fn band_for_percent(&self, percent: f64) -> RiskBand {
        if percent <= self.low_max {
            RiskBand::Low
        } else if percent <= self.medium_max {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }

    pub fn band_for_probability(&self, probability: f64) -> RiskBand {
        self.band_for_percent(probability * 100.0)
    }
}

impl Default for Banding {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive_on_the_lower_band() {
        let banding = Banding::standard();
        assert_eq!(banding.band_for_percent(0.0), RiskBand::Low);
        assert_eq!(banding.band_for_percent(30.0), RiskBand::Low);
        assert_eq!(banding.band_for_percent(30.0001), RiskBand::Medium);
        assert_eq!(banding.band_for_percent(70.0), RiskBand::Medium);
        assert_eq!(banding.band_for_percent(70.0001), RiskBand::High);
        assert_eq!(banding.band_for_percent(100.0), RiskBand::High);
    }

    #[test]
    fn rejects_inverted_or_out_of_scale_bounds() {
        assert!(Banding::new(70.0, 30.0).is_none());
        assert!(Banding::new(40.0, 40.0).is_none());
        assert!(Banding::new(-1.0, 50.0).is_none());
        assert!(Banding::new(20.0, 120.0).is_none());
        assert!(Banding::new(f64::NAN, 50.0).is_none());
        assert_eq!(
            Banding::new(40.0, 60.0).map(|b| b.band_for_percent(55.0)),
            Some(RiskBand::Medium)
        );
    }
}
