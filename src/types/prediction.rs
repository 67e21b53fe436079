//! Prediction outcome data structures

use serde::{Deserialize, Serialize};

/// Binary risk classification returned by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "Tidak Risiko")]
    NoRisk,
    #[serde(rename = "Risiko")]
    Risk,
}

impl RiskLabel {
    /// Map a model class id onto a label
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(RiskLabel::NoRisk),
            1 => Some(RiskLabel::Risk),
            _ => None,
        }
    }

    /// Class id as used by the model
    pub fn class(&self) -> u8 {
        match self {
            RiskLabel::NoRisk => 0,
            RiskLabel::Risk => 1,
        }
    }

    /// Text used in the history table and export
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::NoRisk => "Tidak Risiko",
            RiskLabel::Risk => "Risiko",
        }
    }

    pub fn is_risk(&self) -> bool {
        matches!(self, RiskLabel::Risk)
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one inference call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: RiskLabel,
    /// Probability of the risk class (0.0 - 1.0)
    pub probability: f64,
}

impl Prediction {
    /// Probability formatted as a percentage with two decimals, e.g. `73.00%`
    pub fn formatted_probability(&self) -> String {
        format_percent(self.probability)
    }
}

/// Format a probability in [0, 1] as a percentage string
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}
