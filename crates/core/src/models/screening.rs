//! PHQ-9 screening records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// PHQ-9 severity bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Minimal,
    Mild,
    Moderate,
    #[serde(rename = "Moderately Severe")]
    ModeratelySevere,
    Severe,
}

impl Severity {
    /// Classify a total score (0-27)
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=4 => Severity::Minimal,
            5..=9 => Severity::Mild,
            10..=14 => Severity::Moderate,
            15..=19 => Severity::ModeratelySevere,
            _ => Severity::Severe,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Minimal => "Minimal",
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::ModeratelySevere => "Moderately Severe",
            Severity::Severe => "Severe",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Severity::Minimal => "Continue current practices",
            Severity::Mild => "Monitor symptoms, consider self-care",
            Severity::Moderate => "Consider speaking with a counselor",
            Severity::ModeratelySevere => "Recommend scheduling an appointment",
            Severity::Severe => "Recommend immediate consultation",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Minimal" => Some(Severity::Minimal),
            "Mild" => Some(Severity::Mild),
            "Moderate" => Some(Severity::Moderate),
            "Moderately Severe" => Some(Severity::ModeratelySevere),
            "Severe" => Some(Severity::Severe),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored PHQ-9 result. Re-screening creates a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Nine answers in questionnaire order, each 0-3
    pub answers: Vec<u8>,
    pub score: u8,
    pub severity: Severity,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
}

impl ScreeningResult {
    /// High risk means a score above the moderate band
    pub fn is_high_risk(&self) -> bool {
        self.score > 14
    }
}
