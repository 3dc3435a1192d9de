//! Structured prescription analysis as returned to API callers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Placeholder for any medicine detail the model could not determine.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// One medicine line of a structured prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MedicineRecord {
    #[serde(rename = "medicine_name", alias = "name")]
    pub name: String,
    pub formulation: String,
    pub strength: String,
    pub frequency: String,
    pub timing: String,
    pub duration: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl MedicineRecord {
    /// Creates a record with every optional detail set to [`UNKNOWN_FIELD`].
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formulation: UNKNOWN_FIELD.into(),
            strength: UNKNOWN_FIELD.into(),
            frequency: UNKNOWN_FIELD.into(),
            timing: UNKNOWN_FIELD.into(),
            duration: UNKNOWN_FIELD.into(),
            warnings: Vec::new(),
        }
    }
}

/// How ambiguous the original handwriting/text was judged to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Ambiguity {
    Low,
    Medium,
    High,
}

impl Ambiguity {
    /// Parses a model-supplied label, ignoring case and surrounding whitespace.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Overall quality label of a prescription.
///
/// `Error` never comes from the model; it only marks the zeroed skeleton returned when an
/// analysis fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OverallRating {
    Excellent,
    Good,
    Moderate,
    #[serde(rename = "Needs Correction")]
    NeedsCorrection,
    Poor,
    Error,
}

impl OverallRating {
    /// Maps a 0-100 score onto the fixed rating bands.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::Excellent,
            80..=89 => Self::Good,
            60..=79 => Self::Moderate,
            40..=59 => Self::NeedsCorrection,
            _ => Self::Poor,
        }
    }

    /// Parses a model-supplied label. `Error` is not accepted from the model.
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalised: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '-' => ' ',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalised.as_str() {
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "moderate" => Some(Self::Moderate),
            "needs correction" => Some(Self::NeedsCorrection),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::NeedsCorrection => "Needs Correction",
            Self::Poor => "Poor",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for OverallRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Evaluation {
    /// 0-100
    pub completeness: u8,
    /// 0-100
    pub safety: u8,
    pub ambiguity: Ambiguity,
    pub overall_rating: OverallRating,
}

/// The validated result of one prescription analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionAnalysis {
    pub structured_prescription: Vec<MedicineRecord>,
    /// 0-100
    pub score: u8,
    pub evaluation: Evaluation,
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub drug_interactions: Vec<String>,
}

impl PrescriptionAnalysis {
    /// The zeroed-out analysis used when no real analysis is available.
    pub fn failed_skeleton() -> Self {
        Self {
            structured_prescription: Vec::new(),
            score: 0,
            evaluation: Evaluation {
                completeness: 0,
                safety: 0,
                ambiguity: Ambiguity::High,
                overall_rating: OverallRating::Error,
            },
            summary: String::new(),
            recommendations: Vec::new(),
            drug_interactions: Vec::new(),
        }
    }
}

/// Error envelope returned in place of an analysis.
///
/// The skeleton is flattened into the envelope so a consumer can render the failure with the
/// same code path it uses for a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisFailure {
    pub error: bool,
    pub message: String,
    /// Stable snake_case discriminator, e.g. `malformed_response` or `key_compromised`.
    pub error_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(flatten)]
    pub analysis: PrescriptionAnalysis,
}

impl AnalysisFailure {
    pub fn new(error_kind: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            error: true,
            message: format!("AI Analysis failed: {reason}"),
            error_kind: error_kind.into(),
            details: None,
            raw_response: None,
            analysis: PrescriptionAnalysis::failed_skeleton(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bands() {
        assert_eq!(OverallRating::from_score(100), OverallRating::Excellent);
        assert_eq!(OverallRating::from_score(90), OverallRating::Excellent);
        assert_eq!(OverallRating::from_score(89), OverallRating::Good);
        assert_eq!(OverallRating::from_score(80), OverallRating::Good);
        assert_eq!(OverallRating::from_score(79), OverallRating::Moderate);
        assert_eq!(OverallRating::from_score(60), OverallRating::Moderate);
        assert_eq!(OverallRating::from_score(59), OverallRating::NeedsCorrection);
        assert_eq!(OverallRating::from_score(40), OverallRating::NeedsCorrection);
        assert_eq!(OverallRating::from_score(39), OverallRating::Poor);
        assert_eq!(OverallRating::from_score(0), OverallRating::Poor);
    }

    #[test]
    fn test_rating_labels_are_lenient() {
        assert_eq!(
            OverallRating::parse_label("needs_correction"),
            Some(OverallRating::NeedsCorrection)
        );
        assert_eq!(
            OverallRating::parse_label(" Needs-Correction "),
            Some(OverallRating::NeedsCorrection)
        );
        assert_eq!(OverallRating::parse_label("GOOD"), Some(OverallRating::Good));
        assert_eq!(OverallRating::parse_label("Error"), None);
        assert_eq!(Ambiguity::parse_label("Moderate"), Some(Ambiguity::Medium));
        assert_eq!(Ambiguity::parse_label("unclear"), None);
    }

    #[test]
    fn test_medicine_record_wire_names() {
        let json = serde_json::to_value(MedicineRecord::named("Paracetamol")).unwrap();
        assert_eq!(json["medicine_name"], "Paracetamol");
        assert_eq!(json["timing"], "Unknown");

        let parsed: MedicineRecord = serde_json::from_value(serde_json::json!({
            "name": "Ibuprofen",
            "formulation": "tablet",
            "strength": "400mg",
            "frequency": "twice daily",
            "timing": "after meals",
            "duration": "5 days"
        }))
        .unwrap();
        assert_eq!(parsed.name, "Ibuprofen");
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_failure_envelope_flattens_skeleton() {
        let failure = AnalysisFailure::new("provider_transport", "connection refused")
            .with_raw_response("not json");
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["error"], true);
        assert_eq!(json["message"], "AI Analysis failed: connection refused");
        assert_eq!(json["raw_response"], "not json");
        assert_eq!(json["score"], 0);
        assert_eq!(json["evaluation"]["ambiguity"], "high");
        assert_eq!(json["evaluation"]["overall_rating"], "Error");
        assert_eq!(json["structured_prescription"], serde_json::json!([]));
        assert!(json.get("details").is_none());
    }
}
