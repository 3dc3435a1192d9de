//! Response validation for model output.
//!
//! Model output crosses into the application only through [`parse_model_output`] and
//! [`normalize`]. The policy is lenient: field-level problems (out-of-range numbers, unknown
//! labels, missing optional fields) are repaired and recorded as adjustments, while output that
//! is not a JSON object at all is rejected.

use crate::error::{AnalysisError, AnalysisResult};
use rxcheck_types::{
    Ambiguity, Evaluation, MedicineRecord, OverallRating, PrescriptionAnalysis, UNKNOWN_FIELD,
};
use serde_json::{Map, Value};

/// A normalised analysis plus a note for every field that had to be repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub analysis: PrescriptionAnalysis,
    pub adjustments: Vec<String>,
}

/// Parse raw model text as JSON and normalise it.
///
/// # Errors
///
/// Returns `AnalysisError::MalformedResponse` if `raw` is not valid JSON and
/// `AnalysisError::StructureValidation` if it is valid JSON but not an object. Both carry the raw
/// text.
pub fn parse_model_output(raw: &str) -> AnalysisResult<Normalized> {
    let value: Value =
        serde_json::from_str(raw).map_err(|source| AnalysisError::MalformedResponse {
            raw: raw.to_string(),
            source,
        })?;

    normalize(&value).map_err(|err| match err {
        AnalysisError::StructureValidation { reason, .. } => AnalysisError::StructureValidation {
            reason,
            raw: raw.to_string(),
        },
        other => other,
    })
}

/// Normalise an already-parsed analysis value.
///
/// # Errors
///
/// Returns `AnalysisError::StructureValidation` if `value` is not a JSON object.
pub fn normalize(value: &Value) -> AnalysisResult<Normalized> {
    let Some(obj) = value.as_object() else {
        return Err(AnalysisError::StructureValidation {
            reason: format!("expected a JSON object, got {}", json_type(value)),
            raw: value.to_string(),
        });
    };

    let mut adjustments = Vec::new();

    let structured_prescription = medicines(obj.get("structured_prescription"), &mut adjustments);
    let score = clamped_percentage(obj.get("score"), "score", &mut adjustments);
    let evaluation = evaluation(obj.get("evaluation"), score, &mut adjustments);
    let summary = match obj.get("summary") {
        Some(Value::String(s)) => s.trim().to_string(),
        other => {
            if other.is_some_and(|v| !v.is_null()) {
                adjustments.push("summary: not a string, replaced with empty text".into());
            }
            String::new()
        }
    };
    let recommendations = string_list(obj.get("recommendations"), "recommendations", &mut adjustments);
    let drug_interactions =
        string_list(obj.get("drug_interactions"), "drug_interactions", &mut adjustments);

    Ok(Normalized {
        analysis: PrescriptionAnalysis {
            structured_prescription,
            score,
            evaluation,
            summary,
            recommendations,
            drug_interactions,
        },
        adjustments,
    })
}

/// An analysis ready for report rendering, plus the failure message when it came from an
/// error envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportInput {
    pub analysis: PrescriptionAnalysis,
    pub notice: Option<String>,
}

/// Prepare a client-supplied analysis or error envelope for rendering.
///
/// The value is normalised like model output. An envelope (`"error": true`) keeps the `Error`
/// rating and its message becomes the report notice.
///
/// # Errors
///
/// Returns `AnalysisError::StructureValidation` if `value` is not a JSON object.
pub fn prepare_report(value: &Value) -> AnalysisResult<ReportInput> {
    let mut analysis = normalize(value)?.analysis;
    let mut notice = None;

    if value.get("error").and_then(Value::as_bool) == Some(true) {
        analysis.evaluation.overall_rating = OverallRating::Error;
        notice = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    Ok(ReportInput { analysis, notice })
}

/// Clamp an integer-like value into `0..=100`.
///
/// Accepts integers, floats (rounded) and numeric strings. Anything else becomes 0.
pub fn clamp_percentage(value: Option<&Value>) -> Option<u8> {
    let n = match value? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i as f64
            } else if let Some(u) = n.as_u64() {
                u as f64
            } else {
                n.as_f64()?
            }
        }
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, 100.0) as u8)
}

fn clamped_percentage(value: Option<&Value>, field: &str, adjustments: &mut Vec<String>) -> u8 {
    match clamp_percentage(value) {
        Some(clamped) => {
            if value.and_then(Value::as_i64) != Some(i64::from(clamped)) {
                adjustments.push(format!("{field}: {} normalised to {clamped}", describe(value)));
            }
            clamped
        }
        None => {
            adjustments.push(format!("{field}: {} replaced with 0", describe(value)));
            0
        }
    }
}

fn evaluation(value: Option<&Value>, score: u8, adjustments: &mut Vec<String>) -> Evaluation {
    let empty = Map::new();
    let obj = match value {
        Some(Value::Object(obj)) => obj,
        other => {
            adjustments.push(format!("evaluation: {} replaced with defaults", describe(other)));
            &empty
        }
    };

    let completeness = clamped_percentage(
        obj.get("completeness"),
        "evaluation.completeness",
        adjustments,
    );
    let safety = clamped_percentage(obj.get("safety"), "evaluation.safety", adjustments);

    let ambiguity = match obj.get("ambiguity").and_then(Value::as_str).and_then(Ambiguity::parse_label) {
        Some(a) => a,
        None => {
            adjustments.push(format!(
                "evaluation.ambiguity: {} treated as high",
                describe(obj.get("ambiguity"))
            ));
            Ambiguity::High
        }
    };

    let overall_rating = match obj
        .get("overall_rating")
        .and_then(Value::as_str)
        .and_then(OverallRating::parse_label)
    {
        Some(r) => r,
        None => {
            let derived = OverallRating::from_score(score);
            adjustments.push(format!(
                "evaluation.overall_rating: {} derived from score as {derived}",
                describe(obj.get("overall_rating"))
            ));
            derived
        }
    };

    Evaluation {
        completeness,
        safety,
        ambiguity,
        overall_rating,
    }
}

fn medicines(value: Option<&Value>, adjustments: &mut Vec<String>) -> Vec<MedicineRecord> {
    let items = match value {
        Some(Value::Array(items)) => items,
        other => {
            adjustments.push(format!(
                "structured_prescription: {} replaced with an empty list",
                describe(other)
            ));
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::String(name) if !name.trim().is_empty() => {
                adjustments.push(format!(
                    "structured_prescription[{index}]: bare name expanded to a record"
                ));
                records.push(MedicineRecord::named(name.trim()));
            }
            Value::Object(obj) => match medicine_record(obj, index, adjustments) {
                Some(record) => records.push(record),
                None => adjustments.push(format!(
                    "structured_prescription[{index}]: dropped, no medicine name"
                )),
            },
            _ => adjustments.push(format!(
                "structured_prescription[{index}]: dropped, {}",
                json_type(item)
            )),
        }
    }

    records
}

fn medicine_record(
    obj: &Map<String, Value>,
    index: usize,
    adjustments: &mut Vec<String>,
) -> Option<MedicineRecord> {
    let name = ["medicine_name", "name"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(scalar_text))
        .find(|name| !name.is_empty())?;

    let mut text_field = |key: &str| match obj.get(key).and_then(scalar_text) {
        Some(text) if !text.is_empty() => text,
        _ => {
            adjustments.push(format!(
                "structured_prescription[{index}].{key}: missing, set to {UNKNOWN_FIELD}"
            ));
            UNKNOWN_FIELD.to_string()
        }
    };

    let formulation = text_field("formulation");
    let strength = text_field("strength");
    let frequency = text_field("frequency");
    let timing = text_field("timing");
    let duration = text_field("duration");

    let warnings = string_list(
        obj.get("warnings"),
        &format!("structured_prescription[{index}].warnings"),
        adjustments,
    );

    Some(MedicineRecord {
        name,
        formulation,
        strength,
        frequency,
        timing,
        duration,
        warnings,
    })
}

fn string_list(value: Option<&Value>, field: &str, adjustments: &mut Vec<String>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let list: Vec<String> = items
                .iter()
                .filter_map(scalar_text)
                .filter(|s| !s.is_empty())
                .collect();
            if list.len() != items.len() {
                adjustments.push(format!(
                    "{field}: {} unusable item(s) skipped",
                    items.len() - list.len()
                ));
            }
            list
        }
        Some(Value::String(s)) => {
            adjustments.push(format!("{field}: single string wrapped in a list"));
            if s.trim().is_empty() {
                Vec::new()
            } else {
                vec![s.trim().to_string()]
            }
        }
        Some(other) => {
            adjustments.push(format!("{field}: {} replaced with an empty list", json_type(other)));
            Vec::new()
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".into(),
        Some(v @ (Value::Number(_) | Value::String(_) | Value::Bool(_))) => v.to_string(),
        Some(v) => json_type(v).into(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
