//! Prompt construction for prescription analysis.
//!
//! The prompt is fully deterministic: the same prescription text always yields the same prompt.
//! It embeds the JSON shape the response validator expects, so field names here and in
//! [`crate::analysis`] must stay in step.

use rxcheck_types::PrescriptionText;

const OUTPUT_SCHEMA: &str = r#"{
  "structured_prescription": [
    {
      "medicine_name": "Full medicine name",
      "formulation": "tablet/capsule/syrup/etc.",
      "strength": "dosage, e.g., 500mg",
      "frequency": "once daily / twice daily / as prescribed",
      "timing": "before/after meals, morning/evening, etc.",
      "duration": "duration of treatment",
      "warnings": ["any safety warnings if applicable, including drug interactions"]
    }
  ],
  "score": "integer 0-100",
  "evaluation": {
    "completeness": "integer 0-100",
    "safety": "integer 0-100",
    "ambiguity": "low / medium / high",
    "overall_rating": "Excellent / Good / Moderate / Needs Correction / Poor"
  },
  "summary": "Brief 2-3 sentence summary of the prescription quality",
  "recommendations": ["List of specific improvements or precautions if any"],
  "drug_interactions": ["Identify any potential drug-drug interactions if multiple medicines"]
}"#;

const RULES: &[&str] = &[
    "Expand shorthand medicine names into full names if known.",
    "Fill in missing frequency, timing, and duration if inferred from context, otherwise mark as \"unknown\".",
    "Add warnings if medicine is unknown or dose seems unsafe.",
    "Check for drug-drug interactions if multiple medicines are prescribed.",
    "If a 'Diagnosis' is provided in the text, use it to cross-check the prescribed medicines. Add warnings if a medicine seems contraindicated or unrelated.",
    "Consider patient age and vitals in your safety assessment.",
    "If 'Diagnosis' is present, check for standard treatments and consider this in the completeness score.",
    "Score should be: 90-100 (Excellent), 80-89 (Good), 60-79 (Moderate), 40-59 (Needs Correction), 0-39 (Poor)",
    "Respond ONLY in JSON.",
    "Maintain field names exactly as specified.",
];

/// Builds the analysis instruction for one prescription.
pub fn build_prompt(text: &PrescriptionText) -> String {
    let mut prompt = String::with_capacity(OUTPUT_SCHEMA.len() + text.as_str().len() + 1536);

    prompt.push_str(
        "You are a professional medical AI assistant. Analyze the following raw prescription \
         text and return a structured, safe, and standardized JSON output. Follow these rules:\n\n",
    );

    prompt.push_str("1. Input:\n");
    prompt.push_str("   - Raw prescription text: \"");
    prompt.push_str(text.as_str());
    prompt.push_str("\"\n\n");

    prompt.push_str("2. Output:\n");
    prompt.push_str("   - Always return valid JSON with this structure:\n");
    prompt.push_str(OUTPUT_SCHEMA);
    prompt.push_str("\n\n");

    prompt.push_str("3. Rules:\n");
    for rule in RULES {
        prompt.push_str("   - ");
        prompt.push_str(rule);
        prompt.push('\n');
    }

    prompt
}
