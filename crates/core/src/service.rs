//! Prescription analysis service.
//!
//! Ties the prompt builder, the model provider and the response validator together. Every
//! expected failure comes back as an `AnalysisError`; callers that need a renderable value use
//! [`AnalysisService::analyze_or_failure`].

use crate::analysis::parse_model_output;
use crate::error::{AnalysisError, AnalysisResult};
use crate::prompt::build_prompt;
use crate::provider::LanguageModel;
use rxcheck_types::{AnalysisFailure, PrescriptionAnalysis, PrescriptionText};
use std::sync::Arc;

/// Outcome of one analysis as seen by an API caller.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(PrescriptionAnalysis),
    Failed(AnalysisFailure),
}

#[derive(Clone)]
pub struct AnalysisService {
    model: Arc<dyn LanguageModel>,
}

impl AnalysisService {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Analyse one prescription.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Provider` when the model call fails, and
    /// `AnalysisError::MalformedResponse`/`AnalysisError::StructureValidation` when the model's
    /// answer cannot be used.
    pub async fn analyze(&self, text: &PrescriptionText) -> AnalysisResult<PrescriptionAnalysis> {
        let prompt = build_prompt(text);

        tracing::info!("Sending request to model provider...");
        let raw = self.model.generate_json(&prompt).await?;

        let normalized = parse_model_output(&raw)?;
        if !normalized.adjustments.is_empty() {
            tracing::warn!(
                "AI response normalised ({} adjustment(s)): {}",
                normalized.adjustments.len(),
                normalized.adjustments.join("; ")
            );
        }

        tracing::info!(
            "AI Analysis successful. Score: {}",
            normalized.analysis.score
        );
        Ok(normalized.analysis)
    }

    /// Analyse one prescription, folding every failure into an error envelope.
    pub async fn analyze_or_failure(&self, text: &PrescriptionText) -> AnalysisOutcome {
        match self.analyze(text).await {
            Ok(analysis) => AnalysisOutcome::Completed(analysis),
            Err(err) => {
                log_failure(&err);
                AnalysisOutcome::Failed(AnalysisFailure::from(&err))
            }
        }
    }
}

fn log_failure(err: &AnalysisError) {
    match err {
        AnalysisError::MalformedResponse { raw, .. }
        | AnalysisError::StructureValidation { raw, .. } => {
            tracing::error!("AI Analysis Error: {} (raw response: {} bytes)", err, raw.len());
        }
        _ => tracing::error!("AI Analysis Error: {}", err),
    }
}
