//! # rxcheck types
//!
//! Shared, validated value types used by every rxcheck crate:
//! - `PrescriptionText`: length-bounded input text
//! - the structured analysis (`PrescriptionAnalysis` and its parts) and its error envelope
//! - `MedicineHit`, the projection returned by the medicine search

mod analysis;
mod medicine;
mod text;

pub use analysis::{
    Ambiguity, AnalysisFailure, Evaluation, MedicineRecord, OverallRating, PrescriptionAnalysis,
    UNKNOWN_FIELD,
};
pub use medicine::MedicineHit;
pub use text::{PrescriptionText, TextError, MAX_PRESCRIPTION_CHARS, MIN_PRESCRIPTION_CHARS};
