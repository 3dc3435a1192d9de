//! Wire types for the HTTP API.
//!
//! Analysis results themselves use the `rxcheck_types` structs directly; these are the request
//! and envelope shapes that only exist at the HTTP boundary.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Body of `POST /api/analyze-prescription`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeReq {
    /// Raw prescription text, as typed or transcribed.
    #[serde(default)]
    pub text: String,
}

/// Query of `GET /api/medicines/search`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Name fragment; fewer than two characters returns no results.
    pub q: Option<String>,
}

/// Response of `POST /api/generate-pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PdfRes {
    /// The rendered PDF, standard base64 with padding.
    pub pdf_base64: String,
    pub filename: String,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

impl ErrorRes {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RootRes {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}
