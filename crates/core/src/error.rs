use crate::constants::KEY_COMPROMISED_MESSAGE;
use rxcheck_types::{AnalysisFailure, TextError};

/// Failures talking to the external model provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("request to model provider timed out after {0}s")]
    Timeout(u64),
    #[error("could not connect to model provider: {0}")]
    Connect(reqwest::Error),
    #[error("model provider transport error: {0}")]
    Transport(reqwest::Error),
    #[error("{}", KEY_COMPROMISED_MESSAGE)]
    KeyCompromised,
    #[error("model provider rejected credentials ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("model provider unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },
    #[error("model provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("failed to decode model provider response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
    #[error("prompt was blocked by the model provider: {0}")]
    Blocked(String),
    #[error("AI returned empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether a single retry is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connect(_) | Self::Unavailable { .. }
        )
    }
}

/// Failures of one prescription analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] TextError),
    #[error("AI service error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Failed to parse AI response: {source}")]
    MalformedResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("AI response failed structure validation: {reason}")]
    StructureValidation { reason: String, raw: String },
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Stable snake_case discriminator exposed to API callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Provider(ProviderError::KeyCompromised) => "key_compromised",
            Self::Provider(ProviderError::EmptyResponse) => "empty_response",
            Self::Provider(ProviderError::Decode { .. }) => "malformed_response",
            Self::Provider(_) => "provider_transport",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::StructureValidation { .. } => "structure_validation",
        }
    }

    /// The unparsed model output, when the failure happened after the provider answered.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::MalformedResponse { raw, .. }
            | Self::StructureValidation { raw, .. }
            | Self::Provider(ProviderError::Decode { raw, .. }) => Some(raw),
            _ => None,
        }
    }

    /// Whether the caller, not the system, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<&AnalysisError> for AnalysisFailure {
    fn from(err: &AnalysisError) -> Self {
        let failure = match err {
            // The leaked-key message is shown verbatim so the operator knows what to do.
            AnalysisError::Provider(ProviderError::KeyCompromised) => {
                AnalysisFailure::new(err.kind(), KEY_COMPROMISED_MESSAGE)
            }
            AnalysisError::MalformedResponse { source, .. } => {
                AnalysisFailure::new(err.kind(), err).with_details(source.to_string())
            }
            AnalysisError::Provider(ProviderError::Decode { source, .. }) => {
                AnalysisFailure::new(err.kind(), err).with_details(source.to_string())
            }
            AnalysisError::StructureValidation { reason, .. } => {
                AnalysisFailure::new(err.kind(), err).with_details(reason.clone())
            }
            _ => AnalysisFailure::new(err.kind(), err),
        };

        match err.raw_response() {
            Some(raw) => failure.with_raw_response(raw),
            None => failure,
        }
    }
}

/// Failures loading the medicine reference dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset file not found: {}", .0.display())]
    NotFound(std::path::PathBuf),
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures acquiring the dataset from the remote registry.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("dataset acquisition is disabled: no Kaggle credentials configured")]
    NoCredentials,
    #[error("dataset download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("dataset registry returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("downloaded archive is unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("downloaded archive contains no CSV file")]
    NoCsvInArchive,
    #[error("failed to write dataset file: {0}")]
    Io(#[from] std::io::Error),
}
