//! # rxcheck core
//!
//! Business logic for the prescription analysis service:
//! - Prompt construction and the model provider client
//! - Lenient validation of model output into a [`PrescriptionAnalysis`]
//! - The medicine reference dataset, its one-shot acquisition and name search
//!
//! **No API concerns**: HTTP routing and request parsing belong in `api-rest` and `api-shared`.

pub mod acquisition;
pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod medicines;
pub mod prompt;
pub mod provider;
pub mod service;

pub use acquisition::KaggleDownloader;
pub use config::{ConfigError, ConfigResult, DatasetConfig, KaggleCredentials, ProviderConfig};
pub use error::{AcquisitionError, AnalysisError, AnalysisResult, DatasetError, ProviderError};
pub use medicines::MedicineIndex;
pub use provider::{GeminiClient, LanguageModel};
pub use service::{AnalysisOutcome, AnalysisService};

pub use rxcheck_types::{
    AnalysisFailure, MedicineHit, MedicineRecord, PrescriptionAnalysis, PrescriptionText,
    TextError,
};
