//! Constants used throughout the rxcheck core crate.
//!
//! Provider defaults, dataset locations and search limits live here so configuration and tests
//! agree on a single value.

use std::time::Duration;

/// Default Gemini model used for prescription analysis.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default base URL of the Generative Language API.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default per-request timeout for the model call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause before the single retry of a transient provider failure.
pub const PROVIDER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Sampling parameters sent with every analysis request.
pub const GENERATION_TEMPERATURE: f32 = 0.2;
pub const GENERATION_TOP_P: f32 = 0.95;
pub const GENERATION_TOP_K: u32 = 64;
pub const GENERATION_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Actionable message returned when the provider reports the API key as leaked.
pub const KEY_COMPROMISED_MESSAGE: &str =
    "403 Your API key was reported as leaked. Please use another API key.";

/// Default location of the medicine reference dataset.
pub const DEFAULT_DATASET_PATH: &str = "medicines.csv";

/// Default Kaggle dataset used to acquire the medicine reference table.
pub const DEFAULT_DATASET_SLUG: &str = "shwetbajpai/medicine-dataset";

/// Default Kaggle API base URL.
pub const DEFAULT_KAGGLE_BASE_URL: &str = "https://www.kaggle.com";

/// Candidate name columns, checked in order after header normalisation.
pub const NAME_COLUMN_CANDIDATES: &[&str] = &["name", "drug_name", "medicine_name", "brand_name"];

pub const MANUFACTURER_COLUMN_CANDIDATES: &[&str] = &["manufacturer", "manufacturer_name"];
pub const CATEGORY_COLUMN_CANDIDATES: &[&str] = &["category", "therapeutic class"];
pub const STRENGTH_COLUMN_CANDIDATES: &[&str] = &["strength"];
pub const COMPOSITION_COLUMN_CANDIDATES: &[&str] = &["composition", "short_composition1"];

/// Queries shorter than this (in characters) return no results.
pub const MIN_SEARCH_QUERY_CHARS: usize = 2;

/// Maximum number of search results returned.
pub const MAX_SEARCH_RESULTS: usize = 20;
