//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup from raw environment values and then passed
//! into the services. Nothing in this crate reads process-wide environment variables while
//! handling a request.

use crate::constants::{
    DEFAULT_DATASET_PATH, DEFAULT_DATASET_SLUG, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
    DEFAULT_KAGGLE_BASE_URL, DEFAULT_PROVIDER_TIMEOUT,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not found in environment")]
    MissingApiKey,
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
    #[error("failed to read Kaggle credentials file {path}: {source}", path = path.display())]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse Kaggle credentials file {path}: {source}", path = path.display())]
    CredentialsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings for the external model provider.
#[derive(Clone)]
pub struct ProviderConfig {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl ProviderConfig {
    /// Create a new `ProviderConfig`.
    ///
    /// The API key is mandatory; a missing or blank key is fatal at startup.
    pub fn new(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> ConfigResult<Self> {
        let api_key = non_blank(api_key).ok_or(ConfigError::MissingApiKey)?;
        let model = non_blank(model).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into());
        let base_url = non_blank(base_url)
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            model,
            base_url,
            timeout,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ProviderConfig {
    /// Resolve provider settings from the process environment. Called once at startup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingApiKey` if neither `GEMINI_API_KEY` nor `Gemini_AI_API_KEY`
    /// is set, and `ConfigError::InvalidValue` for a malformed `GEMINI_TIMEOUT_SECS`.
    pub fn from_env() -> ConfigResult<Self> {
        let api_key = api_key_from_env_values(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("Gemini_AI_API_KEY").ok(),
        )?;
        let timeout = timeout_from_env_value(std::env::var("GEMINI_TIMEOUT_SECS").ok())?;

        Self::new(
            Some(api_key),
            std::env::var("GEMINI_MODEL").ok(),
            std::env::var("GEMINI_BASE_URL").ok(),
            timeout,
        )
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Resolve the model API key from the current and the legacy variable names.
///
/// `primary` (`GEMINI_API_KEY`) wins over `legacy` (`Gemini_AI_API_KEY`).
pub fn api_key_from_env_values(
    primary: Option<String>,
    legacy: Option<String>,
) -> ConfigResult<String> {
    non_blank(primary)
        .or_else(|| non_blank(legacy))
        .ok_or(ConfigError::MissingApiKey)
}

/// Parse the provider timeout (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn timeout_from_env_value(value: Option<String>) -> ConfigResult<Duration> {
    let Some(value) = non_blank(value) else {
        return Ok(DEFAULT_PROVIDER_TIMEOUT);
    };

    let secs: u64 = value.parse().map_err(|e| ConfigError::InvalidValue {
        name: "GEMINI_TIMEOUT_SECS",
        reason: format!("{e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            name: "GEMINI_TIMEOUT_SECS",
            reason: "timeout must be at least one second".into(),
        });
    }

    Ok(Duration::from_secs(secs))
}

/// Kaggle API credentials used for dataset acquisition.
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl std::fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl KaggleCredentials {
    /// Resolve credentials from `KAGGLE_USERNAME`/`KAGGLE_KEY` values, falling back to a
    /// `kaggle.json` file.
    ///
    /// Returns `Ok(None)` when neither source provides credentials, or when the file cannot be
    /// read or parsed (logged); dataset acquisition is then simply disabled.
    pub fn resolve(
        username: Option<String>,
        key: Option<String>,
        credentials_file: Option<&Path>,
    ) -> ConfigResult<Option<Self>> {
        if let (Some(username), Some(key)) = (non_blank(username), non_blank(key)) {
            return Ok(Some(Self { username, key }));
        }

        let Some(path) = credentials_file else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }

        match Self::read_file(path) {
            Ok(creds) => Ok(Some(creds)),
            Err(e) => {
                tracing::warn!("{}; dataset acquisition disabled", e);
                Ok(None)
            }
        }
    }

    fn read_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::CredentialsFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::CredentialsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Default location of the Kaggle credentials file (`~/.kaggle/kaggle.json`).
pub fn default_kaggle_credentials_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kaggle").join("kaggle.json"))
}

/// Settings for the medicine reference dataset.
#[derive(Clone, Debug)]
pub struct DatasetConfig {
    path: PathBuf,
    slug: String,
    kaggle_base_url: String,
    credentials: Option<KaggleCredentials>,
}

impl DatasetConfig {
    pub fn new(
        path: Option<String>,
        slug: Option<String>,
        credentials: Option<KaggleCredentials>,
    ) -> ConfigResult<Self> {
        let slug = non_blank(slug).unwrap_or_else(|| DEFAULT_DATASET_SLUG.into());
        validate_slug(&slug)?;

        Ok(Self {
            path: PathBuf::from(non_blank(path).unwrap_or_else(|| DEFAULT_DATASET_PATH.into())),
            slug,
            kaggle_base_url: DEFAULT_KAGGLE_BASE_URL.into(),
            credentials,
        })
    }

    /// Point acquisition at a different Kaggle-compatible host.
    pub fn with_kaggle_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.kaggle_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn kaggle_base_url(&self) -> &str {
        &self.kaggle_base_url
    }

    pub fn credentials(&self) -> Option<&KaggleCredentials> {
        self.credentials.as_ref()
    }

    /// Resolve dataset settings from the process environment. Called once at startup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a malformed slug or an unreadable Kaggle credentials file.
    pub fn from_env() -> ConfigResult<Self> {
        let credentials = KaggleCredentials::resolve(
            std::env::var("KAGGLE_USERNAME").ok(),
            std::env::var("KAGGLE_KEY").ok(),
            default_kaggle_credentials_file().as_deref(),
        )?;

        Self::new(
            std::env::var("MEDICINE_DATASET_PATH").ok(),
            std::env::var("MEDICINE_DATASET_SLUG").ok(),
            credentials,
        )
    }
}

/// A dataset slug must look like `owner/dataset`.
fn validate_slug(slug: &str) -> ConfigResult<()> {
    let ok = slug.split('/').count() == 2
        && slug.split('/').all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'))
        });

    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            name: "MEDICINE_DATASET_SLUG",
            reason: format!("expected owner/dataset, got {slug:?}"),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
