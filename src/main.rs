use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use rxcheck_core::{
    AnalysisService, DatasetConfig, GeminiClient, KaggleDownloader, ProviderConfig, medicines,
};

/// Main entry point for the rxcheck prescription analysis service
///
/// Resolves configuration, loads (or acquires) the medicine dataset and serves the REST API.
///
/// # Environment Variables
/// - `RXCHECK_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `GEMINI_API_KEY` (or legacy `Gemini_AI_API_KEY`): model provider key, required
/// - `GEMINI_MODEL`, `GEMINI_BASE_URL`, `GEMINI_TIMEOUT_SECS`: provider overrides
/// - `MEDICINE_DATASET_PATH`, `MEDICINE_DATASET_SLUG`: dataset location and Kaggle source
/// - `KAGGLE_USERNAME`/`KAGGLE_KEY`: Kaggle credentials, else `~/.kaggle/kaggle.json`
///
/// # Errors
/// Returns an error if:
/// - the API key is missing or a setting is malformed,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rxcheck=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("RXCHECK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    let provider_cfg = ProviderConfig::from_env()?;
    let dataset_cfg = DatasetConfig::from_env()?;
    tracing::info!("Using model {}", provider_cfg.model());

    let downloader = match KaggleDownloader::from_config(&dataset_cfg) {
        Ok(downloader) => Some(downloader),
        Err(e) => {
            tracing::warn!("Dataset acquisition unavailable: {}", e);
            None
        }
    };
    let index = medicines::bootstrap(dataset_cfg.path(), downloader.as_ref()).await;

    let client = GeminiClient::new(&provider_cfg)?;
    let state = AppState::new(AnalysisService::new(Arc::new(client)), index);

    tracing::info!("++ Starting rxcheck REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("-- Shutting down rxcheck REST");
}
