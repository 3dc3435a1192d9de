use anyhow::Context;
use clap::{Parser, Subcommand};
use rxcheck_core::{
    analysis::prepare_report, AnalysisOutcome, AnalysisService, DatasetConfig, GeminiClient,
    KaggleDownloader, MedicineIndex, PrescriptionText, ProviderConfig,
};
use rxcheck_report::render_report;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rxcheck")]
#[command(about = "Prescription analysis operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the medicine dataset by name
    Search {
        /// Name fragment, at least two characters
        query: String,
        /// Dataset file (defaults to MEDICINE_DATASET_PATH or medicines.csv)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Analyse one prescription and print the JSON result
    Analyze {
        /// Prescription text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,
        /// Read the prescription text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Render an analysis JSON file as a PDF report
    RenderPdf {
        /// Analysis or error envelope JSON
        analysis: PathBuf,
        /// Output PDF path
        out: PathBuf,
    },
    /// Download the medicine dataset from Kaggle
    DownloadDataset {
        /// Destination file (defaults to MEDICINE_DATASET_PATH or medicines.csv)
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Kaggle dataset as owner/dataset
        #[arg(long)]
        slug: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rxcheck=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Search { query, dataset }) => {
            let path = match dataset {
                Some(path) => path,
                None => DatasetConfig::from_env()?.path().to_path_buf(),
            };
            let index = MedicineIndex::load(&path)?;
            let hits = index.search(&query);
            if hits.is_empty() {
                println!("No medicines found.");
            } else {
                for hit in hits {
                    println!(
                        "{} | {} | {} | {}",
                        hit.name,
                        hit.manufacturer.unwrap_or_default(),
                        hit.category.unwrap_or_default(),
                        hit.strength.unwrap_or_default()
                    );
                }
            }
        }
        Some(Commands::Analyze { text, file }) => {
            let raw = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("either TEXT or --file is required"),
            };
            let text = PrescriptionText::new(raw)?;

            let client = GeminiClient::new(&ProviderConfig::from_env()?)?;
            let service = AnalysisService::new(Arc::new(client));
            let json = match service.analyze_or_failure(&text).await {
                AnalysisOutcome::Completed(analysis) => serde_json::to_string_pretty(&analysis)?,
                AnalysisOutcome::Failed(failure) => serde_json::to_string_pretty(&failure)?,
            };
            println!("{json}");
        }
        Some(Commands::RenderPdf { analysis, out }) => {
            let contents = std::fs::read_to_string(&analysis)
                .with_context(|| format!("failed to read {}", analysis.display()))?;
            let value: serde_json::Value = serde_json::from_str(&contents)?;
            let input = prepare_report(&value)?;
            let bytes = render_report(&input.analysis, input.notice.as_deref())?;
            std::fs::write(&out, bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote report to {}", out.display());
        }
        Some(Commands::DownloadDataset { dest, slug }) => {
            let cfg = DatasetConfig::from_env()?;
            let dest = dest.unwrap_or_else(|| cfg.path().to_path_buf());
            let downloader = match slug {
                Some(slug) => {
                    let cfg = DatasetConfig::new(
                        Some(dest.display().to_string()),
                        Some(slug),
                        cfg.credentials().cloned(),
                    )?;
                    KaggleDownloader::from_config(&cfg)?
                }
                None => KaggleDownloader::from_config(&cfg)?,
            };
            downloader.download_to(&dest).await?;
            println!("Dataset saved to {}", dest.display());
        }
        None => {
            println!("Use 'rxcheck --help' for commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["rxcheck", "search", "para", "--dataset", "meds.csv"]).unwrap();
        match cli.command {
            Some(Commands::Search { query, dataset }) => {
                assert_eq!(query, "para");
                assert_eq!(dataset, Some(PathBuf::from("meds.csv")));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_analyze_needs_text_or_file() {
        assert!(Cli::try_parse_from(["rxcheck", "analyze"]).is_err());
        assert!(Cli::try_parse_from(["rxcheck", "analyze", "--file", "rx.txt"]).is_ok());
        assert!(Cli::try_parse_from(["rxcheck", "analyze", "Tab PCM 500mg", "--file", "rx.txt"]).is_err());
    }

    #[test]
    fn test_parse_render_pdf() {
        let cli = Cli::try_parse_from(["rxcheck", "render-pdf", "analysis.json", "out.pdf"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::RenderPdf { .. })));
    }

    #[test]
    fn test_parse_download_dataset() {
        let cli = Cli::try_parse_from([
            "rxcheck",
            "download-dataset",
            "--slug",
            "owner/dataset",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::DownloadDataset { dest, slug }) => {
                assert_eq!(dest, None);
                assert_eq!(slug.as_deref(), Some("owner/dataset"));
            }
            _ => panic!("expected download-dataset"),
        }
    }
}
