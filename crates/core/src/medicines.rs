//! Medicine reference dataset and name search.
//!
//! The dataset is a CSV file loaded once at startup into an immutable [`MedicineIndex`]. Column
//! headers are normalised (lowercased, trimmed) and the name column is picked from a short list
//! of candidates, since the column set varies with the acquisition source.
//!
//! An index without a usable name column (or without a file at all) is *uninitialised*: every
//! search returns no results. This is never an error for the running service.

use crate::acquisition::KaggleDownloader;
use crate::constants::{
    CATEGORY_COLUMN_CANDIDATES, COMPOSITION_COLUMN_CANDIDATES, MANUFACTURER_COLUMN_CANDIDATES,
    MAX_SEARCH_RESULTS, MIN_SEARCH_QUERY_CHARS, NAME_COLUMN_CANDIDATES,
    STRENGTH_COLUMN_CANDIDATES,
};
use crate::error::DatasetError;
use rxcheck_types::MedicineHit;
use std::io::Read;
use std::path::Path;

/// One row of the reference table.
#[derive(Debug, Clone)]
struct DatasetRow {
    name: String,
    name_lower: String,
    manufacturer: Option<String>,
    category: Option<String>,
    strength: Option<String>,
    composition: Option<String>,
}

/// Positions of the optional columns the loaded dataset carries.
#[derive(Debug, Clone, Copy, Default)]
struct OptionalColumns {
    manufacturer: Option<usize>,
    category: Option<usize>,
    strength: Option<usize>,
    composition: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MedicineIndex {
    rows: Option<Vec<DatasetRow>>,
}

impl MedicineIndex {
    /// An index that answers every search with no results.
    pub fn uninitialised() -> Self {
        Self { rows: None }
    }

    pub fn is_initialised(&self) -> bool {
        self.rows.is_some()
    }

    /// Number of rows available to search.
    pub fn len(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the dataset from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NotFound` if `path` does not exist and `DatasetError::Csv` if the
    /// file cannot be read or parsed. A file without a recognised name column is *not* an error;
    /// it produces an uninitialised index.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        if !path.is_file() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::from_reader(file)
    }

    /// Load the dataset from any CSV source.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::Csv` if the headers or a record cannot be read.
    pub fn from_reader(reader: impl Read) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let Some(name_idx) = find_column(&headers, NAME_COLUMN_CANDIDATES) else {
            tracing::warn!(
                "Could not find a name column in the medicine dataset (looked for {:?})",
                NAME_COLUMN_CANDIDATES
            );
            return Ok(Self::uninitialised());
        };

        let columns = OptionalColumns {
            manufacturer: find_column(&headers, MANUFACTURER_COLUMN_CANDIDATES),
            category: find_column(&headers, CATEGORY_COLUMN_CANDIDATES),
            strength: find_column(&headers, STRENGTH_COLUMN_CANDIDATES),
            composition: find_column(&headers, COMPOSITION_COLUMN_CANDIDATES),
        };

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for record in csv_reader.records() {
            let record = record?;

            let Some(name) = cell(&record, name_idx) else {
                dropped += 1;
                continue;
            };

            rows.push(DatasetRow {
                name_lower: name.to_lowercase(),
                name,
                manufacturer: present_cell(&record, columns.manufacturer),
                category: present_cell(&record, columns.category),
                strength: present_cell(&record, columns.strength),
                composition: present_cell(&record, columns.composition),
            });
        }

        if dropped > 0 {
            tracing::debug!("dropped {} dataset row(s) without a name", dropped);
        }
        tracing::info!("Loaded {} medicines.", rows.len());

        Ok(Self { rows: Some(rows) })
    }

    /// Case-insensitive substring search on the name column.
    ///
    /// Queries shorter than two characters return nothing without touching the table. At most 20
    /// rows are returned, in file order.
    pub fn search(&self, query: &str) -> Vec<MedicineHit> {
        if query.chars().count() < MIN_SEARCH_QUERY_CHARS {
            return Vec::new();
        }
        let Some(rows) = &self.rows else {
            return Vec::new();
        };

        let needle = query.to_lowercase();
        rows.iter()
            .filter(|row| row.name_lower.contains(&needle))
            .take(MAX_SEARCH_RESULTS)
            .map(|row| MedicineHit {
                name: row.name.clone(),
                manufacturer: row.manufacturer.clone(),
                category: row.category.clone(),
                strength: row.strength.clone(),
                composition: row.composition.clone(),
            })
            .collect()
    }
}

/// Load the dataset at `path`, acquiring it once if it is absent.
///
/// Never fails: on any problem the error is logged and an uninitialised index is returned, so
/// the service still starts and search degrades to empty results.
pub async fn bootstrap(path: &Path, downloader: Option<&KaggleDownloader>) -> MedicineIndex {
    if !path.exists() {
        match downloader {
            Some(downloader) => {
                tracing::info!(
                    "{} not found. Attempting to download the medicine dataset...",
                    path.display()
                );
                if let Err(e) = downloader.download_to(path).await {
                    tracing::error!("Failed to auto-download dataset: {}", e);
                    tracing::warn!("Real-time search will be disabled.");
                    return MedicineIndex::uninitialised();
                }
            }
            None => {
                tracing::warn!(
                    "{} not found and dataset acquisition is not configured. Real-time search will be disabled.",
                    path.display()
                );
                return MedicineIndex::uninitialised();
            }
        }
    }

    match MedicineIndex::load(path) {
        Ok(index) => index,
        Err(e) => {
            tracing::error!("Error loading medicine dataset: {}", e);
            MedicineIndex::uninitialised()
        }
    }
}

/// Value of an optional column: `None` when the dataset lacks the column, empty text when the
/// cell is missing.
fn present_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.map(|i| cell(record, i).unwrap_or_default())
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|candidate| headers.iter().position(|h| h == candidate))
}

/// A trimmed cell value, treating empty and `nan` cells as missing.
fn cell(record: &csv::StringRecord, idx: usize) -> Option<String> {
    let value = record.get(idx)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KaggleCredentials;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
 Name ,Manufacturer,Category,Strength
Paracetamol 500mg,Acme Pharma,Analgesic,500mg
Ibuprofen,Beta Labs,NSAID,
,Nameless Co,Unknown,10mg
PARACETAMOL Syrup,nan,Analgesic,120mg/5ml
";

    fn sample_index() -> MedicineIndex {
        MedicineIndex::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let hits = sample_index().search("para");

        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Paracetamol 500mg", "PARACETAMOL Syrup"]);
    }

    #[test]
    fn test_search_para_excludes_ibuprofen() {
        let index =
            MedicineIndex::from_reader("name\nParacetamol 500mg\nIbuprofen\n".as_bytes()).unwrap();

        let hits = index.search("para");

        assert_eq!(
            hits,
            vec![MedicineHit {
                name: "Paracetamol 500mg".into(),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn test_short_queries_return_nothing() {
        let index = sample_index();
        assert!(index.search("").is_empty());
        assert!(index.search("p").is_empty());
        assert_eq!(index.search("ib").len(), 1);
    }

    #[test]
    fn test_rows_without_name_are_dropped() {
        let index = sample_index();
        assert_eq!(index.len(), 3);
        assert!(index.search("Nameless").is_empty());
    }

    #[test]
    fn test_present_columns_render_missing_cells_as_empty() {
        let hits = sample_index().search("ibuprofen");
        assert_eq!(hits[0].strength.as_deref(), Some(""));
        assert_eq!(hits[0].manufacturer.as_deref(), Some("Beta Labs"));
        assert_eq!(hits[0].composition, None);

        let syrup = &sample_index().search("syrup")[0];
        assert_eq!(syrup.manufacturer.as_deref(), Some(""));
    }

    #[test]
    fn test_name_column_candidates_in_order() {
        let csv = "brand_name,drug_name,short_composition1\nPanadol,Paracetamol,Paracetamol (500mg)\n";
        let index = MedicineIndex::from_reader(csv.as_bytes()).unwrap();

        let hits = index.search("para");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Paracetamol");
        assert_eq!(hits[0].composition.as_deref(), Some("Paracetamol (500mg)"));
    }

    #[test]
    fn test_missing_name_column_leaves_index_uninitialised() {
        let index = MedicineIndex::from_reader("id,title\n1,Paracetamol\n".as_bytes()).unwrap();
        assert!(!index.is_initialised());
        assert!(index.search("para").is_empty());
    }

    #[test]
    fn test_results_are_capped() {
        let mut csv = String::from("name\n");
        for i in 0..50 {
            csv.push_str(&format!("Cetirizine {i}\n"));
        }
        let index = MedicineIndex::from_reader(csv.as_bytes()).unwrap();

        let hits = index.search("cetirizine");
        assert_eq!(hits.len(), MAX_SEARCH_RESULTS);
        assert_eq!(hits[0].name, "Cetirizine 0");
    }

    #[test]
    fn test_query_is_literal_not_a_pattern() {
        let index = MedicineIndex::from_reader("name\nVitamin B12\nVitamin C\n".as_bytes()).unwrap();
        assert!(index.search("B.2").is_empty());
        assert!(index.search("Vitamin (").is_empty());
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = MedicineIndex::load(&temp_dir.path().join("medicines.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_loads_existing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("medicines.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let index = bootstrap(&path, None).await;
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_bootstrap_without_file_or_downloader_degrades() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let index = bootstrap(&temp_dir.path().join("medicines.csv"), None).await;

        assert!(!index.is_initialised());
        assert!(index.search("para").is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_with_failing_download_degrades() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("medicines.csv");
        let downloader = KaggleDownloader::new(
            "http://127.0.0.1:1",
            "owner/dataset",
            KaggleCredentials {
                username: "u".into(),
                key: "k".into(),
            },
        )
        .unwrap();

        let index = bootstrap(&path, Some(&downloader)).await;

        assert!(!index.is_initialised());
        assert!(index.search("para").is_empty());
        assert!(!path.exists());
    }
}
