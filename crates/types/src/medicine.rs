use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One search result from the medicine reference dataset.
///
/// An optional field is present exactly when the loaded dataset carries that column. A present
/// field whose cell was missing is rendered as an empty string, never `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MedicineHit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
}
