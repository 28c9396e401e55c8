use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::features::unit_converter::{format_number, Category};

/// Column header of the persisted history file, in order.
pub const HISTORY_HEADER: [&str; 5] = ["Category", "Value", "From", "To", "Result"];

/// One successful conversion. Field renames match [`HISTORY_HEADER`].
///
/// The category is kept as its label text, so rows written under a category this
/// build does not know still load and survive later appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "From")]
    pub from_unit: String,
    #[serde(rename = "To")]
    pub to_unit: String,
    #[serde(rename = "Result")]
    pub result: f64,
}

impl ConversionRecord {
    pub fn new(
        category: impl Into<String>,
        value: f64,
        from_unit: impl Into<String>,
        to_unit: impl Into<String>,
        result: f64,
    ) -> Self {
        Self {
            category: category.into(),
            value,
            from_unit: from_unit.into(),
            to_unit: to_unit.into(),
            result,
        }
    }
}

/// `5.0 Meter ➡ 0.005 Kilometer`, raw values as stored.
impl fmt::Display for ConversionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} ➡ {:?} {}", self.value, self.from_unit, self.result, self.to_unit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertUnitsRequest {
    pub category: String,
    pub amount: f64,
    pub from_unit: String,
    pub to_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertUnitsResponse {
    pub category: String,
    pub amount: f64,
    pub result: f64,
    pub formatted_result: String,
    pub from_unit: String,
    pub to_unit: String,
}

impl From<&ConversionRecord> for ConvertUnitsResponse {
    fn from(record: &ConversionRecord) -> Self {
        Self {
            category: record.category.clone(),
            amount: record.value,
            result: record.result,
            formatted_result: format_number(record.result),
            from_unit: record.from_unit.clone(),
            to_unit: record.to_unit.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseQueryResponse {
    pub category: Category,
    pub amount: f64,
    pub from_unit: String,
    pub to_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUnitsResponse {
    pub units: Vec<UnitDTO>,
}

// Unit Data Transfer Object for the boundary layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDTO {
    pub id: String,       // Unit label (e.g., "Meter", "km/h")
    pub category: String, // Category label (e.g., "Length", "Data Storage")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentConversionsResponse {
    pub total: usize,
    pub items: Vec<ConversionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportHistoryResponse {
    pub path: String,
    pub records: usize,
}
