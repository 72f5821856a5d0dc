//! Appliance metadata: which appliances sit on which floor and how much they draw

use crate::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Rated consumption of one appliance line on one floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceSpec {
    /// Floor the appliance belongs to
    pub floor: String,
    /// Appliance name
    pub appliance: String,
    /// Number of identical units, if listed
    pub quantity: Option<f64>,
    /// Power rating of one unit, if listed
    pub power_rating: Option<f64>,
    /// Daily active hours; `None` when unknown
    pub time_duration: Option<f64>,
    /// Rated daily consumption
    pub consumption: f64,
}

impl ApplianceSpec {
    /// Draw of all units while switched on.
    ///
    /// Falls back to the rated consumption when quantity or power rating is missing.
    pub fn running_load(&self) -> f64 {
        match (self.quantity, self.power_rating) {
            (Some(quantity), Some(rating)) => quantity * rating,
            _ => self.consumption,
        }
    }
}

/// Raw CSV row; headers follow the spreadsheet export
#[derive(Debug, Deserialize)]
struct ApplianceRecord {
    #[serde(rename = "Floor")]
    floor: String,
    #[serde(rename = "Appliance", default)]
    appliance: String,
    #[serde(rename = "Quantity", default)]
    quantity: Option<String>,
    #[serde(rename = "Power Rating", default)]
    power_rating: Option<String>,
    #[serde(rename = "Time Duration", default)]
    time_duration: Option<String>,
    #[serde(rename = "Consumption", default)]
    consumption: Option<String>,
}

/// Read appliance metadata from a CSV file
pub fn read_appliance_data<P: AsRef<Path>>(path: P) -> Result<Vec<ApplianceSpec>> {
    let file = std::fs::File::open(path)?;
    read_appliance_records(file)
}

/// Read appliance metadata from any CSV source.
///
/// Header and cell whitespace is trimmed, unnamed spreadsheet columns are
/// ignored and rows without an appliance name are skipped.
pub fn read_appliance_records<R: Read>(source: R) -> Result<Vec<ApplianceSpec>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);

    let mut specs = Vec::new();
    for (line, record) in reader.deserialize::<ApplianceRecord>().enumerate() {
        let record = record?;
        if record.appliance.is_empty() {
            debug!(line, "skipping row without appliance name");
            continue;
        }

        let consumption = parse_optional(record.consumption.as_deref(), "Consumption")?
            .ok_or_else(|| {
                DataError::InvalidData(format!(
                    "Appliance '{}' on floor '{}' has no consumption",
                    record.appliance, record.floor
                ))
            })?;

        specs.push(ApplianceSpec {
            floor: record.floor,
            appliance: record.appliance,
            quantity: parse_optional(record.quantity.as_deref(), "Quantity")?,
            power_rating: parse_optional(record.power_rating.as_deref(), "Power Rating")?,
            time_duration: parse_optional(record.time_duration.as_deref(), "Time Duration")?,
            consumption,
        });
    }

    if specs.is_empty() {
        return Err(DataError::InvalidData(
            "No appliances found in metadata".to_string(),
        ));
    }

    Ok(specs)
}

/// Blank cells and `?` both mean "unknown"
fn parse_optional(raw: Option<&str>, column: &str) -> Result<Option<f64>> {
    match raw.map(str::trim) {
        None | Some("") | Some("?") => Ok(None),
        Some(value) => value.parse::<f64>().map(Some).map_err(|e| {
            DataError::ParseError(format!("Column '{}' value '{}': {}", column, value, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_records_with_unknown_duration() {
        let csv = "Floor , Appliance,Quantity,Power Rating,Time Duration,Consumption,Unnamed: 6\n\
                   1,Fan,4,0.075,8,2.4,\n\
                   1,Projector,1,0.3,?,0.3,\n\
                   2,,,,,,\n\
                   2,Light,10,0.04,,4.0,\n";

        let specs = read_appliance_records(csv.as_bytes()).unwrap();

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].floor, "1");
        assert_eq!(specs[0].time_duration, Some(8.0));
        assert_eq!(specs[1].time_duration, None);
        assert_eq!(specs[2].appliance, "Light");
        assert_eq!(specs[2].time_duration, None);
    }

    #[test]
    fn test_running_load_fallback() {
        let mut spec = ApplianceSpec {
            floor: "1".to_string(),
            appliance: "Fan".to_string(),
            quantity: Some(4.0),
            power_rating: Some(0.5),
            time_duration: Some(8.0),
            consumption: 16.0,
        };
        assert_eq!(spec.running_load(), 2.0);

        spec.power_rating = None;
        assert_eq!(spec.running_load(), 16.0);
    }

    #[test]
    fn test_bad_number_is_parse_error() {
        let csv = "Floor,Appliance,Quantity,Power Rating,Time Duration,Consumption\n\
                   1,Fan,four,0.075,8,2.4\n";

        assert!(matches!(
            read_appliance_records(csv.as_bytes()),
            Err(DataError::ParseError(_))
        ));
    }

    #[test]
    fn test_empty_metadata_is_rejected() {
        let csv = "Floor,Appliance,Quantity,Power Rating,Time Duration,Consumption\n";
        assert!(read_appliance_records(csv.as_bytes()).is_err());
    }
}
