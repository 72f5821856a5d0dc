//! # Energy Data
//!
//! Building energy data for floor-level forecasting.
//!
//! ## Features
//!
//! - Appliance metadata parsing (`appliances`)
//! - Synthetic per-appliance, per-hour datasets (`synth`)
//! - Dataset loading with column detection (`loader`)
//! - Gap-free hourly consumption series per floor (`series`)
//! - Aggregate views used for visualization (`aggregate`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use energy_data::appliances::read_appliance_data;
//! use energy_data::synth::{synthesize, SynthesisRule};
//!
//! let appliances = read_appliance_data("appliances.csv")?;
//! let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let end = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap().and_hms_opt(23, 0, 0).unwrap();
//!
//! let mut rng = rand::thread_rng();
//! let readings = synthesize(&appliances, start, end, &SynthesisRule::default(), &mut rng)?;
//! println!("{} rows", readings.len());
//! # Ok::<(), energy_data::DataError>(())
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod appliances;
pub mod loader;
pub mod series;
pub mod synth;

pub use crate::appliances::ApplianceSpec;
pub use crate::loader::{DataLoader, EnergyDataset};
pub use crate::series::ConsumptionSeries;
pub use crate::synth::SynthesisRule;

/// Errors that can occur while building or reading energy data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DataError::PolarsError(err.to_string())
    }
}

/// Result type for energy data operations
pub type Result<T> = std::result::Result<T, DataError>;

/// One row of the energy dataset: the consumption of one appliance during one hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Start of the hour
    pub datetime: NaiveDateTime,
    /// Floor identifier
    pub floor: String,
    /// Appliance name
    pub appliance: String,
    /// Energy drawn during the hour (kWh)
    pub energy_consumption: f64,
}

/// Timestamp formats accepted for dataset rows and request parameters
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp written either ISO-style or the way pandas writes it
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| DataError::ParseError(format!("Unrecognized timestamp '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 4)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap();

        assert_eq!(parse_datetime("2023-03-04T05:00:00").unwrap(), expected);
        assert_eq!(parse_datetime("2023-03-04 05:00:00").unwrap(), expected);
        assert_eq!(parse_datetime(" 2023-03-04 05:00 ").unwrap(), expected);
    }

    #[test]
    fn test_parse_bare_date_is_midnight() {
        let parsed = parse_datetime("2023-03-04").unwrap();
        assert_eq!(parsed.to_string(), "2023-03-04 00:00:00");
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert!(matches!(
            parse_datetime("yesterday"),
            Err(DataError::ParseError(_))
        ));
    }
}
