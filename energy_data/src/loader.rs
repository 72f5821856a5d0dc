//! Loading energy datasets from CSV

use crate::series::ConsumptionSeries;
use crate::{parse_datetime, DataError, Reading, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Loaded per-appliance, per-hour energy readings
#[derive(Debug, Clone, Default)]
pub struct EnergyDataset {
    readings: Vec<Reading>,
}

/// Data loader for energy datasets
#[derive(Debug)]
pub struct DataLoader;

/// Column names found in a dataset file
#[derive(Debug, Clone, PartialEq)]
struct DatasetColumns {
    datetime: String,
    floor: String,
    appliance: String,
    energy: String,
}

impl DataLoader {
    /// Load a dataset from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<EnergyDataset> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let dataset = Self::from_dataframe(&df)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            floors = dataset.floors().len(),
            "loaded energy dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<EnergyDataset> {
        let columns = Self::detect_columns(df)?;
        debug!(?columns, "detected dataset columns");

        let datetimes = Self::string_column(df, &columns.datetime)?;
        let floors = Self::string_column(df, &columns.floor)?;
        let appliances = Self::string_column(df, &columns.appliance)?;
        let energy = Self::f64_column(df, &columns.energy)?;

        let mut readings = Vec::with_capacity(df.height());
        for (row, (((datetime, floor), appliance), value)) in datetimes
            .into_iter()
            .zip(floors)
            .zip(appliances)
            .zip(energy)
            .enumerate()
        {
            let datetime = datetime
                .ok_or_else(|| DataError::InvalidData(format!("Row {} has no timestamp", row)))?;
            let floor =
                floor.ok_or_else(|| DataError::InvalidData(format!("Row {} has no floor", row)))?;

            readings.push(Reading {
                datetime: parse_datetime(&datetime)?,
                floor,
                appliance: appliance.unwrap_or_default(),
                energy_consumption: value.unwrap_or(0.0),
            });
        }

        Ok(EnergyDataset::new(readings))
    }

    /// Detect the datetime, floor, appliance and consumption columns.
    ///
    /// Accepts both `floor`/`appliance` and `floor_no`/`appliance_name` layouts.
    fn detect_columns(df: &DataFrame) -> Result<DatasetColumns> {
        let names = df.get_column_names();
        let find = |what: &str, candidates: &[&str]| -> Result<String> {
            names
                .iter()
                .find(|name| {
                    let lower = name.trim().to_lowercase();
                    candidates.iter().any(|c| lower.contains(c))
                })
                .map(|name| name.to_string())
                .ok_or_else(|| DataError::MissingColumn(what.to_string()))
        };

        Ok(DatasetColumns {
            datetime: find("datetime", &["datetime", "timestamp", "date", "time"])?,
            floor: find("floor", &["floor"])?,
            appliance: find("appliance", &["appliance"])?,
            energy: find("energy_consumption", &["consumption", "energy"])?,
        })
    }

    fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
        let col = df.column(name)?.cast(&DataType::Utf8)?;
        let values = col
            .utf8()?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect();
        Ok(values)
    }

    fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
        let col = df.column(name)?.cast(&DataType::Float64)?;
        let values = col.f64()?.into_iter().collect();
        Ok(values)
    }
}

impl EnergyDataset {
    /// Wrap readings, ordered by timestamp
    pub fn new(mut readings: Vec<Reading>) -> Self {
        readings.sort_by(|a, b| a.datetime.cmp(&b.datetime));
        Self { readings }
    }

    /// All readings in timestamp order
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Check if the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Distinct floors, sorted
    pub fn floors(&self) -> Vec<String> {
        self.readings
            .iter()
            .map(|r| r.floor.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Readings for one floor
    pub fn readings_for_floor<'a>(&'a self, floor: &'a str) -> impl Iterator<Item = &'a Reading> {
        self.readings.iter().filter(move |r| r.floor == floor)
    }

    /// Hourly, gap-filled consumption series for one floor
    pub fn floor_series(&self, floor: &str) -> Result<ConsumptionSeries> {
        let points: Vec<_> = self
            .readings_for_floor(floor)
            .map(|r| (r.datetime, r.energy_consumption))
            .collect();

        if points.is_empty() {
            return Err(DataError::InvalidData(format!(
                "No readings for floor '{}'",
                floor
            )));
        }

        ConsumptionSeries::from_readings(floor, points)
    }

    /// Series for every floor in the dataset
    pub fn all_floor_series(&self) -> Result<BTreeMap<String, ConsumptionSeries>> {
        self.floors()
            .into_iter()
            .map(|floor| {
                let series = self.floor_series(&floor)?;
                Ok((floor, series))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_columns_alternate_names() {
        let df = df!(
            "datetime" => &["2023-01-01 00:00:00"],
            "day" => &["Sunday"],
            "energy_consumption" => &[1.5],
            "floor_no" => &["A"],
            "appliance_name" => &["Fan"]
        )
        .unwrap();

        let columns = DataLoader::detect_columns(&df).unwrap();
        assert_eq!(columns.datetime, "datetime");
        assert_eq!(columns.floor, "floor_no");
        assert_eq!(columns.appliance, "appliance_name");
        assert_eq!(columns.energy, "energy_consumption");
    }

    #[test]
    fn test_missing_floor_column() {
        let df = df!(
            "datetime" => &["2023-01-01 00:00:00"],
            "energy_consumption" => &[1.5],
            "appliance" => &["Fan"]
        )
        .unwrap();

        assert!(matches!(
            DataLoader::detect_columns(&df),
            Err(DataError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_from_dataframe_numeric_floor() {
        let df = df!(
            "datetime" => &["2023-01-01T01:00:00", "2023-01-01T00:00:00"],
            "floor" => &[1i64, 1],
            "appliance" => &["Fan", "Fan"],
            "energy_consumption" => &[2i64, 3]
        )
        .unwrap();

        let dataset = DataLoader::from_dataframe(&df).unwrap();
        assert_eq!(dataset.floors(), vec!["1".to_string()]);

        let series = dataset.floor_series("1").unwrap();
        assert_eq!(series.values(), &[3.0, 2.0]);
    }
}
