//! Aggregate views over an energy dataset

use crate::loader::EnergyDataset;
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

/// Total consumption of one appliance type across the building
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplianceTotal {
    pub appliance: String,
    pub total: f64,
}

/// The four aggregate views served for visualization
#[derive(Debug, Clone, Serialize)]
pub struct ConsumptionOverview {
    /// floor -> hour -> summed consumption
    pub floor_wise_consumption: BTreeMap<String, BTreeMap<NaiveDateTime, f64>>,
    /// appliance totals, largest first
    pub appliance_wise_consumption: Vec<ApplianceTotal>,
    /// floor -> appliance -> summed consumption
    pub floor_appliance_consumption: BTreeMap<String, BTreeMap<String, f64>>,
    /// hour of day (0-23) -> mean consumption per reading
    pub hourly_consumption: BTreeMap<u32, f64>,
}

impl ConsumptionOverview {
    /// Compute all four views
    pub fn from_dataset(dataset: &EnergyDataset) -> Self {
        Self {
            floor_wise_consumption: floor_wise_consumption(dataset),
            appliance_wise_consumption: appliance_wise_consumption(dataset),
            floor_appliance_consumption: floor_appliance_consumption(dataset),
            hourly_consumption: hourly_consumption(dataset),
        }
    }
}

/// Hourly sums per floor
pub fn floor_wise_consumption(
    dataset: &EnergyDataset,
) -> BTreeMap<String, BTreeMap<NaiveDateTime, f64>> {
    let mut by_floor: BTreeMap<String, BTreeMap<NaiveDateTime, f64>> = BTreeMap::new();
    for reading in dataset.readings() {
        *by_floor
            .entry(reading.floor.clone())
            .or_default()
            .entry(reading.datetime)
            .or_insert(0.0) += reading.energy_consumption;
    }
    by_floor
}

/// Daily sums per floor, used for the floor-wise chart
pub fn floor_wise_daily(dataset: &EnergyDataset) -> BTreeMap<String, Vec<(NaiveDateTime, f64)>> {
    let mut by_floor: BTreeMap<String, BTreeMap<NaiveDateTime, f64>> = BTreeMap::new();
    for reading in dataset.readings() {
        let day = reading
            .datetime
            .date()
            .and_hms_opt(0, 0, 0)
            .unwrap_or(reading.datetime);
        *by_floor
            .entry(reading.floor.clone())
            .or_default()
            .entry(day)
            .or_insert(0.0) += reading.energy_consumption;
    }
    by_floor
        .into_iter()
        .map(|(floor, days)| (floor, days.into_iter().collect()))
        .collect()
}

/// Total per appliance name, sorted descending
pub fn appliance_wise_consumption(dataset: &EnergyDataset) -> Vec<ApplianceTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for reading in dataset.readings() {
        *totals.entry(reading.appliance.as_str()).or_insert(0.0) += reading.energy_consumption;
    }

    let mut totals: Vec<ApplianceTotal> = totals
        .into_iter()
        .map(|(appliance, total)| ApplianceTotal {
            appliance: appliance.to_string(),
            total,
        })
        .collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

/// Floor by appliance pivot of summed consumption
pub fn floor_appliance_consumption(
    dataset: &EnergyDataset,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut pivot: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for reading in dataset.readings() {
        *pivot
            .entry(reading.floor.clone())
            .or_default()
            .entry(reading.appliance.clone())
            .or_insert(0.0) += reading.energy_consumption;
    }
    pivot
}

/// Mean consumption per reading for each hour of the day present in the data
pub fn hourly_consumption(dataset: &EnergyDataset) -> BTreeMap<u32, f64> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for reading in dataset.readings() {
        let entry = sums.entry(reading.datetime.hour()).or_insert((0.0, 0));
        entry.0 += reading.energy_consumption;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(hour, (sum, count))| (hour, sum / count as f64))
        .collect()
}
