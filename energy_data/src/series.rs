//! Gap-free hourly consumption series for one floor

use crate::synth::truncate_to_hour;
use crate::{DataError, Result};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Hourly consumption totals for one floor.
///
/// Stored as a start timestamp plus one value per hour, so the series is
/// contiguous by construction: value `i` belongs to `start + i hours`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionSeries {
    floor: String,
    start: NaiveDateTime,
    values: Vec<f64>,
}

impl ConsumptionSeries {
    /// Create a series from consecutive hourly values starting at `start`
    pub fn new(floor: impl Into<String>, start: NaiveDateTime, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(DataError::InvalidData(
                "Consumption series needs at least one hour".to_string(),
            ));
        }

        Ok(Self {
            floor: floor.into(),
            start: truncate_to_hour(start),
            values,
        })
    }

    /// Resample raw readings into hourly sums, filling missing hours with zero
    pub fn from_readings<I>(floor: impl Into<String>, readings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NaiveDateTime, f64)>,
    {
        let mut buckets: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for (ts, value) in readings {
            *buckets.entry(truncate_to_hour(ts)).or_insert(0.0) += value;
        }

        let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(DataError::InvalidData(
                    "No readings to build a consumption series".to_string(),
                ))
            }
        };

        let hours = (last - first).num_hours() as usize + 1;
        let values = (0..hours)
            .map(|i| {
                let ts = first + Duration::hours(i as i64);
                buckets.get(&ts).copied().unwrap_or(0.0)
            })
            .collect();

        Self::new(floor, first, values)
    }

    /// Floor this series belongs to
    pub fn floor(&self) -> &str {
        &self.floor
    }

    /// Number of hours in the series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no hours
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Hourly values in chronological order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// First hour of the series
    pub fn first_timestamp(&self) -> NaiveDateTime {
        self.start
    }

    /// Last hour with a known value
    pub fn last_timestamp(&self) -> NaiveDateTime {
        self.timestamp_at(self.values.len() - 1)
    }

    /// Timestamp of the value at `index`
    pub fn timestamp_at(&self, index: usize) -> NaiveDateTime {
        self.start + Duration::hours(index as i64)
    }

    /// All timestamps in order
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        (0..self.values.len()).map(|i| self.timestamp_at(i)).collect()
    }

    /// Value recorded for the hour containing `ts`, if inside the series
    pub fn value_at(&self, ts: NaiveDateTime) -> Option<f64> {
        self.index_of(truncate_to_hour(ts))
            .and_then(|i| self.values.get(i).copied())
    }

    /// `(timestamp, value)` pairs in order
    pub fn points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.timestamp_at(i), *v))
    }

    /// Points with `start <= timestamp <= end`
    pub fn slice(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<(NaiveDateTime, f64)> {
        if end < start {
            return Vec::new();
        }
        self.points()
            .skip_while(|(ts, _)| *ts < start)
            .take_while(|(ts, _)| *ts <= end)
            .collect()
    }

    /// The final `n` values, or `None` if the series is shorter
    pub fn tail(&self, n: usize) -> Option<&[f64]> {
        self.values.len().checked_sub(n).map(|from| &self.values[from..])
    }

    fn index_of(&self, ts: NaiveDateTime) -> Option<usize> {
        if ts < self.start {
            return None;
        }
        let index = (ts - self.start).num_hours() as usize;
        (index < self.values.len()).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_from_readings_sums_and_fills_gaps() {
        let readings = vec![
            (at(1, 0, 0), 1.0),
            (at(1, 0, 30), 2.0),
            (at(1, 3, 15), 4.0),
            (at(1, 1, 0), 0.5),
        ];

        let series = ConsumptionSeries::from_readings("1", readings).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.values(), &[3.0, 0.5, 0.0, 4.0]);
        assert_eq!(series.first_timestamp(), at(1, 0, 0));
        assert_eq!(series.last_timestamp(), at(1, 3, 0));
    }

    #[test]
    fn test_from_readings_requires_data() {
        let empty: Vec<(NaiveDateTime, f64)> = Vec::new();
        assert!(ConsumptionSeries::from_readings("1", empty).is_err());
        assert!(ConsumptionSeries::new("1", at(1, 0, 0), Vec::new()).is_err());

        let single = ConsumptionSeries::new("1", at(1, 0, 0), vec![0.0]).unwrap();
        assert!(!single.is_empty());
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_slice_is_inclusive() {
        let series = ConsumptionSeries::new("1", at(1, 0, 0), vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();

        let slice = series.slice(at(1, 1, 0), at(1, 3, 0));
        let values: Vec<f64> = slice.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        assert!(series.slice(at(1, 3, 0), at(1, 1, 0)).is_empty());
        assert!(series.slice(at(2, 0, 0), at(2, 5, 0)).is_empty());
    }

    #[test]
    fn test_tail_and_value_at() {
        let series = ConsumptionSeries::new("1", at(1, 0, 0), vec![5.0, 6.0, 7.0]).unwrap();

        assert_eq!(series.tail(2), Some(&[6.0, 7.0][..]));
        assert_eq!(series.tail(4), None);
        assert_eq!(series.value_at(at(1, 1, 45)), Some(6.0));
        assert_eq!(series.value_at(at(1, 3, 0)), None);
    }
}
