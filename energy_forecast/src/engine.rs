//! Autoregressive multi-hour forecasting over a floor's known history
//!
//! The part of a requested range covered by history is returned as-is. Hours
//! past the last known reading are produced one at a time: the model sees the
//! latest 24 normalized values, its prediction is recorded and then pushed
//! into the window for the next hour.

use crate::error::{ForecastError, Result};
use crate::models::WindowModel;
use crate::scaler::MinMaxScaler;
use crate::utils::{ceil_to_hour, floor_to_hour, future_hours};
use chrono::NaiveDateTime;
use energy_data::ConsumptionSeries;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// A validated forecast request, aligned to the hourly grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    floor: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ForecastRequest {
    /// Build a request over the inclusive range `[start, end]`.
    ///
    /// `start` is rounded up and `end` down to whole hours.
    pub fn new(floor: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end < start {
            return Err(ForecastError::InvalidRange { start, end });
        }
        Ok(Self {
            floor: floor.into(),
            start: ceil_to_hour(start),
            end: floor_to_hour(end),
        })
    }

    pub fn floor(&self) -> &str {
        &self.floor
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

/// One hourly value of a forecast response
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl From<(NaiveDateTime, f64)> for ForecastPoint {
    fn from((timestamp, value): (NaiveDateTime, f64)) -> Self {
        Self { timestamp, value }
    }
}

/// Observed hours followed by predicted hours for one request
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    pub floor: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Latest timestamp of the floor's history; the actual/predicted boundary
    pub last_known: NaiveDateTime,
    /// History within `[start, min(end, last_known)]`
    pub actual: Vec<ForecastPoint>,
    /// Predictions within `(last_known, end]`, from `start` on
    pub predicted: Vec<ForecastPoint>,
    /// Number of times the model was invoked
    pub model_calls: usize,
}

impl ForecastOutcome {
    /// All points in time order
    pub fn points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.actual.iter().chain(self.predicted.iter())
    }

    pub fn len(&self) -> usize {
        self.actual.len() + self.predicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forecast a request against a floor's history.
///
/// Fails with `InsufficientHistory` when the history cannot fill one model
/// window, and with `EmptyRange` when the range selects no hours.
pub fn forecast<M: WindowModel + ?Sized>(
    request: &ForecastRequest,
    history: &ConsumptionSeries,
    model: &M,
    scaler: &MinMaxScaler,
) -> Result<ForecastOutcome> {
    let window_size = model.window_size();
    let seed = history
        .tail(window_size)
        .ok_or(ForecastError::InsufficientHistory {
            required: window_size,
            available: history.len(),
        })?;

    let (start, end) = (request.start(), request.end());
    if end < start {
        return Err(ForecastError::EmptyRange { start, end });
    }

    let last_known = history.last_timestamp();
    let actual: Vec<ForecastPoint> = history
        .slice(start, end.min(last_known))
        .into_iter()
        .map(ForecastPoint::from)
        .collect();

    let mut predicted = Vec::new();
    let mut model_calls = 0;

    if end > last_known {
        let horizon = (end - last_known).num_hours() as usize;
        let mut window: VecDeque<f64> = seed.iter().map(|&v| scaler.transform(v)).collect();

        for timestamp in future_hours(last_known, horizon) {
            let next = model.predict_next(window.make_contiguous())?;
            model_calls += 1;

            if !next.is_finite() {
                return Err(ForecastError::ValidationError(format!(
                    "Model produced a non-finite value for {}",
                    timestamp
                )));
            }

            if timestamp >= start {
                predicted.push(ForecastPoint {
                    timestamp,
                    value: scaler.inverse_transform(next),
                });
            }

            window.pop_front();
            window.push_back(next);
        }
    }

    if actual.is_empty() && predicted.is_empty() {
        return Err(ForecastError::EmptyRange { start, end });
    }

    debug!(
        floor = request.floor(),
        actual = actual.len(),
        predicted = predicted.len(),
        model_calls,
        "forecast complete"
    );

    Ok(ForecastOutcome {
        floor: request.floor().to_string(),
        start,
        end,
        last_known,
        actual,
        predicted,
        model_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovingAverage;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_request_aligns_to_hours() {
        let request = ForecastRequest::new("1", at(1, 5, 30), at(1, 9, 45)).unwrap();
        assert_eq!(request.start(), at(1, 6, 0));
        assert_eq!(request.end(), at(1, 9, 0));
    }

    #[test]
    fn test_request_rejects_reversed_range() {
        let err = ForecastRequest::new("1", at(2, 0, 0), at(1, 0, 0)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidRange { .. }));
    }

    #[test]
    fn test_sub_hour_range_is_empty() {
        let history = ConsumptionSeries::new("1", at(1, 0, 0), vec![1.0; 24]).unwrap();
        let scaler = MinMaxScaler::fit(history.values()).unwrap();
        let model = MovingAverage::new(24, 1).unwrap();

        let request = ForecastRequest::new("1", at(1, 5, 10), at(1, 5, 50)).unwrap();
        let err = forecast(&request, &history, &model, &scaler).unwrap_err();
        assert!(matches!(err, ForecastError::EmptyRange { .. }));
    }

    #[test]
    fn test_window_rolls_with_predictions() {
        // Span 2 over history ending [.., 2, 4] gives 3, then mean(4, 3) = 3.5
        let mut values = vec![0.0; 22];
        values.extend([2.0, 4.0]);
        let history = ConsumptionSeries::new("1", at(1, 0, 0), values).unwrap();
        let scaler = MinMaxScaler::fit(history.values()).unwrap();
        let model = MovingAverage::new(24, 2).unwrap();

        let request = ForecastRequest::new("1", at(2, 0, 0), at(2, 1, 0)).unwrap();
        let outcome = forecast(&request, &history, &model, &scaler).unwrap();

        let values: Vec<f64> = outcome.predicted.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 3.5]);
        assert_eq!(outcome.model_calls, 2);
        assert!(outcome.actual.is_empty());
    }
}
