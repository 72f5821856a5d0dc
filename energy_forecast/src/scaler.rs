//! Min-max scaling between raw consumption and the [0, 1] range models see

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Fitted min-max transform.
///
/// A constant training series has no range; it is treated as a unit range so
/// every value maps to `value - min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit on observed values
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::ValidationError(
                "Cannot fit a scaler on an empty series".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ValidationError(
                "Cannot fit a scaler on non-finite values".to_string(),
            ));
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Ok(Self { min, max })
    }

    /// Observed minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Observed maximum
    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    /// Raw value to normalized
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    /// Normalized value back to raw units
    pub fn inverse_transform(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.min
    }

    /// Normalize a slice
    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }

    /// De-normalize a slice
    pub fn inverse_transform_all(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|&v| self.inverse_transform(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_and_transform() {
        let scaler = MinMaxScaler::fit(&[2.0, 4.0, 6.0, 10.0]).unwrap();

        assert_eq!(scaler.min(), 2.0);
        assert_eq!(scaler.max(), 10.0);
        assert_relative_eq!(scaler.transform(2.0), 0.0);
        assert_relative_eq!(scaler.transform(6.0), 0.5);
        assert_relative_eq!(scaler.transform(10.0), 1.0);
        assert_relative_eq!(scaler.inverse_transform(0.25), 4.0);
    }

    #[test]
    fn test_out_of_range_values_extrapolate() {
        let scaler = MinMaxScaler::fit(&[0.0, 10.0]).unwrap();

        assert_relative_eq!(scaler.transform(15.0), 1.5);
        assert_relative_eq!(scaler.inverse_transform(-0.1), -1.0);
    }

    #[test]
    fn test_constant_series_uses_unit_range() {
        let scaler = MinMaxScaler::fit(&[3.0, 3.0, 3.0]).unwrap();

        assert_relative_eq!(scaler.transform(3.0), 0.0);
        assert_relative_eq!(scaler.transform(4.0), 1.0);
        assert_relative_eq!(scaler.inverse_transform(0.0), 3.0);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert!(MinMaxScaler::fit(&[]).is_err());
        assert!(MinMaxScaler::fit(&[1.0, f64::NAN]).is_err());
    }
}
