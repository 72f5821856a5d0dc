//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use crate::models::WindowModel;
use crate::scaler::MinMaxScaler;
use serde::Serialize;

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    // Mean Absolute Error
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    // Mean Squared Error
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;

    let rmse = mse.sqrt();

    // Zero-consumption hours are common overnight, so they are skipped
    let nonzero = actual.iter().filter(|&&a| a != 0.0).count();
    let mape = if nonzero == 0 {
        0.0
    } else {
        actual
            .iter()
            .zip(errors.iter())
            .filter(|(&a, _)| a != 0.0)
            .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
            .sum::<f64>()
            / nonzero as f64
    };

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let abs_a = a.abs();
            let abs_f = f.abs();
            if abs_a + abs_f == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / (abs_a + abs_f)
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// One-step-ahead accuracy of a model in raw consumption units.
///
/// `inputs` and `targets` are normalized with `scaler`; both predictions and
/// targets are mapped back before scoring.
pub fn evaluate_one_step<M: WindowModel + ?Sized>(
    model: &M,
    scaler: &MinMaxScaler,
    inputs: &[Vec<f64>],
    targets: &[f64],
) -> Result<ForecastAccuracy> {
    let predicted = model.predict_batch(inputs)?;
    forecast_accuracy(
        &scaler.inverse_transform_all(&predicted),
        &scaler.inverse_transform_all(targets),
    )
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over non-zero actuals
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovingAverage;
    use approx::assert_relative_eq;

    #[test]
    fn test_forecast_accuracy() {
        let forecast = [1.0, 2.0, 3.0, 4.0];
        let actual = [1.0, 3.0, 2.0, 4.0];
        let accuracy = forecast_accuracy(&forecast, &actual).unwrap();

        assert_relative_eq!(accuracy.mae, 0.5);
        assert_relative_eq!(accuracy.mse, 0.5);
        assert_relative_eq!(accuracy.rmse, 0.5_f64.sqrt());
        // |1|/3 and |1|/2 over four non-zero actuals
        assert_relative_eq!(accuracy.mape, (100.0 / 3.0 + 50.0) / 4.0);
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        let accuracy = forecast_accuracy(&[0.5, 2.0], &[0.0, 1.0]).unwrap();
        assert_relative_eq!(accuracy.mape, 100.0);
        // 200 * 0.5 / 0.5 and 200 * 1 / 3
        assert_relative_eq!(accuracy.smape, (200.0 + 200.0 / 3.0) / 2.0);
    }

    #[test]
    fn test_forecast_accuracy_rejects_mismatch() {
        assert!(forecast_accuracy(&[1.0], &[1.0, 2.0]).is_err());
        assert!(forecast_accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_evaluate_one_step_in_raw_units() {
        let scaler = MinMaxScaler::fit(&[0.0, 10.0]).unwrap();
        let model = MovingAverage::new(2, 1).unwrap();
        let inputs = vec![vec![0.1, 0.2], vec![0.2, 0.4]];
        let targets = vec![0.2, 0.5];

        let accuracy = evaluate_one_step(&model, &scaler, &inputs, &targets).unwrap();
        // Predictions 2.0 and 4.0 against 2.0 and 5.0
        assert_relative_eq!(accuracy.mae, 0.5, epsilon = 1e-12);
    }
}
