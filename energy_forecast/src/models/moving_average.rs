//! Moving average baseline over the most recent hours of a window

use crate::error::{ForecastError, Result};
use crate::models::{check_training_set, check_window, SequenceRegressor, WindowModel};
use serde::{Deserialize, Serialize};

/// Predicts the mean of the last `span` values of the window.
///
/// Needs no fitting, so the configuration is also the trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverage {
    /// Name of the model
    name: String,
    /// Window length accepted
    window_size: usize,
    /// Number of trailing values averaged
    span: usize,
}

impl MovingAverage {
    /// Create a new moving average over the last `span` of `window_size` values
    pub fn new(window_size: usize, span: usize) -> Result<Self> {
        if span == 0 {
            return Err(ForecastError::InvalidParameter(
                "Span must be positive".to_string(),
            ));
        }
        if span > window_size {
            return Err(ForecastError::InvalidParameter(format!(
                "Span ({}) cannot exceed window size ({})",
                span, window_size
            )));
        }

        Ok(Self {
            name: format!("Moving Average (span={})", span),
            window_size,
            span,
        })
    }

    /// Number of trailing values averaged
    pub fn span(&self) -> usize {
        self.span
    }
}

impl WindowModel for MovingAverage {
    fn predict_next(&self, window: &[f64]) -> Result<f64> {
        check_window(self.window_size, window)?;
        let recent = &window[window.len() - self.span..];
        Ok(recent.iter().sum::<f64>() / self.span as f64)
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl SequenceRegressor for MovingAverage {
    type Trained = MovingAverage;

    fn train(&self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        check_training_set(self.window_size, inputs, targets)?;
        Ok(self.clone())
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn name(&self) -> &str {
        &self.name
    }
}
