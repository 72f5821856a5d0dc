//! Linear autoregressive regressor over a consumption window
//!
//! Fitted with `linfa-linear` least squares. An L2 penalty is applied by
//! appending `sqrt(penalty) * I` rows with zero targets to the centered
//! design matrix, which keeps the normal equations positive definite even
//! when every day of the series looks the same.

use crate::error::{ForecastError, Result};
use crate::models::{check_training_set, check_window, SequenceRegressor, WindowModel};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Untrained linear window regressor
#[derive(Debug, Clone)]
pub struct LinearWindowRegressor {
    /// Name of the model
    name: String,
    /// Window length
    window_size: usize,
    /// Ridge penalty
    l2_penalty: f64,
    /// Whether to fit an intercept
    fit_intercept: bool,
}

/// Trained linear window regressor: `intercept + weights . window`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedLinearWindow {
    name: String,
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearWindowRegressor {
    /// Create a new regressor
    pub fn new(window_size: usize, l2_penalty: f64) -> Result<Self> {
        if window_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }
        if !(l2_penalty >= 0.0) || !l2_penalty.is_finite() {
            return Err(ForecastError::InvalidParameter(
                "L2 penalty must be a non-negative number".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Linear Window (window={}, l2={})", window_size, l2_penalty),
            window_size,
            l2_penalty,
            fit_intercept: true,
        })
    }

    /// Set whether to fit intercept
    pub fn fit_intercept(mut self, fit: bool) -> Self {
        self.fit_intercept = fit;
        self
    }
}

impl SequenceRegressor for LinearWindowRegressor {
    type Trained = TrainedLinearWindow;

    fn train(&self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        check_training_set(self.window_size, inputs, targets)?;

        let n_samples = inputs.len();
        let n_features = self.window_size;
        let flat: Vec<f64> = inputs.iter().flatten().copied().collect();

        let x = Array2::from_shape_vec((n_samples, n_features), flat)
            .map_err(|e| ForecastError::TrainingError(e.to_string()))?;
        let y = Array1::from_vec(targets.to_vec());

        let (x_offset, y_offset) = if self.fit_intercept {
            (
                x.mean_axis(Axis(0))
                    .unwrap_or_else(|| Array1::zeros(n_features)),
                y.mean().unwrap_or(0.0),
            )
        } else {
            (Array1::zeros(n_features), 0.0)
        };

        let x_centered = &x - &x_offset;
        let y_centered = &y - y_offset;

        let penalty_rows = Array2::<f64>::eye(n_features) * self.l2_penalty.sqrt();
        let penalty_targets = Array1::<f64>::zeros(n_features);

        let records = concatenate(Axis(0), &[x_centered.view(), penalty_rows.view()])
            .map_err(|e| ForecastError::TrainingError(e.to_string()))?;
        let targets = concatenate(Axis(0), &[y_centered.view(), penalty_targets.view()])
            .map_err(|e| ForecastError::TrainingError(e.to_string()))?;

        let dataset = Dataset::new(records, targets);
        let fitted = LinearRegression::new()
            .with_intercept(false)
            .fit(&dataset)
            .map_err(|e: linfa_linear::LinearError<f64>| {
                ForecastError::TrainingError(e.to_string())
            })?;

        let weights = fitted.params().to_vec();
        let intercept = y_offset - x_offset.dot(fitted.params());
        debug!(samples = n_samples, intercept, "fitted linear window regressor");

        Ok(TrainedLinearWindow {
            name: self.name.clone(),
            weights,
            intercept,
        })
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedLinearWindow {
    /// Build a model from known coefficients
    pub fn from_parts(weights: Vec<f64>, intercept: f64) -> Result<Self> {
        if weights.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Weights cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            name: format!("Linear Window (window={})", weights.len()),
            weights,
            intercept,
        })
    }

    /// Per-lag weights, oldest hour first
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Fitted intercept
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl WindowModel for TrainedLinearWindow {
    fn predict_next(&self, window: &[f64]) -> Result<f64> {
        check_window(self.weights.len(), window)?;
        let dot: f64 = self.weights.iter().zip(window).map(|(w, x)| w * x).sum();
        Ok(self.intercept + dot)
    }

    fn window_size(&self) -> usize {
        self.weights.len()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
