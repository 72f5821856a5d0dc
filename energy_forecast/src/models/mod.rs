//! Next-hour models over a window of normalized consumption
//!
//! A [`SequenceRegressor`] is an untrained configuration; training it yields a
//! [`WindowModel`], the only capability the forecast engine relies on.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod linear;
pub mod lstm;
pub mod moving_average;

pub use linear::{LinearWindowRegressor, TrainedLinearWindow};
pub use lstm::{LstmWindowRegressor, TrainedLstmWindow};
pub use moving_average::MovingAverage;

/// Lookback length used throughout: one day of hourly values
pub const WINDOW_SIZE: usize = 24;

/// Trained model mapping a fixed-length normalized window to the next normalized value
pub trait WindowModel: Debug {
    /// Predict the value following `window`
    fn predict_next(&self, window: &[f64]) -> Result<f64>;

    /// Number of values the model expects in a window
    fn window_size(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;

    /// Predict one value per window
    fn predict_batch(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>> {
        windows.iter().map(|w| self.predict_next(w)).collect()
    }
}

/// Model configuration that can be fitted on windowed training data
pub trait SequenceRegressor: Debug + Clone {
    /// The type of trained model produced
    type Trained: WindowModel;

    /// Fit on `inputs[i]` (one window each) predicting `targets[i]`
    fn train(&self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained>;

    /// Window length the regressor is configured for
    fn window_size(&self) -> usize;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Any model that can be persisted per floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FloorModel {
    Lstm(TrainedLstmWindow),
    Linear(TrainedLinearWindow),
    MovingAverage(MovingAverage),
}

impl WindowModel for FloorModel {
    fn predict_next(&self, window: &[f64]) -> Result<f64> {
        match self {
            FloorModel::Lstm(model) => model.predict_next(window),
            FloorModel::Linear(model) => model.predict_next(window),
            FloorModel::MovingAverage(model) => model.predict_next(window),
        }
    }

    fn window_size(&self) -> usize {
        match self {
            FloorModel::Lstm(model) => model.window_size(),
            FloorModel::Linear(model) => model.window_size(),
            FloorModel::MovingAverage(model) => WindowModel::window_size(model),
        }
    }

    fn name(&self) -> &str {
        match self {
            FloorModel::Lstm(model) => model.name(),
            FloorModel::Linear(model) => model.name(),
            FloorModel::MovingAverage(model) => WindowModel::name(model),
        }
    }

    fn predict_batch(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            FloorModel::Lstm(model) => model.predict_batch(windows),
            FloorModel::Linear(model) => model.predict_batch(windows),
            FloorModel::MovingAverage(model) => model.predict_batch(windows),
        }
    }
}

impl From<TrainedLstmWindow> for FloorModel {
    fn from(model: TrainedLstmWindow) -> Self {
        FloorModel::Lstm(model)
    }
}

impl From<TrainedLinearWindow> for FloorModel {
    fn from(model: TrainedLinearWindow) -> Self {
        FloorModel::Linear(model)
    }
}

impl From<MovingAverage> for FloorModel {
    fn from(model: MovingAverage) -> Self {
        FloorModel::MovingAverage(model)
    }
}

/// Reject windows whose length differs from what the model was built for
pub(crate) fn check_window(expected: usize, window: &[f64]) -> Result<()> {
    if window.len() != expected {
        return Err(ForecastError::ValidationError(format!(
            "Window length ({}) doesn't match model window ({})",
            window.len(),
            expected
        )));
    }
    Ok(())
}

/// Reject training sets that cannot be fitted
pub(crate) fn check_training_set(window: usize, inputs: &[Vec<f64>], targets: &[f64]) -> Result<()> {
    if inputs.is_empty() {
        return Err(ForecastError::TrainingError(
            "No training windows".to_string(),
        ));
    }
    if inputs.len() != targets.len() {
        return Err(ForecastError::ValidationError(format!(
            "Inputs length ({}) doesn't match targets length ({})",
            inputs.len(),
            targets.len()
        )));
    }
    inputs.iter().try_for_each(|w| check_window(window, w))
}
