//! Error types for the energy_forecast crate

use chrono::NaiveDateTime;
use thiserror::Error;

/// Custom error types for the energy_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// No trained model and scaler exist for the floor
    #[error("Unknown floor: no trained model for floor '{0}'")]
    UnknownFloor(String),

    /// Not enough history to fill the first window
    #[error("Insufficient history: need {required} hourly points, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// The requested range resolves to no output rows
    #[error("No data available between {start} and {end}")]
    EmptyRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// End of the range lies before its start
    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error while fitting a regressor
    #[error("Training error: {0}")]
    TrainingError(String),

    /// Error raised by the neural network backend
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from the energy data layer
    #[error("Data error: {0}")]
    DataError(#[from] energy_data::DataError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reading or writing persisted artifacts
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<candle_core::Error> for ForecastError {
    fn from(err: candle_core::Error) -> Self {
        ForecastError::ModelError(err.to_string())
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
