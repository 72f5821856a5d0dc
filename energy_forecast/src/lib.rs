//! # Energy Forecast
//!
//! Per-floor next-hour regressors and autoregressive multi-hour forecasting.
//!
//! ## Features
//!
//! - Min-max scaling of consumption (`scaler`)
//! - Window models: stacked LSTM (default), ridge-penalized linear regressor, moving average baseline (`models`)
//! - Per-floor training with a chronological split and accuracy report (`trainer`)
//! - JSON artifact persistence with a load-once cache (`store`)
//! - Rolling 24-hour window forecasting past the known history (`engine`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use energy_data::DataLoader;
//! use energy_forecast::engine::ForecastRequest;
//! use energy_forecast::models::{LinearWindowRegressor, WINDOW_SIZE};
//! use energy_forecast::{ArtifactStore, ForecastService, Trainer};
//!
//! let dataset = DataLoader::from_csv("energy_consumption_dataset.csv")?;
//! let store = ArtifactStore::new("models");
//!
//! // Fit and persist one model per floor
//! let trainer = Trainer::new(LinearWindowRegressor::new(WINDOW_SIZE, 1e-3)?);
//! for report in trainer.train_dataset(&dataset, &store)? {
//!     println!("{}", report);
//! }
//!
//! // Forecast a floor past its last known hour
//! let service = ForecastService::from_dataset(store, &dataset)?;
//! let start = energy_data::parse_datetime("2023-12-31T00:00")?;
//! let end = energy_data::parse_datetime("2024-01-01T05:00")?;
//! let outcome = service.forecast(&ForecastRequest::new("1", start, end)?)?;
//! println!("{} actual, {} predicted", outcome.actual.len(), outcome.predicted.len());
//! # Ok::<(), energy_forecast::ForecastError>(())
//! ```

pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod scaler;
pub mod service;
pub mod store;
pub mod trainer;
pub mod utils;

// Re-export commonly used types
pub use crate::engine::{forecast, ForecastOutcome, ForecastPoint, ForecastRequest};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{FloorModel, SequenceRegressor, WindowModel};
pub use crate::scaler::MinMaxScaler;
pub use crate::service::ForecastService;
pub use crate::store::{ArtifactCache, ArtifactStore, FloorArtifacts};
pub use crate::trainer::{Trainer, TrainingReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
