//! # Floor Energy
//!
//! Floor-level building energy forecasting, split across three crates:
//!
//! - [`energy_data`]: appliance metadata, synthetic datasets, hourly floor series, aggregates
//! - [`energy_forecast`]: scaling, window models, training, artifact storage, the forecast engine
//! - [`energy_server`]: the HTTP front door and charts
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use floor_energy_workspace::energy_data::ConsumptionSeries;
//! use floor_energy_workspace::energy_forecast::models::MovingAverage;
//! use floor_energy_workspace::energy_forecast::{forecast, ForecastRequest, MinMaxScaler};
//!
//! let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let history = ConsumptionSeries::new("1", start, vec![1.0; 48]).unwrap();
//! let scaler = MinMaxScaler::fit(history.values()).unwrap();
//! let model = MovingAverage::new(24, 3).unwrap();
//!
//! let end = start + chrono::Duration::hours(53);
//! let request = ForecastRequest::new("1", start + chrono::Duration::hours(24), end).unwrap();
//! let outcome = forecast(&request, &history, &model, &scaler).unwrap();
//! assert_eq!(outcome.actual.len(), 24);
//! assert_eq!(outcome.predicted.len(), 6);
//! ```

pub use energy_data;
pub use energy_forecast;
pub use energy_server;
