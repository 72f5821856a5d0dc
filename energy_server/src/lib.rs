//! # Energy Server
//!
//! HTTP front door for floor energy forecasts.
//!
//! - `GET /` serves the forecast form
//! - `POST /forecast` and `GET /api/forecast` run forecasts
//! - `GET /visualize` and `GET /visualize/:view` serve consumption views

pub mod api;
pub mod charts;
pub mod config;
pub mod error;

pub use crate::api::{create_router, AppState};
pub use crate::config::Config;
pub use crate::error::ApiError;
