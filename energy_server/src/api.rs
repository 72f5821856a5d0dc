//! HTTP routes for forecasts and consumption views

use crate::charts::{self, ChartError};
use crate::config::{default_max_horizon_hours, Config};
use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use energy_data::aggregate::{floor_wise_daily, ConsumptionOverview};
use energy_data::{DataLoader, EnergyDataset};
use energy_forecast::{ArtifactStore, ForecastOutcome, ForecastPoint, ForecastRequest, ForecastService};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ForecastService>,
    pub overview: Arc<ConsumptionOverview>,
    pub daily: Arc<BTreeMap<String, Vec<(NaiveDateTime, f64)>>>,
    /// Hours a forecast may reach past the floor's last known hour
    pub max_horizon_hours: u32,
}

impl AppState {
    /// Precompute the consumption views and bind the forecast service
    pub fn new(service: ForecastService, dataset: &EnergyDataset) -> Self {
        Self {
            service: Arc::new(service),
            overview: Arc::new(ConsumptionOverview::from_dataset(dataset)),
            daily: Arc::new(floor_wise_daily(dataset)),
            max_horizon_hours: default_max_horizon_hours(),
        }
    }

    pub fn with_max_horizon_hours(mut self, hours: u32) -> Self {
        self.max_horizon_hours = hours;
        self
    }

    /// Load the dataset and bind the models directory named in `config`
    pub fn from_config(config: &Config) -> Result<Self, energy_forecast::ForecastError> {
        let dataset = DataLoader::from_csv(&config.data.dataset_path)?;
        info!(
            path = %config.data.dataset_path.display(),
            rows = dataset.len(),
            "loaded dataset"
        );
        let store = ArtifactStore::new(&config.data.models_dir);
        let service = ForecastService::from_dataset(store, &dataset)?;
        Ok(Self::new(service, &dataset).with_max_horizon_hours(config.forecast.max_horizon_hours))
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/forecast", post(forecast_form))
        .route("/api/forecast", get(forecast_query))
        .route("/visualize", get(visualize))
        .route("/visualize/:view", get(visualize_view))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Forecast parameters, from a form or a query string
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastParams {
    pub floor: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub floor: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub last_known_date: NaiveDateTime,
    pub actual_data: Vec<ForecastPoint>,
    pub predicted_data: Vec<ForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_url: Option<String>,
}

impl From<ForecastOutcome> for ForecastResponse {
    fn from(outcome: ForecastOutcome) -> Self {
        Self {
            floor: outcome.floor,
            start_date: outcome.start,
            end_date: outcome.end,
            last_known_date: outcome.last_known,
            actual_data: outcome.actual,
            predicted_data: outcome.predicted,
            plot_url: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    floors: Vec<String>,
}

/// Parse a request date. A bare day covers the whole day: it starts at 00:00
/// and, as an end bound, runs through 23:00.
pub fn parse_request_date(raw: &str, end_of_day: bool) -> Result<NaiveDateTime, ApiError> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let hour = if end_of_day { 23 } else { 0 };
        return day
            .and_hms_opt(hour, 0, 0)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid date '{}'", raw)));
    }
    energy_data::parse_datetime(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{}'", raw)))
}

fn run_forecast(state: &AppState, params: &ForecastParams) -> Result<ForecastOutcome, ApiError> {
    let floor = params.floor.trim();
    if floor.is_empty() {
        return Err(ApiError::BadRequest("Floor is required".to_string()));
    }
    let start = parse_request_date(&params.start_date, false)?;
    let end = parse_request_date(&params.end_date, true)?;
    let request = ForecastRequest::new(floor, start, end)?;
    check_horizon(state, &request)?;
    Ok(state.service.forecast(&request)?)
}

/// Reject requests ending further past the floor's history than the limit.
/// Floors without history fall through to the service's own errors.
fn check_horizon(state: &AppState, request: &ForecastRequest) -> Result<(), ApiError> {
    let Some(history) = state.service.history(request.floor()) else {
        return Ok(());
    };
    let last_known = history.last_timestamp();
    let limit = i64::from(state.max_horizon_hours) * 60;
    if (request.end() - last_known).num_minutes() > limit {
        return Err(ApiError::BadRequest(format!(
            "Forecast may end at most {} hours after {} (requested end {})",
            state.max_horizon_hours, last_known, request.end()
        )));
    }
    Ok(())
}

/// Run CPU-bound work off the async runtime
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {}", e)))?
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        floors: state.service.floors(),
    })
}

async fn forecast_form(
    State(state): State<AppState>,
    Form(params): Form<ForecastParams>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let response = blocking(move || {
        let outcome = run_forecast(&state, &params)?;

        let plot_url = match charts::forecast_chart(&outcome) {
            Ok(png) => Some(charts::data_url(&png)),
            Err(e) => {
                warn!(floor = %outcome.floor, error = %e, "forecast chart unavailable");
                None
            }
        };

        Ok(ForecastResponse {
            plot_url,
            ..ForecastResponse::from(outcome)
        })
    })
    .await?;

    Ok(Json(response))
}

async fn forecast_query(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let outcome = blocking(move || run_forecast(&state, &params)).await?;
    Ok(Json(outcome.into()))
}

async fn visualize(State(state): State<AppState>) -> Json<ConsumptionOverview> {
    Json(state.overview.as_ref().clone())
}

async fn visualize_view(
    State(state): State<AppState>,
    Path(view): Path<String>,
) -> Result<Response, ApiError> {
    let png = blocking(move || {
        match view.as_str() {
            "floor_wise" => charts::floor_wise_chart(&state.daily),
            "appliance_wise" => {
                charts::appliance_chart(&state.overview.appliance_wise_consumption)
            }
            "floor_appliance" => {
                charts::floor_appliance_heatmap(&state.overview.floor_appliance_consumption)
            }
            "hourly" => charts::hourly_chart(&state.overview.hourly_consumption),
            other => return Err(ApiError::NotFound(format!("Unknown view '{}'", other))),
        }
        .map_err(|e| match e {
            ChartError::Empty(msg) => ApiError::NotFound(msg),
            other => ApiError::Internal(other.to_string()),
        })
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_bare_dates_cover_whole_day() {
        assert_eq!(parse_request_date("2023-01-02", false).unwrap(), at(2, 0, 0));
        assert_eq!(parse_request_date("2023-01-02", true).unwrap(), at(2, 23, 0));
    }

    #[test]
    fn test_datetimes_are_kept() {
        assert_eq!(
            parse_request_date("2023-01-02T05:30", true).unwrap(),
            at(2, 5, 30)
        );
        assert_eq!(
            parse_request_date("2023-01-02 05:00:00", false).unwrap(),
            at(2, 5, 0)
        );
    }

    #[test]
    fn test_bad_dates_are_bad_requests() {
        let err = parse_request_date("next tuesday", false).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
