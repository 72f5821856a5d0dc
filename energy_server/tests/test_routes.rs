use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate};
use energy_data::{EnergyDataset, Reading};
use energy_forecast::models::{LinearWindowRegressor, WINDOW_SIZE};
use energy_forecast::{ArtifactStore, ForecastService, Trainer};
use energy_server::{charts, create_router, AppState};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Three days of office-hours consumption for floors 1 and 2, ending 2023-01-03T23:00
fn dataset() -> EnergyDataset {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut readings = Vec::new();
    for floor in ["1", "2"] {
        for hour in 0..72 {
            let on = (8..18).contains(&(hour % 24));
            for (appliance, load) in [("Fan", 0.3), ("Computer", 1.2)] {
                readings.push(Reading {
                    datetime: start + Duration::hours(hour),
                    floor: floor.to_string(),
                    appliance: appliance.to_string(),
                    energy_consumption: if on { load } else { 0.05 },
                });
            }
        }
    }
    EnergyDataset::new(readings)
}

fn app_state() -> (AppState, TempDir) {
    charts::register_chart_font(None).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let dataset = dataset();

    // Only floor 1 gets a model
    let trainer = Trainer::new(LinearWindowRegressor::new(WINDOW_SIZE, 1e-3).unwrap());
    let series = dataset.floor_series("1").unwrap();
    let trained = trainer.train_floor(&series).unwrap();
    store
        .save(
            "1",
            &energy_forecast::FloorArtifacts {
                model: trained.model.into(),
                scaler: trained.scaler,
            },
        )
        .unwrap();

    let service = ForecastService::from_dataset(store, &dataset).unwrap();
    (AppState::new(service, &dataset), dir)
}

fn app() -> (Router, TempDir) {
    let (state, dir) = app_state();
    (create_router(state), dir)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = app();
    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["floors"], serde_json::json!(["1", "2"]));
}

#[tokio::test]
async fn test_index_serves_form() {
    let (app, _dir) = app();
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<form"));
}

#[tokio::test]
async fn test_api_forecast_straddles_history() {
    let (app, _dir) = app();
    let (status, body) = send(
        app,
        get("/api/forecast?floor=1&start_date=2023-01-03&end_date=2023-01-04T05:00"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["floor"], "1");
    assert_eq!(body["last_known_date"], "2023-01-03T23:00:00");
    assert_eq!(body["actual_data"].as_array().unwrap().len(), 24);
    assert_eq!(body["predicted_data"].as_array().unwrap().len(), 6);
    assert_eq!(body["predicted_data"][0]["timestamp"], "2023-01-04T00:00:00");
    assert!(body.get("plot_url").is_none());
}

#[tokio::test]
async fn test_form_forecast_returns_json() {
    let (app, _dir) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/forecast")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "floor=1&start_date=2023-01-04&end_date=2023-01-04",
        ))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["actual_data"].as_array().unwrap().is_empty());
    assert_eq!(body["predicted_data"].as_array().unwrap().len(), 24);
    let url = body["plot_url"].as_str().unwrap();
    assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
}

#[tokio::test]
async fn test_far_future_forecast_is_bad_request() {
    let (app, _dir) = app();
    let (status, body) = send(
        app,
        get("/api/forecast?floor=1&start_date=2023-01-04&end_date=2300-01-01"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most 8784 hours"));
}

#[tokio::test]
async fn test_horizon_limit_counts_from_last_known_hour() {
    let (state, _dir) = app_state();
    let app = create_router(state.with_max_horizon_hours(24));

    // 2023-01-04T23:00 is exactly 24 hours past the history
    let (status, body) = send(
        app.clone(),
        get("/api/forecast?floor=1&start_date=2023-01-04&end_date=2023-01-04"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predicted_data"].as_array().unwrap().len(), 24);

    let (status, _) = send(
        app,
        get("/api/forecast?floor=1&start_date=2023-01-04&end_date=2023-01-05T00:00"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_untrained_floor_is_not_found() {
    let (app, _dir) = app();
    let (status, body) = send(
        app,
        get("/api/forecast?floor=2&start_date=2023-01-01&end_date=2023-01-02"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("'2'"));
}

#[tokio::test]
async fn test_reversed_range_is_bad_request() {
    let (app, _dir) = app();
    let (status, body) = send(
        app,
        get("/api/forecast?floor=1&start_date=2023-01-03&end_date=2023-01-02"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid range"));
}

#[tokio::test]
async fn test_unparseable_date_is_bad_request() {
    let (app, _dir) = app();
    let (status, _) = send(
        app,
        get("/api/forecast?floor=1&start_date=soon&end_date=2023-01-02"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_visualize_returns_all_views() {
    let (app, _dir) = app();
    let (status, body) = send(app, get("/visualize")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["floor_wise_consumption"].as_object().unwrap().len(), 2);
    assert_eq!(body["appliance_wise_consumption"][0]["appliance"], "Computer");
    assert!(body["floor_appliance_consumption"]["1"]["Fan"].is_number());
    assert_eq!(body["hourly_consumption"].as_object().unwrap().len(), 24);
}

#[tokio::test]
async fn test_chart_views_are_png() {
    for view in ["floor_wise", "appliance_wise", "floor_appliance", "hourly"] {
        let (app, _dir) = app();
        let response = app
            .oneshot(get(&format!("/visualize/{}", view)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "view {}", view);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}

#[tokio::test]
async fn test_unknown_view_is_not_found() {
    let (app, _dir) = app();
    let (status, body) = send(app, get("/visualize/pie")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("pie"));
}
