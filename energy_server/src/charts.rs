//! PNG charts rendered in memory
//!
//! Every chart is drawn by plotters into an RGB buffer, then PNG-encoded with
//! `image`. [`data_url`] wraps the bytes for embedding in JSON.
//!
//! Text needs a registered font; call [`register_chart_font`] once at
//! startup. DejaVu Sans is compiled in, so a configured font is optional.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{Duration, NaiveDateTime};
use energy_data::aggregate::ApplianceTotal;
use energy_forecast::ForecastOutcome;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const SIZE: (u32, u32) = (1000, 500);

const FONT_FAMILY: &str = "sans-serif";

const BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Nothing to plot: {0}")]
    Empty(String),
    #[error("Chart rendering failed: {0}")]
    Render(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("Font registration failed: {0}")]
    Font(String),
}

type DrawResult = Result<(), Box<dyn Error>>;

/// Draw into a fresh white canvas and return PNG bytes
pub fn render<F>(size: (u32, u32), draw: F) -> Result<Vec<u8>, ChartError>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
{
    let (width, height) = size;
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, size).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| ChartError::Render(e.to_string()))?;
        draw(&root).map_err(|e| ChartError::Render(e.to_string()))?;
        root.present()
            .map_err(|e| ChartError::Render(e.to_string()))?;
    }
    encode_png(&pixels, width, height)
}

/// Where the registered chart font came from
#[derive(Debug, Clone, PartialEq)]
pub enum FontSource {
    Bundled,
    File(PathBuf),
}

/// Register the chart font as "sans-serif": the TrueType file at
/// `configured` when it loads, the bundled DejaVu Sans otherwise.
pub fn register_chart_font(configured: Option<&Path>) -> Result<FontSource, ChartError> {
    if let Some(path) = configured {
        match std::fs::read(path) {
            Ok(bytes) => {
                // plotters keeps registered fonts for the life of the process
                let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
                if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                    info!(path = %path.display(), "registered chart font");
                    return Ok(FontSource::File(path.to_path_buf()));
                }
                warn!(path = %path.display(), "unusable font file, using bundled font");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "font file unreadable, using bundled font"),
        }
    }
    register_font(FONT_FAMILY, FontStyle::Normal, BUNDLED_FONT)
        .map_err(|_| ChartError::Font("bundled font failed to load".to_string()))?;
    Ok(FontSource::Bundled)
}

/// PNG-encode a packed RGB buffer
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ChartError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    PngEncoder::new(&mut png_bytes)
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ChartError::Encode(e.to_string()))?;
    Ok(png_bytes)
}

/// `data:` URL for PNG bytes
pub fn data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

fn value_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        (lo - 1.0, hi + 1.0)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}

fn hours_between(origin: NaiveDateTime, ts: NaiveDateTime) -> f64 {
    (ts - origin).num_minutes() as f64 / 60.0
}

/// Actual consumption followed by the predicted continuation
pub fn forecast_chart(outcome: &ForecastOutcome) -> Result<Vec<u8>, ChartError> {
    let origin = outcome
        .points()
        .next()
        .map(|p| p.timestamp)
        .ok_or_else(|| ChartError::Empty("forecast has no points".to_string()))?;
    let span = hours_between(origin, outcome.end).max(1.0);
    let (y_min, y_max) = value_range(outcome.points().map(|p| p.value));
    let caption = format!("Energy Consumption Forecast for Floor {}", outcome.floor);

    render(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(caption, (FONT_FAMILY, 22))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..span, y_min..y_max)?;

        let label = |x: &f64| {
            (origin + Duration::minutes((x * 60.0) as i64))
                .format("%m-%d %H:%M")
                .to_string()
        };
        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc("Energy Consumption")
            .x_label_formatter(&label)
            .draw()?;

        if !outcome.actual.is_empty() {
            chart
                .draw_series(LineSeries::new(
                    outcome
                        .actual
                        .iter()
                        .map(|p| (hours_between(origin, p.timestamp), p.value)),
                    &BLUE,
                ))?
                .label("Actual")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLUE));
        }

        if !outcome.predicted.is_empty() {
            chart
                .draw_series(LineSeries::new(
                    outcome
                        .predicted
                        .iter()
                        .map(|p| (hours_between(origin, p.timestamp), p.value)),
                    &RED,
                ))?
                .label("Predicted")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], RED));
        }

        let boundary = hours_between(origin, outcome.last_known);
        if (0.0..=span).contains(&boundary) {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(boundary, y_min), (boundary, y_max)],
                BLACK.mix(0.4),
            )))?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// One line of daily totals per floor
pub fn floor_wise_chart(
    daily: &BTreeMap<String, Vec<(NaiveDateTime, f64)>>,
) -> Result<Vec<u8>, ChartError> {
    let origin = daily
        .values()
        .filter_map(|points| points.first().map(|(ts, _)| *ts))
        .min()
        .ok_or_else(|| ChartError::Empty("no floor consumption".to_string()))?;
    let span = daily
        .values()
        .filter_map(|points| points.last().map(|(ts, _)| hours_between(origin, *ts) / 24.0))
        .fold(1.0, f64::max);
    let (y_min, y_max) = value_range(daily.values().flatten().map(|(_, v)| *v));

    render(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Daily Consumption per Floor", (FONT_FAMILY, 22))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..span, y_min.min(0.0)..y_max)?;

        let label = |x: &f64| {
            (origin + Duration::hours((x * 24.0) as i64))
                .format("%Y-%m-%d")
                .to_string()
        };
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Energy Consumption")
            .x_label_formatter(&label)
            .draw()?;

        for (i, (floor, points)) in daily.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(LineSeries::new(
                    points
                        .iter()
                        .map(|(ts, v)| (hours_between(origin, *ts) / 24.0, *v)),
                    color,
                ))?
                .label(format!("Floor {}", floor))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Bar per appliance type, in the given order
pub fn appliance_chart(totals: &[ApplianceTotal]) -> Result<Vec<u8>, ChartError> {
    if totals.is_empty() {
        return Err(ChartError::Empty("no appliances".to_string()));
    }
    let (_, y_max) = value_range(totals.iter().map(|t| t.total));
    let names: Vec<&str> = totals.iter().map(|t| t.appliance.as_str()).collect();
    let count = totals.len() as i32;

    render(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Consumption by Appliance", (FONT_FAMILY, 22))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(60)
            .build_cartesian_2d((0..count).into_segmented(), 0.0..y_max.max(0.0))?;

        let label = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) => names
                .get(*i as usize)
                .map(|name| name.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(names.len())
            .x_label_formatter(&label)
            .y_desc("Total Energy Consumption")
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(8)
                .data(totals.iter().enumerate().map(|(i, t)| (i as i32, t.total))),
        )?;
        Ok(())
    })
}

/// Floor rows by appliance columns, shaded by total consumption
pub fn floor_appliance_heatmap(
    pivot: &BTreeMap<String, BTreeMap<String, f64>>,
) -> Result<Vec<u8>, ChartError> {
    let floors: Vec<&str> = pivot.keys().map(String::as_str).collect();
    let appliances: Vec<&str> = pivot
        .values()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    if floors.is_empty() || appliances.is_empty() {
        return Err(ChartError::Empty("no floor/appliance totals".to_string()));
    }
    let peak = pivot
        .values()
        .flat_map(|row| row.values().copied())
        .fold(0.0, f64::max);

    render(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Consumption by Floor and Appliance", (FONT_FAMILY, 22))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(
                (0..appliances.len() as i32).into_segmented(),
                (0..floors.len() as i32).into_segmented(),
            )?;

        let x_label = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) => appliances
                .get(*i as usize)
                .map(|s| s.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };
        let y_label = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) => floors
                .get(*i as usize)
                .map(|s| format!("Floor {}", s))
                .unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(appliances.len())
            .y_labels(floors.len())
            .x_label_formatter(&x_label)
            .y_label_formatter(&y_label)
            .draw()?;

        let cells = floors.iter().enumerate().flat_map(|(row, floor)| {
            appliances.iter().enumerate().map(move |(col, appliance)| {
                let value = pivot
                    .get(*floor)
                    .and_then(|r| r.get(*appliance))
                    .copied()
                    .unwrap_or(0.0);
                let shade = if peak > 0.0 { value / peak } else { 0.0 };
                let fade = (255.0 * (1.0 - shade)) as u8;
                Rectangle::new(
                    [
                        (SegmentValue::Exact(col as i32), SegmentValue::Exact(row as i32)),
                        (
                            SegmentValue::Exact(col as i32 + 1),
                            SegmentValue::Exact(row as i32 + 1),
                        ),
                    ],
                    RGBColor(255, fade, fade).filled(),
                )
            })
        });
        chart.draw_series(cells)?;
        Ok(())
    })
}

/// Mean consumption for each hour of the day
pub fn hourly_chart(hourly: &BTreeMap<u32, f64>) -> Result<Vec<u8>, ChartError> {
    if hourly.is_empty() {
        return Err(ChartError::Empty("no hourly averages".to_string()));
    }
    let (y_min, y_max) = value_range(hourly.values().copied());

    render(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Average Consumption by Hour of Day", (FONT_FAMILY, 22))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..23.0, y_min.min(0.0)..y_max)?;

        chart
            .configure_mesh()
            .x_labels(24)
            .x_desc("Hour of Day")
            .y_desc("Average Energy Consumption")
            .draw()?;

        let points: Vec<(f64, f64)> = hourly.iter().map(|(h, v)| (*h as f64, *v)).collect();
        chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
        )?;
        Ok(())
    })
}
