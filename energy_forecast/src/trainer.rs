//! Fitting one next-hour model and scaler per floor

use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_one_step, ForecastAccuracy};
use crate::models::{FloorModel, SequenceRegressor, WindowModel};
use crate::scaler::MinMaxScaler;
use crate::store::{ArtifactStore, FloorArtifacts};
use crate::utils::{create_sequences, train_test_split};
use energy_data::{ConsumptionSeries, EnergyDataset};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Default share of windows used for fitting; the rest are held out
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

/// Fits a regressor per floor with a chronological train/test split
#[derive(Debug, Clone)]
pub struct Trainer<R: SequenceRegressor> {
    regressor: R,
    train_ratio: f64,
}

/// Outcome of training one floor
#[derive(Debug, Clone)]
pub struct TrainedFloor<M> {
    pub floor: String,
    pub model: M,
    pub scaler: MinMaxScaler,
    pub report: TrainingReport,
}

/// Fit quality for one floor, in raw consumption units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub floor: String,
    pub model: String,
    pub train_samples: usize,
    pub test_samples: usize,
    pub train: ForecastAccuracy,
    /// Absent when the split leaves no held-out windows
    pub test: Option<ForecastAccuracy>,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Floor {} ({}):", self.floor, self.model)?;
        writeln!(
            f,
            "  Train: RMSE {:.4}, MAE {:.4} over {} windows",
            self.train.rmse, self.train.mae, self.train_samples
        )?;
        match &self.test {
            Some(test) => writeln!(
                f,
                "  Test:  RMSE {:.4}, MAE {:.4} over {} windows",
                test.rmse, test.mae, self.test_samples
            ),
            None => writeln!(f, "  Test:  no held-out windows"),
        }
    }
}

impl<R: SequenceRegressor> Trainer<R> {
    pub fn new(regressor: R) -> Self {
        Self {
            regressor,
            train_ratio: DEFAULT_TRAIN_RATIO,
        }
    }

    /// Set the share of windows used for fitting
    pub fn with_train_ratio(mut self, train_ratio: f64) -> Result<Self> {
        if !(train_ratio > 0.0 && train_ratio <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Train ratio must be in (0, 1]".to_string(),
            ));
        }
        self.train_ratio = train_ratio;
        Ok(self)
    }

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    /// Fit a scaler and a model on one floor's series
    pub fn train_floor(&self, series: &ConsumptionSeries) -> Result<TrainedFloor<R::Trained>> {
        let window = self.regressor.window_size();
        if series.len() <= window {
            return Err(ForecastError::InsufficientHistory {
                required: window + 1,
                available: series.len(),
            });
        }

        let scaler = MinMaxScaler::fit(series.values())?;
        let normalized = scaler.transform_all(series.values());
        let (inputs, targets) = create_sequences(&normalized, window);

        let (train_inputs, test_inputs) = train_test_split(&inputs, self.train_ratio);
        let (train_targets, test_targets) = train_test_split(&targets, self.train_ratio);

        let model = self.regressor.train(train_inputs, train_targets)?;

        let train = evaluate_one_step(&model, &scaler, train_inputs, train_targets)?;
        let test = if test_inputs.is_empty() {
            None
        } else {
            Some(evaluate_one_step(&model, &scaler, test_inputs, test_targets)?)
        };

        let report = TrainingReport {
            floor: series.floor().to_string(),
            model: model.name().to_string(),
            train_samples: train_inputs.len(),
            test_samples: test_inputs.len(),
            train,
            test,
        };
        info!(
            floor = series.floor(),
            train_rmse = report.train.rmse,
            test_rmse = report.test.as_ref().map(|t| t.rmse),
            "trained floor model"
        );

        Ok(TrainedFloor {
            floor: series.floor().to_string(),
            model,
            scaler,
            report,
        })
    }

    /// Train every floor of a dataset and persist the results.
    ///
    /// Floors too short to form a single training window are skipped with a
    /// warning; any other failure aborts.
    pub fn train_dataset(
        &self,
        dataset: &EnergyDataset,
        store: &ArtifactStore,
    ) -> Result<Vec<TrainingReport>>
    where
        R::Trained: Into<FloorModel>,
    {
        let mut reports = Vec::new();

        for (floor, series) in dataset.all_floor_series()? {
            let trained = match self.train_floor(&series) {
                Ok(trained) => trained,
                Err(ForecastError::InsufficientHistory {
                    required,
                    available,
                }) => {
                    warn!(floor = %floor, required, available, "skipping floor with too little history");
                    continue;
                }
                Err(e) => return Err(e),
            };

            store.save(
                &floor,
                &FloorArtifacts {
                    model: trained.model.into(),
                    scaler: trained.scaler,
                },
            )?;
            reports.push(trained.report);
        }

        info!(floors = reports.len(), "training complete");
        Ok(reports)
    }
}
