//! Forecasting against persisted artifacts and loaded floor histories

use crate::engine::{forecast, ForecastOutcome, ForecastRequest};
use crate::error::{ForecastError, Result};
use crate::store::{ArtifactCache, ArtifactStore};
use energy_data::{ConsumptionSeries, EnergyDataset};
use std::collections::BTreeMap;

/// Binds the artifact cache to the known history of every floor
#[derive(Debug)]
pub struct ForecastService {
    artifacts: ArtifactCache,
    histories: BTreeMap<String, ConsumptionSeries>,
}

impl ForecastService {
    pub fn new(store: ArtifactStore, histories: BTreeMap<String, ConsumptionSeries>) -> Self {
        Self {
            artifacts: ArtifactCache::new(store),
            histories,
        }
    }

    /// Build histories for every floor in `dataset`
    pub fn from_dataset(store: ArtifactStore, dataset: &EnergyDataset) -> Result<Self> {
        Ok(Self::new(store, dataset.all_floor_series()?))
    }

    /// Floors with known history
    pub fn floors(&self) -> Vec<String> {
        self.histories.keys().cloned().collect()
    }

    /// Known history for a floor
    pub fn history(&self, floor: &str) -> Option<&ConsumptionSeries> {
        self.histories.get(floor)
    }

    /// Forecast a request.
    ///
    /// Artifacts are resolved first, so a floor without a trained model is
    /// `UnknownFloor` whether or not history exists for it.
    pub fn forecast(&self, request: &ForecastRequest) -> Result<ForecastOutcome> {
        let artifacts = self.artifacts.get(request.floor())?;
        let history = self
            .history(request.floor())
            .ok_or_else(|| ForecastError::UnknownFloor(request.floor().to_string()))?;

        forecast(request, history, &artifacts.model, &artifacts.scaler)
    }
}
