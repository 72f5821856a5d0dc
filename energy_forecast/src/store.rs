//! Per-floor model and scaler persistence
//!
//! Each floor owns two JSON files in the models directory,
//! `model_floor_<key>.json` and `scaler_floor_<key>.json`. A floor is only
//! forecastable when both exist.

use crate::error::{ForecastError, Result};
use crate::models::FloorModel;
use crate::scaler::MinMaxScaler;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// A floor's trained model together with the scaler it was trained under
#[derive(Debug, Clone, PartialEq)]
pub struct FloorArtifacts {
    pub model: FloorModel,
    pub scaler: MinMaxScaler,
}

/// Directory of persisted artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Use `root` as the models directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Models directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File-name key for a floor id
    pub fn floor_key(floor: &str) -> String {
        floor
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }

    /// Path of a floor's model file
    pub fn model_path(&self, floor: &str) -> PathBuf {
        self.root
            .join(format!("model_floor_{}.json", Self::floor_key(floor)))
    }

    /// Path of a floor's scaler file
    pub fn scaler_path(&self, floor: &str) -> PathBuf {
        self.root
            .join(format!("scaler_floor_{}.json", Self::floor_key(floor)))
    }

    /// Whether both files for the floor exist
    pub fn contains(&self, floor: &str) -> bool {
        self.model_path(floor).is_file() && self.scaler_path(floor).is_file()
    }

    /// Persist a floor's artifacts, creating the directory if needed
    pub fn save(&self, floor: &str, artifacts: &FloorArtifacts) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        write_json(&self.model_path(floor), &artifacts.model)?;
        write_json(&self.scaler_path(floor), &artifacts.scaler)?;
        info!(floor, dir = %self.root.display(), "saved floor artifacts");
        Ok(())
    }

    /// Load a floor's artifacts
    pub fn load(&self, floor: &str) -> Result<FloorArtifacts> {
        if !self.contains(floor) {
            return Err(ForecastError::UnknownFloor(floor.to_string()));
        }
        let model = read_json(&self.model_path(floor))?;
        let scaler = read_json(&self.scaler_path(floor))?;
        debug!(floor, "loaded floor artifacts");
        Ok(FloorArtifacts { model, scaler })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Load-once cache in front of an [`ArtifactStore`]
#[derive(Debug)]
pub struct ArtifactCache {
    store: ArtifactStore,
    loaded: RwLock<HashMap<String, Arc<FloorArtifacts>>>,
}

impl ArtifactCache {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Artifacts for a floor, reading the store only on first use
    pub fn get(&self, floor: &str) -> Result<Arc<FloorArtifacts>> {
        {
            let loaded = self.loaded.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(artifacts) = loaded.get(floor) {
                return Ok(Arc::clone(artifacts));
            }
        }

        let artifacts = Arc::new(self.store.load(floor)?);
        let mut loaded = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        let entry = loaded
            .entry(floor.to_string())
            .or_insert_with(|| Arc::clone(&artifacts));
        Ok(Arc::clone(entry))
    }

    /// Number of floors currently cached
    pub fn len(&self) -> usize {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
