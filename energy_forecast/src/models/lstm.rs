//! Stacked LSTM window regressor
//!
//! Two recurrent layers, the first handing its full output sequence to the
//! second, each followed by dropout, and a dense head on the final hidden
//! state. Built on `candle-nn`. Trained parameters are kept as plain tensors
//! so the model persists as JSON next to the floor's scaler.
//!
//! Initial weights, batch order and dropout masks all come from one seeded
//! `StdRng`, so training the same data with the same seed gives the same model.

use crate::error::{ForecastError, Result};
use crate::models::{check_training_set, check_window, SequenceRegressor, WindowModel};
use candle_core::{DType, Device, Tensor};
use candle_nn::{
    AdamW, LSTMConfig, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap, LSTM, RNN,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::PoisonError;
use tracing::debug;

pub const DEFAULT_FIRST_HIDDEN: usize = 100;
pub const DEFAULT_SECOND_HIDDEN: usize = 50;
pub const DEFAULT_DROPOUT: f32 = 0.2;
pub const DEFAULT_EPOCHS: usize = 50;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
pub const DEFAULT_SEED: u64 = 42;

/// Windows evaluated per forward pass when predicting in bulk
const PREDICT_CHUNK: usize = 256;

/// Shape of the network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LstmLayout {
    pub window_size: usize,
    pub first_hidden: usize,
    pub second_hidden: usize,
    pub dropout: f32,
}

/// Untrained stacked LSTM configuration
#[derive(Debug, Clone)]
pub struct LstmWindowRegressor {
    name: String,
    layout: LstmLayout,
    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    seed: u64,
}

impl LstmWindowRegressor {
    /// Create a regressor with 100 and 50 hidden units, 20 % dropout,
    /// 50 epochs of batch 32 at learning rate 0.001
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        let mut regressor = Self {
            name: String::new(),
            layout: LstmLayout {
                window_size,
                first_hidden: DEFAULT_FIRST_HIDDEN,
                second_hidden: DEFAULT_SECOND_HIDDEN,
                dropout: DEFAULT_DROPOUT,
            },
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: DEFAULT_SEED,
        };
        regressor.rename();
        Ok(regressor)
    }

    /// Set the hidden units of both recurrent layers
    pub fn with_hidden(mut self, first: usize, second: usize) -> Result<Self> {
        if first == 0 || second == 0 {
            return Err(ForecastError::InvalidParameter(
                "Hidden sizes must be positive".to_string(),
            ));
        }
        self.layout.first_hidden = first;
        self.layout.second_hidden = second;
        self.rename();
        Ok(self)
    }

    /// Set the dropout rate applied after each recurrent layer
    pub fn with_dropout(mut self, dropout: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&dropout) {
            return Err(ForecastError::InvalidParameter(
                "Dropout must be in [0, 1)".to_string(),
            ));
        }
        self.layout.dropout = dropout;
        self.rename();
        Ok(self)
    }

    pub fn with_epochs(mut self, epochs: usize) -> Result<Self> {
        if epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "Epochs must be positive".to_string(),
            ));
        }
        self.epochs = epochs;
        Ok(self)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Batch size must be positive".to_string(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Result<Self> {
        if learning_rate <= 0.0 || !learning_rate.is_finite() {
            return Err(ForecastError::InvalidParameter(
                "Learning rate must be a positive number".to_string(),
            ));
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn layout(&self) -> LstmLayout {
        self.layout
    }

    fn rename(&mut self) {
        self.name = format!(
            "Stacked LSTM (window={}, hidden={}/{}, dropout={})",
            self.layout.window_size,
            self.layout.first_hidden,
            self.layout.second_hidden,
            self.layout.dropout
        );
    }
}

impl SequenceRegressor for LstmWindowRegressor {
    type Trained = TrainedLstmWindow;

    fn train(&self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        check_training_set(self.layout.window_size, inputs, targets)?;

        let device = Device::Cpu;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let varmap = VarMap::new();
        let network = LstmNetwork::new(
            &self.layout,
            VarBuilder::from_varmap(&varmap, DType::F32, &device),
        )?;
        initialize(&varmap, &self.layout, &mut rng)?;

        let params = ParamsAdamW {
            lr: self.learning_rate,
            weight_decay: 0.0,
            ..ParamsAdamW::default()
        };
        let mut optimizer = AdamW::new(varmap.all_vars(), params)?;

        let mut order: Vec<usize> = (0..inputs.len()).collect();
        for epoch in 1..=self.epochs {
            order.shuffle(&mut rng);

            let mut total_loss = 0.0;
            let mut batches = 0;
            for batch in order.chunks(self.batch_size) {
                let xs = window_tensor(batch.iter().map(|&i| inputs[i].as_slice()), &device)?;
                let ys = Tensor::from_vec(
                    batch.iter().map(|&i| targets[i] as f32).collect::<Vec<_>>(),
                    (batch.len(), 1),
                    &device,
                )?;

                let predictions = network.forward(&xs, Some(&mut rng))?;
                let loss = candle_nn::loss::mse(&predictions, &ys)?;
                optimizer.backward_step(&loss)?;

                total_loss += loss.to_scalar::<f32>()? as f64;
                batches += 1;
            }

            let epoch_loss = total_loss / batches as f64;
            if !epoch_loss.is_finite() {
                return Err(ForecastError::TrainingError(format!(
                    "Loss diverged at epoch {}",
                    epoch
                )));
            }
            debug!(epoch, loss = epoch_loss, "lstm epoch");
        }

        TrainedLstmWindow::from_snapshot(LstmSnapshot {
            name: self.name.clone(),
            layout: self.layout,
            parameters: snapshot_parameters(&varmap)?,
        })
    }

    fn window_size(&self) -> usize {
        self.layout.window_size
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Two LSTM layers with dropout and a dense head
#[derive(Debug, Clone)]
struct LstmNetwork {
    first: LSTM,
    second: LSTM,
    head: Linear,
    dropout: f32,
}

impl LstmNetwork {
    fn new(layout: &LstmLayout, vb: VarBuilder) -> Result<Self> {
        let first = candle_nn::lstm(1, layout.first_hidden, LSTMConfig::default(), vb.pp("first"))?;
        let second = candle_nn::lstm(
            layout.first_hidden,
            layout.second_hidden,
            LSTMConfig::default(),
            vb.pp("second"),
        )?;
        let head = candle_nn::linear(layout.second_hidden, 1, vb.pp("head"))?;

        Ok(Self {
            first,
            second,
            head,
            dropout: layout.dropout,
        })
    }

    /// `xs` is `(batch, window, 1)`; returns `(batch, 1)`.
    /// Dropout is applied only when a mask rng is given.
    fn forward(&self, xs: &Tensor, mut masks: Option<&mut StdRng>) -> Result<Tensor> {
        let states = self.first.seq(xs)?;
        let sequence = self.first.states_to_tensor(&states)?;
        let sequence = dropout(&sequence, self.dropout, masks.as_deref_mut())?;

        let states = self.second.seq(&sequence)?;
        let last = states
            .last()
            .map(|state| state.h().clone())
            .ok_or_else(|| ForecastError::ValidationError("Empty input window".to_string()))?;
        let last = dropout(&last, self.dropout, masks)?;

        Ok(self.head.forward(&last)?)
    }
}

fn dropout(xs: &Tensor, rate: f32, masks: Option<&mut StdRng>) -> Result<Tensor> {
    match masks {
        Some(rng) if rate > 0.0 => {
            let keep = 1.0 / (1.0 - rate);
            let mask: Vec<f32> = (0..xs.elem_count())
                .map(|_| if rng.gen::<f32>() < rate { 0.0 } else { keep })
                .collect();
            let mask = Tensor::from_vec(mask, xs.dims().to_vec(), xs.device())?;
            Ok(xs.mul(&mask)?)
        }
        _ => Ok(xs.clone()),
    }
}

/// Stack windows into a `(count, window, 1)` tensor
fn window_tensor<'a, I>(windows: I, device: &Device) -> Result<Tensor>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut count = 0;
    let mut width = 0;
    let mut flat = Vec::new();
    for window in windows {
        count += 1;
        width = window.len();
        flat.extend(window.iter().map(|&v| v as f32));
    }
    Ok(Tensor::from_vec(flat, (count, width, 1), device)?)
}

/// Overwrite every parameter with uniform draws in `±1/sqrt(hidden)` of its layer
fn initialize(varmap: &VarMap, layout: &LstmLayout, rng: &mut StdRng) -> Result<()> {
    let vars = varmap.data().lock().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<&String> = vars.keys().collect();
    names.sort();

    for name in names {
        let var = &vars[name];
        let hidden = if name.starts_with("first") {
            layout.first_hidden
        } else {
            layout.second_hidden
        };
        let bound = 1.0 / (hidden as f32).sqrt();
        let values: Vec<f32> = (0..var.elem_count())
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        var.set(&Tensor::from_vec(values, var.dims().to_vec(), var.device())?)?;
    }
    Ok(())
}

fn snapshot_parameters(varmap: &VarMap) -> Result<BTreeMap<String, StoredTensor>> {
    let vars = varmap.data().lock().unwrap_or_else(PoisonError::into_inner);
    vars.iter()
        .map(|(name, var)| -> Result<(String, StoredTensor)> {
            let tensor = var.as_tensor();
            Ok((
                name.clone(),
                StoredTensor {
                    shape: tensor.dims().to_vec(),
                    values: tensor.flatten_all()?.to_vec1::<f32>()?,
                },
            ))
        })
        .collect()
}

/// One named parameter tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTensor {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

/// Persisted form of a trained network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmSnapshot {
    pub name: String,
    pub layout: LstmLayout,
    pub parameters: BTreeMap<String, StoredTensor>,
}

/// Trained stacked LSTM
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "LstmSnapshot", into = "LstmSnapshot")]
pub struct TrainedLstmWindow {
    snapshot: LstmSnapshot,
    network: LstmNetwork,
}

impl TrainedLstmWindow {
    /// Rebuild the network from stored parameters
    pub fn from_snapshot(snapshot: LstmSnapshot) -> Result<Self> {
        if snapshot.layout.window_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        let device = Device::Cpu;
        let tensors = snapshot
            .parameters
            .iter()
            .map(|(name, stored)| -> Result<(String, Tensor)> {
                let tensor =
                    Tensor::from_slice(&stored.values, stored.shape.clone(), &device)?;
                Ok((name.clone(), tensor))
            })
            .collect::<Result<HashMap<String, Tensor>>>()?;

        let network = LstmNetwork::new(
            &snapshot.layout,
            VarBuilder::from_tensors(tensors, DType::F32, &device),
        )?;
        Ok(Self { snapshot, network })
    }

    pub fn layout(&self) -> LstmLayout {
        self.snapshot.layout
    }

    pub fn snapshot(&self) -> &LstmSnapshot {
        &self.snapshot
    }
}

impl TryFrom<LstmSnapshot> for TrainedLstmWindow {
    type Error = ForecastError;

    fn try_from(snapshot: LstmSnapshot) -> Result<Self> {
        Self::from_snapshot(snapshot)
    }
}

impl From<TrainedLstmWindow> for LstmSnapshot {
    fn from(model: TrainedLstmWindow) -> Self {
        model.snapshot
    }
}

impl PartialEq for TrainedLstmWindow {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot == other.snapshot
    }
}

impl fmt::Debug for TrainedLstmWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedLstmWindow")
            .field("name", &self.snapshot.name)
            .field("layout", &self.snapshot.layout)
            .field("parameters", &self.snapshot.parameters.len())
            .finish()
    }
}

impl WindowModel for TrainedLstmWindow {
    fn predict_next(&self, window: &[f64]) -> Result<f64> {
        check_window(self.snapshot.layout.window_size, window)?;
        let xs = window_tensor([window], &Device::Cpu)?;
        let output = self.network.forward(&xs, None)?.flatten_all()?.to_vec1::<f32>()?;
        output
            .first()
            .map(|&v| v as f64)
            .ok_or_else(|| ForecastError::ValidationError("Network produced no output".to_string()))
    }

    fn window_size(&self) -> usize {
        self.snapshot.layout.window_size
    }

    fn name(&self) -> &str {
        &self.snapshot.name
    }

    fn predict_batch(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let expected = self.snapshot.layout.window_size;
        windows.iter().try_for_each(|w| check_window(expected, w))?;

        let mut predictions = Vec::with_capacity(windows.len());
        for chunk in windows.chunks(PREDICT_CHUNK) {
            let xs = window_tensor(chunk.iter().map(Vec::as_slice), &Device::Cpu)?;
            let output = self.network.forward(&xs, None)?.flatten_all()?.to_vec1::<f32>()?;
            predictions.extend(output.into_iter().map(f64::from));
        }
        Ok(predictions)
    }
}
