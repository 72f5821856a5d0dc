use clap::{Parser, ValueEnum};
use energy_data::DataLoader;
use energy_forecast::models::lstm::{
    DEFAULT_BATCH_SIZE, DEFAULT_DROPOUT, DEFAULT_EPOCHS, DEFAULT_FIRST_HIDDEN,
    DEFAULT_LEARNING_RATE, DEFAULT_SECOND_HIDDEN, DEFAULT_SEED,
};
use energy_forecast::models::{
    LinearWindowRegressor, LstmWindowRegressor, MovingAverage, WINDOW_SIZE,
};
use energy_forecast::trainer::DEFAULT_TRAIN_RATIO;
use energy_forecast::{ArtifactStore, Trainer};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelKind {
    /// Two stacked LSTM layers with dropout and a dense head
    Lstm,
    /// Ridge-penalized linear regressor over the window
    Linear,
    /// Mean of the most recent hours
    MovingAverage,
}

/// Train and persist one forecasting model per floor
#[derive(Parser, Debug)]
#[command(name = "train_models")]
#[command(version)]
struct Args {
    /// Energy dataset CSV
    #[arg(short, long, default_value = "energy_consumption_dataset.csv")]
    dataset: PathBuf,

    /// Directory receiving model and scaler files
    #[arg(short, long, default_value = "models")]
    models_dir: PathBuf,

    /// Model to train
    #[arg(long, value_enum, default_value_t = ModelKind::Lstm)]
    model: ModelKind,

    /// Hours in each input window
    #[arg(long, default_value_t = WINDOW_SIZE)]
    window: usize,

    /// Share of windows used for fitting
    #[arg(long, default_value_t = DEFAULT_TRAIN_RATIO)]
    train_ratio: f64,

    /// Hidden units of the first LSTM layer
    #[arg(long, default_value_t = DEFAULT_FIRST_HIDDEN)]
    first_hidden: usize,

    /// Hidden units of the second LSTM layer
    #[arg(long, default_value_t = DEFAULT_SECOND_HIDDEN)]
    second_hidden: usize,

    /// Dropout after each LSTM layer
    #[arg(long, default_value_t = DEFAULT_DROPOUT)]
    dropout: f32,

    /// Passes over the training windows
    #[arg(long, default_value_t = DEFAULT_EPOCHS)]
    epochs: usize,

    /// Windows per optimizer step
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = DEFAULT_LEARNING_RATE)]
    learning_rate: f64,

    /// Seed for weights, batch order and dropout
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Ridge penalty for the linear model
    #[arg(long, default_value_t = 1e-3)]
    l2_penalty: f64,

    /// Hours averaged by the moving average model
    #[arg(long, default_value_t = 3)]
    span: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "energy_forecast=info,train_models=info".into()),
        )
        .init();

    let args = Args::parse();

    let dataset = DataLoader::from_csv(&args.dataset)?;
    info!(
        path = %args.dataset.display(),
        rows = dataset.len(),
        floors = dataset.floors().len(),
        "loaded dataset"
    );

    let store = ArtifactStore::new(&args.models_dir);
    let reports = match args.model {
        ModelKind::Lstm => {
            let regressor = LstmWindowRegressor::new(args.window)?
                .with_hidden(args.first_hidden, args.second_hidden)?
                .with_dropout(args.dropout)?
                .with_epochs(args.epochs)?
                .with_batch_size(args.batch_size)?
                .with_learning_rate(args.learning_rate)?
                .with_seed(args.seed);
            Trainer::new(regressor)
                .with_train_ratio(args.train_ratio)?
                .train_dataset(&dataset, &store)?
        }
        ModelKind::Linear => Trainer::new(LinearWindowRegressor::new(args.window, args.l2_penalty)?)
            .with_train_ratio(args.train_ratio)?
            .train_dataset(&dataset, &store)?,
        ModelKind::MovingAverage => Trainer::new(MovingAverage::new(args.window, args.span)?)
            .with_train_ratio(args.train_ratio)?
            .train_dataset(&dataset, &store)?,
    };

    for report in &reports {
        print!("{}", report);
    }
    info!(
        floors = reports.len(),
        dir = %args.models_dir.display(),
        "models saved"
    );

    Ok(())
}
