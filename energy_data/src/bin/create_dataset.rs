use clap::{Parser, ValueEnum};
use energy_data::appliances::read_appliance_data;
use energy_data::parse_datetime;
use energy_data::synth::{synthesize, write_dataset_file, SynthesisRule};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Rule {
    /// Appliances run on the office schedule
    WorkingHours,
    /// Random class sessions and duty cycles
    Occupancy,
}

/// Synthesize a per-appliance, per-hour energy dataset
#[derive(Parser, Debug)]
#[command(name = "create_dataset")]
#[command(version)]
struct Args {
    /// Appliance metadata CSV
    #[arg(short, long, default_value = "appliances.csv")]
    appliances: PathBuf,

    /// Output dataset CSV
    #[arg(short, long, default_value = "energy_consumption_dataset.csv")]
    output: PathBuf,

    /// First hour of the dataset
    #[arg(long, default_value = "2023-01-01T00:00:00")]
    start: String,

    /// Last hour of the dataset (inclusive)
    #[arg(long, default_value = "2023-12-31T23:00:00")]
    end: String,

    /// Consumption rule
    #[arg(long, value_enum, default_value_t = Rule::WorkingHours)]
    rule: Rule,

    /// Probability of a session each hour (occupancy rule)
    #[arg(long, default_value_t = 0.5)]
    session_probability: f64,

    /// Seed for the occupancy rule
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "energy_data=info,create_dataset=info".into()),
        )
        .init();

    let args = Args::parse();

    let appliances = read_appliance_data(&args.appliances)?;
    info!(
        path = %args.appliances.display(),
        appliances = appliances.len(),
        "read appliance metadata"
    );

    let rule = match args.rule {
        Rule::WorkingHours => SynthesisRule::default(),
        Rule::Occupancy => SynthesisRule::Occupancy {
            session_probability: args.session_probability,
        },
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let start = parse_datetime(&args.start)?;
    let end = parse_datetime(&args.end)?;
    let readings = synthesize(&appliances, start, end, &rule, &mut rng)?;

    write_dataset_file(&readings, &args.output)?;
    info!(path = %args.output.display(), rows = readings.len(), "dataset created");

    Ok(())
}
