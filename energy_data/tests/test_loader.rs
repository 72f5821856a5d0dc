use approx::assert_abs_diff_eq;
use chrono::{NaiveDate, NaiveDateTime};
use energy_data::appliances::read_appliance_data;
use energy_data::synth::{synthesize, write_dataset_file, SynthesisRule};
use energy_data::{DataError, DataLoader};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use tempfile::NamedTempFile;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn appliance_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Floor,Appliance,Quantity,Power Rating,Time Duration,Consumption").unwrap();
    writeln!(file, "1,Fan,4,0.075,8,2.4").unwrap();
    writeln!(file, "1,Light,10,0.04,4,1.6").unwrap();
    writeln!(file, "2,Computer,5,0.2,10,10").unwrap();
    file
}

#[test]
fn test_synthesized_dataset_loads_back() {
    let metadata = appliance_file();
    let appliances = read_appliance_data(metadata.path()).unwrap();
    assert_eq!(appliances.len(), 3);

    let mut rng = StdRng::seed_from_u64(3);
    let readings = synthesize(
        &appliances,
        at(1, 0),
        at(3, 23),
        &SynthesisRule::default(),
        &mut rng,
    )
    .unwrap();

    let dataset_file = NamedTempFile::new().unwrap();
    write_dataset_file(&readings, dataset_file.path()).unwrap();

    let dataset = DataLoader::from_csv(dataset_file.path()).unwrap();
    assert_eq!(dataset.len(), 72 * 3);
    assert_eq!(dataset.floors(), vec!["1".to_string(), "2".to_string()]);

    let series = dataset.floor_series("1").unwrap();
    assert_eq!(series.len(), 72);
    assert_eq!(series.first_timestamp(), at(1, 0));
    assert_eq!(series.last_timestamp(), at(3, 23));

    // Fan: 2.4 / 8 for hours 8..16, Light: 1.6 / 4 for hours 8..12
    assert_abs_diff_eq!(series.value_at(at(2, 9)).unwrap(), 0.7, epsilon = 1e-9);
    assert_abs_diff_eq!(series.value_at(at(2, 14)).unwrap(), 0.3, epsilon = 1e-9);
    assert_eq!(series.value_at(at(2, 20)), Some(0.0));
}

#[test]
fn test_loader_accepts_pandas_layout() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "datetime,day,energy_consumption,floor_no,appliance_name").unwrap();
    writeln!(file, "2023-01-01 00:00:00,Sunday,1.5,A,Fan").unwrap();
    writeln!(file, "2023-01-01 02:00:00,Sunday,2.5,A,Fan").unwrap();

    let dataset = DataLoader::from_csv(file.path()).unwrap();
    let series = dataset.floor_series("A").unwrap();

    assert_eq!(series.values(), &[1.5, 0.0, 2.5]);
}

#[test]
fn test_loader_error_handling() {
    assert!(matches!(
        DataLoader::from_csv("nonexistent_dataset.csv"),
        Err(DataError::IoError(_))
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "when,how_much").unwrap();
    writeln!(file, "2023-01-01,1.0").unwrap();
    assert!(DataLoader::from_csv(file.path()).is_err());
}

#[test]
fn test_unknown_floor_series() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "datetime,floor,appliance,energy_consumption").unwrap();
    writeln!(file, "2023-01-01T00:00:00,1,Fan,1.0").unwrap();

    let dataset = DataLoader::from_csv(file.path()).unwrap();
    assert!(dataset.floor_series("7").is_err());
}
