//! Synthetic per-appliance, per-hour energy datasets
//!
//! Two rules decide whether an appliance draws power in a given hour:
//! - [`SynthesisRule::WorkingHours`]: deterministic office schedule
//! - [`SynthesisRule::Occupancy`]: random class sessions and duty cycles

use crate::appliances::ApplianceSpec;
use crate::{DataError, Reading, Result};
use chrono::{Duration, NaiveDateTime, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Rule used to decide per-hour appliance consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynthesisRule {
    /// Appliances run from `start_hour` for their listed duration, never past `end_hour`
    WorkingHours { start_hour: u32, end_hour: u32 },
    /// Each hour a building-wide session is in progress with `session_probability`
    Occupancy { session_probability: f64 },
}

impl Default for SynthesisRule {
    fn default() -> Self {
        SynthesisRule::WorkingHours {
            start_hour: 8,
            end_hour: 18,
        }
    }
}

impl SynthesisRule {
    /// Occupancy rule with an even chance of a session each hour
    pub fn occupancy() -> Self {
        SynthesisRule::Occupancy {
            session_probability: 0.5,
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            SynthesisRule::WorkingHours {
                start_hour,
                end_hour,
            } => {
                if start_hour > end_hour || end_hour > 23 {
                    return Err(DataError::InvalidData(format!(
                        "Working hours {}..={} are not a valid range within a day",
                        start_hour, end_hour
                    )));
                }
            }
            SynthesisRule::Occupancy {
                session_probability,
            } => {
                if !(0.0..=1.0).contains(&session_probability) {
                    return Err(DataError::InvalidData(
                        "Session probability must be between 0 and 1".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Working-hours draw: the rated consumption spread evenly over the active hours
fn working_hours_draw(spec: &ApplianceSpec, hour: u32, start_hour: u32, end_hour: u32) -> f64 {
    let duration = match spec.time_duration {
        Some(d) if d > 0.0 => d,
        _ => return 0.0,
    };

    let working = (start_hour..=end_hour).contains(&hour);
    if working && (hour as f64) < start_hour as f64 + duration {
        spec.consumption / duration
    } else {
        0.0
    }
}

/// Occupancy draw: unknown-duration appliances follow the session,
/// the rest switch on with probability `duration / 24`
fn occupancy_draw<R: Rng + ?Sized>(spec: &ApplianceSpec, in_session: bool, rng: &mut R) -> f64 {
    let on = match spec.time_duration {
        None => in_session,
        Some(duration) => rng.gen::<f64>() < (duration / 24.0).clamp(0.0, 1.0),
    };

    if on {
        spec.running_load()
    } else {
        0.0
    }
}

/// Build one reading per (hour, appliance) over the inclusive range `[start, end]`.
///
/// Both bounds are truncated to the whole hour.
pub fn synthesize<R: Rng + ?Sized>(
    appliances: &[ApplianceSpec],
    start: NaiveDateTime,
    end: NaiveDateTime,
    rule: &SynthesisRule,
    rng: &mut R,
) -> Result<Vec<Reading>> {
    rule.validate()?;

    let start = truncate_to_hour(start);
    let end = truncate_to_hour(end);
    if end < start {
        return Err(DataError::InvalidData(format!(
            "End {} is before start {}",
            end, start
        )));
    }

    let hours = (end - start).num_hours() as usize + 1;
    let mut readings = Vec::with_capacity(hours * appliances.len());

    for step in 0..hours {
        let datetime = start + Duration::hours(step as i64);
        let hour = datetime.hour();

        // One coin flip per hour for the whole building
        let in_session = match *rule {
            SynthesisRule::Occupancy {
                session_probability,
            } => rng.gen::<f64>() < session_probability,
            SynthesisRule::WorkingHours { .. } => false,
        };

        for spec in appliances {
            let energy_consumption = match *rule {
                SynthesisRule::WorkingHours {
                    start_hour,
                    end_hour,
                } => working_hours_draw(spec, hour, start_hour, end_hour),
                SynthesisRule::Occupancy { .. } => occupancy_draw(spec, in_session, rng),
            };

            readings.push(Reading {
                datetime,
                floor: spec.floor.clone(),
                appliance: spec.appliance.clone(),
                energy_consumption,
            });
        }
    }

    info!(
        hours,
        appliances = appliances.len(),
        rows = readings.len(),
        "synthesized energy dataset"
    );

    Ok(readings)
}

/// Write readings as `datetime,floor,appliance,energy_consumption`
pub fn write_dataset<W: Write>(readings: &[Reading], sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    for reading in readings {
        writer.serialize(reading)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write readings to a CSV file
pub fn write_dataset_file<P: AsRef<Path>>(readings: &[Reading], path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_dataset(readings, std::io::BufWriter::new(file))
}

/// Drop minutes, seconds and sub-seconds
pub fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn spec(duration: Option<f64>) -> ApplianceSpec {
        ApplianceSpec {
            floor: "1".to_string(),
            appliance: "Fan".to_string(),
            quantity: Some(2.0),
            power_rating: Some(0.5),
            time_duration: duration,
            consumption: 8.0,
        }
    }

    // 8, 9, 10, 11 are on for a 4 hour duration; 18 is the last working hour
    #[rstest]
    #[case(4.0, 7, 0.0)]
    #[case(4.0, 8, 2.0)]
    #[case(4.0, 11, 2.0)]
    #[case(4.0, 12, 0.0)]
    #[case(16.0, 18, 0.5)]
    #[case(16.0, 19, 0.0)]
    fn test_working_hours_draw(#[case] duration: f64, #[case] hour: u32, #[case] expected: f64) {
        assert_eq!(working_hours_draw(&spec(Some(duration)), hour, 8, 18), expected);
    }

    #[test]
    fn test_unknown_duration_never_runs_on_schedule() {
        assert_eq!(working_hours_draw(&spec(None), 9, 8, 18), 0.0);
    }

    #[test]
    fn test_synthesize_row_count_and_order() {
        let appliances = vec![spec(Some(4.0)), spec(None)];
        let mut rng = StdRng::seed_from_u64(7);

        let readings = synthesize(
            &appliances,
            at(1, 0),
            at(2, 23),
            &SynthesisRule::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(readings.len(), 48 * 2);
        assert_eq!(readings[0].datetime, at(1, 0));
        assert_eq!(readings[2].datetime, at(1, 1));
        assert_eq!(readings.last().unwrap().datetime, at(2, 23));

        let daily: f64 = readings
            .iter()
            .filter(|r| r.datetime.date() == at(1, 0).date())
            .map(|r| r.energy_consumption)
            .sum();
        assert!((daily - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_occupancy_is_reproducible_with_seed() {
        let appliances = vec![spec(Some(12.0)), spec(None)];
        let rule = SynthesisRule::occupancy();

        let first = synthesize(&appliances, at(1, 0), at(3, 0), &rule, &mut StdRng::seed_from_u64(42))
            .unwrap();
        let second = synthesize(&appliances, at(1, 0), at(3, 0), &rule, &mut StdRng::seed_from_u64(42))
            .unwrap();

        assert_eq!(first, second);
        for reading in &first {
            assert!(reading.energy_consumption == 0.0 || reading.energy_consumption == 1.0);
        }
    }

    #[test]
    fn test_occupancy_extremes() {
        let follower = vec![spec(None)];
        let mut rng = StdRng::seed_from_u64(1);

        let always = SynthesisRule::Occupancy {
            session_probability: 1.0,
        };
        let readings = synthesize(&follower, at(1, 0), at(1, 5), &always, &mut rng).unwrap();
        assert!(readings.iter().all(|r| r.energy_consumption == 1.0));

        let never = SynthesisRule::Occupancy {
            session_probability: 0.0,
        };
        let readings = synthesize(&follower, at(1, 0), at(1, 5), &never, &mut rng).unwrap();
        assert!(readings.iter().all(|r| r.energy_consumption == 0.0));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = synthesize(
            &[spec(Some(1.0))],
            at(2, 0),
            at(1, 0),
            &SynthesisRule::default(),
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_write_dataset_header() {
        let readings = vec![Reading {
            datetime: at(1, 8),
            floor: "1".to_string(),
            appliance: "Fan".to_string(),
            energy_consumption: 2.0,
        }];

        let mut out = Vec::new();
        write_dataset(&readings, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("datetime,floor,appliance,energy_consumption\n"));
        assert!(text.contains("2023-01-01T08:00:00,1,Fan,2.0"));
    }
}
