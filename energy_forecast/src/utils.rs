//! Utility functions for the energy_forecast crate

use chrono::{Duration, NaiveDateTime, Timelike};

/// Split time-ordered data into training and test parts.
///
/// The training part keeps at least one element whenever `data` is non-empty.
pub fn train_test_split<T>(data: &[T], train_ratio: f64) -> (&[T], &[T]) {
    let ratio = train_ratio.clamp(0.0, 1.0);
    let split = ((data.len() as f64 * ratio).round() as usize)
        .min(data.len())
        .max(data.len().min(1));
    data.split_at(split)
}

/// Sliding windows of `seq_len` values, each paired with the value that follows it
pub fn create_sequences(data: &[f64], seq_len: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    if seq_len == 0 || data.len() <= seq_len {
        return (Vec::new(), Vec::new());
    }

    data.windows(seq_len + 1)
        .map(|w| (w[..seq_len].to_vec(), w[seq_len]))
        .unzip()
}

/// Truncate a timestamp down to its hour
pub fn floor_to_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    energy_data::synth::truncate_to_hour(timestamp)
}

/// Round a timestamp up to the next whole hour unless already aligned
pub fn ceil_to_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    if is_hour_aligned(timestamp) {
        timestamp
    } else {
        floor_to_hour(timestamp) + Duration::hours(1)
    }
}

/// Whether a timestamp sits exactly on an hour
pub fn is_hour_aligned(timestamp: NaiveDateTime) -> bool {
    timestamp.minute() == 0 && timestamp.second() == 0 && timestamp.nanosecond() == 0
}

/// Create hourly timestamps following `last`
pub fn future_hours(last: NaiveDateTime, horizon: usize) -> Vec<NaiveDateTime> {
    (1..=horizon as i64)
        .map(|h| last + Duration::hours(h))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_train_test_split() {
        let data: Vec<f64> = (0..10).map(f64::from).collect();
        let (train, test) = train_test_split(&data, 0.8);
        assert_eq!(train.len(), 8);
        assert_eq!(test, &[8.0, 9.0]);

        let (train, test) = train_test_split(&data, 1.0);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());

        let (train, _) = train_test_split(&data[..2], 0.1);
        assert_eq!(train, &[0.0]);
    }

    #[test]
    fn test_create_sequences() {
        let (inputs, targets) = create_sequences(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(inputs, vec![vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0]]);
        assert_eq!(targets, vec![4.0, 5.0]);

        let (inputs, targets) = create_sequences(&[1.0, 2.0, 3.0], 3);
        assert!(inputs.is_empty() && targets.is_empty());
    }

    #[test]
    fn test_hour_rounding() {
        assert_eq!(floor_to_hour(at(5, 30)), at(5, 0));
        assert_eq!(ceil_to_hour(at(5, 30)), at(6, 0));
        assert_eq!(ceil_to_hour(at(5, 0)), at(5, 0));
        assert!(is_hour_aligned(at(7, 0)));
        assert!(!is_hour_aligned(at(7, 1)));
    }

    #[test]
    fn test_future_hours() {
        assert_eq!(future_hours(at(22, 0), 2), vec![at(23, 0), at(0, 0) + Duration::days(1)]);
    }
}
