use crate::io::TimeUnits;
use crate::types::{CompositeError, CompositeResult};
use chrono::{DateTime, Utc};
use ndarray::ArrayView1;

/// Mean of all ray times in a volume.
///
/// Every ray counts once regardless of which sweep it belongs to.
pub fn mean_timestamp(time: ArrayView1<f64>, units: &str) -> CompositeResult<DateTime<Utc>> {
    if time.is_empty() {
        return Err(CompositeError::EmptyVolume);
    }

    let units = TimeUnits::parse(units)?;
    let stamps = time
        .iter()
        .map(|&t| units.decode(t))
        .collect::<CompositeResult<Vec<_>>>()?;

    mean_of(&stamps).ok_or_else(|| CompositeError::TimeUnits("mean ray time is out of range".to_string()))
}

/// Arithmetic mean of timestamps, at microsecond precision, rounded toward the past.
///
/// `None` only for an empty slice.
pub fn mean_of(stamps: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    if stamps.is_empty() {
        return None;
    }
    // Every representable timestamp fits i64 microseconds; the sum needs i128
    let total: i128 = stamps.iter().map(|t| i128::from(t.timestamp_micros())).sum();
    let mean = i64::try_from(total.div_euclid(stamps.len() as i128)).ok()?;

    DateTime::from_timestamp_micros(mean)
}
