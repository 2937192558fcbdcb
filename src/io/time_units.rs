use crate::types::{CompositeError, CompositeResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Time offsets described by a CF-style `"<unit> since <epoch>"` string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    /// Microseconds per unit
    scale_us: f64,
    epoch: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse a units descriptor such as `"seconds since 2014-05-20T17:30:02Z"`
    pub fn parse(units: &str) -> CompositeResult<Self> {
        let pattern = Regex::new(r"(?i)^\s*([a-z]+)\s+since\s+(.+?)\s*$")
            .map_err(|e| CompositeError::TimeUnits(format!("Regex error: {}", e)))?;

        let captures = pattern.captures(units).ok_or_else(|| {
            CompositeError::TimeUnits(format!("'{}' is not of the form '<unit> since <epoch>'", units))
        })?;

        let scale_us = Self::unit_scale(&captures[1])
            .ok_or_else(|| CompositeError::TimeUnits(format!("unknown time unit '{}'", &captures[1])))?;
        let epoch = Self::parse_epoch(&captures[2])?;

        log::debug!("Parsed time units '{}': {} us per unit since {}", units, scale_us, epoch);
        Ok(Self { scale_us, epoch })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Absolute time of an offset, at microsecond precision
    pub fn decode(&self, value: f64) -> CompositeResult<DateTime<Utc>> {
        let micros = value * self.scale_us;
        if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
            return Err(CompositeError::TimeUnits(format!("time value {} cannot be decoded", value)));
        }
        self.epoch
            .checked_add_signed(Duration::microseconds(micros.round() as i64))
            .ok_or_else(|| CompositeError::TimeUnits(format!("time value {} is out of range", value)))
    }

    fn unit_scale(unit: &str) -> Option<f64> {
        let scale = match unit.to_ascii_lowercase().as_str() {
            "microseconds" | "microsecond" | "us" => 1.0,
            "milliseconds" | "millisecond" | "ms" => 1e3,
            "seconds" | "second" | "secs" | "sec" | "s" => 1e6,
            "minutes" | "minute" | "mins" | "min" => 60.0 * 1e6,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0 * 1e6,
            "days" | "day" | "d" => 86_400.0 * 1e6,
            _ => return None,
        };
        Some(scale)
    }

    fn parse_epoch(text: &str) -> CompositeResult<DateTime<Utc>> {
        if let Ok(time) = DateTime::parse_from_rfc3339(text) {
            return Ok(time.with_timezone(&Utc));
        }

        let naive = text
            .trim_end_matches("UTC")
            .trim_end()
            .trim_end_matches('Z');

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
                return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
            }
        }

        NaiveDate::parse_from_str(naive, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
            .ok_or_else(|| CompositeError::TimeUnits(format!("unrecognised epoch '{}'", text)))
    }
}
