//! Radar volume access and time-unit decoding

pub mod time_units;
pub mod volume;

pub use time_units::TimeUnits;
pub use volume::{InMemoryVolume, RadarVolume};
