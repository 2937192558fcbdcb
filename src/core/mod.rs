//! Core composite reflectivity processing modules

pub mod quality_filter;
pub mod azimuth_sort;
pub mod resolution;
pub mod composite;
pub mod time_aggregate;
pub mod pipeline;

// Re-export main types
pub use quality_filter::QualityFilter;
pub use azimuth_sort::{AzimuthReorderer, SortedSweep};
pub use resolution::ResolutionNormalizer;
pub use composite::{masked_max, SweepStack};
pub use time_aggregate::mean_timestamp;
pub use pipeline::{composite_reflectivity, CompositeProcessor};
