use crate::core::azimuth_sort::AzimuthReorderer;
use crate::core::composite::SweepStack;
use crate::core::quality_filter::QualityFilter;
use crate::core::resolution::ResolutionNormalizer;
use crate::core::time_aggregate::mean_timestamp;
use crate::io::RadarVolume;
use crate::types::{
    CompositeConfig, CompositeError, CompositeProduct, CompositeResult, GeoGrid, MaskedField,
    CROSS_CORRELATION_RATIO, REFLECTIVITY,
};
use ndarray::s;

/// One sweep after filtering, azimuth sorting and resolution normalization
#[derive(Debug, Clone)]
struct ProcessedSweep {
    field: MaskedField,
    /// Azimuth-sorted geolocation at the sweep's native resolution
    geo: GeoGrid,
}

/// Composite reflectivity processor for one radar volume
pub struct CompositeProcessor {
    config: CompositeConfig,
    filter: QualityFilter,
    normalizer: ResolutionNormalizer,
}

impl CompositeProcessor {
    pub fn new(config: CompositeConfig) -> Self {
        Self {
            filter: QualityFilter::new(config.rhv_value),
            normalizer: ResolutionNormalizer::new(config.super_res_rays),
            config,
        }
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    fn progress_level(&self) -> log::Level {
        if self.config.verbose {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }

    /// Maximum reflectivity over all sweeps at every (azimuth, gate) position
    pub fn compute<V: RadarVolume>(&self, volume: &V) -> CompositeResult<CompositeProduct> {
        let nsweeps = volume.sweep_count();
        if nsweeps == 0 {
            return Err(CompositeError::EmptyVolume);
        }

        log::info!(
            "Computing composite reflectivity over {} sweeps (rho_hv filter: {}, threshold {})",
            nsweeps,
            self.config.rhv_filter,
            self.config.rhv_value
        );

        let mut stack = SweepStack::new(nsweeps);
        let mut canonical = None;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            // Lowest failing sweep is reported, as in the sequential path
            let processed: Vec<CompositeResult<ProcessedSweep>> = (0..nsweeps)
                .into_par_iter()
                .map(|sweep| self.process_sweep(volume, sweep))
                .collect();
            for (sweep, processed) in processed.into_iter().enumerate() {
                self.accumulate(sweep, processed?, &mut stack, &mut canonical)?;
            }
        }
        #[cfg(not(feature = "parallel"))]
        for sweep in 0..nsweeps {
            let processed = self.process_sweep(volume, sweep)?;
            self.accumulate(sweep, processed, &mut stack, &mut canonical)?;
        }

        let composite = stack.reduce_max()?;
        let grid = canonical.ok_or(CompositeError::EmptyVolume)?;
        if grid.dim() != composite.dim() {
            return Err(CompositeError::ShapeMismatch(format!(
                "canonical grid {:?} does not match composite {:?}",
                grid.dim(),
                composite.dim()
            )));
        }

        let time = mean_timestamp(volume.time(), volume.time_units())?;

        log::info!(
            "Composite reflectivity complete: {}x{} gates, {} valid, mean time {}",
            composite.nrays(),
            composite.dim().1,
            composite.valid_count(),
            time.to_rfc3339()
        );
        Ok(CompositeProduct::new(grid, composite, time))
    }

    /// Filter, sort and normalize one sweep
    fn process_sweep<V: RadarVolume>(&self, volume: &V, sweep: usize) -> CompositeResult<ProcessedSweep> {
        let rays = volume.sweep_ray_range(sweep)?;
        let (lon, lat, azimuth) = (volume.gate_longitude(), volume.gate_latitude(), volume.azimuth());

        let available = azimuth.len().min(lon.nrows()).min(lat.nrows());
        if *rays.end() >= available || rays.start() > rays.end() {
            return Err(CompositeError::ShapeMismatch(format!(
                "sweep {} ray range {:?} exceeds volume of {} rays",
                sweep, rays, available
            )));
        }

        log::log!(
            self.progress_level(),
            "Processing sweep {} (rays {}..={})",
            sweep,
            rays.start(),
            rays.end()
        );

        let mut reflectivity = volume.get_field(sweep, REFLECTIVITY)?;
        if self.config.rhv_filter {
            let rho_hv = volume.get_field(sweep, CROSS_CORRELATION_RATIO)?;
            reflectivity = self.filter.apply(&reflectivity, &rho_hv)?;
        }

        let geo = GeoGrid::from_views(
            lon.slice(s![rays.clone(), ..]),
            lat.slice(s![rays.clone(), ..]),
        )?;
        let sorted = AzimuthReorderer::reorder(&reflectivity, &geo, azimuth.slice(s![rays]))?;
        let field = self.normalizer.normalize_field(sorted.field)?;

        Ok(ProcessedSweep {
            field,
            geo: sorted.geo,
        })
    }

    /// Push a processed sweep onto the stack; the first sweep also supplies the output grid
    fn accumulate(
        &self,
        sweep: usize,
        processed: ProcessedSweep,
        stack: &mut SweepStack,
        canonical: &mut Option<GeoGrid>,
    ) -> CompositeResult<()> {
        stack.push(&processed.field)?;

        if canonical.is_none() {
            let mut geo = processed.geo;
            AzimuthReorderer::close_azimuth_circle(&mut geo);
            *canonical = Some(self.normalizer.normalize_geo(geo)?);
        }

        log::log!(
            self.progress_level(),
            "Sweep {} stacked ({} layers)",
            sweep,
            stack.len()
        );
        Ok(())
    }
}

impl Default for CompositeProcessor {
    fn default() -> Self {
        Self::new(CompositeConfig::default())
    }
}

/// Compute the composite reflectivity product of a radar volume
pub fn composite_reflectivity<V: RadarVolume>(
    volume: &V,
    config: &CompositeConfig,
) -> CompositeResult<CompositeProduct> {
    CompositeProcessor::new(config.clone()).compute(volume)
}
