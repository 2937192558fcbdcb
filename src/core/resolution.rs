use crate::types::{CompositeError, CompositeResult, GeoGrid, MaskedField, SUPER_RES_RAYS};
use ndarray::{Array2, Axis};

/// Brings every sweep onto the super-resolution azimuth grid.
///
/// Legacy sweeps carry one ray per degree; super-resolution sweeps carry one
/// per half degree. A coarse ray is repeated so that it covers the two
/// half-degree bins around it; nothing is interpolated.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionNormalizer {
    super_res_rays: usize,
}

impl ResolutionNormalizer {
    pub fn new(super_res_rays: usize) -> Self {
        Self { super_res_rays }
    }

    pub fn super_res_rays(&self) -> usize {
        self.super_res_rays
    }

    /// Ray count of a coarse sweep
    pub fn coarse_rays(&self) -> usize {
        self.super_res_rays / 2
    }

    /// Repeat every row twice: row `i` becomes rows `2i` and `2i + 1`
    pub fn upsample_rows<T: Clone>(grid: &Array2<T>) -> Array2<T> {
        let order: Vec<usize> = (0..grid.nrows()).flat_map(|i| [i, i]).collect();
        grid.select(Axis(0), &order)
    }

    /// Whether a sweep with `nrays` rays must be upsampled
    fn needs_upsample(&self, nrays: usize) -> CompositeResult<bool> {
        if nrays == self.super_res_rays {
            Ok(false)
        } else if nrays * 2 == self.super_res_rays {
            Ok(true)
        } else {
            Err(CompositeError::ShapeMismatch(format!(
                "sweep has {} rays; only {} or {} rays are supported",
                nrays,
                self.coarse_rays(),
                self.super_res_rays
            )))
        }
    }

    pub fn normalize_field(&self, field: MaskedField) -> CompositeResult<MaskedField> {
        if !self.needs_upsample(field.nrays())? {
            return Ok(field);
        }
        log::debug!("Upsampling {} rays to {}", field.nrays(), self.super_res_rays);
        Ok(MaskedField {
            data: Self::upsample_rows(&field.data),
            valid: Self::upsample_rows(&field.valid),
        })
    }

    pub fn normalize_geo(&self, geo: GeoGrid) -> CompositeResult<GeoGrid> {
        if !self.needs_upsample(geo.nrays())? {
            return Ok(geo);
        }
        Ok(GeoGrid {
            longitude: Self::upsample_rows(&geo.longitude),
            latitude: Self::upsample_rows(&geo.latitude),
        })
    }
}

impl Default for ResolutionNormalizer {
    fn default() -> Self {
        Self::new(SUPER_RES_RAYS)
    }
}
