use crate::types::{CompositeError, CompositeResult, MaskedField};
use ndarray::Zip;

/// Masks reflectivity where the co-polar correlation coefficient is too low
/// to be a meteorological return.
#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    threshold: f32,
}

impl QualityFilter {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Invalidate every cell whose correlation is below the threshold.
    ///
    /// A masked correlation sample also invalidates the reflectivity cell.
    pub fn apply(&self, reflectivity: &MaskedField, rho_hv: &MaskedField) -> CompositeResult<MaskedField> {
        if reflectivity.dim() != rho_hv.dim() {
            return Err(CompositeError::ShapeMismatch(format!(
                "reflectivity shape {:?} does not match correlation shape {:?}",
                reflectivity.dim(),
                rho_hv.dim()
            )));
        }

        let mut filtered = reflectivity.clone();
        Zip::from(&mut filtered.valid)
            .and(&rho_hv.data)
            .and(&rho_hv.valid)
            .for_each(|valid, &rho, &rho_ok| {
                if !rho_ok || rho < self.threshold {
                    *valid = false;
                }
            });

        log::debug!(
            "Correlation filter (rho_hv < {}): {} -> {} valid gates",
            self.threshold,
            reflectivity.valid_count(),
            filtered.valid_count()
        );
        Ok(filtered)
    }
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self::new(0.95)
    }
}
