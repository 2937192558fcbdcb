use crate::types::{CompositeError, CompositeResult, Degrees, GeoGrid, MaskedField};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// A sweep whose rays are in ascending azimuth order
#[derive(Debug, Clone)]
pub struct SortedSweep {
    pub field: MaskedField,
    pub geo: GeoGrid,
    pub azimuth: Array1<Degrees>,
}

/// Reorders sweep rays so that row 0 is the smallest azimuth.
///
/// Volumes store rays in the order the antenna swept them, which starts
/// wherever the rotation happened to begin.
pub struct AzimuthReorderer;

impl AzimuthReorderer {
    /// Stable permutation sorting `azimuth` ascending
    pub fn argsort(azimuth: ArrayView1<Degrees>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..azimuth.len()).collect();
        order.sort_by(|&a, &b| azimuth[a].total_cmp(&azimuth[b]));
        order
    }

    /// Apply `order` along the ray axis
    pub fn permute_rays<T: Clone>(grid: &Array2<T>, order: &[usize]) -> Array2<T> {
        grid.select(Axis(0), order)
    }

    /// Sort a sweep's field and geolocation by azimuth with one shared permutation
    pub fn reorder(
        field: &MaskedField,
        geo: &GeoGrid,
        azimuth: ArrayView1<Degrees>,
    ) -> CompositeResult<SortedSweep> {
        let nrays = azimuth.len();
        if field.nrays() != nrays || geo.nrays() != nrays {
            return Err(CompositeError::ShapeMismatch(format!(
                "field has {} rays, geolocation {} rays, azimuth {} rays",
                field.nrays(),
                geo.nrays(),
                nrays
            )));
        }
        if field.dim() != geo.dim() {
            return Err(CompositeError::ShapeMismatch(format!(
                "field shape {:?} does not match geolocation shape {:?}",
                field.dim(),
                geo.dim()
            )));
        }

        let order = Self::argsort(azimuth);
        if let (Some(&first), Some(&last)) = (order.first(), order.last()) {
            log::debug!(
                "Azimuth reorder: stored start {:.2} deg, sorted range {:.2}..{:.2} deg",
                azimuth[0],
                azimuth[first],
                azimuth[last]
            );
        }

        Ok(SortedSweep {
            field: MaskedField {
                data: Self::permute_rays(&field.data, &order),
                valid: Self::permute_rays(&field.valid, &order),
            },
            geo: GeoGrid {
                longitude: Self::permute_rays(&geo.longitude, &order),
                latitude: Self::permute_rays(&geo.latitude, &order),
            },
            azimuth: azimuth.select(Axis(0), &order),
        })
    }

    /// Overwrite the last ray with the first so the grid wraps 360 -> 0 without a seam
    pub fn close_azimuth_circle(geo: &mut GeoGrid) {
        let nrays = geo.nrays();
        if nrays < 2 {
            return;
        }
        for grid in [&mut geo.longitude, &mut geo.latitude] {
            let first = grid.row(0).to_owned();
            grid.row_mut(nrays - 1).assign(&first);
        }
    }
}
