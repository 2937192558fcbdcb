use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Reflectivity sample type (dBZ)
pub type Reflectivity = f32;

/// Geolocation sample type (degrees)
pub type Degrees = f64;

/// 2D geolocation array (ray x gate)
pub type GeoArray = Array2<Degrees>;

/// Field name of the reflectivity moment
pub const REFLECTIVITY: &str = "reflectivity";

/// Field name of the co-polar correlation coefficient (rho_hv)
pub const CROSS_CORRELATION_RATIO: &str = "cross_correlation_ratio";

/// Ray count of a super-resolution sweep (0.5 degree azimuth spacing)
pub const SUPER_RES_RAYS: usize = 720;

/// Data value written into cells that are not valid
pub const FILL_VALUE: Reflectivity = -9999.0;

/// 2D radar field (ray x gate) with an explicit per-cell validity mask.
///
/// `valid[[r, g]] == false` means the sample at `data[[r, g]]` must be ignored;
/// the value stored there carries no meaning. Both grids always share one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedField {
    pub(crate) data: Array2<Reflectivity>,
    pub(crate) valid: Array2<bool>,
}

impl MaskedField {
    /// Wrap a fully valid data grid
    pub fn new(data: Array2<Reflectivity>) -> Self {
        let valid = Array2::from_elem(data.dim(), true);
        Self { data, valid }
    }

    /// Build from a data grid and a validity grid of identical shape
    pub fn with_mask(data: Array2<Reflectivity>, valid: Array2<bool>) -> CompositeResult<Self> {
        if data.dim() != valid.dim() {
            return Err(CompositeError::ShapeMismatch(format!(
                "data shape {:?} does not match mask shape {:?}",
                data.dim(),
                valid.dim()
            )));
        }
        Ok(Self { data, valid })
    }

    /// Treat non-finite samples (NaN, +/-inf) as invalid
    pub fn from_nan_masked(data: Array2<Reflectivity>) -> Self {
        let valid = data.mapv(|v| v.is_finite());
        Self { data, valid }
    }

    pub fn data(&self) -> &Array2<Reflectivity> {
        &self.data
    }

    pub fn valid(&self) -> &Array2<bool> {
        &self.valid
    }

    /// Split into (data, valid)
    pub fn into_parts(self) -> (Array2<Reflectivity>, Array2<bool>) {
        (self.data, self.valid)
    }

    /// (rays, gates)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn nrays(&self) -> usize {
        self.data.nrows()
    }

    /// Sample at a cell, `None` when masked
    pub fn get(&self, ray: usize, gate: usize) -> Option<Reflectivity> {
        match self.valid.get((ray, gate)) {
            Some(true) => self.data.get((ray, gate)).copied(),
            _ => None,
        }
    }

    pub fn is_valid(&self, ray: usize, gate: usize) -> bool {
        self.valid.get((ray, gate)).copied().unwrap_or(false)
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Copy of the data with masked cells replaced by `fill`
    pub fn filled(&self, fill: Reflectivity) -> Array2<Reflectivity> {
        let mut out = self.data.clone();
        ndarray::Zip::from(&mut out)
            .and(&self.valid)
            .for_each(|v, &ok| {
                if !ok {
                    *v = fill;
                }
            });
        out
    }
}

/// Longitude/latitude of every gate (ray x gate)
#[derive(Debug, Clone, PartialEq)]
pub struct GeoGrid {
    pub longitude: GeoArray,
    pub latitude: GeoArray,
}

impl GeoGrid {
    pub fn new(longitude: GeoArray, latitude: GeoArray) -> CompositeResult<Self> {
        if longitude.dim() != latitude.dim() {
            return Err(CompositeError::ShapeMismatch(format!(
                "longitude shape {:?} does not match latitude shape {:?}",
                longitude.dim(),
                latitude.dim()
            )));
        }
        Ok(Self { longitude, latitude })
    }

    pub(crate) fn from_views(longitude: ArrayView2<Degrees>, latitude: ArrayView2<Degrees>) -> CompositeResult<Self> {
        Self::new(longitude.to_owned(), latitude.to_owned())
    }

    pub fn dim(&self) -> (usize, usize) {
        self.longitude.dim()
    }

    pub fn nrays(&self) -> usize {
        self.longitude.nrows()
    }
}

/// Options recognised by the composite computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Mask reflectivity where the correlation coefficient is below `rhv_value`
    pub rhv_filter: bool,
    /// Correlation coefficient considered meteorological
    pub rhv_value: f32,
    /// Report per-sweep progress at info level
    pub verbose: bool,
    /// Ray count every sweep is normalised to before stacking
    pub super_res_rays: usize,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            rhv_filter: true,
            rhv_value: 0.95,
            verbose: false,
            super_res_rays: SUPER_RES_RAYS,
        }
    }
}

/// A product value together with its unit string and description
#[derive(Debug, Clone, PartialEq)]
pub struct ProductVariable<T> {
    pub data: T,
    pub units: &'static str,
    pub info: &'static str,
}

/// Composite reflectivity of one radar volume, all grids indexed [azimuth, range]
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeProduct {
    pub longitude: ProductVariable<GeoArray>,
    pub latitude: ProductVariable<GeoArray>,
    pub composite_reflectivity: ProductVariable<MaskedField>,
    pub time: ProductVariable<DateTime<Utc>>,
}

impl CompositeProduct {
    pub(crate) fn new(grid: GeoGrid, composite: MaskedField, time: DateTime<Utc>) -> Self {
        Self {
            longitude: ProductVariable {
                data: grid.longitude,
                units: "degrees",
                info: "reordered longitude grid, [az,range]",
            },
            latitude: ProductVariable {
                data: grid.latitude,
                units: "degrees",
                info: "reordered latitude grid, [az,range]",
            },
            composite_reflectivity: ProductVariable {
                data: composite,
                units: "dBZ",
                info: "composite reflectivity computed from the maximum radar value in each gate vertically after reordering",
            },
            time: ProductVariable {
                data: time,
                units: "timestamp",
                info: "mean time of all scans",
            },
        }
    }
}

/// Error types for composite processing
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("Radar volume contains no sweeps")]
    EmptyVolume,

    #[error("Field '{field}' missing for sweep {sweep}")]
    MissingField { sweep: usize, field: String },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Time units error: {0}")]
    TimeUnits(String),
}

/// Result type for composite operations
pub type CompositeResult<T> = Result<T, CompositeError>;
