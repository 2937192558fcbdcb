//! radar-composite: composite reflectivity for volumetric weather-radar scans
//!
//! Composite reflectivity is the maximum reflectivity at any altitude as a
//! function of position on the ground. This crate reorders every sweep of a
//! volume into ascending azimuth, brings coarse sweeps onto the
//! super-resolution grid, and reduces the stacked sweeps by a masked-aware
//! maximum.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    CompositeConfig, CompositeError, CompositeProduct, CompositeResult, GeoGrid, MaskedField,
    ProductVariable, CROSS_CORRELATION_RATIO, FILL_VALUE, REFLECTIVITY, SUPER_RES_RAYS,
};

pub use io::{InMemoryVolume, RadarVolume, TimeUnits};
pub use crate::core::{composite_reflectivity, CompositeProcessor};

/// Python bindings
#[cfg(feature = "python")]
mod bindings {
    use crate::{
        composite_reflectivity, CompositeConfig, CompositeError, InMemoryVolume, MaskedField,
        CROSS_CORRELATION_RATIO, REFLECTIVITY,
    };
    use numpy::{PyReadonlyArray1, PyReadonlyArray2, ToPyArray};
    use pyo3::exceptions::{PyKeyError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::PyDict;

    fn to_py_err(err: CompositeError) -> PyErr {
        match err {
            CompositeError::MissingField { .. } => PyKeyError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }

    fn variable<'py>(py: Python<'py>, data: PyObject, units: &str, info: &str) -> PyResult<&'py PyDict> {
        let dict = PyDict::new(py);
        dict.set_item("data", data)?;
        dict.set_item("units", units)?;
        dict.set_item("info", info)?;
        Ok(dict)
    }

    /// Composite reflectivity of a volume given as numpy arrays; NaN marks invalid samples
    #[pyfunction]
    #[pyo3(name = "composite_reflectivity")]
    #[pyo3(signature = (
        azimuth,
        time,
        time_units,
        gate_longitude,
        gate_latitude,
        sweep_start_ray_index,
        sweep_end_ray_index,
        reflectivity,
        cross_correlation_ratio = None,
        rhv_filter = true,
        rhv_value = 0.95,
        verbose = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_composite_reflectivity<'py>(
        py: Python<'py>,
        azimuth: PyReadonlyArray1<f64>,
        time: PyReadonlyArray1<f64>,
        time_units: &str,
        gate_longitude: PyReadonlyArray2<f64>,
        gate_latitude: PyReadonlyArray2<f64>,
        sweep_start_ray_index: Vec<usize>,
        sweep_end_ray_index: Vec<usize>,
        reflectivity: PyReadonlyArray2<f32>,
        cross_correlation_ratio: Option<PyReadonlyArray2<f32>>,
        rhv_filter: bool,
        rhv_value: f32,
        verbose: bool,
    ) -> PyResult<&'py PyDict> {
        if sweep_start_ray_index.len() != sweep_end_ray_index.len() {
            return Err(PyValueError::new_err(
                "sweep_start_ray_index and sweep_end_ray_index differ in length",
            ));
        }

        let mut volume = InMemoryVolume::new(
            azimuth.as_array().to_owned(),
            time.as_array().to_owned(),
            time_units,
            gate_longitude.as_array().to_owned(),
            gate_latitude.as_array().to_owned(),
        )
        .map_err(to_py_err)?;
        for (&start, &end) in sweep_start_ray_index.iter().zip(&sweep_end_ray_index) {
            volume.add_sweep(start, end).map_err(to_py_err)?;
        }
        volume
            .add_field(REFLECTIVITY, MaskedField::from_nan_masked(reflectivity.as_array().to_owned()))
            .map_err(to_py_err)?;
        if let Some(rho_hv) = cross_correlation_ratio {
            volume
                .add_field(
                    CROSS_CORRELATION_RATIO,
                    MaskedField::from_nan_masked(rho_hv.as_array().to_owned()),
                )
                .map_err(to_py_err)?;
        }

        let config = CompositeConfig {
            rhv_filter,
            rhv_value,
            verbose,
            ..CompositeConfig::default()
        };
        let product = composite_reflectivity(&volume, &config).map_err(to_py_err)?;

        let result = PyDict::new(py);
        result.set_item(
            "longitude",
            variable(
                py,
                product.longitude.data.to_pyarray(py).to_object(py),
                product.longitude.units,
                product.longitude.info,
            )?,
        )?;
        result.set_item(
            "latitude",
            variable(
                py,
                product.latitude.data.to_pyarray(py).to_object(py),
                product.latitude.units,
                product.latitude.info,
            )?,
        )?;
        let composite = &product.composite_reflectivity;
        result.set_item(
            "composite_reflectivity",
            variable(
                py,
                composite.data.filled(f32::NAN).to_pyarray(py).to_object(py),
                composite.units,
                composite.info,
            )?,
        )?;
        result.set_item(
            "time",
            variable(
                py,
                product.time.data.to_rfc3339().to_object(py),
                product.time.units,
                product.time.info,
            )?,
        )?;
        Ok(result)
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(py_composite_reflectivity, m)?)?;
        Ok(())
    }
}
