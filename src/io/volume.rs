use crate::types::{
    CompositeError, CompositeResult, Degrees, GeoArray, MaskedField, Reflectivity,
};
use ndarray::{s, Array1, ArrayView1, ArrayView2};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Read-only access to one radar volume scan.
///
/// Ray-indexed arrays (`azimuth`, `time`, gate geolocation) span the whole
/// volume; each sweep owns the inclusive ray range returned by
/// [`RadarVolume::sweep_ray_range`].
pub trait RadarVolume: Sync {
    fn sweep_count(&self) -> usize;

    /// Inclusive (start, end) ray indices of a sweep
    fn sweep_ray_range(&self, sweep: usize) -> CompositeResult<RangeInclusive<usize>>;

    /// Named moment for one sweep, [ray, gate]
    fn get_field(&self, sweep: usize, name: &str) -> CompositeResult<MaskedField>;

    fn gate_longitude(&self) -> ArrayView2<'_, Degrees>;

    fn gate_latitude(&self) -> ArrayView2<'_, Degrees>;

    fn azimuth(&self) -> ArrayView1<'_, Degrees>;

    /// Per-ray time offsets, interpreted through [`RadarVolume::time_units`]
    fn time(&self) -> ArrayView1<'_, f64>;

    fn time_units(&self) -> &str;
}

/// Volume held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryVolume {
    azimuth: Array1<Degrees>,
    time: Array1<f64>,
    time_units: String,
    gate_longitude: GeoArray,
    gate_latitude: GeoArray,
    sweep_start_ray_index: Vec<usize>,
    sweep_end_ray_index: Vec<usize>,
    fields: HashMap<String, MaskedField>,
}

impl InMemoryVolume {
    /// Create a volume without sweeps or fields
    pub fn new(
        azimuth: Array1<Degrees>,
        time: Array1<f64>,
        time_units: impl Into<String>,
        gate_longitude: GeoArray,
        gate_latitude: GeoArray,
    ) -> CompositeResult<Self> {
        let nrays = azimuth.len();
        if time.len() != nrays {
            return Err(CompositeError::ShapeMismatch(format!(
                "time has {} rays, azimuth has {}",
                time.len(),
                nrays
            )));
        }
        if gate_longitude.dim() != gate_latitude.dim() || gate_longitude.nrows() != nrays {
            return Err(CompositeError::ShapeMismatch(format!(
                "gate longitude {:?} / latitude {:?} do not match {} rays",
                gate_longitude.dim(),
                gate_latitude.dim(),
                nrays
            )));
        }

        Ok(Self {
            azimuth,
            time,
            time_units: time_units.into(),
            gate_longitude,
            gate_latitude,
            sweep_start_ray_index: Vec::new(),
            sweep_end_ray_index: Vec::new(),
            fields: HashMap::new(),
        })
    }

    /// Append a sweep covering rays `start..=end`
    pub fn add_sweep(&mut self, start: usize, end: usize) -> CompositeResult<()> {
        let nrays = self.azimuth.len();
        if start > end || end >= nrays {
            return Err(CompositeError::ShapeMismatch(format!(
                "sweep ray range {}..={} invalid for {} rays",
                start, end, nrays
            )));
        }
        self.sweep_start_ray_index.push(start);
        self.sweep_end_ray_index.push(end);
        Ok(())
    }

    /// Add a full-volume field, [ray, gate]
    pub fn add_field(&mut self, name: impl Into<String>, field: MaskedField) -> CompositeResult<()> {
        let name = name.into();
        if field.dim() != self.gate_longitude.dim() {
            return Err(CompositeError::ShapeMismatch(format!(
                "field '{}' shape {:?} does not match gate grid {:?}",
                name,
                field.dim(),
                self.gate_longitude.dim()
            )));
        }
        self.fields.insert(name, field);
        Ok(())
    }

    /// Add a full-volume field from raw data; non-finite samples become invalid
    pub fn add_field_data(
        &mut self,
        name: impl Into<String>,
        data: ndarray::Array2<Reflectivity>,
    ) -> CompositeResult<()> {
        self.add_field(name, MaskedField::from_nan_masked(data))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn nrays(&self) -> usize {
        self.azimuth.len()
    }
}

impl RadarVolume for InMemoryVolume {
    fn sweep_count(&self) -> usize {
        self.sweep_start_ray_index.len()
    }

    fn sweep_ray_range(&self, sweep: usize) -> CompositeResult<RangeInclusive<usize>> {
        match (self.sweep_start_ray_index.get(sweep), self.sweep_end_ray_index.get(sweep)) {
            (Some(&start), Some(&end)) => Ok(start..=end),
            _ => Err(CompositeError::ShapeMismatch(format!(
                "sweep {} out of range ({} sweeps)",
                sweep,
                self.sweep_count()
            ))),
        }
    }

    fn get_field(&self, sweep: usize, name: &str) -> CompositeResult<MaskedField> {
        let field = self.fields.get(name).ok_or_else(|| CompositeError::MissingField {
            sweep,
            field: name.to_string(),
        })?;
        let rays = self.sweep_ray_range(sweep)?;

        Ok(MaskedField {
            data: field.data.slice(s![rays.clone(), ..]).to_owned(),
            valid: field.valid.slice(s![rays, ..]).to_owned(),
        })
    }

    fn gate_longitude(&self) -> ArrayView2<'_, Degrees> {
        self.gate_longitude.view()
    }

    fn gate_latitude(&self) -> ArrayView2<'_, Degrees> {
        self.gate_latitude.view()
    }

    fn azimuth(&self) -> ArrayView1<'_, Degrees> {
        self.azimuth.view()
    }

    fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    fn time_units(&self) -> &str {
        &self.time_units
    }
}
