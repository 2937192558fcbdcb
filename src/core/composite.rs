use crate::types::{CompositeError, CompositeResult, MaskedField, Reflectivity, FILL_VALUE};
use ndarray::{s, Array2, Array3, ArrayView1, Axis, Zip};

/// Maximum of the valid samples in one column of the stack
fn column_max(values: ArrayView1<Reflectivity>, valid: ArrayView1<bool>) -> Option<Reflectivity> {
    values
        .iter()
        .zip(valid.iter())
        .filter(|(_, &ok)| ok)
        .map(|(&v, _)| v)
        .fold(None, |best, v| Some(best.map_or(v, |b: Reflectivity| b.max(v))))
}

/// Masked-aware element-wise maximum of two layers.
///
/// An invalid sample never wins over a valid one; a cell is invalid only when
/// it is invalid in both inputs.
pub fn masked_max(a: &MaskedField, b: &MaskedField) -> CompositeResult<MaskedField> {
    if a.dim() != b.dim() {
        return Err(CompositeError::ShapeMismatch(format!(
            "cannot combine layers of shape {:?} and {:?}",
            a.dim(),
            b.dim()
        )));
    }

    let mut data = Array2::from_elem(a.dim(), FILL_VALUE);
    let mut valid = Array2::from_elem(a.dim(), false);
    Zip::from(&mut data)
        .and(&mut valid)
        .and(&a.data)
        .and(&a.valid)
        .and(&b.data)
        .and(&b.valid)
        .for_each(|out, out_ok, &va, &oka, &vb, &okb| {
            let best = match (oka, okb) {
                (true, true) => Some(va.max(vb)),
                (true, false) => Some(va),
                (false, true) => Some(vb),
                (false, false) => None,
            };
            if let Some(v) = best {
                *out = v;
                *out_ok = true;
            }
        });

    Ok(MaskedField { data, valid })
}

/// Sweep layers stacked along a leading axis, [sweep, azimuth, gate].
///
/// Storage for all layers is allocated once, when the first layer arrives.
#[derive(Debug, Clone)]
pub struct SweepStack {
    capacity: usize,
    len: usize,
    data: Option<Array3<Reflectivity>>,
    valid: Option<Array3<bool>>,
}

impl SweepStack {
    /// Stack with room for `capacity` sweeps
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            len: 0,
            data: None,
            valid: None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// (azimuth, gate) shape every layer must share, once known
    pub fn layer_dim(&self) -> Option<(usize, usize)> {
        self.data.as_ref().map(|d| (d.dim().1, d.dim().2))
    }

    pub fn push(&mut self, layer: &MaskedField) -> CompositeResult<()> {
        if self.len >= self.capacity {
            return Err(CompositeError::ShapeMismatch(format!(
                "sweep stack is full ({} layers)",
                self.capacity
            )));
        }

        let capacity = self.capacity;
        let (rays, gates) = layer.dim();
        let data = self
            .data
            .get_or_insert_with(|| Array3::from_elem((capacity, rays, gates), FILL_VALUE));
        let valid = self
            .valid
            .get_or_insert_with(|| Array3::from_elem((capacity, rays, gates), false));

        let (_, stack_rays, stack_gates) = data.dim();
        if (stack_rays, stack_gates) != (rays, gates) {
            return Err(CompositeError::ShapeMismatch(format!(
                "sweep layer {:?} does not match stack layer shape {:?}",
                (rays, gates),
                (stack_rays, stack_gates)
            )));
        }

        data.index_axis_mut(Axis(0), self.len).assign(&layer.data);
        valid.index_axis_mut(Axis(0), self.len).assign(&layer.valid);
        self.len += 1;
        Ok(())
    }

    /// Collapse the sweep axis by masked-aware maximum
    pub fn reduce_max(&self) -> CompositeResult<MaskedField> {
        let (data, valid) = match (&self.data, &self.valid) {
            (Some(data), Some(valid)) if self.len > 0 => (
                data.slice(s![..self.len, .., ..]),
                valid.slice(s![..self.len, .., ..]),
            ),
            _ => return Err(CompositeError::EmptyVolume),
        };

        let (_, rays, gates) = data.dim();
        let mut out = Array2::from_elem((rays, gates), FILL_VALUE);
        let mut out_valid = Array2::from_elem((rays, gates), false);

        let zip = Zip::from(&mut out)
            .and(&mut out_valid)
            .and(data.lanes(Axis(0)))
            .and(valid.lanes(Axis(0)));

        let reduce = |v: &mut Reflectivity, ok: &mut bool, values: ArrayView1<Reflectivity>, mask: ArrayView1<bool>| {
            if let Some(max) = column_max(values, mask) {
                *v = max;
                *ok = true;
            }
        };

        #[cfg(feature = "parallel")]
        zip.par_for_each(reduce);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(reduce);

        let result = MaskedField {
            data: out,
            valid: out_valid,
        };
        log::debug!(
            "Reduced {} sweeps over {}x{} gates, {} valid",
            self.len,
            rays,
            gates,
            result.valid_count()
        );
        Ok(result)
    }
}
