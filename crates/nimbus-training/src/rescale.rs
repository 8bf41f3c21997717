//! Linear mapping between the normalized target range and physical units.

use ndarray::Array1;

/// Maps values between a normalized range (nominally `[-1, 1]`) and a
/// physical range `[vmin, vmax]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescaler {
    lo: f32,
    hi: f32,
}

impl Default for Rescaler {
    fn default() -> Self {
        Self { lo: -1.0, hi: 1.0 }
    }
}

impl Rescaler {
    #[must_use]
    pub fn with_normalized_range(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    /// Normalized value to physical units.
    #[must_use]
    pub fn rescale_value(&self, value: f32, vmin: f32, vmax: f32) -> f32 {
        (value - self.lo) / (self.hi - self.lo) * (vmax - vmin) + vmin
    }

    /// Physical units back to the normalized range.
    #[must_use]
    pub fn normalize_value(&self, value: f32, vmin: f32, vmax: f32) -> f32 {
        (value - vmin) / (vmax - vmin) * (self.hi - self.lo) + self.lo
    }

    #[must_use]
    pub fn rescale(&self, values: &Array1<f32>, vmin: f32, vmax: f32) -> Array1<f32> {
        values.mapv(|v| self.rescale_value(v, vmin, vmax))
    }

    #[must_use]
    pub fn normalize(&self, values: &Array1<f32>, vmin: f32, vmax: f32) -> Array1<f32> {
        values.mapv(|v| self.normalize_value(v, vmin, vmax))
    }
}

/// Rescale from `[-1, 1]` to `[vmin, vmax]`.
#[must_use]
pub fn rescale(values: &Array1<f32>, vmin: f32, vmax: f32) -> Array1<f32> {
    Rescaler::default().rescale(values, vmin, vmax)
}
