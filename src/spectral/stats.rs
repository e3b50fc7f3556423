//! Closed-form field statistics computed in the spectral domain.
//!
//! For a half spectrum `X` obtained from an unscaled real 2D transform of a
//! field with spatial shape `(h, w)`, the field mean is carried entirely by
//! the DC bin and the field variance follows from Parseval's identity. The
//! columns that drop out of the half spectrum are accounted for by doubling
//! the energy of every bin with a conjugate counterpart.

use ndarray::{ArrayView2, Axis};
use num_complex::Complex64;

/// Mean of the spatial field represented by `spectrum`.
pub fn spectral_mean(spectrum: ArrayView2<'_, Complex64>, shape: (usize, usize)) -> f64 {
    spectrum[[0, 0]].re / (shape.0 * shape.1) as f64
}

/// Standard deviation of the spatial field represented by `spectrum`.
///
/// Uses the population estimator, matching the spatial-domain path. Round-off
/// can push the variance slightly negative for near-constant fields, so it is
/// floored at zero before the square root.
pub fn spectral_std(spectrum: ArrayView2<'_, Complex64>, shape: (usize, usize)) -> f64 {
    let (h, w) = shape;
    let n = (h * w) as f64;
    let wspec = spectrum.len_of(Axis(1));
    let has_nyquist_column = w % 2 == 0;

    let mut energy = 0.0;
    for (j, column) in spectrum.axis_iter(Axis(1)).enumerate() {
        let weight = if j == 0 || (has_nyquist_column && j == wspec - 1) {
            1.0
        } else {
            2.0
        };
        energy += weight * column.iter().map(|value| value.norm_sqr()).sum::<f64>();
    }

    let mean = spectral_mean(spectrum, shape);
    let variance = energy / (n * n) - mean * mean;
    variance.max(0.0).sqrt()
}
