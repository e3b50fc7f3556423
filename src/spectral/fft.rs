//! Real-valued 2D Fourier transform backends.
//!
//! A [`SpectralBackend`] converts between a spatial field of shape `(h, w)`
//! and its half spectrum of shape `(h, w/2 + 1)`. The bundled implementation
//! combines `realfft` row transforms with `rustfft` column transforms; plans
//! are created once per grid shape and reused across calls.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};

use crate::error::{NowcastError, Result};

/// Forward/inverse real 2D transform capability.
///
/// The forward transform is unscaled and the inverse carries the full
/// `1/(h*w)` normalization, so `inverse(forward(field)) == field`.
pub trait SpectralBackend: Send + Sync {
    /// Spatial grid shape `(h, w)` this backend is planned for.
    fn shape(&self) -> (usize, usize);

    /// Half-spectrum shape `(h, w/2 + 1)`.
    fn spectral_shape(&self) -> (usize, usize) {
        let (h, w) = self.shape();
        (h, w / 2 + 1)
    }

    fn forward(&self, field: ArrayView2<'_, f64>) -> Result<Array2<Complex64>>;

    fn inverse(&self, spectrum: ArrayView2<'_, Complex64>) -> Result<Array2<f64>>;
}

/// Resolve a spectral backend from its registered name.
pub fn backend_from_name(name: &str, shape: (usize, usize)) -> Result<RealFftBackend> {
    match name {
        "realfft" => RealFftBackend::new(shape),
        other => Err(NowcastError::InvalidArgument(format!(
            "unknown FFT method: {}",
            other
        ))),
    }
}

/// Real 2D transform built from per-row real FFTs and per-column complex FFTs.
pub struct RealFftBackend {
    shape: (usize, usize),
    row_forward: Arc<dyn RealToComplex<f64>>,
    row_inverse: Arc<dyn ComplexToReal<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl RealFftBackend {
    pub fn new(shape: (usize, usize)) -> Result<Self> {
        let (h, w) = shape;
        if h == 0 || w == 0 {
            return Err(NowcastError::InvalidArgument(format!(
                "grid shape must be non-empty, got ({}, {})",
                h, w
            )));
        }

        let mut real_planner = RealFftPlanner::<f64>::new();
        let mut complex_planner = FftPlanner::<f64>::new();
        Ok(Self {
            shape,
            row_forward: real_planner.plan_fft_forward(w),
            row_inverse: real_planner.plan_fft_inverse(w),
            col_forward: complex_planner.plan_fft_forward(h),
            col_inverse: complex_planner.plan_fft_inverse(h),
        })
    }

    fn check_spatial(&self, dim: (usize, usize)) -> Result<()> {
        if dim != self.shape {
            return Err(NowcastError::InvalidArgument(format!(
                "field shape {:?} does not match backend shape {:?}",
                dim, self.shape
            )));
        }
        Ok(())
    }

    fn check_spectral(&self, dim: (usize, usize)) -> Result<()> {
        if dim != self.spectral_shape() {
            return Err(NowcastError::InvalidArgument(format!(
                "spectrum shape {:?} does not match backend spectral shape {:?}",
                dim,
                self.spectral_shape()
            )));
        }
        Ok(())
    }
}

impl SpectralBackend for RealFftBackend {
    fn shape(&self) -> (usize, usize) {
        self.shape
    }

    fn forward(&self, field: ArrayView2<'_, f64>) -> Result<Array2<Complex64>> {
        self.check_spatial(field.dim())?;
        let (h, w) = self.shape;
        let wspec = w / 2 + 1;

        let mut spectrum = Array2::<Complex64>::zeros((h, wspec));
        let mut row_in = vec![0.0f64; w];
        let mut row_out = vec![Complex64::default(); wspec];
        for (i, row) in field.outer_iter().enumerate() {
            for (dst, src) in row_in.iter_mut().zip(row.iter()) {
                *dst = *src;
            }
            self.row_forward
                .process(&mut row_in, &mut row_out)
                .map_err(|err| NowcastError::InvalidArgument(err.to_string()))?;
            for (j, value) in row_out.iter().enumerate() {
                spectrum[[i, j]] = *value;
            }
        }

        let mut column = vec![Complex64::default(); h];
        for j in 0..wspec {
            for i in 0..h {
                column[i] = spectrum[[i, j]];
            }
            self.col_forward.process(&mut column);
            for i in 0..h {
                spectrum[[i, j]] = column[i];
            }
        }

        Ok(spectrum)
    }

    fn inverse(&self, spectrum: ArrayView2<'_, Complex64>) -> Result<Array2<f64>> {
        self.check_spectral(spectrum.dim())?;
        let (h, w) = self.shape;
        let wspec = w / 2 + 1;
        let scale = 1.0 / (h as f64 * w as f64);

        let mut work = spectrum.to_owned();
        let mut column = vec![Complex64::default(); h];
        for j in 0..wspec {
            for i in 0..h {
                column[i] = work[[i, j]];
            }
            self.col_inverse.process(&mut column);
            for i in 0..h {
                work[[i, j]] = column[i];
            }
        }

        let mut field = Array2::<f64>::zeros((h, w));
        let mut row_in = vec![Complex64::default(); wspec];
        let mut row_out = vec![0.0f64; w];
        for i in 0..h {
            for (dst, src) in row_in.iter_mut().zip(work.row(i).iter()) {
                *dst = *src;
            }
            // realfft rejects residual imaginary parts in the DC and Nyquist
            // bins, which a conjugate-symmetric spectrum carries only as
            // round-off noise.
            row_in[0].im = 0.0;
            if w % 2 == 0 {
                row_in[wspec - 1].im = 0.0;
            }
            self.row_inverse
                .process(&mut row_in, &mut row_out)
                .map_err(|err| NowcastError::InvalidArgument(err.to_string()))?;
            for (j, value) in row_out.iter().enumerate() {
                field[[i, j]] = value * scale;
            }
        }

        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(h: usize, w: usize) -> Array2<f64> {
        Array2::from_shape_fn((h, w), |(i, j)| (i * w + j) as f64 * 0.25 - 3.0)
    }

    #[test]
    fn test_forward_inverse_round_trip_even_width() {
        let backend = RealFftBackend::new((8, 8)).unwrap();
        let field = ramp(8, 8);
        let spectrum = backend.forward(field.view()).unwrap();
        let restored = backend.inverse(spectrum.view()).unwrap();
        for (a, b) in field.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_forward_inverse_round_trip_odd_width() {
        let backend = RealFftBackend::new((6, 7)).unwrap();
        let field = ramp(6, 7);
        let spectrum = backend.forward(field.view()).unwrap();
        assert_eq!(spectrum.dim(), (6, 4));
        let restored = backend.inverse(spectrum.view()).unwrap();
        for (a, b) in field.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_field_concentrates_in_dc_bin() {
        let backend = RealFftBackend::new((4, 4)).unwrap();
        let field = Array2::from_elem((4, 4), 2.5);
        let spectrum = backend.forward(field.view()).unwrap();
        assert!((spectrum[[0, 0]].re - 2.5 * 16.0).abs() < 1e-9);
        for ((i, j), value) in spectrum.indexed_iter() {
            if (i, j) != (0, 0) {
                assert!(value.norm() < 1e-9);
            }
        }
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let backend = RealFftBackend::new((8, 8)).unwrap();
        let field = ramp(4, 4);
        assert!(matches!(
            backend.forward(field.view()),
            Err(NowcastError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_backend_from_name() {
        assert!(backend_from_name("realfft", (4, 4)).is_ok());
        assert!(matches!(
            backend_from_name("numpy", (4, 4)),
            Err(NowcastError::InvalidArgument(_))
        ));
    }
}
