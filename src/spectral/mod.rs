//! Spectral-domain plumbing for the cascade engine.
//!
//! Provides the real 2D Fourier transform capability consumed by the cascade
//! decomposition (`fft`) and closed-form mean/std estimators that operate
//! directly on half spectra without an inverse transform (`stats`).

pub mod fft;
pub mod stats;

pub use fft::{backend_from_name, RealFftBackend, SpectralBackend};
pub use stats::{spectral_mean, spectral_std};
