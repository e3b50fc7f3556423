//! # Nowcast Cascade Core
//!
//! Numerical engines that prepare 2D spatial fields for short-term
//! extrapolation: a multi-scale spectral cascade decomposition built on a
//! bandpass filter bank, and autoregressive AR(p) estimation and iteration
//! for the temporal evolution of each cascade level.
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::{Array2, Array3};
//! use nowcast_cascade_core::{
//!     estimate_ar_params, BandpassFilterBank, CascadeTransformer, DecompositionConfig,
//!     InputField, RealFftBackend,
//! };
//!
//! // A small field and a two-level bank whose weights sum to one everywhere.
//! let field = Array2::from_shape_fn((8, 8), |(i, j)| (i as f64 * 0.8).sin() + j as f64 * 0.1);
//! let weights = Array3::from_shape_fn((2, 8, 5), |(k, _, _)| if k == 0 { 0.4 } else { 0.6 });
//! let bank = BandpassFilterBank::new(vec![0.4, 0.6], weights, (8, 8)).unwrap();
//!
//! let transformer = CascadeTransformer::new(RealFftBackend::new((8, 8)).unwrap());
//! let config = DecompositionConfig {
//!     normalize: true,
//!     compute_stats: true,
//!     ..Default::default()
//! };
//! let decomposition = transformer
//!     .decompose(InputField::Spatial(field.view()), &bank, &config)
//!     .unwrap();
//! assert_eq!(decomposition.level_count(), 2);
//!
//! // Fit an AR(2) model for one level's lag correlations.
//! let params = estimate_ar_params(&[0.8, 0.6]).unwrap();
//! assert_eq!(params.order(), 2);
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Engine configuration via TOML
//! - [`cascade`] - Cascade decomposition and recomposition
//! - [`spectral`] - Real 2D transform backends and spectral statistics
//! - [`timeseries`] - AR(p) estimation and iteration
//! - [`logging`] - JSON line-delimited logging

pub mod cascade;
pub mod config;
pub mod error;
pub mod logging;
pub mod spectral;
pub mod timeseries;

pub use cascade::{
    BandpassFilterBank, CascadeDecomposition, CascadeLevels, CascadeTransformer,
    DecompositionConfig, Domain, InputField, LevelStats, RecomposedField, COMPACTION_THRESHOLD,
};
pub use config::{ArConfig, CascadeConfig, EngineConfig, Lag2Adjustment};
pub use error::{NowcastError, Result};
pub use spectral::{backend_from_name, spectral_mean, spectral_std, RealFftBackend, SpectralBackend};
pub use timeseries::{
    adjust_lag2_refined, adjust_lag2_simple, estimate_ar_params, extend_acf, iterate_ar_model,
    ArParams, STATIONARITY_EPS,
};
