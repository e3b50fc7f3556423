//! Temporal modeling of cascade-level time series.
//!
//! Autoregressive AR(p) estimation from empirical lag autocorrelations,
//! stationarity repair heuristics for lag-2 pairs, autocorrelation-function
//! extension, and one-step iteration of fitted models over field windows.

pub mod autoregression;

pub use autoregression::{
    adjust_lag2_refined, adjust_lag2_simple, estimate_ar_params, extend_acf, iterate_ar_model,
    ArParams, STATIONARITY_EPS,
};
