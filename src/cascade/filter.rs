//! Bandpass filter bank input contract.
//!
//! Filter banks are produced elsewhere and consumed read-only here; this type
//! only pins down the shape and value invariants the cascade engine relies on.

use ndarray::{Array3, ArrayView2, Axis};

use crate::error::{NowcastError, Result};

/// Immutable per-level frequency weights over a half-spectrum grid.
///
/// For a spatial grid of shape `(h, w)` the weights are shaped
/// `(k, h, w/2 + 1)` with `k` cascade levels. Weights are non-negative and
/// finite; the per-level radial profile `weights_1d` is carried along but only
/// its length (the level count) is used by the engine.
#[derive(Debug, Clone)]
pub struct BandpassFilterBank {
    weights_1d: Vec<f64>,
    weights_2d: Array3<f64>,
    shape: (usize, usize),
}

impl BandpassFilterBank {
    pub fn new(weights_1d: Vec<f64>, weights_2d: Array3<f64>, shape: (usize, usize)) -> Result<Self> {
        let (levels, height, spectral_width) = weights_2d.dim();
        if weights_1d.is_empty() || levels != weights_1d.len() {
            return Err(NowcastError::InvalidArgument(format!(
                "weights_1d has {} levels but weights_2d has {}",
                weights_1d.len(),
                levels
            )));
        }

        let (h, w) = shape;
        if height != h || spectral_width != w / 2 + 1 {
            return Err(NowcastError::InvalidArgument(format!(
                "weights_2d shape ({}, {}, {}) does not match grid shape ({}, {}): \
                 expected ({}, {}, {})",
                levels,
                height,
                spectral_width,
                h,
                w,
                levels,
                h,
                w / 2 + 1
            )));
        }

        if weights_2d.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(NowcastError::InvalidArgument(
                "filter weights must be finite and non-negative".into(),
            ));
        }

        Ok(Self {
            weights_1d,
            weights_2d,
            shape,
        })
    }

    /// Number of cascade levels.
    pub fn level_count(&self) -> usize {
        self.weights_1d.len()
    }

    /// Spatial grid shape `(h, w)` the bank was built for.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Half-spectrum shape `(h, w/2 + 1)`.
    pub fn spectral_shape(&self) -> (usize, usize) {
        (self.shape.0, self.shape.1 / 2 + 1)
    }

    pub fn weights_1d(&self) -> &[f64] {
        &self.weights_1d
    }

    pub fn weights_2d(&self) -> &Array3<f64> {
        &self.weights_2d
    }

    /// Spectral weights of one cascade level.
    pub fn level_weights(&self, level: usize) -> ArrayView2<'_, f64> {
        self.weights_2d.index_axis(Axis(0), level)
    }
}
