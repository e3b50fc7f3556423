//! AR(p) model estimation and iteration.
//!
//! Coefficients are fitted from lag autocorrelations through the Yule-Walker
//! equations and verified for stationarity before use; non-stationary fits
//! are rejected, never silently corrected. The lag-2 adjustment heuristics
//! repair empirically estimated correlation pairs so that the subsequent
//! AR(2) fit stays inside the stationarity region.

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use serde::Serialize;

use crate::error::{NowcastError, Result};
use crate::logging;

/// Margin keeping adjusted lag-2 correlations strictly inside the
/// stationarity region boundary.
pub const STATIONARITY_EPS: f64 = 1e-10;

/// Fitted AR(p) parameters.
///
/// `coeffs` holds the lag coefficients in ascending lag order;
/// `innovation_std` scales the stochastic forcing term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArParams {
    pub coeffs: Vec<f64>,
    pub innovation_std: f64,
}

impl ArParams {
    /// Order `p` of the fitted model.
    pub fn order(&self) -> usize {
        self.coeffs.len()
    }
}

/// Clamp `gamma_2` so that the pair admits a stationary AR(2) Yule-Walker fit.
///
/// The result always lies in `[2*gamma_1^2 - 1, 1]`.
pub fn adjust_lag2_simple(gamma_1: f64, gamma_2: f64) -> f64 {
    let adjusted = gamma_2.max(2.0 * gamma_1 * gamma_1 - 1.0 + STATIONARITY_EPS);
    adjusted.min(1.0 - STATIONARITY_EPS)
}

/// Tighter variant of [`adjust_lag2_simple`] using a sharper boundary of the
/// stationarity region.
pub fn adjust_lag2_refined(gamma_1: f64, gamma_2: f64) -> f64 {
    let adjusted = gamma_2.max(2.0 * gamma_1 * gamma_2 - 1.0);
    // The bound degenerates to NaN at gamma_1 == 0; f64::max ignores the NaN
    // operand, which leaves gamma_2 unadjusted exactly as intended.
    let g1_sq = gamma_1 * gamma_1;
    adjusted.max((3.0 * g1_sq - 2.0 + 2.0 * (1.0 - g1_sq).powf(1.5)) / g1_sq)
}

/// Estimate AR(p) parameters from lag-1..lag-p autocorrelations via the
/// Yule-Walker equations.
///
/// Fails with [`NowcastError::NonStationaryProcess`] when any root of the
/// characteristic polynomial lies on or inside the unit circle of the
/// companion form. A negative or non-finite innovation variance, which can
/// occur from round-off near the stability boundary, is clamped to a zero
/// innovation scale.
pub fn estimate_ar_params(gamma: &[f64]) -> Result<ArParams> {
    if gamma.is_empty() {
        return Err(NowcastError::InvalidArgument(
            "autocorrelation vector must not be empty".into(),
        ));
    }
    if gamma.iter().any(|v| !v.is_finite()) {
        return Err(NowcastError::NonFiniteInput(
            "autocorrelation vector contains non-finite values".into(),
        ));
    }

    let p = gamma.len();

    // Normal-equations matrix: each row is the augmented vector
    // [1, gamma_1, .., gamma_{p-1}] rotated right by the row index.
    let mut augmented = Vec::with_capacity(p);
    augmented.push(1.0);
    augmented.extend_from_slice(&gamma[..p - 1]);
    let matrix = DMatrix::from_fn(p, p, |row, col| {
        augmented[(col as isize - row as isize).rem_euclid(p as isize) as usize]
    });
    let rhs = DVector::from_column_slice(gamma);

    let coeffs = matrix.lu().solve(&rhs).ok_or_else(|| {
        NowcastError::InvalidArgument("singular Yule-Walker system".into())
    })?;

    // Roots of z^p - phi_1 z^{p-1} - .. - phi_p via the companion matrix;
    // all must lie strictly inside the unit circle.
    let companion = DMatrix::from_fn(p, p, |row, col| {
        if row == 0 {
            coeffs[col]
        } else if row == col + 1 {
            1.0
        } else {
            0.0
        }
    });
    if companion
        .complex_eigenvalues()
        .iter()
        .any(|root| root.norm() >= 1.0)
    {
        return Err(NowcastError::NonStationaryProcess);
    }

    let mut variance = 1.0;
    for (g, phi) in gamma.iter().zip(coeffs.iter()) {
        variance -= g * phi;
    }
    let innovation_std = variance.sqrt();
    let innovation_std = if innovation_std.is_finite() {
        innovation_std
    } else {
        0.0
    };

    let params = ArParams {
        coeffs: coeffs.iter().copied().collect(),
        innovation_std,
    };

    if let Err(err) = logging::log_operation("estimate_ar_params", &params) {
        eprintln!("failed to log AR estimation: {err}");
    }

    Ok(params)
}

/// Extend lag-1..lag-p autocorrelations to `n` lags using the AR recurrence.
///
/// Returns `gamma` unchanged when `n` equals its length; `n` below the AR
/// order is an error.
pub fn extend_acf(gamma: &[f64], n: usize) -> Result<Vec<f64>> {
    let p = gamma.len();
    if n == p {
        return Ok(gamma.to_vec());
    }
    if n < p {
        return Err(NowcastError::InvalidArgument(format!(
            "n={} must be at least the order of the AR process {}",
            n, p
        )));
    }

    let params = estimate_ar_params(gamma)?;

    let mut acf = vec![0.0; n];
    acf[..p].copy_from_slice(gamma);
    for t in p..n {
        let mut value = 0.0;
        for (i, phi) in params.coeffs.iter().enumerate() {
            value += phi * acf[t - 1 - i];
        }
        acf[t] = value;
    }

    Ok(acf)
}

/// Advance a window of the `p` most recent fields one time step.
///
/// `window` is ordered oldest first; the lag-1 coefficient applies to the
/// most recent field. The optional `eps` innovation field is scaled by the
/// fitted innovation standard deviation. Returns the new window with the
/// oldest field dropped and the predicted field appended.
pub fn iterate_ar_model(
    window: Vec<Array2<f64>>,
    params: &ArParams,
    eps: Option<&Array2<f64>>,
) -> Result<Vec<Array2<f64>>> {
    let p = params.order();
    if p == 0 {
        return Err(NowcastError::InvalidArgument(
            "AR parameters must contain at least one lag coefficient".into(),
        ));
    }
    if window.len() != p {
        return Err(NowcastError::InvalidArgument(format!(
            "window holds {} fields but the AR model has order {}",
            window.len(),
            p
        )));
    }

    let dim = window[0].dim();
    if window.iter().any(|field| field.dim() != dim) {
        return Err(NowcastError::InvalidArgument(
            "window fields must share one shape".into(),
        ));
    }
    if let Some(innovation) = eps {
        if innovation.dim() != dim {
            return Err(NowcastError::InvalidArgument(format!(
                "eps shape {:?} does not match window field shape {:?}",
                innovation.dim(),
                dim
            )));
        }
    }

    let mut predicted = Array2::<f64>::zeros(dim);
    for (i, phi) in params.coeffs.iter().enumerate() {
        predicted.scaled_add(*phi, &window[p - 1 - i]);
    }
    if let Some(innovation) = eps {
        predicted.scaled_add(params.innovation_std, innovation);
    }

    let mut next = window;
    next.remove(0);
    next.push(predicted);
    Ok(next)
}
