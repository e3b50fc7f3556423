//! Engine configuration management via TOML files.
//!
//! This module provides configuration parsing from TOML format with sensible
//! defaults. The `[cascade]` section mirrors the recognized decomposition
//! options; the `[ar]` section controls autoregressive fitting.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use toml::Value;

use crate::cascade::{DecompositionConfig, Domain};
use crate::error::{NowcastError, Result};

/// Engine configuration loaded from a TOML file.
///
/// # Examples
///
/// ```
/// use nowcast_cascade_core::EngineConfig;
///
/// let config = EngineConfig::from_str("[cascade]\nnormalize = true\ncompute_stats = true")
///     .unwrap_or_default();
/// assert_eq!(config.fft_method, "realfft");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    /// Named spectral backend used for forward/inverse transforms
    pub fft_method: String,
    pub cascade: CascadeConfig,
    pub ar: ArConfig,
}

/// Defaults for the cascade decomposition options.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeConfig {
    pub output_domain: Domain,
    pub normalize: bool,
    pub compute_stats: bool,
    pub compact_output: bool,
}

/// Autoregressive fitting options.
#[derive(Debug, Clone, Serialize)]
pub struct ArConfig {
    /// Order p of the AR model, at least 1
    pub order: usize,
    /// Stationarity repair applied to empirical lag-2 correlations
    pub lag2_adjustment: Lag2Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lag2Adjustment {
    None,
    Simple,
    Refined,
}

impl FromStr for Lag2Adjustment {
    type Err = NowcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Lag2Adjustment::None),
            "simple" => Ok(Lag2Adjustment::Simple),
            "refined" => Ok(Lag2Adjustment::Refined),
            other => Err(NowcastError::InvalidArgument(format!(
                "unknown lag-2 adjustment: {}",
                other
            ))),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self> {
        let value: Value = toml::from_str(toml_str)
            .map_err(|err| NowcastError::InvalidArgument(err.to_string()))?;

        let fft_method = value
            .get("engine")
            .and_then(|section| section.get("fft_method"))
            .and_then(|v| v.as_str())
            .unwrap_or("realfft")
            .to_string();

        Ok(Self {
            fft_method,
            cascade: CascadeConfig::from_value(&value),
            ar: ArConfig::from_value(&value),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fft_method: "realfft".to_string(),
            cascade: CascadeConfig::default(),
            ar: ArConfig::default(),
        }
    }
}

impl CascadeConfig {
    fn from_value(value: &Value) -> Self {
        let table = value.get("cascade");
        let defaults = Self::default();

        let output_domain = table
            .and_then(|t| t.get("output_domain"))
            .and_then(|v| v.as_str())
            .and_then(|s| Domain::from_str(s).ok())
            .unwrap_or(defaults.output_domain);
        let normalize = table
            .and_then(|t| t.get("normalize"))
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.normalize);
        let compute_stats = table
            .and_then(|t| t.get("compute_stats"))
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.compute_stats);
        let compact_output = table
            .and_then(|t| t.get("compact_output"))
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.compact_output);

        Self {
            output_domain,
            normalize,
            compute_stats,
            compact_output,
        }
    }

    /// Build per-call decomposition options from these defaults.
    pub fn decomposition_config(&self) -> DecompositionConfig {
        DecompositionConfig {
            output_domain: self.output_domain,
            normalize: self.normalize,
            compute_stats: self.compute_stats,
            compact_output: self.compact_output,
            mask: None,
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            output_domain: Domain::Spatial,
            normalize: false,
            compute_stats: false,
            compact_output: false,
        }
    }
}

impl ArConfig {
    fn from_value(value: &Value) -> Self {
        let table = value.get("ar");
        let defaults = Self::default();

        let order = table
            .and_then(|t| t.get("order"))
            .and_then(|v| v.as_integer())
            .map(|v| v.max(1) as usize)
            .unwrap_or(defaults.order);
        let lag2_adjustment = table
            .and_then(|t| t.get("lag2_adjustment"))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lag2_adjustment);

        Self {
            order,
            lag2_adjustment,
        }
    }
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            order: 2,
            lag2_adjustment: Lag2Adjustment::Simple,
        }
    }
}
