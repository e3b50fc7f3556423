//! FFT cascade decomposition and recomposition.
//!
//! [`CascadeTransformer::decompose`] splits a field into per-level components
//! by multiplying its spectrum with the bank's per-level weights;
//! [`CascadeDecomposition::recompose`] inverts the normalization and sums the
//! levels back together. Levels are independent, so per-level work runs on the
//! rayon pool; recomposition stays a single-threaded reduction because level
//! masks may overlap in the compact spectral representation.

use std::str::FromStr;

use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use num_complex::Complex64;
use rayon::prelude::*;
use serde::Serialize;

use crate::cascade::filter::BandpassFilterBank;
use crate::error::{NowcastError, Result};
use crate::logging;
use crate::spectral::{spectral_mean, spectral_std, SpectralBackend};

/// Filter weights at or below this value are dropped from compact storage.
pub const COMPACTION_THRESHOLD: f64 = 1e-4;

/// Representation domain of a field or decomposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Spatial,
    Spectral,
}

impl FromStr for Domain {
    type Err = NowcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spatial" => Ok(Domain::Spatial),
            "spectral" => Ok(Domain::Spectral),
            other => Err(NowcastError::InvalidArgument(format!(
                "unknown domain: {}",
                other
            ))),
        }
    }
}

/// Options recognized by [`CascadeTransformer::decompose`].
#[derive(Debug, Clone, Default)]
pub struct DecompositionConfig {
    pub output_domain: Domain,
    /// Normalize each level to zero mean and unit variance.
    /// Requires `compute_stats`.
    pub normalize: bool,
    pub compute_stats: bool,
    /// Keep only spectral positions with non-negligible filter weight.
    /// Applies only when `output_domain` is spectral.
    pub compact_output: bool,
    /// Restricts statistics to positions where the mask is true.
    pub mask: Option<Array2<bool>>,
}

/// Input field, tagged by its representation domain.
#[derive(Debug, Clone, Copy)]
pub enum InputField<'a> {
    Spatial(ArrayView2<'a, f64>),
    Spectral(ArrayView2<'a, Complex64>),
}

/// Per-level normalization statistics.
#[derive(Debug, Clone, Serialize)]
pub struct LevelStats {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

/// Cascade levels in one of the three storage layouts.
#[derive(Debug, Clone)]
pub enum CascadeLevels {
    /// Dense spatial levels, shaped `(k, h, w)`.
    Spatial(Array3<f64>),
    /// Dense spectral levels, shaped `(k, h, w/2 + 1)`.
    Spectral(Array3<Complex64>),
    /// Compact spectral levels: retained values plus the boolean position
    /// masks needed to scatter them back onto the spectral grid.
    SpectralCompact {
        values: Vec<Vec<Complex64>>,
        masks: Vec<Array2<bool>>,
    },
}

impl CascadeLevels {
    pub fn domain(&self) -> Domain {
        match self {
            CascadeLevels::Spatial(_) => Domain::Spatial,
            CascadeLevels::Spectral(_) | CascadeLevels::SpectralCompact { .. } => Domain::Spectral,
        }
    }

    pub fn level_count(&self) -> usize {
        match self {
            CascadeLevels::Spatial(levels) => levels.len_of(Axis(0)),
            CascadeLevels::Spectral(levels) => levels.len_of(Axis(0)),
            CascadeLevels::SpectralCompact { values, .. } => values.len(),
        }
    }
}

/// Result of a cascade decomposition.
#[derive(Debug, Clone)]
pub struct CascadeDecomposition {
    pub levels: CascadeLevels,
    pub stats: Option<LevelStats>,
}

/// A recomposed field, spatial or spectral depending on the decomposition.
#[derive(Debug, Clone)]
pub enum RecomposedField {
    Spatial(Array2<f64>),
    Spectral(Array2<Complex64>),
}

impl RecomposedField {
    pub fn as_spatial(&self) -> Option<&Array2<f64>> {
        match self {
            RecomposedField::Spatial(field) => Some(field),
            RecomposedField::Spectral(_) => None,
        }
    }

    pub fn as_spectral(&self) -> Option<&Array2<Complex64>> {
        match self {
            RecomposedField::Spectral(spectrum) => Some(spectrum),
            RecomposedField::Spatial(_) => None,
        }
    }
}

/// Which estimator produces the per-level statistics.
///
/// The choice depends only on whether a spatial representation of the level
/// exists and whether a mask was supplied, so it is made once per call.
#[derive(Clone, Copy)]
enum StatsStrategy {
    MaskedSpatial,
    FullSpatial,
    Spectral,
}

/// One decomposed level before assembly into the output layout.
enum LevelSlot {
    Spatial(Array2<f64>),
    Spectral(Array2<Complex64>),
    Compact {
        values: Vec<Complex64>,
        mask: Array2<bool>,
    },
}

/// Splits fields into cascade levels using an injected spectral backend.
///
/// The backend and the filter bank are long-lived; the transformer borrows
/// nothing per call and can be shared across threads.
pub struct CascadeTransformer<B: SpectralBackend> {
    backend: B,
}

impl<B: SpectralBackend> CascadeTransformer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decompose `input` into the filter bank's cascade levels.
    ///
    /// Validation runs in full before any transform work; the returned
    /// decomposition always carries exactly `filter.level_count()` levels and
    /// statistics iff `config.compute_stats` is set.
    pub fn decompose(
        &self,
        input: InputField<'_>,
        filter: &BandpassFilterBank,
        config: &DecompositionConfig,
    ) -> Result<CascadeDecomposition> {
        self.validate(&input, filter, config)?;

        let spectrum = match input {
            InputField::Spatial(field) => self.backend.forward(field)?,
            InputField::Spectral(spectrum) => spectrum.to_owned(),
        };

        // Masked statistics are defined over spatial values, so a mask forces
        // the inverse transform even when the output stays spectral.
        let needs_spatial =
            config.output_domain == Domain::Spatial || (config.compute_stats && config.mask.is_some());
        let stats_strategy = if config.compute_stats {
            Some(match (needs_spatial, &config.mask) {
                (true, Some(_)) => StatsStrategy::MaskedSpatial,
                (true, None) => StatsStrategy::FullSpatial,
                (false, _) => StatsStrategy::Spectral,
            })
        } else {
            None
        };

        let level_count = filter.level_count();
        let slots: Vec<(LevelSlot, Option<(f64, f64)>)> = (0..level_count)
            .into_par_iter()
            .map(|level| self.decompose_level(level, &spectrum, filter, config, stats_strategy))
            .collect::<Result<Vec<_>>>()?;

        let mut means = Vec::with_capacity(level_count);
        let mut stds = Vec::with_capacity(level_count);
        for (_, stats) in &slots {
            if let Some((mean, std)) = stats {
                means.push(*mean);
                stds.push(*std);
            }
        }

        let levels = assemble_levels(slots, config, filter);
        let stats = config.compute_stats.then(|| LevelStats { means, stds });

        log_event(
            "decompose",
            &serde_json::json!({
                "domain": config.output_domain,
                "levels": level_count,
                "stats": stats,
            }),
        );

        Ok(CascadeDecomposition { levels, stats })
    }

    fn decompose_level(
        &self,
        level: usize,
        spectrum: &Array2<Complex64>,
        filter: &BandpassFilterBank,
        config: &DecompositionConfig,
        stats_strategy: Option<StatsStrategy>,
    ) -> Result<(LevelSlot, Option<(f64, f64)>)> {
        let weights = filter.level_weights(level);
        let mut product =
            Array2::from_shape_fn(spectrum.dim(), |idx| spectrum[idx] * weights[idx]);

        let spatial = match (config.output_domain, &config.mask, config.compute_stats) {
            (Domain::Spatial, _, _) | (Domain::Spectral, Some(_), true) => {
                Some(self.backend.inverse(product.view())?)
            }
            _ => None,
        };

        let stats = stats_strategy.map(|strategy| match strategy {
            StatsStrategy::MaskedSpatial => {
                let field = spatial.as_ref().expect("masked stats require spatial values");
                let mask = config.mask.as_ref().expect("strategy implies mask");
                masked_stats(field.view(), mask.view())
            }
            StatsStrategy::FullSpatial => {
                let field = spatial.as_ref().expect("spatial stats require spatial values");
                full_stats(field.view())
            }
            StatsStrategy::Spectral => (
                spectral_mean(product.view(), filter.shape()),
                spectral_std(product.view(), filter.shape()),
            ),
        });

        match config.output_domain {
            Domain::Spatial => {
                let mut field = spatial.expect("spatial output requires spatial values");
                if config.normalize {
                    let (mean, std) = stats.expect("normalize requires compute_stats");
                    field.mapv_inplace(|v| (v - mean) / std);
                }
                Ok((LevelSlot::Spatial(field), stats))
            }
            Domain::Spectral => {
                if config.normalize {
                    let (mean, std) = stats.expect("normalize requires compute_stats");
                    product.mapv_inplace(|v| (v - mean) / std);
                }
                if config.compact_output {
                    let mask = weights.mapv(|w| w > COMPACTION_THRESHOLD);
                    let values: Vec<Complex64> = product
                        .iter()
                        .zip(mask.iter())
                        .filter(|(_, &retained)| retained)
                        .map(|(value, _)| *value)
                        .collect();
                    Ok((LevelSlot::Compact { values, mask }, stats))
                } else {
                    Ok((LevelSlot::Spectral(product), stats))
                }
            }
        }
    }

    fn validate(
        &self,
        input: &InputField<'_>,
        filter: &BandpassFilterBank,
        config: &DecompositionConfig,
    ) -> Result<()> {
        if config.normalize && !config.compute_stats {
            return Err(NowcastError::InvalidArgument(
                "normalize=true requires compute_stats=true".into(),
            ));
        }

        if self.backend.shape() != filter.shape() {
            return Err(NowcastError::InvalidArgument(format!(
                "backend shape {:?} does not match filter bank shape {:?}",
                self.backend.shape(),
                filter.shape()
            )));
        }

        let (height, spectral_width) = filter.spectral_shape();
        match input {
            InputField::Spatial(field) => {
                let dim = field.dim();
                if let Some(mask) = &config.mask {
                    if mask.dim() != dim {
                        return Err(NowcastError::InvalidArgument(format!(
                            "mask shape {:?} does not match field shape {:?}",
                            mask.dim(),
                            dim
                        )));
                    }
                }
                if dim.0 != height {
                    return Err(NowcastError::InvalidArgument(format!(
                        "field height {} does not match filter bank height {}",
                        dim.0, height
                    )));
                }
                if dim.1 / 2 + 1 != spectral_width {
                    return Err(NowcastError::InvalidArgument(format!(
                        "field width {} maps to {} spectral columns, filter bank has {}",
                        dim.1,
                        dim.1 / 2 + 1,
                        spectral_width
                    )));
                }
                if field.iter().any(|v| !v.is_finite()) {
                    return Err(NowcastError::NonFiniteInput(
                        "field contains non-finite values".into(),
                    ));
                }
            }
            InputField::Spectral(spectrum) => {
                let dim = spectrum.dim();
                if let Some(mask) = &config.mask {
                    if mask.dim() != filter.shape() {
                        return Err(NowcastError::InvalidArgument(format!(
                            "mask shape {:?} does not match grid shape {:?}",
                            mask.dim(),
                            filter.shape()
                        )));
                    }
                }
                if dim.0 != height || dim.1 != spectral_width {
                    return Err(NowcastError::InvalidArgument(format!(
                        "spectrum shape {:?} does not match filter bank spectral shape {:?}",
                        dim,
                        (height, spectral_width)
                    )));
                }
                if spectrum
                    .iter()
                    .any(|v| !v.re.is_finite() || !v.im.is_finite())
                {
                    return Err(NowcastError::NonFiniteInput(
                        "spectrum contains non-finite values".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl CascadeDecomposition {
    pub fn domain(&self) -> Domain {
        self.levels.domain()
    }

    pub fn level_count(&self) -> usize {
        self.levels.level_count()
    }

    /// Invert the normalization and sum the cascade levels.
    ///
    /// Spatial decompositions recompose into a spatial field. Spectral
    /// decompositions recompose on the spectral grid; the caller applies the
    /// inverse transform. Compact levels are scattered through their masks
    /// with additive accumulation, so overlapping masks sum rather than
    /// overwrite.
    pub fn recompose(&self) -> Result<RecomposedField> {
        let stats = self.stats.as_ref().ok_or(NowcastError::MissingStatistics)?;

        let result = match &self.levels {
            CascadeLevels::Spatial(levels) => {
                let (_, h, w) = levels.dim();
                let mut out = Array2::<f64>::zeros((h, w));
                for (level, slice) in levels.outer_iter().enumerate() {
                    let (mu, sigma) = (stats.means[level], stats.stds[level]);
                    Zip::from(&mut out).and(&slice).for_each(|acc, &value| {
                        *acc += value * sigma + mu;
                    });
                }
                RecomposedField::Spatial(out)
            }
            CascadeLevels::Spectral(levels) => {
                let (_, h, wspec) = levels.dim();
                let mut out = Array2::<Complex64>::zeros((h, wspec));
                for (level, slice) in levels.outer_iter().enumerate() {
                    let (mu, sigma) = (stats.means[level], stats.stds[level]);
                    Zip::from(&mut out).and(&slice).for_each(|acc, &value| {
                        *acc += value * sigma + mu;
                    });
                }
                RecomposedField::Spectral(out)
            }
            CascadeLevels::SpectralCompact { values, masks } => {
                for (level, (level_values, mask)) in values.iter().zip(masks.iter()).enumerate() {
                    let retained = mask.iter().filter(|&&flag| flag).count();
                    if level_values.len() != retained {
                        return Err(NowcastError::InvalidArgument(format!(
                            "level {} stores {} values but its mask retains {} positions",
                            level,
                            level_values.len(),
                            retained
                        )));
                    }
                }

                let dim = masks[0].dim();
                let mut out = Array2::<Complex64>::zeros(dim);
                for (level, (level_values, mask)) in values.iter().zip(masks.iter()).enumerate() {
                    let (mu, sigma) = (stats.means[level], stats.stds[level]);
                    let mut next = level_values.iter();
                    for (idx, &retained) in mask.indexed_iter() {
                        if retained {
                            let value = next.next().expect("value count checked against mask");
                            out[idx] += *value * sigma + mu;
                        }
                    }
                }
                RecomposedField::Spectral(out)
            }
        };

        log_event(
            "recompose",
            &serde_json::json!({
                "domain": self.domain(),
                "levels": self.level_count(),
            }),
        );

        Ok(result)
    }
}

fn assemble_levels(
    slots: Vec<(LevelSlot, Option<(f64, f64)>)>,
    config: &DecompositionConfig,
    filter: &BandpassFilterBank,
) -> CascadeLevels {
    let level_count = slots.len();
    match config.output_domain {
        Domain::Spatial => {
            let (h, w) = filter.shape();
            let mut levels = Array3::<f64>::zeros((level_count, h, w));
            for (k, (slot, _)) in slots.into_iter().enumerate() {
                if let LevelSlot::Spatial(field) = slot {
                    levels.index_axis_mut(Axis(0), k).assign(&field);
                }
            }
            CascadeLevels::Spatial(levels)
        }
        Domain::Spectral if config.compact_output => {
            let mut values = Vec::with_capacity(level_count);
            let mut masks = Vec::with_capacity(level_count);
            for (slot, _) in slots {
                if let LevelSlot::Compact {
                    values: level_values,
                    mask,
                } = slot
                {
                    values.push(level_values);
                    masks.push(mask);
                }
            }
            CascadeLevels::SpectralCompact { values, masks }
        }
        Domain::Spectral => {
            let (h, wspec) = filter.spectral_shape();
            let mut levels = Array3::<Complex64>::zeros((level_count, h, wspec));
            for (k, (slot, _)) in slots.into_iter().enumerate() {
                if let LevelSlot::Spectral(spectrum) = slot {
                    levels.index_axis_mut(Axis(0), k).assign(&spectrum);
                }
            }
            CascadeLevels::Spectral(levels)
        }
    }
}

fn full_stats(values: ArrayView2<'_, f64>) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.sum() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn masked_stats(values: ArrayView2<'_, f64>, mask: ArrayView2<'_, bool>) -> (f64, f64) {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (value, &keep) in values.iter().zip(mask.iter()) {
        if keep {
            sum += value;
            count += 1;
        }
    }
    let n = count as f64;
    let mean = sum / n;
    let mut squared = 0.0;
    for (value, &keep) in values.iter().zip(mask.iter()) {
        if keep {
            squared += (value - mean) * (value - mean);
        }
    }
    (mean, (squared / n).sqrt())
}

fn log_event(name: &str, details: &serde_json::Value) {
    if let Err(err) = logging::log_operation(name, details) {
        eprintln!("failed to log cascade operation {name}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::RealFftBackend;
    use ndarray::Array3;

    fn test_field(h: usize, w: usize) -> Array2<f64> {
        Array2::from_shape_fn((h, w), |(i, j)| {
            (i as f64 * 0.9).sin() * 3.0 + (j as f64 * 0.4).cos() * 2.0 + 0.1 * (i + j) as f64
        })
    }

    /// Two uniform levels whose weights sum to one at every spectral position.
    fn unit_partition_bank(h: usize, w: usize) -> BandpassFilterBank {
        let wspec = w / 2 + 1;
        let weights = Array3::from_shape_fn((2, h, wspec), |(k, _, _)| {
            if k == 0 {
                0.4
            } else {
                0.6
            }
        });
        BandpassFilterBank::new(vec![0.4, 0.6], weights, (h, w)).unwrap()
    }

    fn transformer(h: usize, w: usize) -> CascadeTransformer<RealFftBackend> {
        CascadeTransformer::new(RealFftBackend::new((h, w)).unwrap())
    }

    #[test]
    fn test_level_count_matches_filter_bank() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let decomp = transformer(8, 8)
            .decompose(
                InputField::Spatial(field.view()),
                &bank,
                &DecompositionConfig::default(),
            )
            .unwrap();
        assert_eq!(decomp.level_count(), bank.level_count());
        assert_eq!(decomp.domain(), Domain::Spatial);
        assert!(decomp.stats.is_none());
    }

    #[test]
    fn test_normalize_without_stats_is_rejected() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let config = DecompositionConfig {
            normalize: true,
            ..Default::default()
        };
        let result = transformer(8, 8).decompose(InputField::Spatial(field.view()), &bank, &config);
        assert!(matches!(result, Err(NowcastError::InvalidArgument(_))));
    }

    #[test]
    fn test_mask_shape_mismatch_is_rejected() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let config = DecompositionConfig {
            compute_stats: true,
            mask: Some(Array2::from_elem((4, 4), true)),
            ..Default::default()
        };
        let result = transformer(8, 8).decompose(InputField::Spatial(field.view()), &bank, &config);
        assert!(matches!(result, Err(NowcastError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_finite_field_is_rejected() {
        let mut field = test_field(8, 8);
        field[[3, 5]] = f64::NAN;
        let bank = unit_partition_bank(8, 8);
        let result = transformer(8, 8).decompose(
            InputField::Spatial(field.view()),
            &bank,
            &DecompositionConfig::default(),
        );
        assert!(matches!(result, Err(NowcastError::NonFiniteInput(_))));
    }

    #[test]
    fn test_field_filter_dimension_mismatch_is_rejected() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(16, 16);
        let result = CascadeTransformer::new(RealFftBackend::new((16, 16)).unwrap()).decompose(
            InputField::Spatial(field.view()),
            &bank,
            &DecompositionConfig::default(),
        );
        assert!(matches!(result, Err(NowcastError::InvalidArgument(_))));
    }

    #[test]
    fn test_spatial_round_trip() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let config = DecompositionConfig {
            normalize: true,
            compute_stats: true,
            ..Default::default()
        };
        let decomp = transformer(8, 8)
            .decompose(InputField::Spatial(field.view()), &bank, &config)
            .unwrap();
        let restored = decomp.recompose().unwrap();
        let restored = restored.as_spatial().unwrap();
        for (a, b) in field.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-8, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_compact_spectral_round_trip() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let engine = transformer(8, 8);
        let config = DecompositionConfig {
            output_domain: Domain::Spectral,
            normalize: true,
            compute_stats: true,
            compact_output: true,
            ..Default::default()
        };
        let decomp = engine
            .decompose(InputField::Spatial(field.view()), &bank, &config)
            .unwrap();
        assert!(matches!(
            decomp.levels,
            CascadeLevels::SpectralCompact { .. }
        ));

        let recomposed = decomp.recompose().unwrap();
        let spectrum = recomposed.as_spectral().unwrap();
        let restored = engine.backend().inverse(spectrum.view()).unwrap();
        for (a, b) in field.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-8, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_dense_spectral_round_trip() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let engine = transformer(8, 8);
        let config = DecompositionConfig {
            output_domain: Domain::Spectral,
            normalize: true,
            compute_stats: true,
            compact_output: false,
            ..Default::default()
        };
        let decomp = engine
            .decompose(InputField::Spatial(field.view()), &bank, &config)
            .unwrap();
        let recomposed = decomp.recompose().unwrap();
        let restored = engine
            .backend()
            .inverse(recomposed.as_spectral().unwrap().view())
            .unwrap();
        for (a, b) in field.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn test_spectral_input_matches_spatial_input() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let engine = transformer(8, 8);
        let config = DecompositionConfig {
            compute_stats: true,
            ..Default::default()
        };

        let from_spatial = engine
            .decompose(InputField::Spatial(field.view()), &bank, &config)
            .unwrap();
        let spectrum = engine.backend().forward(field.view()).unwrap();
        let from_spectral = engine
            .decompose(InputField::Spectral(spectrum.view()), &bank, &config)
            .unwrap();

        let a = from_spatial.stats.unwrap();
        let b = from_spectral.stats.unwrap();
        for (x, y) in a.means.iter().zip(b.means.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
        for (x, y) in a.stds.iter().zip(b.stds.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_spectral_stats_agree_with_spatial_stats() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let engine = transformer(8, 8);

        let spatial = engine
            .decompose(
                InputField::Spatial(field.view()),
                &bank,
                &DecompositionConfig {
                    compute_stats: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let spectral = engine
            .decompose(
                InputField::Spatial(field.view()),
                &bank,
                &DecompositionConfig {
                    output_domain: Domain::Spectral,
                    compute_stats: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let a = spatial.stats.unwrap();
        let b = spectral.stats.unwrap();
        for (x, y) in a.means.iter().zip(b.means.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
        for (x, y) in a.stds.iter().zip(b.stds.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_masked_stats_ignore_excluded_positions() {
        let mut field = test_field(8, 8);
        // Large outlier excluded by the mask.
        field[[0, 0]] = 1000.0;
        let bank = unit_partition_bank(8, 8);
        let engine = transformer(8, 8);

        let mut mask = Array2::from_elem((8, 8), true);
        mask[[0, 0]] = false;

        let masked = engine
            .decompose(
                InputField::Spatial(field.view()),
                &bank,
                &DecompositionConfig {
                    compute_stats: true,
                    mask: Some(mask),
                    ..Default::default()
                },
            )
            .unwrap();
        let unmasked = engine
            .decompose(
                InputField::Spatial(field.view()),
                &bank,
                &DecompositionConfig {
                    compute_stats: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let masked_stats = masked.stats.unwrap();
        let unmasked_stats = unmasked.stats.unwrap();
        for (a, b) in masked_stats.means.iter().zip(unmasked_stats.means.iter()) {
            assert!((a - b).abs() > 1e-6, "mask had no effect on the mean");
        }
    }

    #[test]
    fn test_recompose_without_stats_fails() {
        let field = test_field(8, 8);
        let bank = unit_partition_bank(8, 8);
        let decomp = transformer(8, 8)
            .decompose(
                InputField::Spatial(field.view()),
                &bank,
                &DecompositionConfig::default(),
            )
            .unwrap();
        assert!(matches!(
            decomp.recompose(),
            Err(NowcastError::MissingStatistics)
        ));
    }

    #[test]
    fn test_compact_masks_follow_weight_threshold() {
        let field = test_field(8, 8);
        let wspec = 5;
        // Level 0 keeps only the first spectral column above the threshold.
        let weights = Array3::from_shape_fn((2, 8, wspec), |(k, _, j)| {
            if k == 0 {
                if j == 0 {
                    1.0
                } else {
                    0.0
                }
            } else if j == 0 {
                0.0
            } else {
                1.0
            }
        });
        let bank = BandpassFilterBank::new(vec![1.0, 1.0], weights, (8, 8)).unwrap();
        let decomp = transformer(8, 8)
            .decompose(
                InputField::Spatial(field.view()),
                &bank,
                &DecompositionConfig {
                    output_domain: Domain::Spectral,
                    compute_stats: true,
                    compact_output: true,
                    ..Default::default()
                },
            )
            .unwrap();

        match &decomp.levels {
            CascadeLevels::SpectralCompact { values, masks } => {
                assert_eq!(values[0].len(), 8);
                assert_eq!(values[1].len(), 8 * (wspec - 1));
                assert!(masks[0].column(0).iter().all(|&m| m));
                assert!(masks[1].column(0).iter().all(|&m| !m));
            }
            other => panic!("expected compact levels, got {:?}", other.domain()),
        }
    }
}
