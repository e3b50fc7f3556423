//! Multi-scale cascade decomposition of 2D fields.
//!
//! A bandpass filter bank splits the spectrum of a field into additive scale
//! levels; the decomposition can stay in the spectral domain (optionally in
//! compact storage) or be transformed back to the spatial domain, with
//! per-level normalization statistics for later recomposition.

pub mod decomposition;
pub mod filter;

pub use decomposition::{
    CascadeDecomposition, CascadeLevels, CascadeTransformer, DecompositionConfig, Domain,
    InputField, LevelStats, RecomposedField, COMPACTION_THRESHOLD,
};
pub use filter::BandpassFilterBank;
