//! # Workflows Module
//!
//! Top-level entry points of the library. Each workflow takes parsed structures and
//! validated configuration, drives the engine, and returns annotated structures ready to
//! be written back to disk.
//!
//! - **Optimization** ([`optimize`]) - Relax one structure, optionally holding a dihedral
//! - **Clustering** ([`cluster`]) - Relax every conformer of an ensemble in parallel, then
//!   sort and deduplicate the results with CREST

pub mod cluster;
pub mod optimize;

/// Renders a float the way the reference tooling prints charges and spins (`0.0`, `-1.0`, `0.5`).
pub(crate) fn plain_float(value: f64) -> String {
    format!("{value:?}")
}
