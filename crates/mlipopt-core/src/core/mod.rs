//! # Core Module
//!
//! Fundamental building blocks for MLIP-driven structure optimization.
//!
//! - **Molecular Representation** ([`models`]) - Elements, atoms, bonds, molecules, and the
//!   electronic state (charge and spin multiplicity) handed to the potential
//! - **File I/O** ([`io`]) - Multi-frame xyz and multi-record sdf readers and writers
//! - **Geometry** ([`geometry`]) - Torsion angles, their Cartesian gradients, and RMSD
//! - **Energy Evaluation** ([`calculator`]) - The `Calculator` seam and the external MLIP worker
//! - **Constraints** ([`constraints`]) - Holding a dihedral angle fixed during optimization
//! - **Clustering** ([`crest`]) - Invocation of CREST's CREGEN ensemble sorting

pub mod calculator;
pub mod constraints;
pub mod crest;
pub mod geometry;
pub mod io;
pub mod models;
