//! # mlipopt Core Library
//!
//! Geometry optimization and conformer clustering for small molecules, with energies and
//! forces supplied by a pretrained machine-learning interatomic potential (MLIP) such as
//! Orb-v3 running in an external worker process.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `Element`), file I/O
//!   for xyz and sdf, torsion geometry, the dihedral constraint, the calculator seam that
//!   talks to the MLIP worker, and the CREST runner.
//!
//! - **[`engine`]: The Logic Core.** Configuration builders, the BFGS optimizer,
//!   progress reporting, and the aggregated error type.
//!
//! - **[`workflows`]: The Public API.** Complete procedures: optimizing one structure
//!   (optionally with a held dihedral) and optimizing-then-clustering a conformer ensemble.
//!
//! ## Calculator worker
//!
//! Energies and forces come from a separate process speaking one JSON object per line
//! (see [`core::calculator::external`]). The crate ships the Orb-v3 worker in
//! `worker/orb_calculator.py`; `pip install ./crates/mlipopt-core/worker` installs it as the
//! `orb-calculator` command, which is the default worker command. It needs `ase` and
//! `orb-models`, and loads `pretrained.orb_v3_conservative_inf_omat` (or whichever model
//! `--model` names) once per process.

pub mod core;
pub mod engine;
pub mod workflows;
