//! # Engine Module
//!
//! Numerical machinery shared by the workflows: validated configuration, the BFGS geometry
//! optimizer, progress reporting, and the error type that ties the lower layers together.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Optimizer, calculator and CREST settings with builders
//! - **Optimizer** ([`optimizer`]) - Cartesian BFGS with an optional dihedral constraint
//! - **State Tracking** ([`state`]) - The outcome of an optimization run
//! - **Progress Monitoring** ([`progress`]) - Events for front ends that draw progress
//! - **Error Handling** ([`error`]) - Engine-level error aggregation

pub mod config;
pub mod error;
pub mod optimizer;
pub mod progress;
pub mod state;
