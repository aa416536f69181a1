//! Energy and force evaluation.
//!
//! The optimizer only sees the [`traits::Calculator`] trait. The production implementation,
//! [`external::ExternalCalculator`], keeps a pretrained-potential worker process alive for
//! the whole optimization and exchanges one JSON line per evaluation with it, so the model
//! is loaded once per run rather than once per step.

pub mod error;
pub mod external;
pub mod protocol;
pub mod traits;
#[cfg(test)]
pub(crate) mod testing;
