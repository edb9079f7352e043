//! # cardest-estimators
//!
//! Cardinality estimator algorithms behind a single three-operation
//! contract, so the harness and mode controller never know which
//! concrete algorithm is active.
//!
//! An estimator builds its statistic once ([`Estimator::summarize`]),
//! loads it once per process ([`Estimator::read_summary`]), and then
//! answers any number of ([`Estimator::run`]) calls against the loaded,
//! immutable state. `run` may consume randomness, which is why the
//! harness averages repeated trials instead of trusting a single call.
//!
//! Randomness is always threaded in explicitly: there is no global RNG
//! and no hidden coupling between calls.

pub mod cset;
pub mod wander_join;

use cardest_common::{Error, Result};
use cardest_graph::{DataGraph, QueryGraph};
use rand::RngCore;
use std::path::Path;

pub use cset::CharacteristicSets;
pub use wander_join::WanderJoin;

/// The capability contract every estimator algorithm implements.
pub trait Estimator {
    /// The registry name of this algorithm (also the summary method
    /// tag).
    fn method(&self) -> &'static str;

    /// Builds the algorithm's statistic over `graph` and writes it to
    /// `out_path`.
    ///
    /// Deterministic for a fixed RNG state: identical seeds produce
    /// byte-identical artifacts.
    fn summarize(
        &mut self,
        graph: &DataGraph,
        out_path: &Path,
        param: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()>;

    /// Loads a previously built artifact into the estimator.
    ///
    /// Called exactly once before any [`Estimator::run`]; the loaded
    /// state serves arbitrarily many runs without reloading.
    fn read_summary(&mut self, path: &Path) -> Result<()>;

    /// Returns an approximate match count for `query` against `graph`.
    ///
    /// Fails with [`Error::UnsupportedQueryShape`] for pattern shapes
    /// the algorithm cannot process; that failure is never a zero
    /// estimate.
    fn run(
        &self,
        graph: &DataGraph,
        query: &QueryGraph,
        param: f64,
        rng: &mut dyn RngCore,
    ) -> Result<f64>;
}

/// Method names with a registered estimator, in registry order.
pub const METHODS: &[&str] = &[wander_join::METHOD, cset::METHOD];

/// Instantiates the estimator registered under `method`.
pub fn new_estimator(method: &str) -> Result<Box<dyn Estimator>> {
    match method {
        wander_join::METHOD => Ok(Box::new(WanderJoin::default())),
        cset::METHOD => Ok(Box::new(CharacteristicSets::default())),
        other => Err(Error::UnknownMethod(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        for &m in METHODS {
            assert_eq!(new_estimator(m).unwrap().method(), m);
        }
        assert!(matches!(
            new_estimator("nope"),
            Err(Error::UnknownMethod(_))
        ));
    }
}
