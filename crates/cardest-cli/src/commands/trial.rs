//! Hidden trial mode: the child side of one isolated trial.
//!
//! Loads the graph and summary into this process's own address space,
//! runs the estimator exactly once with the seed the orchestrator
//! derived, writes one `"{estimate} {elapsed}"` line to stdout, and
//! exits. A shape rejection exits with a distinct code and no result
//! line, so the orchestrator can tell it apart from both a crash and
//! a genuine estimate.

use crate::TrialArgs;
use anyhow::{Context, Result};
use cardest_common::Error;
use cardest_estimators::new_estimator;
use cardest_graph::{DataGraph, QueryGraph};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::process::ExitCode;
use std::time::Instant;

/// Exit code for a pattern shape the estimator does not support.
const EXIT_UNSUPPORTED_SHAPE: u8 = 3;

/// Run one trial in this (child) process.
pub fn run(args: &TrialArgs) -> Result<ExitCode> {
    let graph = DataGraph::read_binary(&args.data)
        .with_context(|| format!("failed to load {}", args.data.display()))?;
    let query = QueryGraph::read_text(&args.query)
        .with_context(|| format!("failed to parse query {}", args.query.display()))?;
    let mut estimator = new_estimator(&args.method)?;
    estimator
        .read_summary(&args.summary)
        .with_context(|| format!("failed to load summary {}", args.summary.display()))?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = Instant::now();
    match estimator.run(&graph, &query, args.param, &mut rng) {
        Ok(estimate) => {
            let elapsed = start.elapsed().as_secs_f64();
            println!("{estimate} {elapsed}");
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::UnsupportedQueryShape(reason)) => {
            tracing::warn!(query = %args.query.display(), reason, "unsupported query shape");
            Ok(ExitCode::from(EXIT_UNSUPPORTED_SHAPE))
        }
        Err(e) => Err(e).context("estimator run failed"),
    }
}
