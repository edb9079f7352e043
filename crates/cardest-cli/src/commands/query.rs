//! Query mode: benchmark one query under the isolated trial harness.
//!
//! The parent validates the graph, summary, and query up front —
//! nothing trial-level can rescue a missing summary, so those abort
//! before any trial is dispatched. Each trial then re-execs this
//! binary's hidden `trial` mode as its own failure domain.

use crate::QueryArgs;
use anyhow::{Context, Result};
use cardest_common::Error;
use cardest_estimators::new_estimator;
use cardest_graph::{DataGraph, QueryGraph, summary_path};
use cardest_harness::{HarnessConfig, run_query};
use std::process::{Command, ExitCode};
use std::time::Duration;

/// Run query mode.
///
/// stdout carries exactly one line `"{avg_estimate},{avg_time}"` on
/// success. When every trial fails, an error line naming the query
/// goes to stderr instead and the exit code is still 0: downstream
/// tooling appends one CSV row per query and must not abort a batch
/// on a single query's failure.
pub fn run(args: &QueryArgs) -> Result<ExitCode> {
    let (param, summary_param) = super::resolve_param(&args.ratio, args.budget)?;
    let summary = summary_path(&args.data, &args.method, &summary_param, args.seed);

    // Fail-fast validation; the trial children redo these loads in
    // their own address space.
    DataGraph::read_binary(&args.data)
        .with_context(|| format!("failed to load {}", args.data.display()))?;
    let mut estimator = new_estimator(&args.method)?;
    estimator
        .read_summary(&summary)
        .with_context(|| format!("failed to load summary {}", summary.display()))?;
    QueryGraph::read_text(&args.input)
        .with_context(|| format!("failed to parse query {}", args.input.display()))?;

    let exe = std::env::current_exe().context("cannot locate own executable")?;
    let query_id = args.input.display().to_string();

    let spawner = move |_index: u32, seed: u64| {
        let mut cmd = Command::new(&exe);
        cmd.arg("trial")
            .arg("--method")
            .arg(&args.method)
            .arg("--data")
            .arg(&args.data)
            .arg("--summary")
            .arg(&summary)
            .arg("--query")
            .arg(&args.input)
            .arg("--param")
            .arg(param.to_string())
            .arg("--seed")
            .arg(seed.to_string());
        cmd
    };

    let config = HarnessConfig {
        num_iter: args.iterations,
        base_seed: args.seed,
        timeout: Duration::from_secs(args.timeout_secs),
        poll_interval: Duration::from_millis(args.poll_interval_ms),
    };

    match run_query(&spawner, &config, &query_id) {
        Ok(agg) => {
            tracing::debug!(
                successes = agg.successes,
                attempted = agg.attempted,
                peak_rss_kb = agg.peak_rss_kb,
                "query aggregated"
            );
            println!("{},{}", agg.avg_estimate, agg.avg_time);
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::AllTrialsFailed {
            query,
            attempted,
            detail,
        }) => {
            // In-band failure: no result line, stderr report, exit 0.
            eprintln!("{query} error after {attempted} trials: {detail}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Err(e).context("trial harness failed"),
    }
}
