//! Build mode: ensure a compacted binary graph exists, then build one
//! estimator summary over it.

use crate::BuildArgs;
use anyhow::{Context, Result};
use cardest_estimators::new_estimator;
use cardest_graph::{DataGraph, summary_path};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::process::ExitCode;
use std::time::Instant;

/// Run build mode. Prints the summary build wall-time (seconds) to
/// stdout.
pub fn run(args: &BuildArgs) -> Result<ExitCode> {
    let mut estimator = new_estimator(&args.method)?;
    let (param, summary_param) = super::resolve_param(&args.ratio, args.budget)?;
    let out_path = summary_path(&args.data, &args.method, &summary_param, args.seed);

    if !DataGraph::has_binary(&args.data) {
        tracing::info!(input = %args.input.display(), "no binary graph, building one");
        let mut g = DataGraph::read_text(&args.input)
            .with_context(|| format!("failed to parse {}", args.input.display()))?;
        g.make_binary()?;
        g.write_binary(&args.data)
            .with_context(|| format!("failed to write {}", args.data.display()))?;
        g.clear_raw_data();
    }

    let g = DataGraph::read_binary(&args.data)
        .with_context(|| format!("failed to load {}", args.data.display()))?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = Instant::now();
    estimator
        .summarize(&g, &out_path, param, &mut rng)
        .with_context(|| format!("summarize failed for method {}", args.method))?;
    let build_time = start.elapsed().as_secs_f64();

    tracing::info!(summary = %out_path.display(), "summary written");
    println!("{build_time}");
    Ok(ExitCode::SUCCESS)
}
