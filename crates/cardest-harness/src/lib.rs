//! # cardest-harness
//!
//! Executes `Estimator::run` N times per query, each trial in its own
//! failure domain (a separate OS process), enforces a per-trial
//! wall-clock ceiling, and aggregates the surviving results.
//!
//! Estimator code is adversarial from the harness's point of view: it
//! may hang, grow without bound, or fault. The hard process boundary
//! plus a one-line pipe result channel contains all of that without
//! instrumenting any algorithm, and the bounded poll loop guarantees
//! the orchestrator itself always makes progress.
//!
//! Trials are strictly sequential: one execution context outstanding at
//! a time, its result channel fully drained before the next dispatch.

pub mod aggregate;
pub mod trial;

use cardest_common::Result;
use std::process::Command;
use std::time::Duration;

pub use aggregate::{Accumulator, QueryAggregate};
pub use trial::{TrialOutcome, TrialRecord};

/// Reference wall-clock ceiling per trial.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Reference completion-poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Harness configuration. The reference constants are defaults, not
/// hardcoded behavior.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Trials per query.
    pub num_iter: u32,
    /// Base RNG seed; trial `i` runs with `base_seed + i`.
    pub base_seed: u64,
    /// Per-trial wall-clock ceiling.
    pub timeout: Duration,
    /// Completion-poll interval.
    pub poll_interval: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_iter: 30,
            base_seed: 0,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Builds the command for one trial's execution context.
///
/// The production spawner re-execs the current binary's hidden trial
/// mode; tests substitute shell stubs.
pub trait TrialSpawner {
    /// Command for trial `index` with derived seed `seed`.
    fn command(&self, index: u32, seed: u64) -> Command;
}

impl<F: Fn(u32, u64) -> Command> TrialSpawner for F {
    fn command(&self, index: u32, seed: u64) -> Command {
        self(index, seed)
    }
}

/// Runs all trials for one query and aggregates them.
///
/// `query_id` is only used for logging and the failure report.
/// Excluded trials are logged and never retried; the query fails only
/// when every trial was excluded.
pub fn run_query(
    spawner: &impl TrialSpawner,
    config: &HarnessConfig,
    query_id: &str,
) -> Result<QueryAggregate> {
    let mut acc = Accumulator::new();

    for index in 0..config.num_iter {
        let seed = config.base_seed + u64::from(index);
        let mut command = spawner.command(index, seed);
        let record = trial::run_trial(
            &mut command,
            index,
            seed,
            config.timeout,
            config.poll_interval,
        )?;

        match &record.outcome {
            TrialOutcome::Completed { .. } => {}
            TrialOutcome::TimedOut => {
                tracing::warn!(query = query_id, trial = index, "trial timed out");
            }
            TrialOutcome::Crashed { signal } => {
                tracing::warn!(
                    query = query_id,
                    trial = index,
                    signal,
                    "trial crashed"
                );
            }
            TrialOutcome::Rejected { code } => {
                tracing::warn!(
                    query = query_id,
                    trial = index,
                    code,
                    "trial rejected by estimator"
                );
            }
        }
        acc.record(&record);
    }

    acc.finish(query_id)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn config(num_iter: u32) -> HarnessConfig {
        HarnessConfig {
            num_iter,
            base_seed: 100,
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(20),
        }
    }

    fn sh_spawner(script: impl Fn(u32, u64) -> String) -> impl TrialSpawner {
        move |index: u32, seed: u64| {
            let mut cmd = Command::new("/bin/sh");
            cmd.arg("-c").arg(script(index, seed));
            cmd
        }
    }

    #[test]
    fn test_aggregates_across_trials() {
        // Trials echo 2, 4, 6; the aggregate is their mean.
        let spawner = sh_spawner(|i, _| format!("echo '{}.0 0.01'", (i + 1) * 2));
        let agg = run_query(&spawner, &config(3), "q").unwrap();
        assert_eq!(agg.avg_estimate, 4.0);
        assert_eq!(agg.successes, 3);
    }

    #[test]
    fn test_seed_derivation() {
        // Each trial sees base_seed + index.
        let spawner = sh_spawner(|_, seed| format!("echo '{seed}.0 0.0'"));
        let agg = run_query(&spawner, &config(2), "q").unwrap();
        assert_eq!(agg.avg_estimate, 100.5);
    }

    #[test]
    fn test_survives_mixed_failures() {
        // Trial 0 crashes, trial 1 hangs past the ceiling, trial 2
        // completes; the run must reach trial 2 and report it.
        let spawner = sh_spawner(|i, _| match i {
            0 => "kill -SEGV $$".to_string(),
            1 => "sleep 30".to_string(),
            _ => "echo '7.0 0.5'".to_string(),
        });
        let cfg = HarnessConfig {
            timeout: Duration::from_millis(200),
            ..config(3)
        };
        let agg = run_query(&spawner, &cfg, "q").unwrap();
        assert_eq!(agg.avg_estimate, 7.0);
        assert_eq!(agg.successes, 1);
        assert_eq!(agg.attempted, 3);
    }

    #[test]
    fn test_all_failed_is_query_failure() {
        let spawner = sh_spawner(|_, _| "exit 3".to_string());
        let err = run_query(&spawner, &config(2), "queries/q1.txt").unwrap_err();
        assert!(matches!(
            err,
            cardest_common::Error::AllTrialsFailed { .. }
        ));
    }
}
