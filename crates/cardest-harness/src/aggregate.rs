//! Aggregation of trial outcomes into one reportable statistic.

use crate::trial::{TrialOutcome, TrialRecord};
use cardest_common::{Error, Result};

/// The unit the workbench ultimately reports for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAggregate {
    /// Arithmetic mean of accepted estimates.
    pub avg_estimate: f64,
    /// Arithmetic mean of accepted per-trial times, in seconds.
    pub avg_time: f64,
    /// Running maximum RSS observed across all trials, in kB.
    /// Diagnostic only.
    pub peak_rss_kb: u64,
    /// Trials that contributed to the means.
    pub successes: usize,
    /// Trials attempted in total.
    pub attempted: usize,
}

/// Accumulates trial records; successes feed the means, everything
/// else is just counted.
#[derive(Debug, Default)]
pub struct Accumulator {
    estimates: Vec<f64>,
    times: Vec<f64>,
    peak_rss_kb: u64,
    attempted: usize,
    timed_out: usize,
    crashed: usize,
    rejected: usize,
}

impl Accumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one finished trial in.
    pub fn record(&mut self, record: &TrialRecord) {
        self.attempted += 1;
        self.peak_rss_kb = self.peak_rss_kb.max(record.peak_rss_kb);
        match record.outcome {
            TrialOutcome::Completed { estimate, elapsed } => {
                self.estimates.push(estimate);
                self.times.push(elapsed);
            }
            TrialOutcome::TimedOut => self.timed_out += 1,
            TrialOutcome::Crashed { .. } => self.crashed += 1,
            TrialOutcome::Rejected { .. } => self.rejected += 1,
        }
    }

    /// Number of successful trials so far.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.estimates.len()
    }

    /// Produces the aggregate, or the query-level failure if zero
    /// trials succeeded. A failed query is never reported as 0.
    pub fn finish(self, query: &str) -> Result<QueryAggregate> {
        let successes = self.estimates.len();
        if successes == 0 {
            return Err(Error::AllTrialsFailed {
                query: query.to_string(),
                attempted: self.attempted,
                detail: format!(
                    "timed_out={} crashed={} rejected={}",
                    self.timed_out, self.crashed, self.rejected
                ),
            });
        }
        Ok(QueryAggregate {
            avg_estimate: self.estimates.iter().sum::<f64>() / successes as f64,
            avg_time: self.times.iter().sum::<f64>() / successes as f64,
            peak_rss_kb: self.peak_rss_kb,
            successes,
            attempted: self.attempted,
        })
    }
}
