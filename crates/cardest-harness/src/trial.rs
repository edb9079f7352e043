//! One isolated trial.
//!
//! A trial moves `Idle -> Running` on dispatch and ends in exactly one
//! of `Completed`, `TimedOut`, or `Crashed`; a clean exit that produced
//! no result line ends as `Rejected`. The orchestrator never blocks on
//! the child: it polls `try_wait` at a fixed interval so the wall-clock
//! ceiling is enforced promptly, and on timeout it SIGKILLs the child
//! and drains the zombie with a blocking `wait` before moving on.
//!
//! The result channel is the child's piped stdout carrying at most one
//! line `"{estimate} {elapsed_seconds}"`. Because every trial gets a
//! fresh pipe, "no result yet" is simply the absence of a parseable
//! line — a stale value from an earlier trial cannot be observed.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Terminal state of one trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    /// The execution context returned a result before the deadline.
    Completed {
        /// The trial's estimate.
        estimate: f64,
        /// Estimator wall-time in seconds, measured inside the child.
        elapsed: f64,
    },
    /// The deadline elapsed first; the context was forcibly killed.
    TimedOut,
    /// The context terminated on a fault signal.
    Crashed {
        /// Signal number that terminated the context.
        signal: i32,
    },
    /// The context exited on its own without producing a result
    /// (estimator-level failure such as an unsupported shape).
    Rejected {
        /// The context's exit code.
        code: i32,
    },
}

impl TrialOutcome {
    /// True only for `Completed`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Record of one finished trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    /// Trial index within the query.
    pub index: u32,
    /// Derived RNG seed the trial ran with.
    pub seed: u64,
    /// Terminal outcome.
    pub outcome: TrialOutcome,
    /// Highest resident set size observed while the trial ran, in kB.
    /// 0 where the platform offers no cheap way to read it.
    pub peak_rss_kb: u64,
}

/// Dispatches `command` as an isolated execution context and babysits
/// it to a terminal outcome.
///
/// # Errors
///
/// Only spawn/wait I/O failures of the orchestrator itself; estimator
/// misbehavior always lands in the returned outcome instead.
pub fn run_trial(
    command: &mut Command,
    index: u32,
    seed: u64,
    timeout: Duration,
    poll_interval: Duration,
) -> std::io::Result<TrialRecord> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let started = Instant::now();
    let mut peak_rss_kb = 0u64;

    let outcome = loop {
        std::thread::sleep(poll_interval);
        peak_rss_kb = peak_rss_kb.max(read_rss_kb(child.id()).unwrap_or(0));

        if let Some(status) = child.try_wait()? {
            break classify_exit(&mut child, status);
        }

        if started.elapsed() >= timeout {
            // Non-catchable kill, then a blocking wait to drain the
            // zombie before the next trial reuses the slot.
            child.kill()?;
            child.wait()?;
            break TrialOutcome::TimedOut;
        }
    };

    Ok(TrialRecord {
        index,
        seed,
        outcome,
        peak_rss_kb,
    })
}

fn classify_exit(child: &mut Child, status: std::process::ExitStatus) -> TrialOutcome {
    if let Some(signal) = termination_signal(&status) {
        return TrialOutcome::Crashed { signal };
    }
    let code = status.code().unwrap_or(-1);
    if code == 0 {
        if let Some(result) = read_result_line(child) {
            return TrialOutcome::Completed {
                estimate: result.0,
                elapsed: result.1,
            };
        }
    }
    TrialOutcome::Rejected { code }
}

/// Reads at most one `"{estimate} {elapsed}"` line from the drained
/// result channel.
fn read_result_line(child: &mut Child) -> Option<(f64, f64)> {
    let mut buf = String::new();
    child.stdout.take()?.read_to_string(&mut buf).ok()?;
    let line = buf.lines().next()?;
    let mut fields = line.split_whitespace();
    let estimate: f64 = fields.next()?.parse().ok()?;
    let elapsed: f64 = fields.next()?.parse().ok()?;
    Some((estimate, elapsed))
}

#[cfg(unix)]
fn termination_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Resident set size of a live process in kB, from `/proc`.
#[cfg(target_os = "linux")]
fn read_rss_kb(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    line.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(not(target_os = "linux"))]
fn read_rss_kb(_pid: u32) -> Option<u64> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    const POLL: Duration = Duration::from_millis(20);

    #[test]
    fn test_completed_trial() {
        let record = run_trial(
            &mut sh("echo '2.5 0.01'"),
            0,
            7,
            Duration::from_secs(5),
            POLL,
        )
        .unwrap();
        assert_eq!(
            record.outcome,
            TrialOutcome::Completed {
                estimate: 2.5,
                elapsed: 0.01
            }
        );
        assert_eq!(record.seed, 7);
    }

    #[test]
    fn test_timeout_containment() {
        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let record = run_trial(&mut sh("sleep 30"), 0, 0, timeout, POLL).unwrap();
        assert_eq!(record.outcome, TrialOutcome::TimedOut);
        // Killed within ceiling + polling slack, not after 30 s.
        assert!(started.elapsed() < timeout + Duration::from_secs(2));
    }

    #[test]
    fn test_crash_containment() {
        let record = run_trial(
            &mut sh("kill -SEGV $$"),
            0,
            0,
            Duration::from_secs(5),
            POLL,
        )
        .unwrap();
        assert_eq!(record.outcome, TrialOutcome::Crashed { signal: 11 });
    }

    #[test]
    fn test_abort_signal_is_reported() {
        let record = run_trial(
            &mut sh("kill -ABRT $$"),
            0,
            0,
            Duration::from_secs(5),
            POLL,
        )
        .unwrap();
        assert_eq!(record.outcome, TrialOutcome::Crashed { signal: 6 });
    }

    #[test]
    fn test_nonzero_exit_is_rejected() {
        let record = run_trial(&mut sh("exit 3"), 0, 0, Duration::from_secs(5), POLL).unwrap();
        assert_eq!(record.outcome, TrialOutcome::Rejected { code: 3 });
    }

    #[test]
    fn test_clean_exit_without_result_is_rejected() {
        // Exit 0 but no result line: must not be mistaken for a
        // (stale or zero) estimate.
        let record = run_trial(&mut sh("true"), 0, 0, Duration::from_secs(5), POLL).unwrap();
        assert_eq!(record.outcome, TrialOutcome::Rejected { code: 0 });
    }

    #[test]
    fn test_garbled_result_is_rejected() {
        let record = run_trial(
            &mut sh("echo 'not a number'"),
            0,
            0,
            Duration::from_secs(5),
            POLL,
        )
        .unwrap();
        assert_eq!(record.outcome, TrialOutcome::Rejected { code: 0 });
    }
}
