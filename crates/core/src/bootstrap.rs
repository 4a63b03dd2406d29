use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Run each candidate with the version-check arguments and return the
/// first one that exits zero. A candidate that cannot be spawned counts
/// as a failed probe, not an error.
pub fn probe_executables(candidates: &[&str], check_args: &[&str]) -> Option<String> {
    for candidate in candidates {
        let probe = Command::new(candidate)
            .args(check_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match probe {
            Ok(status) if status.success() => {
                debug!(candidate, "executable probe succeeded");
                return Some(candidate.to_string());
            }
            Ok(status) => debug!(candidate, ?status, "executable probe failed"),
            Err(e) => debug!(candidate, error = %e, "executable probe could not spawn"),
        }
    }
    None
}

/// Idempotently create the directory for daemon logs. Failure is not
/// fatal: the caller falls back to discarding the daemon's output.
pub fn ensure_log_dir(path: &Path) -> bool {
    match std::fs::create_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not create log directory");
            false
        }
    }
}

/// Outcome of one setup strategy: the goal is met, either because this
/// strategy did the work or because it found nothing left to do.
pub enum Attempt<T> {
    Ready(T),
    AlreadySatisfied(T),
}

pub trait SetupStrategy {
    type Output;

    fn name(&self) -> &'static str;
    fn attempt(&mut self) -> Result<Attempt<Self::Output>, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub reason: String,
}

pub enum SetupReport<T> {
    Satisfied {
        strategy: &'static str,
        /// True when the winning strategy found the goal already met.
        already: bool,
        value: T,
    },
    Exhausted {
        failures: Vec<StrategyFailure>,
    },
}

/// Evaluate strategies in declaration order, returning at the first
/// success. Exhausting the list is reported, not raised: some
/// environments meet the goal through means none of the strategies can
/// see, and the caller decides how loudly to warn.
pub fn run_strategies<T>(
    strategies: &mut [Box<dyn SetupStrategy<Output = T> + '_>],
) -> SetupReport<T> {
    let mut failures = Vec::new();

    for strategy in strategies {
        match strategy.attempt() {
            Ok(Attempt::Ready(value)) => {
                return SetupReport::Satisfied {
                    strategy: strategy.name(),
                    already: false,
                    value,
                }
            }
            Ok(Attempt::AlreadySatisfied(value)) => {
                return SetupReport::Satisfied {
                    strategy: strategy.name(),
                    already: true,
                    value,
                }
            }
            Err(reason) => {
                warn!(strategy = strategy.name(), %reason, "setup strategy failed");
                failures.push(StrategyFailure {
                    strategy: strategy.name(),
                    reason,
                });
            }
        }
    }

    SetupReport::Exhausted { failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Scripted {
        name: &'static str,
        result: Option<Result<Attempt<u32>, String>>,
        attempts: Rc<Cell<u32>>,
    }

    impl SetupStrategy for Scripted {
        type Output = u32;

        fn name(&self) -> &'static str {
            self.name
        }

        fn attempt(&mut self) -> Result<Attempt<u32>, String> {
            self.attempts.set(self.attempts.get() + 1);
            self.result.take().unwrap()
        }
    }

    fn scripted(
        name: &'static str,
        result: Result<Attempt<u32>, String>,
    ) -> (Box<dyn SetupStrategy<Output = u32>>, Rc<Cell<u32>>) {
        let attempts = Rc::new(Cell::new(0));
        let strategy = Scripted {
            name,
            result: Some(result),
            attempts: attempts.clone(),
        };
        (Box::new(strategy), attempts)
    }

    #[cfg(unix)]
    #[test]
    fn probe_returns_first_succeeding_candidate() {
        let found = probe_executables(&["definitely-missing-xyz", "false", "true"], &[]);
        assert_eq!(found.as_deref(), Some("true"));
    }

    #[cfg(unix)]
    #[test]
    fn probe_returns_none_when_all_fail() {
        assert_eq!(
            probe_executables(&["definitely-missing-xyz", "also-missing-abc"], &["--version"]),
            None
        );
    }

    #[test]
    fn log_dir_creation_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("logs").join("nested");

        assert!(ensure_log_dir(&target));
        assert!(target.is_dir());
        assert!(ensure_log_dir(&target));
    }

    #[test]
    fn log_dir_blocked_by_file_is_nonfatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("logs");
        std::fs::write(&target, b"in the way").unwrap();

        assert!(!ensure_log_dir(&target));
    }

    #[test]
    fn first_success_stops_the_chain() {
        let (a, a_count) = scripted("a", Err("nope".to_string()));
        let (b, b_count) = scripted("b", Ok(Attempt::Ready(7)));
        let (c, c_count) = scripted("c", Ok(Attempt::Ready(99)));

        let mut strategies = [a, b, c];
        let report = run_strategies(&mut strategies);

        match report {
            SetupReport::Satisfied {
                strategy,
                already,
                value,
            } => {
                assert_eq!(strategy, "b");
                assert!(!already);
                assert_eq!(value, 7);
            }
            SetupReport::Exhausted { .. } => panic!("expected success"),
        }

        assert_eq!(a_count.get(), 1);
        assert_eq!(b_count.get(), 1);
        assert_eq!(c_count.get(), 0, "strategy after the winner must not run");
    }

    #[test]
    fn already_satisfied_is_reported_as_such() {
        let (a, _) = scripted("probe", Ok(Attempt::AlreadySatisfied(1)));
        let mut strategies = [a];

        match run_strategies(&mut strategies) {
            SetupReport::Satisfied { already, .. } => assert!(already),
            SetupReport::Exhausted { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn exhaustion_collects_every_failure() {
        let (a, _) = scripted("a", Err("first".to_string()));
        let (b, _) = scripted("b", Err("second".to_string()));
        let mut strategies = [a, b];

        match run_strategies(&mut strategies) {
            SetupReport::Exhausted { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].strategy, "a");
                assert_eq!(failures[0].reason, "first");
                assert_eq!(failures[1].reason, "second");
            }
            SetupReport::Satisfied { .. } => panic!("expected exhaustion"),
        }
    }
}
