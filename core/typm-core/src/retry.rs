//! Retry and fallback control (made by FontLab https://www.fontlab.com/)
//!
//! Every unit of work, whether a probe batch or a whole font, runs under a
//! bounded retry budget with backoff, and always terminates in either a
//! success or an exhausted state the caller converts to a safe fallback.
//! The pipeline never halts on one failure.

use std::future::Future;
use std::time::Duration;

use crate::session::SessionError;

/// Retry budget and pacing. Backoff before attempt `n + 1` is
/// `n × backoff_unit`, growing with each failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
    /// The target measured numerically indistinguishable from the
    /// baseline: the font most likely never loaded and the engine fell
    /// back silently. Suspect, so retried like any exception.
    #[error("no signal: |Δ| {delta} below epsilon {epsilon}")]
    NoSignal { delta: f64, epsilon: f64 },
    #[error("degenerate measurement: {0}")]
    Degenerate(String),
}

/// Terminal state of one unit of work.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded(T),
    Exhausted {
        attempts: u32,
        last_error: AttemptError,
    },
}

/// Drive one unit of work to a terminal state.
///
/// The unit's context (typically the `&mut` session) is threaded through
/// by value so it stays usable across attempts; `attempt` receives it
/// together with the 1-based attempt number and must hand it back.
pub async fn run_with_retry<C, T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut unit: C,
    mut attempt: F,
) -> (C, RetryOutcome<T>)
where
    F: FnMut(C, u32) -> Fut,
    Fut: Future<Output = (C, Result<T, AttemptError>)>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error: Option<AttemptError> = None;

    for n in 1..=attempts {
        let (returned, result) = attempt(unit, n).await;
        unit = returned;

        match result {
            Ok(value) => return (unit, RetryOutcome::Succeeded(value)),
            Err(err) => {
                log::warn!("{label}: attempt {n}/{attempts} failed: {err}");
                last_error = Some(err);
                if n < attempts {
                    tokio::time::sleep(policy.backoff_unit * n).await;
                }
            }
        }
    }

    let last_error = last_error
        .unwrap_or_else(|| AttemptError::Degenerate("retry budget permitted no attempts".into()));
    (
        unit,
        RetryOutcome::Exhausted {
            attempts,
            last_error,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_unit: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn always_failing_unit_exhausts_after_max_attempts() {
        let mut calls = 0u32;
        let (_, outcome) = run_with_retry(&fast_policy(3), "unit", (), |unit, _| {
            calls += 1;
            async move {
                (
                    unit,
                    Err::<(), _>(AttemptError::Degenerate("nope".into())),
                )
            }
        })
        .await;

        assert_eq!(calls, 3);
        match outcome {
            RetryOutcome::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            RetryOutcome::Succeeded(_) => panic!("must exhaust"),
        }
    }

    #[tokio::test]
    async fn succeeds_without_further_attempts() {
        let mut calls = 0u32;
        let (_, outcome) = run_with_retry(&fast_policy(5), "unit", (), |unit, n| {
            calls += 1;
            async move {
                if n < 2 {
                    (unit, Err(AttemptError::Degenerate("flaky".into())))
                } else {
                    (unit, Ok(n))
                }
            }
        })
        .await;

        assert_eq!(calls, 2);
        match outcome {
            RetryOutcome::Succeeded(n) => assert_eq!(n, 2),
            RetryOutcome::Exhausted { .. } => panic!("must succeed"),
        }
    }

    #[tokio::test]
    async fn zero_budget_is_clamped_to_one_attempt() {
        let (_, outcome) = run_with_retry(&fast_policy(0), "unit", (), |unit, _| async move {
            (unit, Ok::<_, AttemptError>(42))
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded(v) => assert_eq!(v, 42),
            RetryOutcome::Exhausted { .. } => panic!("must run once"),
        }
    }
}
