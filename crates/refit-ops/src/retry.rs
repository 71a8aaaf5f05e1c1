//! Retry policy and the state machine that applies it.
//!
//! ```text
//!            begin                 failure (transient, retryable, attempts left)
//!   Idle ──────────▶ Retrying ─────────────────────────────────────▶ Waiting
//!                     │  ▲                                              │
//!                     │  └──────────── backoff elapsed ─────────────────┘
//!                     ├── success ──▶ Succeeded
//!                     └── failure ──▶ Failed
//!   (any non-terminal state) ── cancel ──▶ Cancelled
//! ```
//!
//! The machine never sleeps itself; it is handed the current instant and
//! reports how long the caller still has to wait. [`run_with_retry`] drives it
//! with tokio timers and a cancellation token.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{OpsError, OpsResult};

// =============================================================================
// Policy
// =============================================================================

/// Kinds of per-component operation the orchestrator performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    FileRead,
    Parse,
    Transform,
    Generate,
    Validate,
    FileWrite,
}

impl OperationKind {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::FileRead => "file-read",
            OperationKind::Parse => "parse",
            OperationKind::Transform => "transform",
            OperationKind::Generate => "generate",
            OperationKind::Validate => "validate",
            OperationKind::FileWrite => "file-write",
        }
    }

    /// Parse a label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "file-read" => Some(OperationKind::FileRead),
            "parse" => Some(OperationKind::Parse),
            "transform" => Some(OperationKind::Transform),
            "generate" => Some(OperationKind::Generate),
            "validate" => Some(OperationKind::Validate),
            "file-write" => Some(OperationKind::FileWrite),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How failed operations are repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Growth factor applied per further attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound for a single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Operation kinds that may be retried at all.
    #[serde(default = "default_retryable")]
    pub retryable: Vec<OperationKind>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_retryable() -> Vec<OperationKind> {
    vec![
        OperationKind::FileRead,
        OperationKind::FileWrite,
        OperationKind::Parse,
    ]
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            retryable: default_retryable(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Whether `kind` is on the whitelist.
    pub fn allows(&self, kind: OperationKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = (self.base_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(millis.max(0.0) as u64)
    }
}

// =============================================================================
// State machine
// =============================================================================

/// Position of one operation in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryState {
    Idle,
    Waiting,
    Retrying,
    Cancelled,
    Failed,
    Succeeded,
}

impl RetryState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Cancelled | RetryState::Failed | RetryState::Succeeded
        )
    }
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RetryState::Idle => "idle",
            RetryState::Waiting => "waiting",
            RetryState::Retrying => "retrying",
            RetryState::Cancelled => "cancelled",
            RetryState::Failed => "failed",
            RetryState::Succeeded => "succeeded",
        };
        f.write_str(label)
    }
}

/// Checked transitions for one operation.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    kind: OperationKind,
    state: RetryState,
    attempt: u32,
    wait: Option<(Instant, Duration)>,
}

impl RetryMachine {
    /// A machine in `Idle` with no attempts spent.
    pub fn new(policy: RetryPolicy, kind: OperationKind) -> Self {
        Self {
            policy,
            kind,
            state: RetryState::Idle,
            attempt: 0,
            wait: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Operation the machine retries.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// `Idle -> Retrying`: the first attempt starts.
    pub fn begin(&mut self) -> OpsResult<()> {
        self.expect(RetryState::Idle, "begin")?;
        self.state = RetryState::Retrying;
        self.attempt = 1;
        Ok(())
    }

    /// `Retrying -> Succeeded`.
    pub fn succeed(&mut self) -> OpsResult<()> {
        self.expect(RetryState::Retrying, "succeed")?;
        self.state = RetryState::Succeeded;
        Ok(())
    }

    /// `Retrying -> Waiting | Failed`.
    ///
    /// The machine waits only when the failure is transient, the kind is
    /// whitelisted and attempts remain.
    pub fn fail(&mut self, transient: bool, now: Instant) -> OpsResult<RetryState> {
        self.expect(RetryState::Retrying, "fail")?;
        let retry = transient
            && self.policy.allows(self.kind)
            && self.attempt < self.policy.max_attempts;
        if retry {
            let delay = self.policy.delay_after(self.attempt);
            self.wait = Some((now, delay));
            self.state = RetryState::Waiting;
        } else {
            self.state = RetryState::Failed;
        }
        Ok(self.state)
    }

    /// Time still to wait before [`poll`](Self::poll) can advance.
    pub fn remaining(&self, now: Instant) -> Duration {
        match (self.state, self.wait) {
            (RetryState::Waiting, Some((since, delay))) => {
                delay.saturating_sub(now.saturating_duration_since(since))
            }
            _ => Duration::ZERO,
        }
    }

    /// `Waiting -> Retrying` once the backoff delay has elapsed.
    ///
    /// Returns whether the transition happened.
    pub fn poll(&mut self, now: Instant) -> OpsResult<bool> {
        self.expect(RetryState::Waiting, "poll")?;
        if !self.remaining(now).is_zero() {
            return Ok(false);
        }
        self.wait = None;
        self.attempt += 1;
        self.state = RetryState::Retrying;
        Ok(true)
    }

    /// Any non-terminal state `-> Cancelled`.
    pub fn cancel(&mut self) -> OpsResult<()> {
        if self.state.is_terminal() {
            return Err(OpsError::InvalidTransition {
                from: self.state,
                event: "cancel",
            });
        }
        self.wait = None;
        self.state = RetryState::Cancelled;
        Ok(())
    }

    fn expect(&self, state: RetryState, event: &'static str) -> OpsResult<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(OpsError::InvalidTransition {
                from: self.state,
                event,
            })
        }
    }
}

// =============================================================================
// Async driver
// =============================================================================

/// Outcome of a driven operation.
#[derive(Debug)]
pub struct Attempted<T> {
    /// Value or the last error.
    pub outcome: OpsResult<T>,
    /// Attempts started.
    pub attempts: u32,
}

/// Run `op` under `policy`, each attempt bounded by `timeout`.
///
/// `op` receives the 1-based attempt number. Cancellation is observed before
/// every attempt and during backoff; an attempt already running is allowed to
/// finish or time out.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    kind: OperationKind,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    mut op: F,
) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = OpsResult<T>>,
{
    let mut machine = RetryMachine::new(policy.clone(), kind);
    if let Err(e) = machine.begin() {
        return Attempted {
            outcome: Err(e),
            attempts: 0,
        };
    }

    loop {
        if cancel.is_cancelled() {
            let _ = machine.cancel();
            return Attempted {
                outcome: Err(OpsError::Cancelled),
                attempts: machine.attempt().saturating_sub(1),
            };
        }

        let attempt = machine.attempt();
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(OpsError::Timeout {
                    operation: kind,
                    after_ms: limit.as_millis() as u64,
                }),
            },
            None => op(attempt).await,
        };

        let error = match result {
            Ok(value) => {
                let _ = machine.succeed();
                return Attempted {
                    outcome: Ok(value),
                    attempts: attempt,
                };
            }
            Err(e) => e,
        };

        match machine.fail(error.is_transient(), Instant::now()) {
            Ok(RetryState::Waiting) => {
                let delay = machine.remaining(Instant::now());
                warn!(
                    operation = %kind,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Operation failed, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = machine.cancel();
                        return Attempted {
                            outcome: Err(OpsError::Cancelled),
                            attempts: attempt,
                        };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                // Timers may wake marginally early; never start before the gate opens.
                while !machine.poll(Instant::now()).unwrap_or(true) {
                    tokio::time::sleep(machine.remaining(Instant::now())).await;
                }
            }
            _ => {
                debug!(operation = %kind, attempt, error = %error, "Operation failed");
                return Attempted {
                    outcome: Err(error),
                    attempts: attempt,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refit_engine::MigrationError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> OpsError {
        OpsError::Engine(MigrationError::write_failed("A/A.tsx", "disk busy"))
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy {
            base_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 300,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(300));
        assert_eq!(policy.delay_after(30), Duration::from_millis(300));
    }

    #[test]
    fn test_machine_happy_path() {
        let mut m = RetryMachine::new(RetryPolicy::default(), OperationKind::FileRead);
        assert_eq!(m.state(), RetryState::Idle);
        m.begin().unwrap();
        assert_eq!(m.state(), RetryState::Retrying);
        m.succeed().unwrap();
        assert_eq!(m.state(), RetryState::Succeeded);
        assert!(m.cancel().is_err());
    }

    #[test]
    fn test_machine_waits_until_delay_elapsed() {
        let mut m = RetryMachine::new(RetryPolicy::default(), OperationKind::FileWrite);
        let t0 = Instant::now();
        m.begin().unwrap();
        assert_eq!(m.fail(true, t0).unwrap(), RetryState::Waiting);

        assert!(!m.poll(t0 + Duration::from_millis(50)).unwrap());
        assert_eq!(m.state(), RetryState::Waiting);
        assert_eq!(
            m.remaining(t0 + Duration::from_millis(50)),
            Duration::from_millis(50)
        );

        assert!(m.poll(t0 + Duration::from_millis(100)).unwrap());
        assert_eq!(m.state(), RetryState::Retrying);
        assert_eq!(m.attempt(), 2);
    }

    #[test]
    fn test_machine_fails_when_not_whitelisted() {
        let mut m = RetryMachine::new(RetryPolicy::default(), OperationKind::Validate);
        m.begin().unwrap();
        assert_eq!(m.fail(true, Instant::now()).unwrap(), RetryState::Failed);
    }

    #[test]
    fn test_machine_fails_on_permanent_error_and_exhaustion() {
        let mut m = RetryMachine::new(RetryPolicy::default(), OperationKind::Parse);
        m.begin().unwrap();
        assert_eq!(m.fail(false, Instant::now()).unwrap(), RetryState::Failed);

        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 0,
            ..RetryPolicy::default()
        };
        let mut m = RetryMachine::new(policy, OperationKind::Parse);
        let now = Instant::now();
        m.begin().unwrap();
        assert_eq!(m.fail(true, now).unwrap(), RetryState::Waiting);
        assert!(m.poll(now).unwrap());
        assert_eq!(m.fail(true, now).unwrap(), RetryState::Failed);
    }

    #[test]
    fn test_machine_rejects_invalid_edges() {
        let mut m = RetryMachine::new(RetryPolicy::default(), OperationKind::Parse);
        assert!(matches!(
            m.succeed(),
            Err(OpsError::InvalidTransition {
                from: RetryState::Idle,
                event: "succeed"
            })
        ));
        assert!(m.poll(Instant::now()).is_err());
        m.cancel().unwrap();
        assert_eq!(m.state(), RetryState::Cancelled);
        assert!(m.begin().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_retries_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let cancel = CancellationToken::new();

        let result = run_with_retry(
            &RetryPolicy::default(),
            OperationKind::FileWrite,
            None,
            &cancel,
            |attempt| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(transient())
                    } else {
                        Ok(attempt)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.outcome.unwrap(), 3);
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_does_not_retry_other_kinds() {
        let cancel = CancellationToken::new();
        let result: Attempted<()> = run_with_retry(
            &RetryPolicy::default(),
            OperationKind::Validate,
            None,
            &cancel,
            |_| async { Err(transient()) },
        )
        .await;
        assert!(result.outcome.is_err());
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_times_out_each_attempt() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let result: Attempted<()> = run_with_retry(
            &policy,
            OperationKind::FileRead,
            Some(Duration::from_millis(50)),
            &cancel,
            |_| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(
            result.outcome,
            Err(OpsError::Timeout {
                operation: OperationKind::FileRead,
                after_ms: 50
            })
        ));
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Attempted<()> = run_with_retry(
            &RetryPolicy::default(),
            OperationKind::FileRead,
            None,
            &cancel,
            |_| async { Ok(()) },
        )
        .await;
        assert!(matches!(result.outcome, Err(OpsError::Cancelled)));
    }
}
