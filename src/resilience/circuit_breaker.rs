use crate::error_code::ErrorKind;
use crate::{Error, ErrorContext, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_FALLBACK_MESSAGE: &str = "Service temporarily unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Calls pass through; outcomes are counted.
    Closed,
    /// Calls short-circuit to the fallback until the reset timeout elapses.
    Open,
    /// One trial call is let through to decide between closed and open.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Per-call timeout; a call running longer counts as a failure.
    pub timeout: Duration,
    /// Rolling failure percentage at which the circuit opens.
    pub error_threshold_percentage: u8,
    /// Time spent open before a trial call is allowed.
    pub reset_timeout: Duration,
    /// Length of the rolling statistics window.
    pub rolling_window: Duration,
    /// Number of buckets the window is split into.
    pub rolling_buckets: u32,
    /// Minimum calls in the window before the failure rate is evaluated.
    pub volume_threshold: u32,
    pub fallback_message: String,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            error_threshold_percentage: 50,
            reset_timeout: Duration::from_millis(30_000),
            rolling_window: Duration::from_secs(10),
            rolling_buckets: 10,
            volume_threshold: 0,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_error_threshold_percentage(mut self, pct: u8) -> Self {
        self.error_threshold_percentage = pct;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    pub fn with_rolling_window(mut self, window: Duration, buckets: u32) -> Self {
        self.rolling_window = window;
        self.rolling_buckets = buckets;
        self
    }

    pub fn with_volume_threshold(mut self, volume: u32) -> Self {
        self.volume_threshold = volume;
        self
    }

    pub fn with_fallback_message(mut self, msg: impl Into<String>) -> Self {
        self.fallback_message = msg.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, msg: &str| -> Result<()> {
            Err(Error::config_with_context(
                msg,
                ErrorContext::new()
                    .with_field_path(format!("breaker.{}", field))
                    .with_source("circuit_breaker"),
            ))
        };
        if !(1..=100).contains(&self.error_threshold_percentage) {
            return invalid("error_threshold_percentage", "must be within 1..=100");
        }
        if self.timeout.is_zero() {
            return invalid("timeout", "must be non-zero");
        }
        if self.reset_timeout.is_zero() {
            return invalid("reset_timeout", "must be non-zero");
        }
        if self.rolling_window.is_zero() {
            return invalid("rolling_window", "must be non-zero");
        }
        if self.rolling_buckets == 0 {
            return invalid("rolling_buckets", "must be non-zero");
        }
        Ok(())
    }
}

/// Why a call ended on the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Circuit open; the operation was not invoked.
    Open,
    /// Half-open with the single trial already running.
    TrialInFlight,
    /// The operation exceeded the per-call timeout.
    Timeout,
    /// The operation failed.
    Failed(ErrorKind),
}

/// Degraded-availability payload handed out instead of an error.
///
/// Serializes as `{"fallback": true, "error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackResponse {
    pub fallback: bool,
    pub error: String,
    #[serde(skip)]
    pub reason: FallbackReason,
}

/// Result of a protected call: the real value or the fallback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BreakerOutcome<T> {
    Success(T),
    Fallback(FallbackResponse),
}

impl<T> BreakerOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, BreakerOutcome::Fallback(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            BreakerOutcome::Success(v) => Some(v),
            BreakerOutcome::Fallback(_) => None,
        }
    }

    pub fn fallback(&self) -> Option<&FallbackResponse> {
        match self {
            BreakerOutcome::Success(_) => None,
            BreakerOutcome::Fallback(f) => Some(f),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    /// Calls completed inside the rolling window.
    pub fires: u32,
    pub successes: u32,
    pub failures: u32,
    pub timeouts: u32,
    /// Rolling failure percentage, timeouts included.
    pub failure_percentage: f64,
    /// Short-circuited calls since creation.
    pub rejects: u64,
    /// Fallback responses since creation.
    pub fallbacks: u64,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Trial,
}

#[derive(Debug)]
struct Bucket {
    started: Instant,
    successes: u32,
    failures: u32,
    timeouts: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    successes: u32,
    failures: u32,
    timeouts: u32,
}

impl Totals {
    fn fires(&self) -> u32 {
        self.successes + self.failures + self.timeouts
    }

    fn failure_percentage(&self) -> f64 {
        let fires = self.fires();
        if fires == 0 {
            0.0
        } else {
            f64::from(self.failures + self.timeouts) * 100.0 / f64::from(fires)
        }
    }
}

#[derive(Debug)]
struct State {
    circuit: CircuitState,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    buckets: VecDeque<Bucket>,
    rejects: u64,
    fallbacks: u64,
}

impl State {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.started) >= window {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn push(&mut self, now: Instant, outcome: Outcome, cfg: &CircuitBreakerConfig) {
        self.prune(now, cfg.rolling_window);
        let bucket_len = cfg.rolling_window / cfg.rolling_buckets.max(1);
        let reuse = self
            .buckets
            .back()
            .map(|b| now.duration_since(b.started) < bucket_len)
            .unwrap_or(false);
        if !reuse {
            self.buckets.push_back(Bucket {
                started: now,
                successes: 0,
                failures: 0,
                timeouts: 0,
            });
        }
        if let Some(b) = self.buckets.back_mut() {
            match outcome {
                Outcome::Success => b.successes += 1,
                Outcome::Failure => b.failures += 1,
                Outcome::Timeout => b.timeouts += 1,
            }
        }
    }

    fn totals(&self) -> Totals {
        self.buckets.iter().fold(Totals::default(), |acc, b| Totals {
            successes: acc.successes + b.successes,
            failures: acc.failures + b.failures,
            timeouts: acc.timeouts + b.timeouts,
        })
    }
}

/// Rolling-window circuit breaker with a per-call timeout and fallback.
///
/// - `closed` → `open` when the rolling failure percentage (timeouts count as
///   failures) reaches the threshold
/// - `open` → `half-open` once the reset timeout has elapsed; the transition
///   happens on the next call, which becomes the single trial
/// - `half-open` → `closed` on trial success, back to `open` on trial failure
///
/// All counting and transitions happen under one lock, so concurrent callers
/// sharing a breaker see a consistent state machine.
pub struct CircuitBreaker {
    name: String,
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, cfg: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            cfg,
            state: Mutex::new(State {
                circuit: CircuitState::Closed,
                opened_at: None,
                trial_in_flight: false,
                buckets: VecDeque::new(),
                rejects: 0,
                fallbacks: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    /// Run `op` under the breaker.
    ///
    /// Never returns the operation's error: failures, timeouts and
    /// short-circuits all yield [`BreakerOutcome::Fallback`]. On timeout the
    /// operation's future is dropped at its current await point, so nothing it
    /// would have done afterwards (such as populating a cache) takes effect.
    pub async fn call<T, F, Fut>(&self, op: F) -> BreakerOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = match self.admit() {
            Ok(a) => a,
            Err(reason) => return self.fallback(reason),
        };
        let mut attempt = Attempt {
            breaker: self,
            admission,
            settled: false,
        };

        match tokio::time::timeout(self.cfg.timeout, op()).await {
            Ok(Ok(value)) => {
                attempt.settle(Outcome::Success);
                BreakerOutcome::Success(value)
            }
            Ok(Err(err)) => {
                debug!(breaker = %self.name, kind = %err.kind(), error = %err, "protected call failed");
                attempt.settle(Outcome::Failure);
                self.fallback(FallbackReason::Failed(err.kind()))
            }
            Err(_) => {
                warn!(
                    breaker = %self.name,
                    timeout_ms = self.cfg.timeout.as_millis() as u64,
                    "protected call timed out"
                );
                attempt.settle(Outcome::Timeout);
                self.fallback(FallbackReason::Timeout)
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().circuit
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let now = Instant::now();
        let mut st = self.lock();
        st.prune(now, self.cfg.rolling_window);
        let totals = st.totals();
        let open_remaining_ms = match (st.circuit, st.opened_at) {
            (CircuitState::Open, Some(at)) => {
                let until = at + self.cfg.reset_timeout;
                (until > now).then(|| (until - now).as_millis() as u64)
            }
            _ => None,
        };
        CircuitBreakerSnapshot {
            state: st.circuit,
            fires: totals.fires(),
            successes: totals.successes,
            failures: totals.failures,
            timeouts: totals.timeouts,
            failure_percentage: totals.failure_percentage(),
            rejects: st.rejects,
            fallbacks: st.fallbacks,
            open_remaining_ms,
        }
    }

    // Counters and the state enum stay coherent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> std::result::Result<Admission, FallbackReason> {
        let mut st = self.lock();
        match st.circuit {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                let elapsed = st
                    .opened_at
                    .map(|at| at.elapsed() >= self.cfg.reset_timeout)
                    .unwrap_or(true);
                if elapsed {
                    self.transition(&mut st, CircuitState::HalfOpen);
                    st.trial_in_flight = true;
                    Ok(Admission::Trial)
                } else {
                    st.rejects += 1;
                    debug!(breaker = %self.name, "circuit open, short-circuiting");
                    Err(FallbackReason::Open)
                }
            }
            CircuitState::HalfOpen => {
                if st.trial_in_flight {
                    st.rejects += 1;
                    Err(FallbackReason::TrialInFlight)
                } else {
                    st.trial_in_flight = true;
                    Ok(Admission::Trial)
                }
            }
        }
    }

    fn record(&self, admission: Admission, outcome: Outcome) {
        let now = Instant::now();
        let mut st = self.lock();

        if admission == Admission::Trial && st.circuit == CircuitState::HalfOpen {
            st.trial_in_flight = false;
            if outcome == Outcome::Success {
                st.buckets.clear();
                st.opened_at = None;
                self.transition(&mut st, CircuitState::Closed);
            } else {
                st.opened_at = Some(now);
                self.transition(&mut st, CircuitState::Open);
            }
            return;
        }

        st.push(now, outcome, &self.cfg);
        if st.circuit == CircuitState::Closed && outcome != Outcome::Success {
            let totals = st.totals();
            let volume = self.cfg.volume_threshold.max(1);
            if totals.fires() >= volume
                && totals.failure_percentage() >= f64::from(self.cfg.error_threshold_percentage)
            {
                st.opened_at = Some(now);
                self.transition(&mut st, CircuitState::Open);
            }
        }
    }

    fn transition(&self, st: &mut State, to: CircuitState) {
        if st.circuit != to {
            info!(breaker = %self.name, from = %st.circuit, to = %to, "circuit state change");
            st.circuit = to;
        }
    }

    fn fallback<T>(&self, reason: FallbackReason) -> BreakerOutcome<T> {
        self.lock().fallbacks += 1;
        BreakerOutcome::Fallback(FallbackResponse {
            fallback: true,
            error: self.cfg.fallback_message.clone(),
            reason,
        })
    }
}

/// Settles an admitted call exactly once. An abandoned trial (the caller
/// dropped the future) counts as a failed trial so half-open cannot wedge.
struct Attempt<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl Attempt<'_> {
    fn settle(&mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.record(self.admission, outcome);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Trial {
            self.breaker.record(self.admission, Outcome::Failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> Error {
        Error::not_found_with_context("User not found", ErrorContext::new())
    }

    async fn ok(breaker: &CircuitBreaker) -> BreakerOutcome<u32> {
        breaker.call(|| async { Ok(7) }).await
    }

    async fn fail(breaker: &CircuitBreaker) -> BreakerOutcome<u32> {
        breaker.call(|| async { Err(not_found()) }).await
    }

    #[test]
    fn test_config_defaults() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(3000));
        assert_eq!(config.error_threshold_percentage, 50);
        assert_eq!(config.reset_timeout, Duration::from_millis(30_000));
        assert_eq!(config.fallback_message, "Service temporarily unavailable");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(CircuitBreakerConfig::new()
            .with_error_threshold_percentage(0)
            .validate()
            .is_err());
        assert!(CircuitBreakerConfig::new()
            .with_error_threshold_percentage(101)
            .validate()
            .is_err());
        assert!(CircuitBreakerConfig::new()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CircuitBreakerConfig::new()
            .with_rolling_window(Duration::from_secs(1), 0)
            .validate()
            .is_err());
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        assert_eq!(ok(&cb).await, BreakerOutcome::Success(7));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().successes, 1);
    }

    #[tokio::test]
    async fn test_error_becomes_fallback_never_propagates() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        let out = fail(&cb).await;
        let fb = out.fallback().cloned().unwrap();
        assert!(fb.fallback);
        assert_eq!(fb.error, "Service temporarily unavailable");
        assert_eq!(fb.reason, FallbackReason::Failed(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_opens_when_failure_rate_reaches_threshold() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        ok(&cb).await;
        ok(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
        let snap = cb.snapshot();
        assert_eq!(snap.fires, 4);
        assert!((snap.failure_percentage - 50.0).abs() < f64::EPSILON);
        assert!(snap.open_remaining_ms.is_some());
    }

    #[tokio::test]
    async fn test_volume_threshold_defers_evaluation() {
        let cb = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::new().with_volume_threshold(3),
        );
        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_operation() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        let mut invoked = false;
        let out: BreakerOutcome<u32> = cb
            .call(|| {
                invoked = true;
                async { Ok(1) }
            })
            .await;
        assert!(!invoked);
        assert_eq!(out.fallback().map(|f| f.reason), Some(FallbackReason::Open));
        assert_eq!(cb.snapshot().rejects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_success_closes() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        fail(&cb).await;
        tokio::time::advance(Duration::from_millis(30_000)).await;
        assert_eq!(ok(&cb).await, BreakerOutcome::Success(7));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().fires, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_failure_reopens() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        fail(&cb).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(
            ok(&cb).await.fallback().map(|f| f.reason),
            Some(FallbackReason::Open)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rolling_window_forgets_old_outcomes() {
        let cb = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::new().with_volume_threshold(2),
        );
        fail(&cb).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        ok(&cb).await;
        fail(&cb).await;
        // old failure dropped: 1 of 2 fails, 50% reached
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot().fires, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        let out: BreakerOutcome<u32> = cb
            .call(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(1)
            })
            .await;
        assert_eq!(out.fallback().map(|f| f.reason), Some(FallbackReason::Timeout));
        let snap = cb.snapshot();
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.state, CircuitState::Open);
    }

    #[test]
    fn test_fallback_payload_shape() {
        let out: BreakerOutcome<Vec<u32>> = BreakerOutcome::Fallback(FallbackResponse {
            fallback: true,
            error: DEFAULT_FALLBACK_MESSAGE.to_string(),
            reason: FallbackReason::Open,
        });
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            serde_json::json!({"fallback": true, "error": "Service temporarily unavailable"})
        );
        let ok: BreakerOutcome<Vec<u32>> = BreakerOutcome::Success(vec![1]);
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!([1]));
    }

    #[test]
    fn test_breaker_thread_safe() {
        use std::sync::Arc;
        use std::thread;

        let cb = Arc::new(CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::new().with_error_threshold_percentage(100),
        ));
        let mut handles = vec![];
        for _ in 0..8 {
            let cb = Arc::clone(&cb);
            handles.push(thread::spawn(move || {
                tokio_test::block_on(async {
                    for _ in 0..5 {
                        ok(&cb).await;
                    }
                })
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cb.snapshot().successes, 40);
    }
}
