//! Resilient backend connections
//!
//! [`ResilientConnector`] opens a connection to a slow-starting, possibly
//! unavailable backend with bounded retry: a hard attempt ceiling, a fixed
//! inter-attempt delay, and per-attempt outcome logging. The retry loop is an
//! explicit state machine (`Idle -> Connecting -> {Connected | Retrying ->
//! Connecting | Failed}`) with an injectable [`Sleeper`] so tests simulate
//! elapsed time without real delays. An in-progress wait or dial is
//! interruptible through a [`CancellationToken`] and surfaces as
//! [`ConnectError::Cancelled`], never as exhaustion.
//!
//! [`StartupLatch`] covers the "backend already started" bootstrap: only the
//! first caller pays the startup cost, concurrent callers wait on it.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Which kind of backend a target addresses; carries the retry defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendClass {
    /// Partitioned object store: slow to bootstrap, patient retry budget.
    Storage,
    /// SQL-capable query service: shorter budget, faster feedback.
    Query,
}

impl BackendClass {
    /// Default retry budgets: 5 attempts / 3s for storage, 3 attempts / 1s
    /// for query targets.
    pub fn default_policy(&self) -> RetryPolicy {
        match self {
            BackendClass::Storage => RetryPolicy::new(5, Duration::from_secs(3)),
            BackendClass::Query => RetryPolicy::new(3, Duration::from_secs(1)),
        }
    }
}

/// Identifies one backend service to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub name: String,
    pub url: String,
    pub class: BackendClass,
}

impl BackendTarget {
    pub fn storage(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            class: BackendClass::Storage,
        }
    }

    pub fn query(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            class: BackendClass::Query,
        }
    }
}

/// Bounded retry: a hard attempt ceiling and a fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            // The ceiling is a hard contract; zero would mean "never dial".
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Connection lifecycle states. `Connected` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Idle,
    Connecting,
    Retrying,
    Connected,
    Failed,
}

/// Connection failure, distinguishing "gave up" from "was told to stop".
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The retry budget is exhausted; wraps the last underlying failure.
    #[error("backend '{target}' unavailable after {attempts} attempts: {source}")]
    BackendUnavailable {
        target: String,
        attempts: u32,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// The caller's cancellation signal aborted a wait or an in-flight dial.
    #[error("connection to '{target}' was cancelled")]
    Cancelled { target: String },
}

/// Injectable delay so retry tests can simulate elapsed time.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Opens backend connections with bounded retry and explicit failure
/// reporting. One connector is shared per backend target; each `connect`
/// call hands exclusive ownership of the returned handle to the caller.
pub struct ResilientConnector {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

impl ResilientConnector {
    /// Connector with the target class defaults and a never-fired token.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: Arc::new(TokioSleeper),
            cancel: CancellationToken::new(),
        }
    }

    pub fn for_class(class: BackendClass) -> Self {
        Self::new(class.default_policy())
    }

    /// Replace the sleeper (tests).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Attach the caller's cancellation signal.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn transition(&self, target: &BackendTarget, from: &mut ConnectState, to: ConnectState) {
        debug!("{}: connection state {:?} -> {:?}", target.name, *from, to);
        *from = to;
    }

    /// Dial `target` until connected, the attempt ceiling is hit, or the
    /// cancellation token fires.
    ///
    /// `dial` performs one connection attempt and is invoked at most
    /// `max_attempts` times. On exhaustion the last failure is wrapped in
    /// [`ConnectError::BackendUnavailable`].
    pub async fn connect<H, D, Fut>(
        &self,
        target: &BackendTarget,
        mut dial: D,
    ) -> Result<H, ConnectError>
    where
        D: FnMut() -> Fut,
        Fut: Future<Output = Result<H, Box<dyn Error + Send + Sync>>>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut state = ConnectState::Idle;
        let mut last_error: Option<Box<dyn Error + Send + Sync>> = None;

        for attempt in 1..=max_attempts {
            self.transition(target, &mut state, ConnectState::Connecting);
            info!(
                "connecting to {} at {} (attempt {}/{})",
                target.name, target.url, attempt, max_attempts
            );

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("{}: connection attempt {} cancelled", target.name, attempt);
                    return Err(ConnectError::Cancelled {
                        target: target.name.clone(),
                    });
                }
                outcome = dial() => outcome,
            };

            match outcome {
                Ok(handle) => {
                    self.transition(target, &mut state, ConnectState::Connected);
                    info!("{}: connected on attempt {}", target.name, attempt);
                    return Ok(handle);
                }
                Err(err) => {
                    warn!(
                        "{}: connection attempt {}/{} failed: {}",
                        target.name, attempt, max_attempts, err
                    );
                    last_error = Some(err);
                }
            }

            if attempt < max_attempts {
                self.transition(target, &mut state, ConnectState::Retrying);
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        warn!("{}: retry wait cancelled", target.name);
                        return Err(ConnectError::Cancelled {
                            target: target.name.clone(),
                        });
                    }
                    _ = self.sleeper.sleep(self.policy.delay) => {}
                }
            }
        }

        self.transition(target, &mut state, ConnectState::Failed);
        error!(
            "{}: giving up after {} attempts",
            target.name, max_attempts
        );
        Err(ConnectError::BackendUnavailable {
            target: target.name.clone(),
            attempts: max_attempts,
            source: last_error
                .unwrap_or_else(|| "no connection attempt was made".to_string().into()),
        })
    }
}

/// Process-wide once-per-target startup latch.
///
/// `ensure_started` runs the expensive bootstrap exactly once per target per
/// process; concurrent first callers wait for the winner's result instead of
/// racing their own bootstrap.
pub struct StartupLatch;

static STARTUP_CELLS: OnceLock<Mutex<HashMap<String, Arc<OnceCell<()>>>>> = OnceLock::new();

impl StartupLatch {
    fn cell_for(target: &str) -> Arc<OnceCell<()>> {
        let cells = STARTUP_CELLS.get_or_init(|| Mutex::new(HashMap::new()));
        let mut map = match cells.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(target.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Run `init` once for `target`; all callers observe the first outcome.
    /// A failed bootstrap leaves the latch unset so a later caller retries.
    pub async fn ensure_started<F, Fut, E>(target: &str, init: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let cell = Self::cell_for(target);
        cell.get_or_try_init(|| async {
            info!("bootstrapping backend '{}'", target);
            init().await
        })
        .await
        .map(|_| ())
    }

    /// Whether `target` has completed its bootstrap in this process.
    pub fn is_started(target: &str) -> bool {
        Self::cell_for(target).initialized()
    }
}
