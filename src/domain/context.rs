use crate::error::ChannelError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub type TimerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Source of timers for module code.
///
/// A `cdylib` module links its own copy of the async runtime, and that copy
/// never sees the host's reactor. Timers therefore come from the host through
/// this trait: the returned future is built and polled by host code.
pub trait Timer: fmt::Debug + Send + Sync {
    fn sleep_until(&self, deadline: Instant) -> TimerFuture;
}

/// [`Timer`] backed by the tokio runtime the caller runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep_until(&self, deadline: Instant) -> TimerFuture {
        Box::pin(tokio::time::sleep_until(deadline.into()))
    }
}

/// Caller-controlled execution context handed to every payment operation.
///
/// The core never enforces the deadline; modules that honor it should stop
/// outstanding work once [`CallContext::done`] resolves. Contexts are built by
/// the host. Modules wait through [`CallContext::sleep`] and never create
/// runtime timers of their own.
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    timer: Arc<dyn Timer>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::with_token(CancellationToken::new())
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Self::default()
        }
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            timer: Arc::new(TokioTimer),
        }
    }

    /// Replaces the timer, e.g. with one driven by a different runtime.
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    /// A context cancelled together with `self`, keeping the same deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            timer: self.timer.clone(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                let expired = self.timer.sleep_until(deadline);
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => {}
                    _ = expired => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Waits for `duration` on the host's timer.
    ///
    /// Fails with [`ChannelError::Cancelled`] if the context ends first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ChannelError> {
        if self.is_cancelled() {
            return Err(ChannelError::Cancelled);
        }
        let elapsed = self.timer.sleep_until(Instant::now() + duration);
        tokio::select! {
            biased;
            _ = self.done() => Err(ChannelError::Cancelled),
            _ = elapsed => Ok(()),
        }
    }
}
