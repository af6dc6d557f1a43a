//! One-shot readiness signal for a bound item.
//!
//! Supports both blocking waits (duration/time reads from synchronous call
//! sites) and async waits; both resolve on the same transition.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

/// How a wait for readiness ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// The item loaded.
    Ready,
    /// The item failed or was superseded before loading.
    Failed,
    /// The item was still loading when the timeout expired.
    TimedOut,
    /// Nothing is bound.
    Unbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug)]
pub(crate) struct Readiness {
    state: Mutex<Resolution>,
    cond: Condvar,
    notify: Notify,
}

impl Readiness {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(Resolution::Pending),
            cond: Condvar::new(),
            notify: Notify::new(),
        })
    }

    /// Resolve once; later calls are ignored.
    pub(crate) fn resolve(&self, ready: bool) {
        let mut state = self.state.lock();
        if *state != Resolution::Pending {
            return;
        }
        *state = if ready {
            Resolution::Ready
        } else {
            Resolution::Failed
        };
        drop(state);
        self.cond.notify_all();
        self.notify.notify_waiters();
    }

    fn outcome(&self) -> Option<ReadinessOutcome> {
        match *self.state.lock() {
            Resolution::Pending => None,
            Resolution::Ready => Some(ReadinessOutcome::Ready),
            Resolution::Failed => Some(ReadinessOutcome::Failed),
        }
    }

    /// Block the calling thread until resolved or `timeout` elapses.
    pub(crate) fn wait(&self, timeout: Duration) -> ReadinessOutcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while *state == Resolution::Pending {
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        match *state {
            Resolution::Pending => ReadinessOutcome::TimedOut,
            Resolution::Ready => ReadinessOutcome::Ready,
            Resolution::Failed => ReadinessOutcome::Failed,
        }
    }

    /// Await resolution for at most `timeout`.
    pub(crate) async fn wait_async(&self, timeout: Duration) -> ReadinessOutcome {
        let resolved = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if let Some(outcome) = self.outcome() {
                    return outcome;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, resolved)
            .await
            .unwrap_or(ReadinessOutcome::TimedOut)
    }
}
