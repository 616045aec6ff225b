//! Trailing-edge debounce: each call restarts the quiet period and only the
//! most recently scheduled action runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub struct Debouncer {
    delay: Duration,
    runtime: Handle,
    shutdown: CancellationToken,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration, runtime: Handle) -> Arc<Self> {
        Arc::new(Self {
            delay,
            runtime,
            shutdown: CancellationToken::new(),
            pending: Mutex::new(None),
        })
    }

    /// Cancel any pending action and start a new quiet period for `action`.
    ///
    /// Cancellation only covers the quiet period: once `action` has started
    /// it runs to completion even if a newer one is scheduled.
    pub fn schedule<Fut>(self: &Arc<Self>, action: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.shutdown.is_cancelled() {
            return;
        }
        let token = self.shutdown.child_token();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let this = Arc::clone(self);
        let delay = self.delay;
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if this.claim(&token) {
                action.await;
            }
        });
    }

    /// A timer that elapsed may still have been superseded between waking
    /// and getting here; the pending slot is the source of truth.
    fn claim(&self, token: &CancellationToken) -> bool {
        let mut pending = self.pending.lock();
        if token.is_cancelled() {
            return false;
        }
        *pending = None;
        true
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.cancel();
        }
    }

    /// Cancel the pending action and refuse to fire any later ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}
