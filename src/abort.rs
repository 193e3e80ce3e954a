//! Per-dispatch cancellation and the deadline timer that triggers it.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

/// Cancellation handle shared between a dispatch and its deadline.
///
/// Cloning yields another handle to the same signal.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    state: Arc<watch::Sender<bool>>,
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Fires the signal. Later calls are no-ops.
    pub fn abort(&self) {
        self.state.send_if_modified(|aborted| !std::mem::replace(aborted, true));
    }

    pub fn is_aborted(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes once the signal has fired.
    pub async fn aborted(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = receiver.wait_for(|aborted| *aborted).await;
    }
}

/// Schedules a one-shot callback after a delay.
pub trait Scheduler: Send + Sync {
    type Handle: Send;

    fn schedule(
        &self,
        callback: Box<dyn FnOnce() + Send + 'static>,
        delay: Duration,
    ) -> Self::Handle;

    /// Cancels a scheduled callback. Cancelling one that already ran is a no-op.
    fn cancel(&self, handle: Self::Handle);
}

/// [`Scheduler`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    type Handle = tokio::task::JoinHandle<()>;

    fn schedule(
        &self,
        callback: Box<dyn FnOnce() + Send + 'static>,
        delay: Duration,
    ) -> Self::Handle {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
    }

    fn cancel(&self, handle: Self::Handle) {
        handle.abort();
    }
}

/// Armed deadline. The timer is cancelled exactly once, when this is dropped.
pub(crate) struct Deadline<'a, S: Scheduler> {
    scheduler: &'a S,
    handle: Option<S::Handle>,
}

impl<'a, S: Scheduler> Deadline<'a, S> {
    pub(crate) fn arm(scheduler: &'a S, timeout: Duration, signal: &AbortSignal) -> Self {
        let signal = signal.clone();
        let handle = scheduler.schedule(
            Box::new(move || {
                #[cfg(feature = "tracing")]
                tracing::debug!("request deadline elapsed, aborting");
                signal.abort();
            }),
            timeout,
        );
        Self {
            scheduler,
            handle: Some(handle),
        }
    }
}

impl<S: Scheduler> Drop for Deadline<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.scheduler.cancel(handle);
        }
    }
}
