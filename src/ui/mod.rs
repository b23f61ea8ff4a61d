//! UI-affine execution context
//!
//! Window state and hotkey registration belong to a single thread. Code
//! running anywhere else reaches them only through a [`UiContext`]:
//! - `run_blocking` when a return value is needed (visibility queries)
//! - `invoke` for fire-and-forget work (navigation dispatch)

pub mod thread;

use crossbeam::channel;
use std::time::Duration;

use crate::error::DispatchError;

pub use thread::UiThread;

/// Work item executed on the UI context
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// How long a blocking call waits for the UI context before giving up
pub const BLOCKING_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Queue priority for posted work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Regular background work (timer ticks, housekeeping)
    Normal,
    /// Immediate delivery; never queued behind `Normal` work
    Send,
}

/// A single-threaded execution context that owns UI resources
///
/// Implementors wrap their platform's main loop or task queue.
pub trait UiContext: Send + Sync {
    /// Whether the calling thread is the context's own thread
    fn is_current(&self) -> bool;

    /// Whether the context has started tearing down
    fn is_shutting_down(&self) -> bool;

    /// Enqueue a job at the given priority
    fn post(&self, priority: Priority, job: UiJob) -> Result<(), DispatchError>;
}

/// Marshaling helpers available on every [`UiContext`]
pub trait UiContextExt: UiContext {
    /// Run `f` on the context and wait for its result
    ///
    /// Runs inline when already on the context. Fails when the context is
    /// shutting down, drops the job, or does not answer within
    /// [`BLOCKING_CALL_TIMEOUT`].
    fn run_blocking<T, F>(&self, f: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.is_shutting_down() {
            return Err(DispatchError::ShuttingDown);
        }

        if self.is_current() {
            return Ok(f());
        }

        let (result_tx, result_rx) = channel::bounded(1);
        self.post(
            Priority::Send,
            Box::new(move || {
                let _ = result_tx.send(f());
            }),
        )?;

        match result_rx.recv_timeout(BLOCKING_CALL_TIMEOUT) {
            Ok(value) => Ok(value),
            Err(channel::RecvTimeoutError::Timeout) => Err(DispatchError::TimedOut(
                BLOCKING_CALL_TIMEOUT.as_millis() as u64,
            )),
            Err(channel::RecvTimeoutError::Disconnected) => Err(DispatchError::Dropped),
        }
    }

    /// Run `f` now if already on the context, otherwise enqueue it
    fn invoke<F>(&self, priority: Priority, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shutting_down() {
            return Err(DispatchError::ShuttingDown);
        }

        if self.is_current() {
            f();
            return Ok(());
        }

        self.post(priority, Box::new(f))
    }
}

impl<C: UiContext + ?Sized> UiContextExt for C {}
