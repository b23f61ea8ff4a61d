//! Fixed-interval tick loop for pollers
//!
//! Each poller runs its ticks on one dedicated thread, so two ticks of the
//! same poller never overlap. A tick that takes longer than the interval
//! delays the next one instead of stacking up. Panics inside a tick are
//! caught and logged; the loop keeps its schedule.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Handle to a running tick loop
pub struct PollLoop {
    name: String,
    disposed: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PollLoop {
    /// Start ticking `tick` every `interval`
    ///
    /// # Arguments
    /// * `name` - Thread name and log label
    /// * `interval` - Time between tick starts
    /// * `disposed` - Flag set on stop; checked before every tick
    /// * `tick` - Tick body, called with the tick's start time
    pub fn spawn<F>(
        name: &str,
        interval: Duration,
        disposed: Arc<AtomicBool>,
        mut tick: F,
    ) -> std::io::Result<Self>
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let label = name.to_string();
        let flag = disposed.clone();

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            debug!("{} started ({} ms interval)", label, interval.as_millis());
            let mut wait = interval;

            loop {
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {},
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                if flag.load(Ordering::SeqCst) {
                    break;
                }

                let started = Instant::now();
                if panic::catch_unwind(AssertUnwindSafe(|| tick(started))).is_err() {
                    error!("{} tick panicked; continuing", label);
                }

                wait = interval.saturating_sub(started.elapsed());
            }

            debug!("{} stopped", label);
        })?;

        Ok(Self {
            name: name.to_string(),
            disposed,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Set the disposed flag and stop the timer without waiting
    ///
    /// An in-flight tick finishes on its own; ticks must check the disposed
    /// flag before doing anything observable.
    pub fn cancel(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.stop_tx.take();
        self.handle.take();
    }

    /// Set the disposed flag, stop the timer and wait for an in-flight tick
    ///
    /// Idempotent. When called from inside a tick the loop exits after that
    /// tick without being joined.
    pub fn stop(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.stop_tx.take();

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("{} thread panicked", self.name);
            }
        }
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_ticks_repeat_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut poll = PollLoop::spawn("test-poll", Duration::from_millis(5), Arc::default(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(100));
        poll.stop();
        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 3, "expected several ticks, got {}", after_stop);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert!(poll.is_stopped());
    }

    #[test]
    fn test_panicking_tick_keeps_timer_alive() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut poll = PollLoop::spawn("test-poll", Duration::from_millis(5), Arc::default(), move |_| {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first tick fails");
            }
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(100));
        poll.stop();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_cancel_stops_without_join() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let disposed = Arc::new(AtomicBool::new(false));
        let mut poll = PollLoop::spawn("test-poll", Duration::from_millis(5), disposed.clone(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(30));
        poll.cancel();
        assert!(disposed.load(Ordering::SeqCst));

        // Allow a tick that was already running to finish
        std::thread::sleep(Duration::from_millis(20));
        let after_cancel = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_ticks_never_overlap() {
        let active = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let (a, o) = (active.clone(), overlapped.clone());

        // Tick body is slower than the interval
        let mut poll = PollLoop::spawn("test-poll", Duration::from_millis(2), Arc::default(), move |_| {
            if a.swap(true, Ordering::SeqCst) {
                o.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(10));
            a.store(false, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(80));
        poll.stop();
        assert!(!overlapped.load(Ordering::SeqCst));
    }
}
