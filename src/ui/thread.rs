//! Dedicated UI dispatcher thread
//!
//! Runs posted jobs on one OS thread with two queues. Send-priority jobs are
//! always drained before the next normal job runs. On Windows the loop also
//! pumps the thread's message queue, which the global hotkey window needs.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{Priority, UiContext, UiJob};
use crate::error::DispatchError;

/// Idle wait between message pumps when no job arrives
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// UI context backed by a dedicated thread
pub struct UiThread {
    send_tx: Sender<UiJob>,
    normal_tx: Sender<UiJob>,
    thread_id: ThreadId,
    shutting_down: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl UiThread {
    /// Spawn the dispatcher thread
    ///
    /// # Arguments
    /// * `name` - OS thread name (shows up in debuggers and panic messages)
    pub fn spawn(name: &str) -> std::io::Result<Arc<Self>> {
        let (send_tx, send_rx) = channel::unbounded::<UiJob>();
        let (normal_tx, normal_rx) = channel::unbounded::<UiJob>();
        let shutting_down = Arc::new(AtomicBool::new(false));

        let flag = shutting_down.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::run_loop(send_rx, normal_rx, flag))?;

        Ok(Arc::new(Self {
            send_tx,
            normal_tx,
            thread_id: handle.thread().id(),
            shutting_down,
            handle: Mutex::new(Some(handle)),
        }))
    }

    /// Stop accepting work and wait for the thread to exit
    ///
    /// Jobs still queued are dropped; blocked `run_blocking` callers get
    /// [`DispatchError::Dropped`]. Idempotent.
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("UI dispatcher shutdown requested");

        // Wake the loop if it is idle
        let _ = self.send_tx.send(Box::new(|| {}));

        if self.is_current() {
            return;
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("UI dispatcher thread panicked during shutdown");
            }
        }
    }

    fn run_loop(send_rx: Receiver<UiJob>, normal_rx: Receiver<UiJob>, shutting_down: Arc<AtomicBool>) {
        debug!("UI dispatcher started");

        loop {
            pump_windows_messages();

            while let Ok(job) = send_rx.try_recv() {
                run_job(job);
            }

            if shutting_down.load(Ordering::SeqCst) {
                break;
            }

            let received = channel::select! {
                recv(send_rx) -> job => Some(job.map(|job| (Priority::Send, job))),
                recv(normal_rx) -> job => Some(job.map(|job| (Priority::Normal, job))),
                default(PUMP_INTERVAL) => None,
            };

            match received {
                None => {}
                Some(Err(_)) => break,
                Some(Ok((Priority::Send, job))) => run_job(job),
                Some(Ok((Priority::Normal, job))) => {
                    // Urgent work that arrived meanwhile goes first
                    while let Ok(urgent) = send_rx.try_recv() {
                        run_job(urgent);
                    }
                    run_job(job);
                }
            }
        }

        debug!("UI dispatcher stopped");
    }
}

impl UiContext for UiThread {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    fn post(&self, priority: Priority, job: UiJob) -> Result<(), DispatchError> {
        if self.is_shutting_down() {
            return Err(DispatchError::ShuttingDown);
        }

        let tx = match priority {
            Priority::Send => &self.send_tx,
            Priority::Normal => &self.normal_tx,
        };

        tx.send(job).map_err(|_| DispatchError::ShuttingDown)
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run one job; a panicking job is logged and the loop continues
fn run_job(job: UiJob) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("UI job panicked");
    }
}

/// Pump pending Windows messages (hotkey window, etc.)
#[cfg(target_os = "windows")]
fn pump_windows_messages() {
    use windows::Win32::UI::WindowsAndMessaging::*;

    unsafe {
        let mut msg = std::mem::zeroed();
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// No-op on non-Windows platforms
#[cfg(not(target_os = "windows"))]
fn pump_windows_messages() {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::UiContextExt;

    #[test]
    fn test_run_blocking_returns_value_from_ui_thread() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let ui_id = ui.thread_id;

        let ran_on = ui.run_blocking(|| thread::current().id()).unwrap();
        assert_eq!(ran_on, ui_id);
        assert_ne!(ran_on, thread::current().id());

        ui.shutdown();
    }

    #[test]
    fn test_send_priority_runs_before_normal() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        // Hold the UI thread so both queues fill up
        let (release_tx, release_rx) = channel::bounded::<()>(0);
        ui.post(
            Priority::Normal,
            Box::new(move || {
                let _ = release_rx.recv();
            }),
        )
        .unwrap();

        for i in 0..3 {
            let order = order.clone();
            ui.post(Priority::Normal, Box::new(move || order.lock().push(format!("normal{}", i))))
                .unwrap();
        }
        let urgent = order.clone();
        ui.post(Priority::Send, Box::new(move || urgent.lock().push("send".to_string())))
            .unwrap();

        release_tx.send(()).unwrap();
        ui.run_blocking(|| ()).unwrap();

        let order = order.lock().clone();
        assert_eq!(order.first().map(String::as_str), Some("send"));
        assert_eq!(order.len(), 4);

        ui.shutdown();
    }

    #[test]
    fn test_invoke_on_ui_thread_runs_inline() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let inner = ui.clone();

        let ran_inline = ui
            .run_blocking(move || {
                let flag = Arc::new(AtomicBool::new(false));
                let f = flag.clone();
                inner
                    .invoke(Priority::Send, move || f.store(true, Ordering::SeqCst))
                    .unwrap();
                flag.load(Ordering::SeqCst)
            })
            .unwrap();

        assert!(ran_inline);
        ui.shutdown();
    }

    #[test]
    fn test_panicking_job_does_not_kill_thread() {
        let ui = UiThread::spawn("test-ui").unwrap();

        ui.post(Priority::Normal, Box::new(|| panic!("boom"))).unwrap();
        assert_eq!(ui.run_blocking(|| 7).unwrap(), 7);

        ui.shutdown();
    }

    #[test]
    fn test_shutdown_rejects_work() {
        let ui = UiThread::spawn("test-ui").unwrap();
        ui.shutdown();
        ui.shutdown(); // Idempotent

        assert!(ui.is_shutting_down());
        assert_eq!(ui.run_blocking(|| 1), Err(DispatchError::ShuttingDown));
        assert_eq!(
            ui.post(Priority::Send, Box::new(|| {})),
            Err(DispatchError::ShuttingDown)
        );
    }
}
