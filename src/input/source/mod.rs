//! Controller state capability
//!
//! Pollers read controller state through [`ControllerSource`]. Platform
//! backends implement [`Sampler`] and run behind a [`SampledSource`], which
//! owns the (thread-affine) device handle on a dedicated thread and
//! publishes a snapshot the pollers read without touching the device.

pub mod gilrs_sampler;
#[cfg(windows)]
pub mod xinput_sampler;

use anyhow::{anyhow, Result};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::buttons::flags;
use super::slot::SLOT_COUNT;

pub use gilrs_sampler::GilrsSampler;
#[cfg(windows)]
pub use xinput_sampler::XInputSampler;

/// Sampling rate for backend threads (~120 Hz)
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(8);

/// One controller reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    /// XInput-layout button word (see [`flags`])
    pub buttons: u16,
}

/// Read access to up to [`SLOT_COUNT`] controllers
///
/// Both reads return `None` when no controller sits at `slot`.
pub trait ControllerSource: Send + Sync {
    /// Plain read; the Guide bit is never set
    fn read(&self, slot: usize) -> Option<ControllerState>;

    /// Guide-inclusive read
    fn read_with_guide(&self, slot: usize) -> Option<ControllerState>;
}

/// Source with no controllers attached (used when no backend initialises)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoControllers;

impl ControllerSource for NoControllers {
    fn read(&self, _slot: usize) -> Option<ControllerState> {
        None
    }

    fn read_with_guide(&self, _slot: usize) -> Option<ControllerState> {
        None
    }
}

/// Backend that fills a per-slot button snapshot
///
/// Samplers are created and driven on the sampling thread only, so they
/// may hold handles that are not `Send`.
pub trait Sampler {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Fill `out` with the guide-inclusive button word of every present controller
    fn sample(&mut self, out: &mut [Option<u16>; SLOT_COUNT]);
}

type Snapshot = [Option<u16>; SLOT_COUNT];

/// [`ControllerSource`] fed by a sampler thread
pub struct SampledSource {
    snapshot: Arc<RwLock<Snapshot>>,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SampledSource {
    /// Start a sampler thread
    ///
    /// # Arguments
    /// * `thread_name` - OS thread name
    /// * `interval` - Delay between samples
    /// * `make_sampler` - Builds the sampler on the sampling thread
    ///
    /// # Returns
    /// Running source, or the sampler's initialisation error
    pub fn spawn<S, F>(thread_name: &str, interval: Duration, make_sampler: F) -> Result<Self>
    where
        S: Sampler + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let snapshot = Arc::new(RwLock::new([None; SLOT_COUNT]));
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = channel::bounded::<std::result::Result<&'static str, String>>(1);

        let shared = snapshot.clone();
        let handle = std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                let mut sampler = match make_sampler() {
                    Ok(s) => {
                        let _ = ready_tx.send(Ok(s.name()));
                        s
                    },
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("{:#}", e)));
                        return;
                    },
                };

                loop {
                    let mut next = [None; SLOT_COUNT];
                    sampler.sample(&mut next);
                    *shared.write() = next;

                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                debug!("{} sampler stopped", sampler.name());
            })?;

        match ready_rx.recv() {
            Ok(Ok(name)) => {
                info!("✅ Controller backend ready: {}", name);
                Ok(Self {
                    snapshot,
                    shutdown_tx: Some(shutdown_tx),
                    handle: Some(handle),
                })
            },
            Ok(Err(reason)) => {
                let _ = handle.join();
                Err(anyhow!("controller backend failed to initialise: {}", reason))
            },
            Err(_) => {
                let _ = handle.join();
                Err(anyhow!("controller sampler thread exited during initialisation"))
            },
        }
    }

    /// Start the gilrs backend
    pub fn gilrs() -> Result<Self> {
        Self::spawn("gilrs-sampler", SAMPLE_INTERVAL, GilrsSampler::new)
    }

    /// Start the XInput backend (exposes the Guide button)
    #[cfg(windows)]
    pub fn xinput() -> Result<Self> {
        Self::spawn("xinput-sampler", SAMPLE_INTERVAL, XInputSampler::new)
    }

    fn slot_buttons(&self, slot: usize) -> Option<u16> {
        self.snapshot.read().get(slot).copied().flatten()
    }
}

impl ControllerSource for SampledSource {
    fn read(&self, slot: usize) -> Option<ControllerState> {
        self.slot_buttons(slot).map(|buttons| ControllerState {
            buttons: buttons & !flags::GUIDE,
        })
    }

    fn read_with_guide(&self, slot: usize) -> Option<ControllerState> {
        self.slot_buttons(slot).map(|buttons| ControllerState { buttons })
    }
}

impl Drop for SampledSource {
    fn drop(&mut self) {
        // Disconnecting the channel stops the sampler
        self.shutdown_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Controller sampler thread panicked");
            }
        }
    }
}

/// Open the best available controller backend
///
/// Prefers XInput on Windows (the only backend that reports Guide), then
/// gilrs, then a source with no controllers so the app keeps running.
pub fn open_default_source() -> Arc<dyn ControllerSource> {
    #[cfg(windows)]
    {
        match SampledSource::xinput() {
            Ok(source) => return Arc::new(source),
            Err(e) => warn!("XInput unavailable (falling back to gilrs): {:#}", e),
        }
    }

    match SampledSource::gilrs() {
        Ok(source) => Arc::new(source),
        Err(e) => {
            warn!("Failed to initialize controller input: {:#}. Continuing without controllers.", e);
            Arc::new(NoControllers)
        },
    }
}
