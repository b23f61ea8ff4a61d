//! Overlay input - demo host
//!
//! Wires the input listener to a console overlay: every toggle flips the
//! overlay's visibility, and controller navigation is polled while it is
//! shown.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overlay_input::config::{AppConfig, ConfigWatcher, InputConfig, TimingConfig};
use overlay_input::input::diagnostics::print_controller_diagnostics;
use overlay_input::input::{open_default_source, ControllerSource, NavigationPoller};
use overlay_input::{ConsoleOverlay, GlobalHotkeyBackend, InputListener, UiContextExt, UiThread};

/// Overlay input - hotkey and controller activation for an overlay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (created with defaults if missing)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List connected controllers and exit
    #[arg(long)]
    list_controllers: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting overlay-input v{}...", env!("CARGO_PKG_VERSION"));

    if args.list_controllers {
        let source = open_default_source();
        tokio::task::spawn_blocking(move || {
            print_controller_diagnostics(source.as_ref(), Duration::from_secs(3))
        })
        .await?;
        return Ok(());
    }

    ensure_config_file(&args.config).await?;
    let (config_watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
    info!("Configuration loaded from {} with hot-reload enabled", args.config);

    let ui = UiThread::spawn("ui-dispatch").context("Failed to start UI thread")?;
    let source = open_default_source();

    let listener = Arc::new(InputListener::new(
        ui.clone(),
        Box::new(GlobalHotkeyBackend::new()),
        source.clone(),
        InputConfig::from(&config.input),
        config.timing.clone(),
    ));

    let (toggle_tx, toggle_rx) = mpsc::unbounded_channel();
    listener.subscribe(move || {
        let _ = toggle_tx.send(());
    });

    let starter = listener.clone();
    tokio::task::spawn_blocking(move || starter.start())
        .await?
        .context("Failed to start controller polling")?;
    info!("✅ Listening for toggle requests (Ctrl+C to exit)");

    let app = App {
        ui: ui.clone(),
        source,
        overlay: Arc::new(ConsoleOverlay::new()),
        listener: listener.clone(),
        timing: config.timing,
        navigation: None,
    };
    app.run(toggle_rx, config_watcher, shutdown_signal()).await;

    tokio::task::spawn_blocking(move || listener.stop()).await?;
    ui.shutdown();

    info!("overlay-input shutdown complete");
    Ok(())
}

struct App {
    ui: Arc<UiThread>,
    source: Arc<dyn ControllerSource>,
    overlay: Arc<ConsoleOverlay>,
    listener: Arc<InputListener>,
    timing: TimingConfig,
    navigation: Option<NavigationPoller>,
}

impl App {
    async fn run(
        mut self,
        mut toggle_rx: mpsc::UnboundedReceiver<()>,
        mut config_watcher: ConfigWatcher,
        shutdown: impl std::future::Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(()) = toggle_rx.recv() => {
                    self.on_toggle().await;
                }

                Some(new_config) = config_watcher.next_config() => {
                    self.on_config(new_config).await;
                }

                _ = &mut shutdown => {
                    break;
                }
            }
        }

        if let Some(mut navigation) = self.navigation.take() {
            navigation.dispose();
        }
        self.overlay.hide();
    }

    async fn on_toggle(&mut self) {
        let ui = self.ui.clone();
        let overlay = self.overlay.clone();
        let shown = tokio::task::spawn_blocking(move || ui.run_blocking(move || overlay.toggle())).await;

        match shown {
            Ok(Ok(true)) => self.start_navigation(),
            Ok(Ok(false)) => {
                if let Some(mut navigation) = self.navigation.take() {
                    navigation.dispose();
                }
            },
            Ok(Err(e)) => debug!("Toggle ignored: {}", e),
            Err(e) => warn!("Toggle task failed: {}", e),
        }
    }

    fn start_navigation(&mut self) {
        if let Some(mut previous) = self.navigation.take() {
            previous.dispose();
        }

        match NavigationPoller::start(
            self.ui.clone(),
            self.source.clone(),
            self.overlay.clone(),
            self.timing.navigation_poll_interval(),
            self.timing.navigation_cooldown(),
        ) {
            Ok(poller) => self.navigation = Some(poller),
            Err(e) => warn!("⚠️  Failed to start navigation polling: {}", e),
        }
    }

    async fn on_config(&mut self, config: AppConfig) {
        if config.timing != self.timing {
            info!("Timing changes apply to pollers started from now on");
            self.timing = config.timing.clone();
        }

        let listener = self.listener.clone();
        let input = InputConfig::from(&config.input);
        match tokio::task::spawn_blocking(move || listener.apply_settings(input)).await {
            Ok(state) => info!("Hotkey state after reload: {:?}", state),
            Err(e) => warn!("Failed to apply settings: {}", e),
        }
    }
}

/// Write a default config file if none exists
async fn ensure_config_file(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        return Ok(());
    }

    AppConfig::default()
        .save(path)
        .await
        .with_context(|| format!("Failed to create default config: {}", path))?;
    info!("📝 Created default configuration at {}", path);
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
