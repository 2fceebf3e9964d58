//! WinRelay - stream one window over TCP and relay input back
//!
//! ```text
//! winrelay host --title <substr>   Share the first window whose title matches
//! winrelay host --offscreen        Share the first window parked off-screen
//! winrelay host                    Share the window chosen by the edge gesture
//! winrelay view [--server <addr>]  Connect to a host, read commands from stdin
//! winrelay gen-config              Print the default configuration
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use winrelay::client::{read_commands, DisplaySink, FrameCounter, ReconnectingClient, SnapshotSink};
use winrelay::config::Config;
use winrelay::gesture::EdgeGestureDetector;
use winrelay::logging::{init_logging, LogLevel};
use winrelay::session::{SessionHandle, SessionHost, SessionReport};
use winrelay::window::{SharedWindowSystem, WindowHandle, WindowLocator};

/// How often a title or off-screen lookup is retried
const LOCATE_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "winrelay", version, about = "Stream a single window and relay input to it")]
struct Cli {
    /// Path to a configuration TOML file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Share a window
    Host {
        /// Share the first window whose title contains this text
        #[arg(long, conflicts_with = "offscreen")]
        title: Option<String>,

        /// Share the first viewable window lying entirely off the display
        #[arg(long)]
        offscreen: bool,
    },

    /// View a shared window
    View {
        /// Host address, overrides the configuration
        #[arg(long)]
        server: Option<String>,

        /// Keep this image file updated with the latest frame
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Print the default configuration to stdout
    GenConfig,
}

/// How the host picks the window to share
#[derive(Debug, Clone)]
enum Selector {
    Title(String),
    Offscreen,
    Gesture,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        println!("{}", Config::default().to_toml()?);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.log_level()
    };
    init_logging(level);

    info!("Starting WinRelay v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    spawn_ctrl_c(shutdown.clone());

    match cli.command {
        Command::Host { title, offscreen } => {
            let selector = match (title, offscreen) {
                (Some(title), _) => Selector::Title(title),
                (None, true) => Selector::Offscreen,
                (None, false) => Selector::Gesture,
            };
            run_host(config, selector, shutdown).await?;
        }
        Command::View { server, snapshot } => {
            if let Some(server) = server {
                config.network.server_address = server;
            }
            run_view(config, snapshot, shutdown).await?;
        }
        Command::GenConfig => {}
    }

    info!("WinRelay stopped.");
    Ok(())
}

fn spawn_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down..."),
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
        shutdown.cancel();
    });
}

#[cfg(target_os = "linux")]
fn open_window_system() -> anyhow::Result<SharedWindowSystem> {
    let system = winrelay::window::X11WindowSystem::connect().context("opening the X display")?;
    Ok(SharedWindowSystem::new(system))
}

#[cfg(not(target_os = "linux"))]
fn open_window_system() -> anyhow::Result<SharedWindowSystem> {
    anyhow::bail!("hosting requires an X11 display")
}

async fn run_host(
    config: Config,
    selector: Selector,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let system = open_window_system()?;
    let host = SessionHost::bind(system.clone(), config.clone()).await?;

    match selector {
        Selector::Gesture => serve_gestures(&host, system, &config, shutdown).await,
        selector => serve_located(&host, WindowLocator::new(system), &selector, shutdown).await,
    }
    Ok(())
}

/// Finds the window by title or position and serves one session at a time
async fn serve_located(
    host: &SessionHost,
    locator: WindowLocator,
    selector: &Selector,
    shutdown: CancellationToken,
) {
    loop {
        let Some(window) = locate(&locator, selector, &shutdown).await else {
            return;
        };

        let session = tokio::select! {
            _ = shutdown.cancelled() => return,
            session = host.start(window) => session,
        };

        match session {
            Ok(session) => {
                tokio::select! {
                    _ = shutdown.cancelled() => session.stop(),
                    _ = session.stopped() => {}
                }
                log_report(&session.join().await);
            }
            Err(e) => warn!("Failed to start session: {}", e),
        }

        if shutdown.is_cancelled() {
            return;
        }
    }
}

/// Polls the locator until a window turns up, None on shutdown
async fn locate(
    locator: &WindowLocator,
    selector: &Selector,
    shutdown: &CancellationToken,
) -> Option<WindowHandle> {
    let mut logged = false;
    loop {
        let found = match selector {
            Selector::Title(title) => locator.find_by_title(title).await,
            Selector::Offscreen => locator.find_offscreen().await,
            Selector::Gesture => locator.current_active_window().await,
        };
        if found.is_some() {
            return found;
        }

        if !logged {
            info!("No matching window yet ({:?}), still looking", selector);
            logged = true;
        }
        tokio::select! {
            _ = shutdown.cancelled() => return None,
            _ = tokio::time::sleep(LOCATE_RETRY_DELAY) => {}
        }
    }
}

/// Starts a session for every window the edge gesture selects
async fn serve_gestures(
    host: &SessionHost,
    system: SharedWindowSystem,
    config: &Config,
    shutdown: CancellationToken,
) {
    let (selected_tx, mut selected_rx) = mpsc::channel(4);
    let detector = EdgeGestureDetector::new(system, config.gesture.clone());
    tokio::spawn(detector.run(selected_tx, shutdown.clone()));

    let mut current: Option<SessionHandle> = None;

    loop {
        let window = tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = session_ended(current.as_ref()) => {
                if let Some(session) = current.take() {
                    log_report(&session.join().await);
                }
                continue;
            }
            selected = selected_rx.recv() => match selected {
                Some(window) => window,
                None => break,
            },
        };

        if let Some(session) = current.as_ref() {
            if !config.gesture.preempt {
                warn!(
                    "Ignoring gesture for window {}, window {} is still being shared",
                    window,
                    session.window()
                );
                continue;
            }
        }
        if let Some(session) = current.take() {
            info!("Replacing session for window {} with {}", session.window(), window);
            log_report(&session.shutdown().await);
        }

        let started = tokio::select! {
            _ = shutdown.cancelled() => break,
            started = host.start(window) => started,
        };
        match started {
            Ok(session) => current = Some(session),
            Err(e) => warn!("Failed to start session: {}", e),
        }
    }

    if let Some(session) = current {
        log_report(&session.shutdown().await);
    }
}

/// Resolves when the session stops, never if there is none
async fn session_ended(session: Option<&SessionHandle>) {
    match session {
        Some(session) => session.stopped().await,
        None => std::future::pending().await,
    }
}

fn log_report(report: &SessionReport) {
    info!(
        "Session for window {} ended after {:.1}s: {} frames ({} bytes, {:.1} fps), {} commands applied ({} events), {} dropped",
        report.window,
        report.duration.as_secs_f64(),
        report.frames_sent,
        report.bytes_sent,
        report.average_fps(),
        report.commands_applied,
        report.events_injected,
        report.commands_dropped
    );
    info!(
        "Capture ended: {:?}, input ended: {:?}",
        report.capture_stop, report.dispatch_stop
    );
}

async fn run_view(
    config: Config,
    snapshot: Option<PathBuf>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let sink: Box<dyn DisplaySink> = match snapshot {
        Some(path) => {
            info!("Writing frames to {}", path.display());
            Box::new(SnapshotSink::new(path))
        }
        None => Box::new(FrameCounter::new()),
    };

    let mut client = ReconnectingClient::new(config, sink);

    let queue = client.input_queue();
    std::thread::spawn(move || read_commands(std::io::stdin().lock(), &queue));

    info!("Type commands (click X Y [right], dclick X Y, key NAME, esc)");
    client.run(shutdown).await?;
    Ok(())
}
