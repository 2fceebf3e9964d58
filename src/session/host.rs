//! Host side of a session
//!
//! The host owns one listener per channel. Each session accepts exactly one
//! video peer and one input peer, then runs the capture and dispatch halves
//! as two tasks sharing a cancellation token. Whichever half ends first
//! cancels the other.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::desktop::{FrameCodec, FrameSource, JpegCodec};
use crate::error::{Result, TransportError};
use crate::input::InputSimulator;
use crate::session::capture::{CaptureReport, CaptureSession, CaptureStop};
use crate::session::dispatcher::{DispatchReport, DispatchStop, InputDispatcher};
use crate::window::{SharedWindowSystem, WindowHandle};

/// One pending connection per channel
const LISTEN_BACKLOG: u32 = 1;

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Window the session targeted
    pub window: WindowHandle,
    /// Frames written to the video channel
    pub frames_sent: u64,
    /// Bytes written to the video channel
    pub bytes_sent: u64,
    /// Commands injected into the window
    pub commands_applied: u64,
    /// Commands dropped as malformed or failed
    pub commands_dropped: u64,
    /// Synthetic pointer and key events sent to the window
    pub events_injected: u64,
    /// Why the capture half ended
    pub capture_stop: CaptureStop,
    /// Why the dispatch half ended
    pub dispatch_stop: DispatchStop,
    /// Session lifetime
    pub duration: Duration,
}

impl SessionReport {
    /// Returns the average frame rate over the session
    pub fn average_fps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.frames_sent as f64 / secs
    }
}

/// Running session with explicit stop and join
#[derive(Debug)]
pub struct SessionHandle {
    window: WindowHandle,
    cancel: CancellationToken,
    capture: JoinHandle<CaptureReport>,
    dispatch: JoinHandle<DispatchReport>,
    started_at: Instant,
}

impl SessionHandle {
    /// Window the session targets
    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// Returns true once both halves have ended
    pub fn is_finished(&self) -> bool {
        self.capture.is_finished() && self.dispatch.is_finished()
    }

    /// Asks both halves to stop
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Resolves once the session has been stopped from either side
    pub async fn stopped(&self) {
        self.cancel.cancelled().await;
    }

    /// Waits for both halves and summarizes the session
    pub async fn join(self) -> SessionReport {
        let (capture, dispatch) = tokio::join!(self.capture, self.dispatch);

        let capture = capture.unwrap_or_else(|e| CaptureReport {
            frames_sent: 0,
            bytes_sent: 0,
            stop: CaptureStop::TaskFailed(e.to_string()),
        });
        let dispatch = dispatch.unwrap_or_else(|e| DispatchReport {
            commands_applied: 0,
            commands_dropped: 0,
            events_injected: 0,
            stop: DispatchStop::TaskFailed(e.to_string()),
        });

        SessionReport {
            window: self.window,
            frames_sent: capture.frames_sent,
            bytes_sent: capture.bytes_sent,
            commands_applied: dispatch.commands_applied,
            commands_dropped: dispatch.commands_dropped,
            events_injected: dispatch.events_injected,
            capture_stop: capture.stop,
            dispatch_stop: dispatch.stop,
            duration: self.started_at.elapsed(),
        }
    }

    /// Stops the session and waits for it
    pub async fn shutdown(self) -> SessionReport {
        self.stop();
        self.join().await
    }
}

/// Starts both halves of a session over already connected channels
pub fn spawn_session<V, I>(
    system: SharedWindowSystem,
    config: &Config,
    window: WindowHandle,
    video: V,
    input: I,
) -> SessionHandle
where
    V: AsyncWrite + Unpin + Send + 'static,
    I: AsyncRead + Unpin + Send + 'static,
{
    let cancel = CancellationToken::new();
    let codec: Arc<dyn FrameCodec> = Arc::new(JpegCodec::new(config.capture.quality));

    let source = FrameSource::new(system.clone(), window, codec);
    let capture = CaptureSession::new(source, video, config.capture.frame_delay());

    let simulator = InputSimulator::new(system, config.input.clone());
    let dispatcher = InputDispatcher::new(input, simulator, window, config.input.stop_key.clone());

    let token = cancel.clone();
    let capture = tokio::spawn(async move {
        let report = capture.run(token.clone()).await;
        token.cancel();
        report
    });

    let token = cancel.clone();
    let dispatch = tokio::spawn(async move {
        let report = dispatcher.run(token.clone()).await;
        token.cancel();
        report
    });

    info!("Session started for window {}", window);

    SessionHandle {
        window,
        cancel,
        capture,
        dispatch,
        started_at: Instant::now(),
    }
}

/// Listeners for the video and input channels
pub struct SessionHost {
    system: SharedWindowSystem,
    config: Config,
    video: TcpListener,
    input: TcpListener,
}

impl SessionHost {
    /// Binds both channel listeners
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if either address cannot be resolved or bound
    pub async fn bind(system: SharedWindowSystem, config: Config) -> Result<Self> {
        let video = bind_listener(&config.network.video_bind()).await?;
        let input = bind_listener(&config.network.input_bind()).await?;

        info!(
            "Listening for video on {} and input on {}",
            video.local_addr()?,
            input.local_addr()?
        );

        Ok(Self {
            system,
            config,
            video,
            input,
        })
    }

    /// Local address of the video listener
    pub fn video_addr(&self) -> io::Result<SocketAddr> {
        self.video.local_addr()
    }

    /// Local address of the input listener
    pub fn input_addr(&self) -> io::Result<SocketAddr> {
        self.input.local_addr()
    }

    /// Waits for one video peer and one input peer
    ///
    /// # Errors
    ///
    /// Returns a transport error if accepting fails
    pub async fn accept(&self) -> Result<(TcpStream, TcpStream)> {
        let ((video, video_peer), (input, input_peer)) =
            tokio::try_join!(self.video.accept(), self.input.accept())
                .map_err(TransportError::Io)?;

        info!("Viewer connected (video {}, input {})", video_peer, input_peer);

        if let Err(e) = video.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }
        Ok((video, input))
    }

    /// Accepts a viewer and starts a session for `window`
    ///
    /// # Errors
    ///
    /// Returns a transport error if accepting fails
    pub async fn start(&self, window: WindowHandle) -> Result<SessionHandle> {
        info!("Waiting for a viewer for window {}", window);
        let (video, input) = self.accept().await?;
        Ok(spawn_session(
            self.system.clone(),
            &self.config,
            window,
            video,
            input,
        ))
    }
}

/// Binds a reusable listener with a backlog of one
async fn bind_listener(addr: &str) -> Result<TcpListener> {
    let bind_failed = |source: io::Error| TransportError::BindFailed {
        addr: addr.to_string(),
        source,
    };

    let resolved = lookup_host(addr)
        .await
        .map_err(bind_failed)?
        .next()
        .ok_or_else(|| bind_failed(io::Error::new(io::ErrorKind::NotFound, "no address")))?;

    let socket = if resolved.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_failed)?;

    socket.set_reuseaddr(true).map_err(bind_failed)?;
    socket.bind(resolved).map_err(bind_failed)?;
    Ok(socket.listen(LISTEN_BACKLOG).map_err(bind_failed)?)
}
