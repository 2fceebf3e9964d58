//! Input command consumer loop
//!
//! Reads commands from the input channel and applies them to the tracked
//! window. Malformed or failing commands are dropped one at a time. The loop
//! ends when the peer closes, a read fails, the stop key arrives or the
//! session is cancelled.

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RelayError, TransportError};
use crate::input::InputSimulator;
use crate::network::{InputCommand, MessageReader, MAX_COMMAND_SIZE};
use crate::window::WindowHandle;

/// Why the dispatch loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStop {
    /// The viewer closed the input channel
    PeerClosed,
    /// Reading from the input channel failed
    ReadFailed(String),
    /// The viewer sent the stop key
    StopKey,
    /// The session was stopped from outside or by the capture half
    Cancelled,
    /// The task panicked or was aborted
    TaskFailed(String),
}

/// Outcome of one dispatch loop
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Commands injected into the window
    pub commands_applied: u64,
    /// Commands dropped as malformed or failed
    pub commands_dropped: u64,
    /// Synthetic pointer and key events sent to the window
    pub events_injected: u64,
    /// Why the loop ended
    pub stop: DispatchStop,
}

/// Applies commands from the input peer to one window
pub struct InputDispatcher<R> {
    reader: MessageReader<R>,
    simulator: InputSimulator,
    window: WindowHandle,
    stop_key: String,
}

impl<R: AsyncRead + Unpin + Send> InputDispatcher<R> {
    /// Creates a dispatcher reading from `input`
    pub fn new(input: R, simulator: InputSimulator, window: WindowHandle, stop_key: String) -> Self {
        Self {
            reader: MessageReader::new(input, MAX_COMMAND_SIZE),
            simulator,
            window,
            stop_key,
        }
    }

    /// Runs until the channel ends, the stop key arrives or cancellation
    ///
    /// Cancellation is observed between commands, a command already being
    /// injected completes first.
    pub async fn run(mut self, cancel: CancellationToken) -> DispatchReport {
        let mut applied = 0u64;
        let mut dropped = 0u64;

        let stop = loop {
            let payload = tokio::select! {
                _ = cancel.cancelled() => break DispatchStop::Cancelled,
                payload = self.reader.recv() => payload,
            };

            let payload = match payload {
                Ok(payload) => payload,
                Err(RelayError::Transport(TransportError::Closed)) => {
                    info!("Input peer closed the channel");
                    break DispatchStop::PeerClosed;
                }
                Err(e) if !e.is_fatal() => {
                    warn!("Dropping input message: {}", e);
                    dropped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Input channel read failed: {}", e);
                    break DispatchStop::ReadFailed(e.to_string());
                }
            };

            let command = match InputCommand::from_json(&payload) {
                Ok(command) => command,
                Err(e) => {
                    warn!("Dropping malformed command: {}", e);
                    dropped += 1;
                    continue;
                }
            };

            if command.is_stop(&self.stop_key) {
                info!("Stop key received, ending session for window {}", self.window);
                break DispatchStop::StopKey;
            }

            match self.simulator.apply(self.window, &command).await {
                Ok(()) => {
                    applied += 1;
                    debug!("Applied {} command", command.kind());
                }
                Err(e) => {
                    warn!("Dropping {} command: {}", command.kind(), e);
                    dropped += 1;
                }
            }
        };

        DispatchReport {
            commands_applied: applied,
            commands_dropped: dropped,
            events_injected: self.simulator.events_simulated(),
            stop,
        }
    }
}
