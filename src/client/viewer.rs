//! Viewer side of the relay
//!
//! Keeps both channels connected, decodes frames into a display sink and
//! flushes queued input on every video tick. Losing the video channel tears
//! down both channels and restarts both connectors. Losing only the input
//! channel restarts its connector while frames keep flowing.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::connector::ChannelConnector;
use crate::client::queue::InputQueue;
use crate::client::sink::DisplaySink;
use crate::config::Config;
use crate::desktop::{DecoderStats, FrameCodec, FrameDecoder, JpegCodec};
use crate::error::{CodecError, CodecResult, Result};
use crate::network::{MessageReader, MessageWriter, MAX_FRAME_SIZE};
use crate::window::RawImage;

/// Reconnecting viewer for one host
pub struct ReconnectingClient<S> {
    config: Config,
    video: ChannelConnector,
    input: ChannelConnector,
    queue: InputQueue,
    decoder: Arc<FrameDecoder>,
    sink: S,
}

impl<S: DisplaySink> ReconnectingClient<S> {
    /// Creates a viewer rendering into `sink`
    pub fn new(config: Config, sink: S) -> Self {
        let retry = config.client.reconnect_delay();
        let codec: Arc<dyn FrameCodec> = Arc::new(JpegCodec::new(config.capture.quality));

        Self {
            video: ChannelConnector::new("video", config.network.video_remote(), retry),
            input: ChannelConnector::new("input", config.network.input_remote(), retry),
            queue: InputQueue::new(),
            decoder: Arc::new(FrameDecoder::new(codec)),
            config,
            sink,
        }
    }

    /// Queue that local input events should be pushed to
    pub fn input_queue(&self) -> InputQueue {
        self.queue.clone()
    }

    /// Decode statistics so far
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Runs until cancelled
    ///
    /// # Errors
    ///
    /// Currently never fails, connection errors are retried
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        loop {
            let Some((video, input)) = self.connect(&cancel).await else {
                break;
            };

            info!("Streaming from {}", self.config.network.video_remote());
            self.stream(video, input, &cancel).await;

            if cancel.is_cancelled() {
                break;
            }
            info!("Connection lost, reconnecting");
        }

        let stats = self.decoder.stats();
        info!(
            "Viewer stopped after {} frames ({:.1}% decoded)",
            stats.frames_decoded,
            stats.success_rate()
        );
        Ok(())
    }

    /// Waits until both channels are up, None if cancelled first
    async fn connect(&self, cancel: &CancellationToken) -> Option<(TcpStream, TcpStream)> {
        self.video.launch(cancel);
        self.input.launch(cancel);

        let mut video = None;
        let mut input = None;
        loop {
            if video.is_none() {
                video = self.video.take();
            }
            if input.is_none() {
                input = self.input.take();
            }
            if let (Some(_), Some(_)) = (&video, &input) {
                return video.zip(input);
            }

            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.config.client.connect_poll()) => {}
            }
        }
    }

    /// Consumes frames until the video channel fails or cancellation
    async fn stream(&mut self, video: TcpStream, input: TcpStream, cancel: &CancellationToken) {
        let mut frames = MessageReader::new(video, MAX_FRAME_SIZE);
        let mut commands = Some(MessageWriter::new(input));

        loop {
            let payload = tokio::select! {
                _ = cancel.cancelled() => return,
                payload = frames.recv() => payload,
            };

            match payload {
                Ok(payload) => match self.decode(payload).await {
                    Ok(frame) => self.sink.show(&frame),
                    Err(e) => debug!("Skipping undecodable frame: {}", e),
                },
                Err(e) if !e.is_fatal() => {
                    warn!("Skipping video message: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!("{} channel failed: {}", self.video.name(), e);
                    return;
                }
            }

            // Input goes out once per video tick
            if commands.is_none() {
                commands = self.input.take().map(MessageWriter::new);
                if commands.is_none() {
                    self.input.launch(cancel);
                }
            }

            if let Some(writer) = commands.as_mut() {
                if let Err(e) = self.flush_input(writer).await {
                    warn!("{} channel failed: {}", self.input.name(), e);
                    commands = None;
                    self.input.launch(cancel);
                }
            }
        }
    }

    /// Decodes on the blocking pool
    async fn decode(&self, payload: Vec<u8>) -> CodecResult<RawImage> {
        let decoder = Arc::clone(&self.decoder);
        tokio::task::spawn_blocking(move || decoder.decode(&payload))
            .await
            .map_err(|e| CodecError::DecodeFailed(format!("decoder task failed: {}", e)))?
    }

    async fn flush_input(&self, writer: &mut MessageWriter<TcpStream>) -> Result<()> {
        for command in self.queue.drain() {
            let payload = match command.to_json() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Dropping unserializable command: {}", e);
                    continue;
                }
            };
            writer.send(&payload).await?;
            debug!("Sent {} command", command.kind());
        }
        Ok(())
    }
}
