//! Reconnecting channel acquisition
//!
//! Each channel has its own connector task that retries with a fixed delay
//! until a connection is up, then parks the stream in a slot for the viewer
//! to take. A flag keeps at most one connector running per channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::TransportError;

/// Supervised connector for one channel
#[derive(Debug, Clone)]
pub struct ChannelConnector {
    name: &'static str,
    addr: String,
    retry_delay: Duration,
    connecting: Arc<AtomicBool>,
    slot: Arc<Mutex<Option<TcpStream>>>,
}

impl ChannelConnector {
    /// Creates a connector for `addr`
    pub fn new(name: &'static str, addr: String, retry_delay: Duration) -> Self {
        Self {
            name,
            addr,
            retry_delay,
            connecting: Arc::new(AtomicBool::new(false)),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts a connector task unless one is already running
    ///
    /// Returns false if a task was already running.
    pub fn launch(&self, cancel: &CancellationToken) -> bool {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return false;
        }

        let connector = self.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            connector.connect_loop(cancel).await;
            connector.connecting.store(false, Ordering::SeqCst);
        });
        true
    }

    async fn connect_loop(&self, cancel: CancellationToken) {
        loop {
            let attempt = tokio::select! {
                _ = cancel.cancelled() => return,
                attempt = TcpStream::connect(&self.addr) => attempt,
            };

            match attempt {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY on {} channel: {}", self.name, e);
                    }
                    info!("Connected to {} channel at {}", self.name, self.addr);
                    *self.slot.lock() = Some(stream);
                    return;
                }
                Err(source) => {
                    let error = TransportError::ConnectFailed {
                        addr: self.addr.clone(),
                        source,
                    };
                    debug!(
                        "{} channel: {}, retrying in {:?}",
                        self.name, error, self.retry_delay
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    /// Takes the connected stream, if one is parked
    pub fn take(&self) -> Option<TcpStream> {
        self.slot.lock().take()
    }

    /// Returns true while a connector task is running
    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::SeqCst)
    }

    /// Channel name for logging
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_single_connector_per_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let cancel = CancellationToken::new();

        let connector = ChannelConnector::new("video", addr, Duration::from_millis(10));
        assert!(connector.launch(&cancel));
        assert!(!connector.launch(&cancel));

        let (_server, _) = listener.accept().await.unwrap();
        let stream = loop {
            if let Some(stream) = connector.take() {
                break stream;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert!(stream.peer_addr().is_ok());

        while connector.is_connecting() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(connector.launch(&cancel));
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_cancel_stops_retrying() {
        // Grab a free port and release it so connects are refused
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let cancel = CancellationToken::new();
        let connector = ChannelConnector::new("input", addr, Duration::from_millis(10));

        connector.launch(&cancel);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(connector.is_connecting());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), async {
            while connector.is_connecting() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(connector.take().is_none());
    }
}
