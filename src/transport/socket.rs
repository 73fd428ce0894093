//! One WebSocket connection to one board.
//!
//! The owner drives the socket from its own loop: it awaits
//! [`Transport::next_event`] alongside its timers and calls
//! [`Transport::send`] as needed. Nothing is queued; a send while the
//! socket is not open is dropped.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Result;
use crate::protocol::DeviceCommand;

// ============================================================================
// Types
// ============================================================================

/// Client stream, plain or TLS.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// TransportEvent
// ============================================================================

/// Something the socket reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Message(String),
    /// The socket failed.
    Error(String),
    /// The board closed the socket or the stream ended.
    Closed(String),
}

// ============================================================================
// Transport
// ============================================================================

/// Open socket to a board.
pub struct Transport {
    stream: Option<WsStream>,
    open: bool,
}

impl Transport {
    /// Connects to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`](crate::Error::WebSocket) if the TCP,
    /// TLS or upgrade step fails.
    pub async fn open(url: &Url) -> Result<Self> {
        let (stream, _response) = connect_async(url.as_str()).await?;
        debug!(%url, "Socket open");

        Ok(Self {
            stream: Some(stream),
            open: true,
        })
    }

    /// Returns `true` while frames can be sent.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Waits for the next event.
    ///
    /// Control and binary frames are skipped. After [`Transport::close`],
    /// or once a close has been reported, this never resolves.
    pub async fn next_event(&mut self) -> TransportEvent {
        let Some(stream) = self.stream.as_mut() else {
            return std::future::pending().await;
        };

        let event = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return TransportEvent::Message(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by board".to_string());
                    break TransportEvent::Closed(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break TransportEvent::Error(e.to_string()),
                None => break TransportEvent::Closed("stream ended".to_string()),
            }
        };

        self.open = false;
        self.stream = None;
        event
    }

    /// Sends one text frame.
    ///
    /// Returns `false` if the frame was dropped. A failed write marks the
    /// socket closed.
    pub async fn send(&mut self, text: String) -> bool {
        let Some(stream) = self.stream.as_mut().filter(|_| self.open) else {
            debug!("Socket not open, frame dropped");
            return false;
        };

        if let Err(e) = stream.send(Message::Text(text.into())).await {
            warn!(error = %e, "Send failed");
            self.open = false;
            return false;
        }

        true
    }

    /// Serializes and sends a device command.
    pub async fn send_command(&mut self, command: &DeviceCommand) -> bool {
        match command.to_json() {
            Ok(text) => {
                trace!(cmd = command.name(), "Sending command");
                self.send(text).await
            }
            Err(e) => {
                warn!(cmd = command.name(), error = %e, "Command not serializable");
                false
            }
        }
    }

    /// Closes the socket. Safe to call more than once.
    pub async fn close(&mut self) {
        self.open = false;

        if let Some(mut stream) = self.stream.take()
            && let Err(e) = stream.close(None).await
        {
            debug!(error = %e, "Close handshake failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
