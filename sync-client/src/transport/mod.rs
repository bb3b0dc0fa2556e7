//! Transport abstraction for boardsync.
//!
//! The session supervisor talks to the server through this trait. The real
//! implementation (a reconnecting websocket owned by the embedding app) is
//! out of scope here; [`MockTransport`] is provided for tests.
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` opens the game's socket; `force_reconnect` drops any
//!   existing connection first and is the resync primitive
//! - `send()` hands over an outbound message (ackable messages are retried
//!   by the transport until the server acknowledges them)
//! - `recv()` yields connection lifecycle events and inbound frames
//! - `close()` gracefully terminates
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.connect("/play/abcdefgh/v6", false).await?;
//! transport.send(ClientMessage::command(MessageKind::Resign)).await?;
//! let event = transport.recv().await?;
//! ```

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use boardsync_types::{ClientMessage, SocketEvent};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A fresh connection is up. Sent on every (re)connection.
    Connected,
    /// An inbound frame.
    Message(SocketEvent),
    /// The connection dropped; the transport is reconnecting on its own.
    Disconnected {
        /// Why the connection dropped.
        reason: String,
    },
}

/// Transport trait for the game socket.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connect to the socket at `address`.
    ///
    /// With `force_reconnect`, an existing connection is torn down and
    /// re-established, which makes the server send a fresh snapshot.
    async fn connect(&self, address: &str, force_reconnect: bool) -> Result<(), TransportError>;

    /// Send a message. Returns once the message is queued.
    async fn send(&self, message: ClientMessage) -> Result<(), TransportError>;

    /// Wait for the next event.
    ///
    /// Must be cancel-safe: dropping the future loses no event.
    async fn recv(&self) -> Result<TransportEvent, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
