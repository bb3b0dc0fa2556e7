//! Mock transport for testing.
//!
//! Allows scripting inbound events and capturing sent messages for verification.

use super::{Transport, TransportError, TransportEvent};
use async_trait::async_trait;
use boardsync_types::{ClientMessage, SocketEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// Every successful `connect()` queues [`TransportEvent::Connected`],
/// followed by the snapshot set with
/// [`snapshot_on_connect`](Self::snapshot_on_connect) if any. `recv()`
/// waits while the queue is empty.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    notify: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connects: Vec<(String, bool)>,
    sent_messages: Vec<ClientMessage>,
    receive_queue: VecDeque<TransportEvent>,
    snapshot_on_connect: Option<SocketEvent>,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn queue(&self, event: TransportEvent) {
        self.lock().receive_queue.push_back(event);
        self.notify.notify_one();
    }

    /// Queue an inbound frame.
    pub fn push_event(&self, frame: SocketEvent) {
        self.queue(TransportEvent::Message(frame));
    }

    /// Queue a disconnection notice.
    pub fn push_disconnect(&self, reason: &str) {
        self.queue(TransportEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Deliver `frame` after every successful connect.
    pub fn snapshot_on_connect(&self, frame: SocketEvent) {
        self.lock().snapshot_on_connect = Some(frame);
    }

    /// Get all messages that were sent.
    pub fn sent_messages(&self) -> Vec<ClientMessage> {
        self.lock().sent_messages.clone()
    }

    /// Get the last message that was sent.
    pub fn last_sent(&self) -> Option<ClientMessage> {
        self.lock().sent_messages.last().cloned()
    }

    /// Every `connect()` call as `(address, force_reconnect)`.
    pub fn connects(&self) -> Vec<(String, bool)> {
        self.lock().connects.clone()
    }

    /// Number of forced reconnections (resyncs).
    pub fn resync_count(&self) -> usize {
        self.lock().connects.iter().filter(|(_, force)| *force).count()
    }

    /// Get the address that was last connected to.
    pub fn connected_address(&self) -> Option<String> {
        self.lock().connects.last().map(|(address, _)| address.clone())
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.lock().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.lock().fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.lock().fail_next_recv = Some(error.to_string());
    }

    /// Clear all state (messages, queue, connection).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
        self.notify.notify_one();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            notify: Arc::clone(&self.notify),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str, force_reconnect: bool) -> Result<(), TransportError> {
        {
            let mut inner = self.lock();

            // Check for forced failure
            if let Some(error) = inner.fail_next_connect.take() {
                return Err(TransportError::ConnectionFailed(error));
            }

            inner.connected = true;
            inner.connects.push((address.to_string(), force_reconnect));
            inner.receive_queue.push_back(TransportEvent::Connected);
            if let Some(snapshot) = inner.snapshot_on_connect.clone() {
                inner.receive_queue.push_back(TransportEvent::Message(snapshot));
            }
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        let mut inner = self.lock();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_messages.push(message);
        Ok(())
    }

    async fn recv(&self) -> Result<TransportEvent, TransportError> {
        loop {
            {
                let mut inner = self.lock();

                if !inner.connected {
                    return Err(TransportError::NotConnected);
                }

                // Check for forced failure
                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }

                if let Some(event) = inner.receive_queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.lock().connected = false;
        self.notify.notify_one();
        Ok(())
    }
}
