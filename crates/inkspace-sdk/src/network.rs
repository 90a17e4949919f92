//! Transport abstraction for outbound messages.
//!
//! The synchronizer never touches a socket. It is handed something that
//! implements [`Transport`] and calls `send` with fully formed messages;
//! inbound messages are fed back in by whoever owns the connection.

use crate::error::{Result, SdkError};
use crate::message::ClientMessage;
use tokio::sync::mpsc;

/// Outbound half of a connection to the authority.
pub trait Transport: Send + Sync + 'static {
    /// Hand a message to the connection. Must not block.
    fn send(&self, message: ClientMessage) -> Result<()>;
}

impl<F> Transport for F
where
    F: Fn(ClientMessage) -> Result<()> + Send + Sync + 'static,
{
    fn send(&self, message: ClientMessage) -> Result<()> {
        self(message)
    }
}

/// In-memory transport backed by an unbounded channel.
///
/// Used by tests and by the stress-test binary, where the receiving end is
/// drained straight into the authority.
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl MemoryTransport {
    /// Create a transport and the receiver that observes everything sent.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, message: ClientMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|e| SdkError::Transport(format!("receiver dropped: {}", e.0.event())))
    }
}
