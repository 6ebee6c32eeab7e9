//! # quip-transport
//!
//! The chat transport seam. The supervisor drives a [`Transport`] as a
//! black box: connect, join, send, ping, and a stream of events. The one
//! bundled implementation is a deliberately thin IRC line adapter; protocol
//! completeness is somebody else's job.

pub mod irc;

use async_trait::async_trait;

use quip_core::Result;

/// Events surfaced by a transport to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The server accepted the session; channels may be joined.
    Welcome,
    /// A public message in a joined channel.
    Message {
        sender: String,
        channel: String,
        text: String,
    },
    /// An answer to one of our keepalive probes.
    Pong,
    /// The link dropped, with a reason when the transport knows one.
    Disconnected(Option<String>),
}

/// A chat-protocol session. Implementations own framing and any
/// protocol-level housekeeping; the supervisor only sees [`TransportEvent`]s.
#[async_trait]
pub trait Transport: Send {
    /// Establish the network session and begin the login handshake.
    async fn connect(&mut self) -> Result<()>;

    /// Join a channel. Valid only after [`TransportEvent::Welcome`].
    async fn join(&mut self, channel: &str) -> Result<()>;

    /// Deliver one line of text to a channel.
    async fn send_message(&mut self, channel: &str, text: &str) -> Result<()>;

    /// Send a keepalive probe; the server answers with a Pong event.
    async fn ping(&mut self) -> Result<()>;

    /// Tear down the session. Safe to call when already disconnected.
    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    /// The next event, or `None` once the transport is permanently closed.
    async fn next_event(&mut self) -> Option<TransportEvent>;
}
