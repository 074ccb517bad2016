// simlink_core/src/transport/mod.rs

//! Message channels between the controller and the bridge.
//!
//! The primary channel is strict request/reply: the server side must send
//! exactly one reply for each request before it may receive again.

pub mod frame;
pub mod memory;
pub mod tcp;
pub mod telemetry;

pub use memory::{memory_pair, MemoryReplySocket, MemoryRequestSocket};
pub use tcp::{TcpReplySocket, TcpRequestSocket};
pub use telemetry::{TelemetryMessage, TelemetryPublisher, TelemetrySubscriber, TelemetryValue};

use crate::error::TransportError;

/// Server side of the request/reply channel.
pub trait ReplyTransport {
    /// Blocks until the next request arrives, or the receive timeout expires.
    fn recv_request(&mut self) -> Result<String, TransportError>;

    /// Sends the reply to the request most recently received.
    fn send_reply(&mut self, reply: &str) -> Result<(), TransportError>;
}

/// Client side of the request/reply channel.
pub trait RequestTransport {
    fn request(&mut self, message: &str) -> Result<String, TransportError>;
}

/// Tracks request/reply alternation for a server socket.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cadence {
    awaiting_reply: bool,
}

impl Cadence {
    pub(crate) fn before_recv(&self) -> Result<(), TransportError> {
        if self.awaiting_reply {
            Err(TransportError::OutOfOrder("previous request has not been answered"))
        } else {
            Ok(())
        }
    }

    pub(crate) fn received(&mut self) {
        self.awaiting_reply = true;
    }

    pub(crate) fn before_reply(&self) -> Result<(), TransportError> {
        if self.awaiting_reply {
            Ok(())
        } else {
            Err(TransportError::OutOfOrder("no request is waiting for a reply"))
        }
    }

    pub(crate) fn replied(&mut self) {
        self.awaiting_reply = false;
    }

    pub(crate) fn reset(&mut self) {
        self.awaiting_reply = false;
    }
}
