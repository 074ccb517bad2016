// simlink_core/src/transport/memory.rs

//! An in-process request/reply pair over crossbeam channels.

use super::{Cadence, ReplyTransport, RequestTransport};
use crate::error::TransportError;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

pub struct MemoryReplySocket {
    requests: Receiver<String>,
    replies: Sender<String>,
    recv_timeout: Option<Duration>,
    cadence: Cadence,
}

pub struct MemoryRequestSocket {
    requests: Sender<String>,
    replies: Receiver<String>,
}

/// Creates a connected (server, client) pair.
pub fn memory_pair() -> (MemoryReplySocket, MemoryRequestSocket) {
    let (request_tx, request_rx) = channel::bounded(1);
    let (reply_tx, reply_rx) = channel::bounded(1);
    (
        MemoryReplySocket {
            requests: request_rx,
            replies: reply_tx,
            recv_timeout: None,
            cadence: Cadence::default(),
        },
        MemoryRequestSocket {
            requests: request_tx,
            replies: reply_rx,
        },
    )
}

impl MemoryReplySocket {
    pub fn with_recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }
}

impl ReplyTransport for MemoryReplySocket {
    fn recv_request(&mut self) -> Result<String, TransportError> {
        self.cadence.before_recv()?;
        let message = match self.recv_timeout {
            Some(timeout) => self.requests.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => TransportError::Timeout,
                RecvTimeoutError::Disconnected => TransportError::Disconnected,
            })?,
            None => self
                .requests
                .recv()
                .map_err(|_| TransportError::Disconnected)?,
        };
        self.cadence.received();
        Ok(message)
    }

    fn send_reply(&mut self, reply: &str) -> Result<(), TransportError> {
        self.cadence.before_reply()?;
        self.replies
            .send(reply.to_string())
            .map_err(|_| TransportError::Disconnected)?;
        self.cadence.replied();
        Ok(())
    }
}

impl RequestTransport for MemoryRequestSocket {
    fn request(&mut self, message: &str) -> Result<String, TransportError> {
        self.requests
            .send(message.to_string())
            .map_err(|_| TransportError::Disconnected)?;
        self.replies.recv().map_err(|_| TransportError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_request_reply_across_threads() {
        let (mut server, mut client) = memory_pair();
        let handle = thread::spawn(move || {
            let request = server.recv_request().unwrap();
            server.send_reply(&format!("ack {}", request)).unwrap();
        });
        assert_eq!(client.request("EXIT").unwrap(), "ack EXIT");
        handle.join().unwrap();
    }

    #[test]
    fn test_alternation_is_enforced() {
        let (mut server, mut client) = memory_pair();
        assert!(matches!(server.send_reply("x"), Err(TransportError::OutOfOrder(_))));

        let handle = thread::spawn(move || client.request("CMD:OBS:"));
        server.recv_request().unwrap();
        assert!(matches!(server.recv_request(), Err(TransportError::OutOfOrder(_))));
        server.send_reply("[]").unwrap();
        assert_eq!(handle.join().unwrap().unwrap(), "[]");
    }

    #[test]
    fn test_timeout_and_disconnect() {
        let (server, client) = memory_pair();
        let mut server = server.with_recv_timeout(Some(Duration::from_millis(10)));
        assert!(matches!(server.recv_request(), Err(TransportError::Timeout)));

        drop(client);
        assert!(matches!(server.recv_request(), Err(TransportError::Disconnected)));
    }
}
