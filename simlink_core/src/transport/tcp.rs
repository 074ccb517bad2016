// simlink_core/src/transport/tcp.rs

use super::frame::{self, map_io, DEFAULT_MAX_FRAME_LEN};
use super::{Cadence, ReplyTransport, RequestTransport};
use crate::error::TransportError;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Server end of the request/reply channel. Serves one controller at a
/// time; after a disconnect the next `recv_request` accepts a new one.
pub struct TcpReplySocket {
    listener: TcpListener,
    stream: Option<TcpStream>,
    recv_timeout: Option<Duration>,
    max_frame_len: usize,
    cadence: Cadence,
}

impl TcpReplySocket {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)?;
        info!("Bridge listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            stream: None,
            recv_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            cadence: Cadence::default(),
        })
    }

    pub fn with_recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Blocks until a controller connects.
    pub fn accept(&mut self) -> Result<SocketAddr, TransportError> {
        let (stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.recv_timeout)?;
        info!("Controller connected from {}", peer);
        self.stream = Some(stream);
        self.cadence.reset();
        Ok(peer)
    }

    fn drop_peer(&mut self) {
        if self.stream.take().is_some() {
            info!("Controller disconnected");
        }
        self.cadence.reset();
    }
}

impl ReplyTransport for TcpReplySocket {
    fn recv_request(&mut self) -> Result<String, TransportError> {
        self.cadence.before_recv()?;
        if self.stream.is_none() {
            self.accept()?;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Disconnected);
        };

        match frame::read_text(stream, self.max_frame_len) {
            Ok(message) => {
                debug!("<- {}", message);
                self.cadence.received();
                Ok(message)
            }
            Err(TransportError::Timeout) => Err(TransportError::Timeout),
            // The whole frame was consumed, so the stream is still in sync
            // and the peer is owed a reply.
            Err(TransportError::InvalidUtf8) => {
                warn!("Request is not valid UTF-8");
                self.cadence.received();
                Err(TransportError::InvalidUtf8)
            }
            // Unread payload is left on the stream; start over with a new peer.
            Err(err @ (TransportError::FrameTooLarge { .. } | TransportError::TooManyFrames { .. })) => {
                warn!("Dropping controller: {}", err);
                self.drop_peer();
                Err(TransportError::Disconnected)
            }
            Err(err) => {
                self.drop_peer();
                Err(err)
            }
        }
    }

    fn send_reply(&mut self, reply: &str) -> Result<(), TransportError> {
        self.cadence.before_reply()?;
        let Some(stream) = self.stream.as_mut() else {
            self.cadence.reset();
            return Err(TransportError::Disconnected);
        };

        match frame::write_text(stream, reply) {
            Ok(()) => {
                debug!("-> {}", reply);
                self.cadence.replied();
                Ok(())
            }
            Err(err) => {
                self.drop_peer();
                Err(err)
            }
        }
    }
}

/// Client end of the request/reply channel.
pub struct TcpRequestSocket {
    stream: TcpStream,
    max_frame_len: usize,
}

impl TcpRequestSocket {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).map_err(map_io)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    pub fn with_timeout(self, timeout: Option<Duration>) -> Result<Self, TransportError> {
        self.stream.set_read_timeout(timeout)?;
        Ok(self)
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

impl RequestTransport for TcpRequestSocket {
    fn request(&mut self, message: &str) -> Result<String, TransportError> {
        frame::write_text(&mut self.stream, message)?;
        frame::read_text(&mut self.stream, self.max_frame_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_tcp_round_trip_and_reconnect() {
        let mut server = TcpReplySocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let handle = thread::spawn(move || {
            for _ in 0..3 {
                let request = server.recv_request().unwrap();
                server.send_reply(&request.to_lowercase()).unwrap();
            }
            // The first client hangs up here.
            assert!(matches!(server.recv_request(), Err(TransportError::Disconnected)));
            let request = server.recv_request().unwrap();
            server.send_reply(&request).unwrap();
        });

        {
            let mut client = TcpRequestSocket::connect(addr).unwrap();
            assert_eq!(client.request("EXIT").unwrap(), "exit");
            assert_eq!(client.request("CMD:OBS:").unwrap(), "cmd:obs:");
            assert_eq!(client.request("").unwrap(), "");
        }

        let mut second = TcpRequestSocket::connect(addr).unwrap();
        assert_eq!(second.request("RESET:{}").unwrap(), "RESET:{}");
        handle.join().unwrap();
    }

    #[test]
    fn test_malformed_requests_keep_serving() {
        let server = TcpReplySocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let mut server = server.with_max_frame_len(64);

        let handle = thread::spawn(move || {
            // Bad UTF-8 is owed a reply on the same connection.
            assert!(matches!(server.recv_request(), Err(TransportError::InvalidUtf8)));
            assert!(server.is_connected());
            server.send_reply("INVALID").unwrap();

            // An oversized frame costs the peer its connection.
            assert!(matches!(server.recv_request(), Err(TransportError::Disconnected)));
            assert!(!server.is_connected());

            let request = server.recv_request().unwrap();
            server.send_reply(&request).unwrap();
        });

        let mut raw = TcpStream::connect(addr).unwrap();
        frame::write_message(&mut raw, &[b"CMD:thr1:VELOCITY:\xff;OBS:"]).unwrap();
        assert_eq!(frame::read_text(&mut raw, DEFAULT_MAX_FRAME_LEN).unwrap(), "INVALID");
        frame::write_message(&mut raw, &[&[b'x'; 128]]).unwrap();

        let mut next = TcpRequestSocket::connect(addr).unwrap();
        assert_eq!(next.request("EXIT").unwrap(), "EXIT");
        handle.join().unwrap();
    }

    #[test]
    fn test_recv_timeout_keeps_connection() {
        let server = TcpReplySocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let mut server = server.with_recv_timeout(Some(Duration::from_millis(20)));

        let mut client = TcpRequestSocket::connect(addr).unwrap();
        assert!(matches!(server.recv_request(), Err(TransportError::Timeout)));
        assert!(server.is_connected());

        let handle = thread::spawn(move || client.request("EXIT").unwrap());
        let request = loop {
            match server.recv_request() {
                Ok(request) => break request,
                Err(TransportError::Timeout) => continue,
                Err(err) => panic!("unexpected error: {err}"),
            }
        };
        assert_eq!(request, "EXIT");
        server.send_reply("EXIT OK").unwrap();
        assert_eq!(handle.join().unwrap(), "EXIT OK");
    }
}
