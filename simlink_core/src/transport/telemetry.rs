// simlink_core/src/transport/telemetry.rs

//! Fire-and-forget telemetry fan-out.
//!
//! Every message is three frames: `[id: i32 LE][title: UTF-8][payload]`.
//! Numeric payloads are little-endian; string lists are joined with `|`.
//! Subscribers that fall behind or hang up are dropped.

use super::frame::{self, map_io, DEFAULT_MAX_FRAME_LEN};
use crate::error::TransportError;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const STRING_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    Int(i32),
    Float(f32),
    Double(f64),
    Bool(bool),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Strings(Vec<String>),
}

impl TelemetryValue {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TelemetryValue::Int(v) => v.to_le_bytes().to_vec(),
            TelemetryValue::Float(v) => v.to_le_bytes().to_vec(),
            TelemetryValue::Double(v) => v.to_le_bytes().to_vec(),
            TelemetryValue::Bool(v) => vec![u8::from(*v)],
            TelemetryValue::Ints(vs) => vs.iter().flat_map(|v| v.to_le_bytes()).collect(),
            TelemetryValue::Floats(vs) => vs.iter().flat_map(|v| v.to_le_bytes()).collect(),
            TelemetryValue::Doubles(vs) => vs.iter().flat_map(|v| v.to_le_bytes()).collect(),
            TelemetryValue::Strings(vs) => vs.join(&STRING_SEPARATOR.to_string()).into_bytes(),
        }
    }
}

/// One received telemetry message.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    pub id: i32,
    pub title: String,
    pub payload: Vec<u8>,
}

impl TelemetryMessage {
    pub fn as_f64s(&self) -> Vec<f64> {
        self.payload
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect()
    }

    pub fn as_f32s(&self) -> Vec<f32> {
        self.payload
            .chunks_exact(4)
            .map(|chunk| {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(chunk);
                f32::from_le_bytes(bytes)
            })
            .collect()
    }

    pub fn as_strings(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.payload)
            .split(STRING_SEPARATOR)
            .map(str::to_string)
            .collect()
    }
}

pub struct TelemetryPublisher {
    listener: TcpListener,
    subscribers: Vec<TcpStream>,
    write_timeout: Duration,
}

impl TelemetryPublisher {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!("Telemetry publisher bound to {}", listener.local_addr()?);
        Ok(Self {
            listener,
            subscribers: Vec::new(),
            write_timeout: Duration::from_millis(100),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Picks up any subscribers waiting on the listener. Never blocks.
    pub fn accept_pending(&mut self) -> usize {
        let mut accepted = 0;
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let configured = stream
                        .set_nonblocking(false)
                        .and_then(|_| stream.set_write_timeout(Some(self.write_timeout)))
                        .and_then(|_| stream.set_nodelay(true));
                    match configured {
                        Ok(()) => {
                            info!("Telemetry subscriber connected from {}", peer);
                            self.subscribers.push(stream);
                            accepted += 1;
                        }
                        Err(err) => warn!("Rejecting telemetry subscriber {}: {}", peer, err),
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!("Telemetry accept failed: {}", err);
                    break;
                }
            }
        }
        accepted
    }

    /// Sends one message to every subscriber. Returns how many received it.
    pub fn publish(&mut self, id: i32, title: &str, value: &TelemetryValue) -> usize {
        self.accept_pending();

        let id_bytes = id.to_le_bytes();
        let payload = value.encode();
        let frames: [&[u8]; 3] = [&id_bytes, title.as_bytes(), &payload];

        self.subscribers.retain_mut(|stream| match frame::write_message(stream, &frames) {
            Ok(()) => true,
            Err(err) => {
                warn!("Dropping telemetry subscriber: {}", err);
                false
            }
        });
        debug!("Published '{}' (id {}) to {} subscribers", title, id, self.subscribers.len());
        self.subscribers.len()
    }
}

pub struct TelemetrySubscriber {
    stream: TcpStream,
}

impl TelemetrySubscriber {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).map_err(map_io)?;
        Ok(Self { stream })
    }

    pub fn with_timeout(self, timeout: Option<Duration>) -> Result<Self, TransportError> {
        self.stream.set_read_timeout(timeout)?;
        Ok(self)
    }

    pub fn recv(&mut self) -> Result<TelemetryMessage, TransportError> {
        let frames = frame::read_message(&mut self.stream, DEFAULT_MAX_FRAME_LEN)?;
        let [id, title, payload]: [Vec<u8>; 3] = frames
            .try_into()
            .map_err(|_| TransportError::OutOfOrder("telemetry message must have three frames"))?;

        let id_bytes: [u8; 4] = id
            .as_slice()
            .try_into()
            .map_err(|_| TransportError::OutOfOrder("telemetry id must be four bytes"))?;
        let title = String::from_utf8(title).map_err(|_| TransportError::InvalidUtf8)?;

        Ok(TelemetryMessage {
            id: i32::from_le_bytes(id_bytes),
            title,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_value_encoding() {
        assert_eq!(TelemetryValue::Int(-2).encode(), (-2i32).to_le_bytes());
        assert_eq!(TelemetryValue::Bool(true).encode(), vec![1]);
        assert_eq!(TelemetryValue::Floats(vec![1.0, 2.0]).encode().len(), 8);
        assert_eq!(
            TelemetryValue::Strings(vec!["girona".into(), "ds".into()]).encode(),
            b"girona|ds"
        );
    }

    #[test]
    fn test_publish_to_subscriber() {
        let mut publisher = TelemetryPublisher::bind("127.0.0.1:0").unwrap();
        let addr = publisher.local_addr().unwrap();
        let mut subscriber = TelemetrySubscriber::connect(addr)
            .unwrap()
            .with_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while publisher.subscriber_count() == 0 && Instant::now() < deadline {
            publisher.accept_pending();
            thread::sleep(Duration::from_millis(5));
        }

        let delivered = publisher.publish(3, "girona/pose", &TelemetryValue::Doubles(vec![1.0, -2.0, 0.5]));
        assert_eq!(delivered, 1);

        let message = subscriber.recv().unwrap();
        assert_eq!(message.id, 3);
        assert_eq!(message.title, "girona/pose");
        assert_eq!(message.as_f64s(), vec![1.0, -2.0, 0.5]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let mut publisher = TelemetryPublisher::bind("127.0.0.1:0").unwrap();
        assert_eq!(publisher.publish(0, "nobody", &TelemetryValue::Int(1)), 0);
    }
}
