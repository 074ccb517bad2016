// simlink_core/src/transport/frame.rs

//! Length-prefixed framing shared by every TCP channel.
//!
//! Each physical frame is `[len: u64 LE][flags: u8][payload; len]`. Flag
//! bit 0 says another frame of the same logical message follows.

use crate::error::TransportError;
use std::io::{self, ErrorKind, Read, Write};

pub const LENGTH_BYTES: usize = 8;
pub const HEADER_BYTES: usize = LENGTH_BYTES + 1;
pub const FLAG_MORE: u8 = 0b0000_0001;
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;
/// Most frames one logical message may carry.
pub const MAX_MESSAGE_FRAMES: usize = 16;

pub(crate) fn map_io(err: io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout,
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => TransportError::Disconnected,
        _ => TransportError::Io(err),
    }
}

/// Fills `buf`. A timeout before the first byte is reported as
/// [`TransportError::Timeout`] when `idle_timeout_ok` is set; once a frame
/// has started, timeouts are retried so the stream never desyncs.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8], idle_timeout_ok: bool) -> Result<(), TransportError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(TransportError::Disconnected),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                if filled == 0 && idle_timeout_ok {
                    return Err(TransportError::Timeout);
                }
            }
            Err(err) => return Err(map_io(err)),
        }
    }
    Ok(())
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8], more: bool) -> Result<(), TransportError> {
    let mut header = [0u8; HEADER_BYTES];
    header[..LENGTH_BYTES].copy_from_slice(&(payload.len() as u64).to_le_bytes());
    header[LENGTH_BYTES] = if more { FLAG_MORE } else { 0 };

    writer.write_all(&header).map_err(map_io)?;
    writer.write_all(payload).map_err(map_io)?;
    Ok(())
}

/// Reads one frame, returning its payload and whether more frames follow.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<(Vec<u8>, bool), TransportError> {
    read_frame_inner(reader, max_len, true)
}

fn read_frame_inner<R: Read>(
    reader: &mut R,
    max_len: usize,
    idle_timeout_ok: bool,
) -> Result<(Vec<u8>, bool), TransportError> {
    let mut header = [0u8; HEADER_BYTES];
    read_full(reader, &mut header, idle_timeout_ok)?;

    let mut length_bytes = [0u8; LENGTH_BYTES];
    length_bytes.copy_from_slice(&header[..LENGTH_BYTES]);
    let length = u64::from_le_bytes(length_bytes);
    let length = usize::try_from(length).unwrap_or(usize::MAX);
    if length > max_len {
        return Err(TransportError::FrameTooLarge { length, max: max_len });
    }

    let mut payload = vec![0u8; length];
    read_full(reader, &mut payload, false)?;
    Ok((payload, header[LENGTH_BYTES] & FLAG_MORE != 0))
}

/// Writes a logical message as a run of frames. An empty slice writes a
/// single empty frame.
pub fn write_message<W: Write>(writer: &mut W, frames: &[&[u8]]) -> Result<(), TransportError> {
    if frames.is_empty() {
        write_frame(writer, &[], false)?;
    } else {
        let last = frames.len() - 1;
        for (index, frame) in frames.iter().enumerate() {
            write_frame(writer, frame, index < last)?;
        }
    }
    writer.flush().map_err(map_io)
}

/// Reads every frame of one logical message. `max_len` bounds the summed
/// payload of all frames, and at most [`MAX_MESSAGE_FRAMES`] are accepted.
pub fn read_message<R: Read>(reader: &mut R, max_len: usize) -> Result<Vec<Vec<u8>>, TransportError> {
    let mut frames: Vec<Vec<u8>> = Vec::new();
    let mut total = 0usize;
    loop {
        if frames.len() == MAX_MESSAGE_FRAMES {
            return Err(TransportError::TooManyFrames { max: MAX_MESSAGE_FRAMES });
        }
        let budget = max_len - total;
        let (frame, more) = match read_frame_inner(reader, budget, frames.is_empty()) {
            Ok(read) => read,
            Err(TransportError::FrameTooLarge { length, .. }) => {
                return Err(TransportError::FrameTooLarge {
                    length: total.saturating_add(length),
                    max: max_len,
                });
            }
            Err(err) => return Err(err),
        };
        total += frame.len();
        frames.push(frame);
        if !more {
            return Ok(frames);
        }
    }
}

/// Reads a single-frame text message. Extra frames are appended.
pub fn read_text<R: Read>(reader: &mut R, max_len: usize) -> Result<String, TransportError> {
    let bytes = read_message(reader, max_len)?.concat();
    String::from_utf8(bytes).map_err(|_| TransportError::InvalidUtf8)
}

pub fn write_text<W: Write>(writer: &mut W, text: &str) -> Result<(), TransportError> {
    write_message(writer, &[text.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"EXIT", true).unwrap();
        assert_eq!(&wire[..8], &4u64.to_le_bytes());
        assert_eq!(wire[8], FLAG_MORE);
        assert_eq!(&wire[9..], b"EXIT");
    }

    #[test]
    fn test_multipart_message() {
        let mut wire = Vec::new();
        write_message(&mut wire, &[&7i32.to_le_bytes(), b"depth", &2.5f64.to_le_bytes()]).unwrap();

        let frames = read_message(&mut Cursor::new(wire), DEFAULT_MAX_FRAME_LEN).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], b"depth");
        assert_eq!(frames[2], 2.5f64.to_le_bytes());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut wire = Vec::new();
        write_frame(&mut wire, &[0u8; 64], false).unwrap();
        let err = read_frame(&mut Cursor::new(wire), 16).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { length: 64, max: 16 }));
    }

    #[test]
    fn test_truncated_stream_is_disconnect() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"RESET:{}", false).unwrap();
        wire.truncate(12);
        assert!(matches!(
            read_frame(&mut Cursor::new(wire), DEFAULT_MAX_FRAME_LEN),
            Err(TransportError::Disconnected)
        ));
        assert!(matches!(
            read_frame(&mut Cursor::new(Vec::new()), DEFAULT_MAX_FRAME_LEN),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn test_message_size_is_bounded_across_frames() {
        let mut wire = Vec::new();
        for _ in 0..4 {
            write_frame(&mut wire, &[b'a'; 10], true).unwrap();
        }
        write_frame(&mut wire, &[b'a'; 10], false).unwrap();

        // Every frame fits on its own; together they do not.
        let err = read_message(&mut Cursor::new(wire.clone()), 32).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { length: 40, max: 32 }));
        assert_eq!(read_message(&mut Cursor::new(wire), 50).unwrap().len(), 5);
    }

    #[test]
    fn test_frame_count_is_bounded() {
        let mut wire = Vec::new();
        for _ in 0..MAX_MESSAGE_FRAMES + 8 {
            write_frame(&mut wire, b"", true).unwrap();
        }
        write_frame(&mut wire, b"", false).unwrap();

        assert!(matches!(
            read_text(&mut Cursor::new(wire), DEFAULT_MAX_FRAME_LEN),
            Err(TransportError::TooManyFrames { max: MAX_MESSAGE_FRAMES })
        ));
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        let mut wire = Vec::new();
        write_message(&mut wire, &[&[0xff, 0xfe]]).unwrap();
        assert!(matches!(
            read_text(&mut Cursor::new(wire), DEFAULT_MAX_FRAME_LEN),
            Err(TransportError::InvalidUtf8)
        ));
    }
}
