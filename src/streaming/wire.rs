//! Length-prefixed JSON framing
//!
//! Every TCP message is a 4-byte big-endian length followed by a JSON
//! payload. Frames over 1 MB are rejected and the connection dropped.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Maximum accepted frame payload size
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Serialize and write one frame
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::InvalidFrame(format!(
            "outbound frame of {} bytes exceeds {} byte limit",
            payload.len(),
            MAX_FRAME_SIZE
        )));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame.
///
/// Returns `Ok(None)` on a read timeout before any byte of the frame has
/// arrived, so callers can poll shutdown flags between frames. Once the
/// length prefix has started, the read persists across timeouts until the
/// frame is complete; bailing out mid-prefix would leave the stream
/// desynchronized for every frame after.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>> {
    let mut len_bytes = [0u8; 4];
    let filled = match reader.read(&mut len_bytes) {
        Ok(0) => {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            )))
        }
        Ok(n) => n,
        Err(e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            return Ok(None);
        }
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => 0,
        Err(e) => return Err(Error::Io(e)),
    };
    read_full(reader, &mut len_bytes, filled)?;

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::InvalidFrame(format!(
            "inbound frame of {} bytes exceeds {} byte limit",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; len];
    read_full(reader, &mut payload, 0)?;
    let message = serde_json::from_slice(&payload)?;
    Ok(Some(message))
}

/// Fill the rest of `buf` starting at `filled`, retrying across timeouts
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8], mut filled: usize) -> Result<()> {
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed mid-frame",
                )))
            }
            Ok(n) => filled += n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::messages::{TuningCommand, TuningReply};
    use std::io::Cursor;

    #[test]
    fn test_frame_round_trip() {
        let command = TuningCommand::UpdateParams {
            kp: Some(5.5),
            ki: None,
            kd: Some(1.25),
            alpha: None,
            target_angle: Some(-0.5),
        };

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &command).unwrap();

        let mut cursor = Cursor::new(buffer);
        let decoded: TuningCommand = read_frame(&mut cursor).unwrap().unwrap();
        match decoded {
            TuningCommand::UpdateParams { kp, kd, target_angle, .. } => {
                assert_eq!(kp, Some(5.5));
                assert_eq!(kd, Some(1.25));
                assert_eq!(target_angle, Some(-0.5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&(MAX_FRAME_SIZE as u32 + 1).to_be_bytes());
        buffer.extend_from_slice(&[0u8; 16]);

        let mut cursor = Cursor::new(buffer);
        let result: Result<Option<TuningReply>> = read_frame(&mut cursor);
        assert!(matches!(result, Err(Error::InvalidFrame(_))));
    }

    /// Delivers one byte per read, stalling with a timeout between bytes
    struct IntermittentReader {
        data: Vec<u8>,
        pos: usize,
        stall: bool,
    }

    impl IntermittentReader {
        fn new(data: Vec<u8>, stall_first: bool) -> Self {
            Self {
                data,
                pos: 0,
                stall: stall_first,
            }
        }
    }

    impl Read for IntermittentReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.stall {
                self.stall = false;
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WouldBlock,
                    "timed out",
                ));
            }
            self.stall = true;
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_frame_survives_timeouts_mid_prefix() {
        let reply = TuningReply::ok("trickled");
        let mut framed = Vec::new();
        write_frame(&mut framed, &reply).unwrap();

        // Every other read times out, including inside the length prefix;
        // the frame must still come out whole
        let mut reader = IntermittentReader::new(framed, false);
        let decoded: TuningReply = read_frame(&mut reader).unwrap().unwrap();
        match decoded {
            TuningReply::Ack { ok, message } => {
                assert!(ok);
                assert_eq!(message, "trickled");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_idle_timeout_consumes_nothing() {
        let reply = TuningReply::ok("later");
        let mut framed = Vec::new();
        write_frame(&mut framed, &reply).unwrap();

        // Timeout before the first byte is the idle poll case; a retry
        // must then read the untouched frame
        let mut reader = IntermittentReader::new(framed, true);
        let first: Option<TuningReply> = read_frame(&mut reader).unwrap();
        assert!(first.is_none());
        let second: TuningReply = read_frame(&mut reader).unwrap().unwrap();
        assert!(matches!(second, TuningReply::Ack { ok: true, .. }));
    }

    #[test]
    fn test_reply_round_trip() {
        let reply = TuningReply::ok("applied");
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &reply).unwrap();

        let mut cursor = Cursor::new(buffer);
        let decoded: TuningReply = read_frame(&mut cursor).unwrap().unwrap();
        match decoded {
            TuningReply::Ack { ok, message } => {
                assert!(ok);
                assert_eq!(message, "applied");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }
}
