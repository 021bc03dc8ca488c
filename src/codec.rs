use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::parser::{escapes_headers, parse_frame_slice};

/// Escape a STOMP header value for wire transmission.
///
/// - backslash (0x5c) → `\\`
/// - carriage return (0x0d) → `\r`
/// - line feed (0x0a) → `\n`
/// - colon (0x3a) → `\c`
pub fn escape_header_value(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\r' => result.push_str("\\r"),
            '\n' => result.push_str("\\n"),
            ':' => result.push_str("\\c"),
            _ => result.push(ch),
        }
    }
    result
}

/// Result of [`unmarshal`]: every complete frame, in wire order, plus the
/// bytes of a trailing frame that has not fully arrived yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unmarshalled {
    pub frames: Vec<Frame>,
    /// Leftover bytes to prefix onto the next delivery.
    pub partial: Vec<u8>,
}

/// Serialize `frame` into wire bytes, including the trailing NUL.
///
/// A `content-length` header carrying the body's byte count is appended for
/// non-empty bodies unless the frame already has one or asked for it to be
/// suppressed. Header values are escaped when `escape` is set and the command
/// is not CONNECT/CONNECTED.
pub fn marshal(frame: &Frame, escape: bool) -> Vec<u8> {
    let mut dst = BytesMut::with_capacity(frame.command.len() + frame.body.len() + 64);
    let escaped = escapes_headers(&frame.command, escape);

    dst.extend_from_slice(frame.command.as_bytes());
    dst.put_u8(b'\n');

    for (k, v) in &frame.headers {
        if frame.suppress_content_length && k == "content-length" {
            continue;
        }
        dst.extend_from_slice(k.as_bytes());
        dst.put_u8(b':');
        if escaped {
            dst.extend_from_slice(escape_header_value(v).as_bytes());
        } else {
            dst.extend_from_slice(v.as_bytes());
        }
        dst.put_u8(b'\n');
    }

    let has_cl = frame.headers.iter().any(|(k, _)| k == "content-length");
    if !frame.body.is_empty() && !has_cl && !frame.suppress_content_length {
        dst.extend_from_slice(format!("content-length:{}\n", frame.body.len()).as_bytes());
    }

    dst.put_u8(b'\n');
    dst.extend_from_slice(&frame.body);
    dst.put_u8(0);
    dst.to_vec()
}

/// Split `buffer` into frames.
///
/// Frames end with NUL and may be followed by any number of line-feeds; a
/// line-feed at a frame boundary is a heartbeat and yields nothing. A trailing
/// frame without its terminator is returned as `partial`; the caller feeds it
/// back in front of the next chunk it receives.
pub fn unmarshal(buffer: &[u8], escape: bool) -> Result<Unmarshalled, ProtocolError> {
    let mut out = Unmarshalled::default();
    let mut pos = 0usize;
    loop {
        while pos < buffer.len() && (buffer[pos] == b'\n' || buffer[pos] == b'\r') {
            pos += 1;
        }
        if pos >= buffer.len() {
            break;
        }
        match parse_frame_slice(&buffer[pos..], escape)? {
            Some((frame, consumed)) => {
                out.frames.push(frame);
                pos += consumed;
            }
            None => {
                out.partial = buffer[pos..].to_vec();
                break;
            }
        }
    }
    Ok(out)
}
