// Slice-based STOMP frame parser (produces owned frames from input slices)
use crate::error::ProtocolError;
use crate::frame::Frame;

/// Whether header values of `command` go through STOMP escaping.
///
/// CONNECT and CONNECTED always carry raw values.
pub fn escapes_headers(command: &str, escape: bool) -> bool {
    escape && command != "CONNECT" && command != "CONNECTED"
}

/// Reverse the STOMP header escaping (`\\`, `\r`, `\n`, `\c`).
pub fn unescape_header_value(input: &str) -> Result<String, ProtocolError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(other) => return Err(ProtocolError::InvalidEscape(other)),
            None => return Err(ProtocolError::IncompleteEscape),
        }
    }
    Ok(out)
}

/// Find the next line ending at or after `pos`.
///
/// Returns Ok(Some(index of LF)) when a full line is present, Ok(None) when
/// more bytes are required, and an error when a NUL shows up first: the frame
/// ended without ever reaching its blank divider line.
fn line_end(input: &[u8], pos: usize, command: &str) -> Result<Option<usize>, ProtocolError> {
    match input[pos..].iter().position(|&b| b == b'\n' || b == 0) {
        Some(rel) if input[pos + rel] == 0 => {
            Err(ProtocolError::MissingDivider(command.to_string()))
        }
        Some(rel) => Ok(Some(pos + rel)),
        None => Ok(None),
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((b'\r', rest)) => rest,
        _ => line,
    }
}

fn content_length(headers: &[(String, String)]) -> Result<Option<usize>, ProtocolError> {
    match headers.iter().find(|(k, _)| k == "content-length") {
        Some((_, v)) => v
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ProtocolError::InvalidContentLength(v.clone())),
        None => Ok(None),
    }
}

/// Parse a single STOMP frame from the start of `input`.
///
/// `input` must begin at a command line (heartbeat line-feeds already
/// skipped). Returns Ok(Some((frame, consumed_bytes))) when a full frame,
/// including its NUL terminator, is present; Ok(None) when more bytes are
/// required; Err on protocol errors.
///
/// When a header name repeats, the topmost occurrence is kept.
pub fn parse_frame_slice(input: &[u8], escape: bool) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(cmd_end) = line_end(input, 0, "")? else {
        return Ok(None);
    };
    let command = std::str::from_utf8(strip_cr(&input[..cmd_end]))
        .map_err(|_| ProtocolError::InvalidUtf8("command"))?
        .to_string();
    let unescape = escapes_headers(&command, escape);
    let mut pos = cmd_end + 1;

    // headers until an empty line
    let mut headers: Vec<(String, String)> = Vec::new();
    loop {
        if pos >= input.len() {
            return Ok(None);
        }
        let Some(end) = line_end(input, pos, &command)? else {
            return Ok(None);
        };
        let line = strip_cr(&input[pos..end]);
        pos = end + 1;
        if line.is_empty() {
            break;
        }
        let line = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8("header"))?;
        let Some((name, value)) = line.split_once(':') else {
            return Err(ProtocolError::MalformedHeader(line.to_string()));
        };
        if headers.iter().any(|(k, _)| k == name) {
            continue;
        }
        let value = if unescape {
            unescape_header_value(value)?
        } else {
            value.to_string()
        };
        headers.push((name.to_string(), value));
    }

    let (body, consumed) = match content_length(&headers)? {
        Some(len) => {
            let end = pos
                .checked_add(len)
                .ok_or_else(|| ProtocolError::InvalidContentLength(len.to_string()))?;
            if end >= input.len() {
                return Ok(None);
            }
            if input[end] != 0 {
                return Err(ProtocolError::MissingTerminator);
            }
            (input[pos..end].to_vec(), end + 1)
        }
        None => match input[pos..].iter().position(|&b| b == 0) {
            Some(rel) => (input[pos..pos + rel].to_vec(), pos + rel + 1),
            None => return Ok(None),
        },
    };

    let frame = Frame {
        command,
        headers,
        body,
        suppress_content_length: false,
    };
    Ok(Some((frame, consumed)))
}
