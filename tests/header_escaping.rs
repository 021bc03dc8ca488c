//! Header escaping in the frame codec.
//!
//! Negotiated STOMP 1.2 sessions escape header values with:
//! - `\r` → carriage return (0x0d)
//! - `\n` → line feed (0x0a)
//! - `\c` → colon (0x3a)
//! - `\\` → backslash (0x5c)
//!
//! CONNECT and CONNECTED frames are never escaped, and 1.0/1.1 sessions pass
//! values through untouched.

use stomp_ws::{Frame, ProtocolError, marshal, unmarshal};

fn decode_one(raw: &[u8], escape: bool) -> Frame {
    let mut out = unmarshal(raw, escape).expect("decode failed");
    assert_eq!(out.frames.len(), 1, "expected exactly one frame");
    assert!(out.partial.is_empty());
    out.frames.remove(0)
}

// ============================================================================
// Unescape tests (parsing incoming frames)
// ============================================================================

#[test]
fn unescape_each_sequence() {
    let cases: [(&[u8], &str); 4] = [
        (b"MESSAGE\nheader:value\\\\with\\\\backslashes\n\n\0", "value\\with\\backslashes"),
        (b"MESSAGE\nheader:line1\\nline2\n\n\0", "line1\nline2"),
        (b"MESSAGE\nheader:before\\rafter\n\n\0", "before\rafter"),
        (b"MESSAGE\nheader:key\\cvalue\n\n\0", "key:value"),
    ];
    for (raw, expected) in cases {
        let frame = decode_one(raw, true);
        assert_eq!(frame.get_header("header"), Some(expected));
    }
}

#[test]
fn unescape_multiple_sequences() {
    let frame = decode_one(b"MESSAGE\nheader:a\\nb\\rc\\\\d\\ce\n\n\0", true);
    assert_eq!(frame.get_header("header"), Some("a\nb\rc\\d:e"));
}

#[test]
fn unescape_invalid_sequence() {
    let err = unmarshal(b"MESSAGE\nheader:bad\\xescape\n\n\0", true).unwrap_err();
    assert_eq!(err, ProtocolError::InvalidEscape('x'));
    assert!(err.to_string().contains("invalid escape"));
}

#[test]
fn unescape_incomplete_sequence() {
    let err = unmarshal(b"MESSAGE\nheader:trailing\\\n\n\0", true).unwrap_err();
    assert_eq!(err, ProtocolError::IncompleteEscape);
    assert!(err.to_string().contains("incomplete escape"));
}

#[test]
fn backslashes_are_literal_without_escaping() {
    let frame = decode_one(b"MESSAGE\nheader:bad\\xescape\\c\n\n\0", false);
    assert_eq!(frame.get_header("header"), Some("bad\\xescape\\c"));
}

#[test]
fn value_keeps_colons_after_the_first() {
    let frame = decode_one(b"MESSAGE\nheader:key:value\n\n\0", false);
    assert_eq!(frame.get_header("header"), Some("key:value"));
}

#[test]
fn connected_frame_is_never_unescaped() {
    let frame = decode_one(b"CONNECTED\nsession:a\\cb\n\n\0", true);
    assert_eq!(frame.get_header("session"), Some("a\\cb"));
}

// ============================================================================
// Escape tests (encoding outgoing frames)
// ============================================================================

fn encoded(frame: &Frame, escape: bool) -> String {
    String::from_utf8(marshal(frame, escape)).expect("utf8 frame")
}

#[test]
fn escape_each_character() {
    let cases = [
        ("path\\to\\file", "custom:path\\\\to\\\\file\n"),
        ("line1\nline2", "custom:line1\\nline2\n"),
        ("before\rafter", "custom:before\\rafter\n"),
        ("key:value", "custom:key\\cvalue\n"),
        ("a\nb\rc\\d:e", "custom:a\\nb\\rc\\\\d\\ce\n"),
    ];
    for (value, expected) in cases {
        let frame = Frame::new("SEND")
            .header("destination", "/queue/test")
            .header("custom", value);
        let out = encoded(&frame, true);
        assert!(out.contains(expected), "{:?} not in {:?}", expected, out);
    }
}

#[test]
fn escaping_off_writes_raw_values() {
    let frame = Frame::new("SEND").header("destination", "/queue/a:b");
    assert_eq!(encoded(&frame, false), "SEND\ndestination:/queue/a:b\n\n\0");
}

#[test]
fn connect_frame_is_never_escaped() {
    let frame = Frame::new("CONNECT").header("passcode", "p:w\\d");
    assert_eq!(encoded(&frame, true), "CONNECT\npasscode:p:w\\d\n\n\0");
}

// ============================================================================
// Round-trip tests (encode then decode)
// ============================================================================

#[test]
fn roundtrip_special_values() {
    let values = [
        "C:\\Users\\test\\file.txt",
        "first\nsecond\nthird",
        "line1\r\nline2",
        "http://example.com:8080/path",
        "path\\to\\file\nkey:value\r\nend",
        "",
        "\\\n\r:",
        "\n\n\n\\\\\\",
    ];
    for value in values {
        let original = Frame::new("SEND")
            .header("destination", "/queue/http://example.com:8080")
            .header("custom", value);
        let frame = decode_one(&marshal(&original, true), true);
        assert_eq!(frame.get_header("custom"), Some(value));
        assert_eq!(
            frame.get_header("destination"),
            Some("/queue/http://example.com:8080")
        );
    }
}

#[test]
fn no_escaping_needed() {
    let original = Frame::new("SEND")
        .header("destination", "/queue/test")
        .header("normal", "just-a-normal-value");
    let out = encoded(&original, true);
    assert!(out.contains("normal:just-a-normal-value"));
    assert!(!out.contains('\\'));
}
