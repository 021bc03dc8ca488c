//! Unit tests for the Frame struct and the protocol version helpers.

use stomp_ws::{Frame, ServerCommand, Version};

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn frame_new_creates_empty() {
    let frame = Frame::new("SEND");
    assert_eq!(frame.command, "SEND");
    assert!(frame.headers.is_empty());
    assert!(frame.body.is_empty());
    assert!(!frame.suppress_content_length);
}

#[test]
fn frame_new_with_string() {
    let frame = Frame::new(String::from("MESSAGE"));
    assert_eq!(frame.command, "MESSAGE");
}

// =============================================================================
// Builder Pattern Tests
// =============================================================================

#[test]
fn frame_header_preserves_order() {
    let frame = Frame::new("SEND")
        .header("z-header", "z")
        .header("a-header", "a")
        .header("m-header", "m");
    let names: Vec<&str> = frame.headers.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, ["z-header", "a-header", "m-header"]);
}

#[test]
fn frame_header_replaces_in_place() {
    let frame = Frame::new("SEND")
        .header("custom", "first")
        .header("destination", "/queue/a")
        .header("custom", "second");
    assert_eq!(
        frame.headers,
        vec![
            ("custom".to_string(), "second".to_string()),
            ("destination".to_string(), "/queue/a".to_string()),
        ]
    );
}

#[test]
fn frame_headers_from_iterator() {
    let frame = Frame::new("SUBSCRIBE")
        .headers(vec![("ack", "client"), ("id", "s1")])
        .header("id", "s2");
    assert_eq!(frame.get_header("ack"), Some("client"));
    assert_eq!(frame.get_header("id"), Some("s2"));
    assert_eq!(frame.headers.len(), 2);
}

#[test]
fn frame_set_header_mutates() {
    let mut frame = Frame::new("SEND");
    frame.set_header("destination", "/queue/a");
    frame.set_header("destination", "/queue/b");
    assert_eq!(frame.get_header("destination"), Some("/queue/b"));
}

#[test]
fn frame_set_body_from_str_and_bytes() {
    assert_eq!(Frame::new("SEND").set_body("hello").body, b"hello");
    assert_eq!(Frame::new("SEND").set_body(vec![1, 2, 3]).body, vec![1, 2, 3]);
}

#[test]
fn frame_receipt_adds_header() {
    let frame = Frame::new("SEND")
        .header("destination", "/queue/test")
        .receipt("receipt-123");
    assert_eq!(frame.get_header("receipt"), Some("receipt-123"));
    assert_eq!(frame.headers.len(), 2);
}

#[test]
fn frame_without_content_length_sets_flag() {
    let frame = Frame::new("SEND").set_body("x").without_content_length();
    assert!(frame.suppress_content_length);
}

#[test]
fn frame_get_header_is_case_sensitive() {
    let frame = Frame::new("MESSAGE").header("Destination", "/queue/a");
    assert_eq!(frame.get_header("destination"), None);
    assert_eq!(frame.get_header("Destination"), Some("/queue/a"));
}

#[test]
fn frame_body_text_is_lossy() {
    let frame = Frame::new("MESSAGE").set_body(vec![b'h', b'i', 0xff]);
    assert_eq!(frame.body_text(), "hi\u{fffd}");
}

// =============================================================================
// Display Trait Tests
// =============================================================================

#[test]
fn frame_display() {
    let frame = Frame::new("SEND")
        .header("destination", "/queue/test")
        .header("content-type", "text/plain")
        .set_body(b"hello".to_vec());
    let display = format!("{}", frame);
    assert!(display.contains("Command: SEND"));
    assert!(display.contains("destination: /queue/test"));
    assert!(display.contains("content-type: text/plain"));
    assert!(display.contains("Body (5 bytes)"));
}

// =============================================================================
// ServerCommand Tests
// =============================================================================

#[test]
fn server_command_from_frame() {
    assert_eq!(Frame::new("CONNECTED").server_command(), ServerCommand::Connected);
    assert_eq!(Frame::new("MESSAGE").server_command(), ServerCommand::Message);
    assert_eq!(Frame::new("RECEIPT").server_command(), ServerCommand::Receipt);
    assert_eq!(Frame::new("ERROR").server_command(), ServerCommand::Error);
    assert_eq!(
        Frame::new("message").server_command(),
        ServerCommand::Unknown("message".to_string())
    );
}

// =============================================================================
// Version Tests
// =============================================================================

#[test]
fn version_parse_and_display() {
    assert_eq!(Version::parse("1.0"), Some(Version::V1_0));
    assert_eq!(Version::parse("1.1"), Some(Version::V1_1));
    assert_eq!(Version::parse(" 1.2 "), Some(Version::V1_2));
    assert_eq!(Version::parse("2.0"), None);
    assert_eq!(Version::V1_2.to_string(), "1.2");
    assert_eq!(Version::default(), Version::V1_0);
}

#[test]
fn version_ack_headers() {
    assert_eq!(Version::V1_2.message_ack_header(), "ack");
    assert_eq!(Version::V1_2.ack_id_header(), "id");
    for v in [Version::V1_0, Version::V1_1] {
        assert_eq!(v.message_ack_header(), "message-id");
        assert_eq!(v.ack_id_header(), "message-id");
    }
}

#[test]
fn version_capabilities() {
    assert!(!Version::V1_0.supports_heartbeats());
    assert!(Version::V1_1.supports_heartbeats());
    assert!(Version::V1_2.supports_heartbeats());
    assert!(!Version::V1_1.escapes_headers());
    assert!(Version::V1_2.escapes_headers());
    assert_eq!(Version::SUPPORTED, "1.2,1.1,1.0");
}
