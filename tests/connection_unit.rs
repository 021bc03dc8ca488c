//! Unit tests for the public error and event types.
//!
//! Connection behaviour itself is covered by the inline tests in
//! connection.rs and by client_lifecycle.rs.

use std::io;

use stomp_ws::{CloseEvent, ErrorEvent, Frame, Phase, ProtocolError, StompError, TransportError};

// =============================================================================
// ErrorEvent Tests
// =============================================================================

#[test]
fn error_event_frame_display_uses_message_header() {
    let frame = Frame::new("ERROR")
        .header("message", "malformed frame received")
        .set_body("The message:\n-----\nMESSAGE\n");
    let event = ErrorEvent::Frame(frame);
    let display = event.to_string();
    assert!(display.starts_with("malformed frame received: The message:"));
}

#[test]
fn error_event_frame_display_without_message() {
    let event = ErrorEvent::Frame(Frame::new("ERROR"));
    assert_eq!(event.to_string(), "ERROR frame");
}

#[test]
fn error_event_connection_lost_display() {
    let event = ErrorEvent::ConnectionLost("lost connection to ws://broker".into());
    assert_eq!(event.to_string(), "lost connection to ws://broker");
}

#[test]
fn error_event_protocol_display() {
    let event = ErrorEvent::Protocol(ProtocolError::MissingTerminator);
    assert!(event.to_string().contains("NUL terminator"));
}

// =============================================================================
// StompError Tests
// =============================================================================

#[test]
fn stomp_error_io_display() {
    let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
    let err: StompError = TransportError::from(io_err).into();
    let display = format!("{}", err);
    assert!(display.contains("io error"));
    assert!(display.contains("connection refused"));
}

#[test]
fn stomp_error_protocol_from() {
    let err: StompError = ProtocolError::InvalidEscape('x').into();
    assert!(matches!(err, StompError::Protocol(ProtocolError::InvalidEscape('x'))));
    assert!(err.to_string().contains("protocol error"));
}

#[test]
fn stomp_error_misuse_display() {
    let err = StompError::Misuse("destination must not be empty".into());
    assert_eq!(err.to_string(), "misuse: destination must not be empty");
}

#[test]
fn errors_implement_error_trait() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
    assert_error::<StompError>();
    assert_error::<TransportError>();
    assert_error::<ProtocolError>();
}

// =============================================================================
// CloseEvent / Phase Tests
// =============================================================================

#[test]
fn close_event_constructors() {
    assert!(CloseEvent::normal().was_clean);
    assert!(!CloseEvent::remote().was_clean);
    let err = CloseEvent::error("connection reset");
    assert!(!err.was_clean);
    assert!(err.reason.contains("connection reset"));
}

#[test]
fn phase_is_copy_and_comparable() {
    let phase = Phase::Connected;
    let copied = phase;
    assert_eq!(phase, copied);
    assert_ne!(Phase::Idle, Phase::Closed);
}
