use thiserror::Error;

/// Malformed wire data found while decoding a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A NUL byte arrived before the blank line ending the header block.
    #[error("missing header/body divider in {0} frame")]
    MissingDivider(String),
    /// Header line without a `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
    /// `content-length` present but not a decimal byte count.
    #[error("invalid content-length '{0}'")]
    InvalidContentLength(String),
    /// The `content-length` bytes were not followed by NUL.
    #[error("missing NUL terminator after content-length body")]
    MissingTerminator,
    /// Backslash escape other than `\\`, `\r`, `\n`, `\c`.
    #[error("invalid escape sequence '\\{0}' in header value")]
    InvalidEscape(char),
    /// Header value ending with a lone backslash.
    #[error("incomplete escape sequence at end of header value")]
    IncompleteEscape,
    /// Buffered bytes of an unfinished inbound frame exceeded the limit.
    #[error("inbound frame exceeds {0} bytes")]
    FrameTooLarge(usize),
    /// Command or header bytes that are not UTF-8.
    #[error("invalid utf8 in {0}")]
    InvalidUtf8(&'static str),
}

/// Failures reported by a transport adapter.
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O-level error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The transport's writer is gone; nothing more can be sent.
    #[error("transport closed")]
    Closed,
    /// The URL could not be turned into a transport.
    #[error("unsupported transport url '{0}'")]
    UnsupportedUrl(String),
    /// WebSocket handshake or framing failure
    #[cfg(feature = "websocket")]
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Errors returned by `Client` operations.
#[derive(Error, Debug)]
pub enum StompError {
    /// Protocol-level error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// Transport-level error
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The call itself was invalid (missing credentials, empty destination).
    #[error("misuse: {0}")]
    Misuse(String),
    /// The background connection task has stopped.
    #[error("client task has shut down")]
    ClientClosed,
}
