use std::fmt;

/// A simple representation of a STOMP frame.
///
/// `Frame` contains the command (e.g. "SEND", "MESSAGE"), an ordered list
/// of headers (key/value pairs) and the raw body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// STOMP command (e.g. CONNECT, SEND, SUBSCRIBE)
    pub command: String,
    /// Ordered headers as (key, value) pairs
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
    /// When set, the encoder does not add a `content-length` header.
    pub suppress_content_length: bool,
}

/// Commands a broker may send to a client.
///
/// Produced once from a decoded frame so the connection can match on it
/// exhaustively instead of comparing strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Connected,
    Message,
    Receipt,
    Error,
    /// Anything else, carrying the raw command name.
    Unknown(String),
}

impl From<&str> for ServerCommand {
    fn from(command: &str) -> Self {
        match command {
            "CONNECTED" => ServerCommand::Connected,
            "MESSAGE" => ServerCommand::Message,
            "RECEIPT" => ServerCommand::Receipt,
            "ERROR" => ServerCommand::Error,
            other => ServerCommand::Unknown(other.to_string()),
        }
    }
}

/// STOMP protocol versions this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Version {
    #[default]
    V1_0,
    V1_1,
    V1_2,
}

impl Version {
    /// `accept-version` value sent in CONNECT, most preferred first.
    pub const SUPPORTED: &'static str = "1.2,1.1,1.0";

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "1.0" => Some(Version::V1_0),
            "1.1" => Some(Version::V1_1),
            "1.2" => Some(Version::V1_2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1_0 => "1.0",
            Version::V1_1 => "1.1",
            Version::V1_2 => "1.2",
        }
    }

    /// Header naming the message in MESSAGE frames: `ack` in 1.2,
    /// `message-id` before.
    pub fn message_ack_header(&self) -> &'static str {
        match self {
            Version::V1_2 => "ack",
            _ => "message-id",
        }
    }

    /// Header naming the message in ACK/NACK frames: `id` in 1.2,
    /// `message-id` before.
    pub fn ack_id_header(&self) -> &'static str {
        match self {
            Version::V1_2 => "id",
            _ => "message-id",
        }
    }

    /// Header values are escaped from 1.2 on.
    pub fn escapes_headers(&self) -> bool {
        *self == Version::V1_2
    }

    /// Heartbeats exist from 1.1 on.
    pub fn supports_heartbeats(&self) -> bool {
        *self >= Version::V1_1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Frame {
    /// Create a new frame with the given command and empty headers/body.
    ///
    /// Parameters
    /// - `command`: the STOMP command name (for example, `"SEND"` or
    ///   `"SUBSCRIBE"`). Accepts any type convertible into `String`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: Vec::new(),
            suppress_content_length: false,
        }
    }

    /// Add a header (builder style).
    ///
    /// If a header with the same name already exists its value is replaced
    /// in place, so header names stay unique and keep their first position.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Append several headers (builder style), with the same replacement
    /// rule as [`Frame::header`].
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in headers {
            self.set_header(k, v);
        }
        self
    }

    /// Set the frame body (builder style).
    pub fn set_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Ask the encoder not to emit `content-length` (builder style).
    pub fn without_content_length(mut self) -> Self {
        self.suppress_content_length = true;
        self
    }

    /// Add a `receipt` header requesting a RECEIPT from the broker.
    pub fn receipt(self, id: impl Into<String>) -> Self {
        self.header("receipt", id)
    }

    /// Insert or replace a header value in place.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Get the value of a header by name.
    ///
    /// Returns the first header value matching the given key (case-sensitive),
    /// or `None` if no such header exists.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The command as a [`ServerCommand`].
    pub fn server_command(&self) -> ServerCommand {
        ServerCommand::from(self.command.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Command: {}", self.command)?;
        for (k, v) in &self.headers {
            writeln!(f, "{}: {}", k, v)?;
        }
        writeln!(f, "Body ({} bytes)", self.body.len())
    }
}
