use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::connection::ErrorEvent;
use crate::error::StompError;
use crate::frame::Frame;
use crate::heartbeat::Heartbeat;
use crate::subscription::Message;
use crate::transport::CloseEvent;

/// Receives every diagnostic line the client produces.
pub type DebugHook = Arc<dyn Fn(&str) + Send + Sync>;
/// Called with the CONNECTED frame once the handshake completes.
pub type ConnectCallback = Box<dyn FnMut(&Frame) + Send>;
/// Called with ERROR frames and connection failures.
pub type ErrorCallback = Box<dyn FnMut(ErrorEvent) + Send>;
/// Called when the transport closes.
pub type CloseCallback = Box<dyn FnMut(&CloseEvent) + Send>;
/// Called for RECEIPT frames that do not complete a disconnect.
pub type ReceiptCallback = Box<dyn FnMut(&Frame) + Send>;
/// Called for each MESSAGE delivered to a subscription.
pub type MessageCallback = Box<dyn FnMut(Message) + Send>;
/// Called once a disconnect has completed.
pub type DisconnectCallback = Box<dyn FnOnce() + Send>;

/// Client-wide settings, fixed for the lifetime of a `Client`.
#[derive(Clone)]
pub struct Config {
    /// Heartbeat intervals offered in CONNECT.
    pub heartbeat: Heartbeat,
    /// Delay before reopening the transport after it closed while the
    /// client still wants to be connected. Zero disables reconnection.
    pub reconnect_delay: Duration,
    /// Serialized frames longer than this are written in chunks of at most
    /// this many bytes. Zero disables chunking.
    pub max_frame_size: usize,
    /// Upper bound on the bytes held for a partially received frame. A
    /// broker exceeding it is treated as a protocol error. Zero means no
    /// bound.
    pub max_inbound_size: usize,
    /// Optional hook receiving diagnostic lines in addition to `tracing`.
    pub debug: Option<DebugHook>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat: Heartbeat::default(),
            reconnect_delay: Duration::ZERO,
            max_frame_size: 16 * 1024,
            max_inbound_size: 16 * 1024 * 1024,
            debug: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set outgoing/incoming heartbeat intervals in milliseconds.
    pub fn with_heartbeat(mut self, outgoing: u64, incoming: u64) -> Self {
        self.heartbeat = Heartbeat::new(outgoing, incoming);
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    pub fn with_max_inbound_size(mut self, bytes: usize) -> Self {
        self.max_inbound_size = bytes;
        self
    }

    pub fn with_debug<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.debug = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("heartbeat", &self.heartbeat)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("max_frame_size", &self.max_frame_size)
            .field("max_inbound_size", &self.max_inbound_size)
            .field("debug", &self.debug.is_some())
            .finish()
    }
}

/// Everything `Client::connect` needs: CONNECT headers and the lifecycle
/// callbacks.
///
/// ```ignore
/// let opts = ConnectOptions::default()
///     .login("guest", "guest")
///     .host("/")
///     .on_connect(|frame| println!("connected: {:?}", frame.get_header("version")))
///     .on_error(|err| eprintln!("stomp error: {}", err));
/// client.connect(opts)?;
/// ```
#[derive(Default)]
pub struct ConnectOptions {
    /// `login` header
    pub login: Option<String>,
    /// `passcode` header
    pub passcode: Option<String>,
    /// `host` header (virtual host)
    pub host: Option<String>,
    /// Additional CONNECT headers, sent in order.
    pub headers: Vec<(String, String)>,
    pub(crate) on_connect: Option<ConnectCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) on_close: Option<CloseCallback>,
    pub(crate) on_receipt: Option<ReceiptCallback>,
    pub(crate) on_message: Option<MessageCallback>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set login and passcode credentials.
    pub fn login(mut self, login: impl Into<String>, passcode: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.passcode = Some(passcode.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Add a custom CONNECT header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Frame) + Send + 'static,
    {
        self.on_connect = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(ErrorEvent) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: FnMut(&CloseEvent) + Send + 'static,
    {
        self.on_close = Some(Box::new(f));
        self
    }

    /// Handler for RECEIPT frames other than the disconnect receipt.
    pub fn on_receipt<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Frame) + Send + 'static,
    {
        self.on_receipt = Some(Box::new(f));
        self
    }

    /// Catch-all handler for MESSAGE frames whose subscription has no
    /// registered callback.
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Reject option sets that cannot produce a sensible CONNECT.
    pub fn validate(&self) -> Result<(), StompError> {
        match (&self.login, &self.passcode) {
            (Some(_), None) => Err(StompError::Misuse("login given without passcode".into())),
            (None, Some(_)) => Err(StompError::Misuse("passcode given without login".into())),
            _ => Ok(()),
        }
    }

    /// CONNECT headers in emission order: credentials, host, then custom
    /// headers.
    pub fn connect_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(login) = &self.login {
            headers.push(("login".to_string(), login.clone()));
        }
        if let Some(passcode) = &self.passcode {
            headers.push(("passcode".to_string(), passcode.clone()));
        }
        if let Some(host) = &self.host {
            headers.push(("host".to_string(), host.clone()));
        }
        headers.extend(self.headers.iter().cloned());
        headers
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("login", &self.login)
            .field("host", &self.host)
            .field("headers", &self.headers)
            .field("on_connect", &self.on_connect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_receipt", &self.on_receipt.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}
