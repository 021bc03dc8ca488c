use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};

use crate::config::{Config, ConnectOptions};
use crate::connection::{Command, Connection, Phase};
use crate::error::{StompError, TransportError};
use crate::frame::Frame;
use crate::subscription::{AckHandle, Message, Subscription};
use crate::transport::{TcpTransportFactory, TransportFactory};

/// Handle to a STOMP client.
///
/// Creating a `Client` spawns a background task that owns the connection
/// state machine: the transport, heartbeats, the subscription registry and
/// reconnection. The handle is cheap to clone; every method only queues a
/// request for that task and returns immediately, so they are safe to call
/// from inside callbacks. When the last handle is dropped the task closes
/// the transport and exits.
///
/// Must be created from within a tokio runtime.
#[derive(Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    /// Shared counter behind the `sub-N`, `tx-N` and `close-N` default ids.
    counter: Arc<AtomicU64>,
    phase: watch::Receiver<Phase>,
}

impl Client {
    /// Build a client that opens transports with `factory`.
    pub fn new(factory: impl TransportFactory, config: Config) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::new(AtomicU64::new(0));
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
        let conn = Connection::new(Arc::new(factory), config, counter.clone(), phase_tx);
        tokio::spawn(conn.run(rx));
        Self {
            commands: tx,
            counter,
            phase: phase_rx,
        }
    }

    /// Build a client for `url`.
    ///
    /// `ws://` and `wss://` URLs need the `websocket` feature; `tcp://host:port`
    /// and bare `host:port` use a plain TCP socket.
    pub fn from_url(url: &str, config: Config) -> Result<Self, StompError> {
        if url.starts_with("ws://") || url.starts_with("wss://") {
            #[cfg(feature = "websocket")]
            {
                return Ok(Self::new(
                    crate::websocket::WebSocketTransportFactory::new(url),
                    config,
                ));
            }
            #[cfg(not(feature = "websocket"))]
            {
                return Err(TransportError::UnsupportedUrl(url.to_string()).into());
            }
        }
        if url.contains("://") && !url.starts_with("tcp://") {
            return Err(TransportError::UnsupportedUrl(url.to_string()).into());
        }
        Ok(Self::new(TcpTransportFactory::new(url), config))
    }

    /// Current connection phase.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// A receiver that observes phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    fn command(&self, cmd: Command) -> Result<(), StompError> {
        self.commands.send(cmd).map_err(|_| StompError::ClientClosed)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst))
    }

    /// Open a transport and start the STOMP handshake.
    ///
    /// `on_connect` runs when CONNECTED arrives. Transport failures and
    /// ERROR frames are reported through `on_error`/`on_close`, never as an
    /// `Err` here; this only fails for invalid options or a stopped client.
    pub fn connect(&self, options: ConnectOptions) -> Result<(), StompError> {
        options.validate()?;
        self.command(Command::Connect(options))
    }

    /// Stop reconnecting and close the session.
    ///
    /// When connected, DISCONNECT is sent with a `receipt` header (taken from
    /// `headers` or generated) and `on_disconnect` runs once the matching
    /// RECEIPT arrives or the transport closes.
    pub fn disconnect<F>(&self, on_disconnect: F, headers: Vec<(String, String)>) -> Result<(), StompError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.command(Command::Disconnect {
            on_disconnect: Some(Box::new(on_disconnect)),
            headers,
        })
    }

    /// Send an arbitrary frame as-is.
    pub fn send_frame(&self, frame: Frame) -> Result<(), StompError> {
        self.command(Command::Transmit(frame))
    }

    /// Send `body` to `destination`.
    pub fn send(
        &self,
        destination: &str,
        headers: Vec<(String, String)>,
        body: impl Into<Vec<u8>>,
    ) -> Result<(), StompError> {
        require_destination(destination)?;
        let frame = Frame::new("SEND")
            .headers(headers)
            .header("destination", destination)
            .set_body(body);
        self.send_frame(frame)
    }

    /// Subscribe to `destination`, delivering each MESSAGE to `callback`.
    ///
    /// The subscription id is taken from an `id` header in `headers` when
    /// present, otherwise `sub-N` is generated.
    pub fn subscribe<F>(
        &self,
        destination: &str,
        callback: F,
        headers: Vec<(String, String)>,
    ) -> Result<Subscription, StompError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        require_destination(destination)?;
        let id = match headers.iter().find(|(k, _)| k == "id") {
            Some((_, v)) => v.clone(),
            None => self.next_id("sub"),
        };
        let frame = Frame::new("SUBSCRIBE")
            .headers(headers)
            .header("id", id.clone())
            .header("destination", destination);
        self.command(Command::Subscribe {
            id: id.clone(),
            callback: Box::new(callback),
            frame,
        })?;
        Ok(Subscription::new(id, destination.to_string(), self.clone()))
    }

    /// Cancel subscription `id` and forget its callback.
    pub fn unsubscribe(&self, id: &str, headers: Vec<(String, String)>) -> Result<(), StompError> {
        let frame = Frame::new("UNSUBSCRIBE").headers(headers).header("id", id);
        self.command(Command::Unsubscribe {
            id: id.to_string(),
            frame,
        })
    }

    /// Begin a transaction, generating `tx-N` when no id is given.
    pub fn begin(&self, transaction_id: Option<&str>) -> Result<Transaction, StompError> {
        let id = match transaction_id {
            Some(id) => id.to_string(),
            None => self.next_id("tx"),
        };
        self.send_transaction_frame("BEGIN", &id)?;
        Ok(Transaction {
            id,
            client: self.clone(),
        })
    }

    pub fn commit(&self, transaction_id: &str) -> Result<(), StompError> {
        self.send_transaction_frame("COMMIT", transaction_id)
    }

    pub fn abort(&self, transaction_id: &str) -> Result<(), StompError> {
        self.send_transaction_frame("ABORT", transaction_id)
    }

    fn send_transaction_frame(&self, command: &str, transaction_id: &str) -> Result<(), StompError> {
        self.send_frame(Frame::new(command).header("transaction", transaction_id))
    }

    /// Acknowledge a delivered message.
    pub fn ack(&self, handle: &AckHandle, headers: Vec<(String, String)>) -> Result<(), StompError> {
        self.send_frame(ack_frame("ACK", handle, headers))
    }

    /// Negative-acknowledge a delivered message.
    pub fn nack(&self, handle: &AckHandle, headers: Vec<(String, String)>) -> Result<(), StompError> {
        self.send_frame(ack_frame("NACK", handle, headers))
    }
}

fn require_destination(destination: &str) -> Result<(), StompError> {
    if destination.is_empty() {
        return Err(StompError::Misuse("destination must not be empty".into()));
    }
    Ok(())
}

/// ACK/NACK frame for `handle`, using the id header of the version the
/// message arrived under.
pub fn ack_frame(command: &str, handle: &AckHandle, headers: Vec<(String, String)>) -> Frame {
    Frame::new(command)
        .headers(headers)
        .header(handle.version.ack_id_header(), handle.message_id.clone())
        .header("subscription", handle.subscription.clone())
}

/// A transaction started with `Client::begin`.
#[derive(Clone)]
pub struct Transaction {
    id: String,
    client: Client,
}

impl Transaction {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn commit(&self) -> Result<(), StompError> {
        self.client.commit(&self.id)
    }

    pub fn abort(&self) -> Result<(), StompError> {
        self.client.abort(&self.id)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").field("id", &self.id).finish()
    }
}
