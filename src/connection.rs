use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use crate::codec::{marshal, unmarshal};
use crate::config::{Config, ConnectOptions, DisconnectCallback, MessageCallback};
use crate::error::{ProtocolError, StompError, TransportError};
use crate::frame::{Frame, ServerCommand, Version};
use crate::heartbeat::{negotiate_heartbeats, parse_heartbeat_header};
use crate::subscription::{AckHandle, Message};
use crate::transport::{CloseEvent, Payload, Transport, TransportEvent, TransportFactory};

/// Where the connection is in its lifecycle.
///
/// Independent of this, the connection tracks whether the application still
/// wants to be connected; that intent is what drives reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Never connected.
    Idle,
    /// Transport opening or STOMP handshake in flight.
    Connecting,
    /// CONNECTED received.
    Connected,
    /// DISCONNECT sent, waiting for its receipt or the transport close.
    Disconnecting,
    /// Transport gone.
    Closed,
}

/// Failures delivered to the `on_error` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorEvent {
    /// The broker sent an ERROR frame.
    Frame(Frame),
    /// The transport closed; the message names the endpoint.
    ConnectionLost(String),
    /// Inbound bytes could not be decoded; the transport is closed.
    Protocol(ProtocolError),
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorEvent::Frame(frame) => {
                let message = frame.get_header("message").unwrap_or("ERROR frame");
                write!(f, "{}", message)?;
                if !frame.body.is_empty() {
                    write!(f, ": {}", frame.body_text())?;
                }
                Ok(())
            }
            ErrorEvent::ConnectionLost(msg) => f.write_str(msg),
            ErrorEvent::Protocol(err) => write!(f, "{}", err),
        }
    }
}

/// Requests from `Client` handles to the connection task.
pub(crate) enum Command {
    Connect(ConnectOptions),
    Disconnect {
        on_disconnect: Option<DisconnectCallback>,
        headers: Vec<(String, String)>,
    },
    Transmit(Frame),
    Subscribe {
        id: String,
        callback: MessageCallback,
        frame: Frame,
    },
    Unsubscribe {
        id: String,
        frame: Frame,
    },
}

/// Everything that can wake the connection task.
enum Event {
    Command(Option<Command>),
    Transport(Option<TransportEvent>),
    Ping,
    Pong,
    Reconnect,
}

/// Split a serialized frame into transport writes of at most `max` bytes.
///
/// UTF-8 frames become text payloads cut on character boundaries; anything
/// else is sent as binary. `max == 0` disables splitting.
pub fn chunk_payload(out: Vec<u8>, max: usize) -> Vec<Payload> {
    match String::from_utf8(out) {
        Ok(text) => {
            if max == 0 || text.len() <= max {
                return vec![Payload::Text(text)];
            }
            let mut chunks = Vec::new();
            let mut rest = text.as_str();
            while rest.len() > max {
                let mut cut = max;
                while !rest.is_char_boundary(cut) {
                    cut -= 1;
                }
                if cut == 0 {
                    // a single character wider than `max`
                    cut = rest.char_indices().nth(1).map(|(i, _)| i).unwrap_or(rest.len());
                }
                chunks.push(Payload::Text(rest[..cut].to_string()));
                rest = &rest[cut..];
            }
            if !rest.is_empty() {
                chunks.push(Payload::Text(rest.to_string()));
            }
            chunks
        }
        Err(e) => {
            let bytes = e.into_bytes();
            if max == 0 || bytes.len() <= max {
                return vec![Payload::Binary(bytes)];
            }
            bytes.chunks(max).map(|c| Payload::Binary(c.to_vec())).collect()
        }
    }
}

fn heartbeat_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

async fn recv_event(events: &mut Option<mpsc::UnboundedReceiver<TransportEvent>>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn wait(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(s) => s.as_mut().await,
        None => future::pending::<()>().await,
    }
}

/// The STOMP connection state machine.
///
/// Owned by a single background task; every transport event, timer tick and
/// client command is handled here one at a time, so none of this state needs
/// locking.
pub(crate) struct Connection {
    factory: Arc<dyn TransportFactory>,
    config: Config,
    phase: Phase,
    phase_tx: watch::Sender<Phase>,
    /// The application wants to be connected.
    active: bool,
    version: Version,
    escape: bool,
    counter: Arc<AtomicU64>,
    options: ConnectOptions,
    transport: Option<Box<dyn Transport>>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    partial: Vec<u8>,
    server_activity: Instant,
    subscriptions: HashMap<String, MessageCallback>,
    close_receipt: Option<String>,
    on_disconnect: Option<DisconnectCallback>,
    /// DISCONNECT headers held back until an in-flight handshake completes.
    pending_disconnect: Option<Vec<(String, String)>>,
    pinger: Option<Interval>,
    ponger: Option<Interval>,
    ponger_ttl: Duration,
    reconnect: Option<Pin<Box<Sleep>>>,
}

impl Connection {
    pub(crate) fn new(
        factory: Arc<dyn TransportFactory>,
        config: Config,
        counter: Arc<AtomicU64>,
        phase_tx: watch::Sender<Phase>,
    ) -> Self {
        Self {
            factory,
            config,
            phase: Phase::Idle,
            phase_tx,
            active: false,
            version: Version::default(),
            escape: false,
            counter,
            options: ConnectOptions::default(),
            transport: None,
            events: None,
            partial: Vec::new(),
            server_activity: Instant::now(),
            subscriptions: HashMap::new(),
            close_receipt: None,
            on_disconnect: None,
            pending_disconnect: None,
            pinger: None,
            ponger: None,
            ponger_ttl: Duration::ZERO,
            reconnect: None,
        }
    }

    /// Drive the connection until every `Client` handle is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            match self.next_event(&mut commands).await {
                Event::Command(Some(cmd)) => self.handle_command(cmd),
                Event::Command(None) => break,
                Event::Transport(Some(ev)) => self.handle_transport_event(ev),
                Event::Transport(None) => {
                    self.handle_transport_event(TransportEvent::Close(CloseEvent::remote()))
                }
                Event::Ping => self.ping(),
                Event::Pong => self.check_activity(),
                Event::Reconnect => self.reconnect(),
            }
        }
        self.shutdown();
    }

    async fn next_event(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> Event {
        tokio::select! {
            cmd = commands.recv() => Event::Command(cmd),
            ev = recv_event(&mut self.events) => Event::Transport(ev),
            _ = tick(&mut self.pinger) => Event::Ping,
            _ = tick(&mut self.ponger) => Event::Pong,
            _ = wait(&mut self.reconnect) => Event::Reconnect,
        }
    }

    fn log(&self, msg: &str) {
        debug!("{}", msg);
        if let Some(hook) = &self.config.debug {
            hook(msg);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect(options) => {
                self.options = options;
                self.active = true;
                self.open_transport();
            }
            Command::Disconnect {
                on_disconnect,
                headers,
            } => self.disconnect(on_disconnect, headers),
            Command::Transmit(frame) => {
                if let Err(e) = self.transmit(&frame) {
                    warn!("dropping {} frame: {}", frame.command, e);
                }
            }
            Command::Subscribe {
                id,
                callback,
                frame,
            } => {
                self.subscriptions.insert(id, callback);
                if let Err(e) = self.transmit(&frame) {
                    warn!("dropping SUBSCRIBE frame: {}", e);
                }
            }
            Command::Unsubscribe { id, frame } => {
                self.subscriptions.remove(&id);
                if let Err(e) = self.transmit(&frame) {
                    warn!("dropping UNSUBSCRIBE frame: {}", e);
                }
            }
        }
    }

    fn open_transport(&mut self) {
        if !self.active {
            self.log("client has been marked inactive, will not attempt to connect");
            return;
        }
        if self.transport.is_some() {
            self.log("transport already open or connecting, will not attempt to connect");
            return;
        }
        self.log("opening transport...");
        self.escape = false;
        self.version = Version::default();
        let (tx, rx) = mpsc::unbounded_channel();
        self.transport = Some(self.factory.open(tx));
        self.events = Some(rx);
        self.set_phase(Phase::Connecting);
    }

    /// Serialize and write a frame, splitting it per `max_frame_size`.
    pub(crate) fn transmit(&mut self, frame: &Frame) -> Result<(), StompError> {
        if self.transport.is_none() {
            return Err(TransportError::Closed.into());
        }
        let out = marshal(frame, self.escape);
        self.log(&format!(">>> {}", String::from_utf8_lossy(&out)));
        let chunks = chunk_payload(out, self.config.max_frame_size);
        if chunks.len() > 1 {
            self.log(&format!("splitting frame into {} writes", chunks.len()));
        }
        let transport = self.transport.as_mut().ok_or(TransportError::Closed)?;
        for chunk in chunks {
            transport.send(chunk)?;
        }
        Ok(())
    }

    pub(crate) fn handle_transport_event(&mut self, ev: TransportEvent) {
        match ev {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Message(payload) => self.on_data(payload),
            TransportEvent::Close(close) => self.on_transport_closed(close),
        }
    }

    fn on_open(&mut self) {
        self.log("transport opened...");
        self.server_activity = Instant::now();
        let frame = Frame::new("CONNECT")
            .headers(self.options.connect_headers())
            .header("accept-version", Version::SUPPORTED)
            .header("heart-beat", self.config.heartbeat.header_value());
        if let Err(e) = self.transmit(&frame) {
            warn!("failed to send CONNECT: {}", e);
        }
    }

    fn on_data(&mut self, payload: Payload) {
        let data = payload.into_bytes();
        if data.is_empty() {
            self.log("--- empty message, ignored");
            return;
        }
        self.server_activity = Instant::now();
        if self.partial.is_empty() && data == b"\n" {
            self.log("<<< PONG");
            return;
        }
        self.log(&format!("<<< {}", String::from_utf8_lossy(&data)));

        let mut buffer = std::mem::take(&mut self.partial);
        buffer.extend_from_slice(&data);
        let limit = self.config.max_inbound_size;
        let decoded = unmarshal(&buffer, self.escape).and_then(|decoded| {
            if limit > 0 && decoded.partial.len() > limit {
                Err(ProtocolError::FrameTooLarge(limit))
            } else {
                Ok(decoded)
            }
        });
        match decoded {
            Ok(decoded) => {
                self.partial = decoded.partial;
                for frame in decoded.frames {
                    if self.transport.is_none() {
                        break;
                    }
                    self.dispatch(frame);
                }
            }
            Err(e) => {
                warn!("failed to decode inbound data: {}", e);
                if let Some(cb) = self.options.on_error.as_mut() {
                    cb(ErrorEvent::Protocol(e));
                }
                if let Some(t) = self.transport.as_mut() {
                    t.close();
                }
            }
        }
    }

    fn dispatch(&mut self, frame: Frame) {
        match frame.server_command() {
            ServerCommand::Connected => self.on_connected(frame),
            ServerCommand::Message => self.on_message(frame),
            ServerCommand::Receipt => self.on_receipt(frame),
            ServerCommand::Error => {
                if let Some(cb) = self.options.on_error.as_mut() {
                    cb(ErrorEvent::Frame(frame));
                }
            }
            ServerCommand::Unknown(command) => {
                self.log(&format!("unhandled frame: {}", command));
            }
        }
    }

    fn on_connected(&mut self, frame: Frame) {
        self.version = match frame.get_header("version") {
            Some(v) => Version::parse(v).unwrap_or_else(|| {
                warn!("unknown STOMP version '{}', assuming 1.0", v);
                Version::V1_0
            }),
            None => Version::V1_0,
        };
        self.escape = self.version.escapes_headers();
        self.set_phase(Phase::Connected);
        info!(
            "connected to server {} (STOMP {})",
            frame.get_header("server").unwrap_or("unknown"),
            self.version
        );

        if !self.active {
            let headers = self.pending_disconnect.take().unwrap_or_default();
            self.send_disconnect(headers);
            return;
        }

        self.setup_heartbeat(&frame);
        if let Some(cb) = self.options.on_connect.as_mut() {
            cb(&frame);
        }
    }

    fn setup_heartbeat(&mut self, frame: &Frame) {
        if !self.version.supports_heartbeats() {
            return;
        }
        let Some(value) = frame.get_header("heart-beat") else {
            return;
        };
        let (server_out, server_in) = parse_heartbeat_header(value);
        let ours = self.config.heartbeat;
        let (outgoing, incoming) =
            negotiate_heartbeats(ours.outgoing, ours.incoming, server_out, server_in);
        if let Some(ttl) = outgoing {
            self.log(&format!("send PING every {}ms", ttl.as_millis()));
            self.pinger = Some(heartbeat_interval(ttl));
        }
        if let Some(ttl) = incoming {
            self.log(&format!("check PONG every {}ms", ttl.as_millis()));
            self.ponger = Some(heartbeat_interval(ttl));
            self.ponger_ttl = ttl;
        }
    }

    fn on_message(&mut self, frame: Frame) {
        let subscription = frame.get_header("subscription").unwrap_or_default().to_string();
        let message_id = frame
            .get_header(self.version.message_ack_header())
            .unwrap_or_default()
            .to_string();
        let message = Message {
            ack: AckHandle {
                message_id,
                subscription: subscription.clone(),
                version: self.version,
            },
            frame,
        };
        if let Some(cb) = self.subscriptions.get_mut(&subscription) {
            cb(message);
        } else if let Some(cb) = self.options.on_message.as_mut() {
            cb(message);
        } else {
            warn!("unhandled MESSAGE for subscription '{}'", subscription);
            self.log(&format!("unhandled received MESSAGE: {}", message.frame));
        }
    }

    fn on_receipt(&mut self, frame: Frame) {
        let receipt_id = frame.get_header("receipt-id");
        if self.close_receipt.is_some() && receipt_id == self.close_receipt.as_deref() {
            self.log("disconnect receipt received, closing transport");
            self.close_receipt = None;
            // drop the event channel first so the close event never arrives
            self.events = None;
            if let Some(mut transport) = self.transport.take() {
                transport.close();
            }
            self.cleanup();
            if let Some(cb) = self.on_disconnect.take() {
                cb();
            }
        } else if let Some(cb) = self.options.on_receipt.as_mut() {
            cb(&frame);
        } else {
            self.log(&format!("unhandled RECEIPT {}", receipt_id.unwrap_or_default()));
        }
    }

    fn on_transport_closed(&mut self, close: CloseEvent) {
        let url = self
            .transport
            .as_ref()
            .map(|t| t.url().to_string())
            .unwrap_or_default();
        let msg = format!("lost connection to {}: {}", url, close);
        info!("{}", msg);
        if let Some(hook) = &self.config.debug {
            hook(&msg);
        }

        if let Some(cb) = self.options.on_close.as_mut() {
            cb(&close);
        }
        self.transport = None;
        self.events = None;
        self.close_receipt = None;
        self.pending_disconnect = None;
        self.cleanup();
        if let Some(cb) = self.options.on_error.as_mut() {
            cb(ErrorEvent::ConnectionLost(msg));
        }
        if !self.active {
            if let Some(cb) = self.on_disconnect.take() {
                cb();
            }
        }
        self.schedule_reconnect();
    }

    /// Stop timers and forget per-connection state.
    fn cleanup(&mut self) {
        self.reconnect = None;
        self.pinger = None;
        self.ponger = None;
        self.subscriptions.clear();
        self.partial.clear();
        self.set_phase(Phase::Closed);
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.config.reconnect_delay;
        if !self.active || delay.is_zero() {
            return;
        }
        self.log(&format!("scheduling reconnection in {}ms", delay.as_millis()));
        self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
    }

    fn reconnect(&mut self) {
        self.reconnect = None;
        if self.phase == Phase::Connected {
            self.log("already connected");
            return;
        }
        self.log("attempting to reconnect");
        self.open_transport();
    }

    fn disconnect(&mut self, on_disconnect: Option<DisconnectCallback>, headers: Vec<(String, String)>) {
        self.on_disconnect = on_disconnect;
        self.active = false;
        self.reconnect = None;
        match self.phase {
            Phase::Connected => self.send_disconnect(headers),
            Phase::Connecting if self.transport.is_some() => {
                // finished once CONNECTED arrives or the transport fails
                self.pending_disconnect = Some(headers);
            }
            _ if self.transport.is_none() => {
                self.set_phase(Phase::Closed);
                if let Some(cb) = self.on_disconnect.take() {
                    cb();
                }
            }
            _ => {}
        }
    }

    fn send_disconnect(&mut self, headers: Vec<(String, String)>) {
        let receipt = headers
            .iter()
            .find(|(k, _)| k == "receipt")
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.next_id("close"));
        let frame = Frame::new("DISCONNECT").headers(headers).receipt(receipt.clone());
        self.close_receipt = Some(receipt);
        self.set_phase(Phase::Disconnecting);
        if let Err(e) = self.transmit(&frame) {
            self.log(&format!("ignoring error during disconnect: {}", e));
        }
    }

    fn ping(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            if transport.send(Payload::Text("\n".to_string())).is_ok() {
                self.log(">>> PING");
            }
        }
    }

    fn check_activity(&mut self) {
        let ttl = self.ponger_ttl;
        let delta = self.server_activity.elapsed();
        if delta > ttl * 2 {
            self.log(&format!(
                "did not receive server activity for the last {}ms",
                delta.as_millis()
            ));
            self.ponger = None;
            if let Some(transport) = self.transport.as_mut() {
                transport.close();
            }
        }
    }

    /// Every client handle is gone: close the transport and stop.
    fn shutdown(&mut self) {
        self.active = false;
        self.events = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.cleanup();
    }
}
