//! The transport collaborator contract and the TCP adapter.
//!
//! A transport is a message-oriented duplex pipe. The connection asks a
//! [`TransportFactory`] for a fresh instance on every (re)connect and hands
//! it the sending half of an event channel; the transport reports
//! [`TransportEvent::Open`], every inbound [`TransportEvent::Message`] and
//! exactly one final [`TransportEvent::Close`] through it.
//!
//! Writes are fire-and-forget: [`Transport::send`] only fails when the
//! transport is already gone. Consecutive writes are assumed to reach the
//! broker as one continuous byte stream.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::fmt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tracing::debug;

use crate::error::TransportError;

/// Data carried by one transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(s) => s.into_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Why a transport went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Protocol close code, when the transport has one (WebSocket).
    pub code: Option<u16>,
    pub reason: String,
    /// `true` when the close was requested through [`Transport::close`].
    pub was_clean: bool,
}

impl CloseEvent {
    /// Closed on request.
    pub fn normal() -> Self {
        Self {
            code: None,
            reason: "closed".to_string(),
            was_clean: true,
        }
    }

    /// The peer ended the stream.
    pub fn remote() -> Self {
        Self {
            code: None,
            reason: "connection closed by peer".to_string(),
            was_clean: false,
        }
    }

    /// The transport failed.
    pub fn error(err: impl fmt::Display) -> Self {
        Self {
            code: None,
            reason: err.to_string(),
            was_clean: false,
        }
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.reason, code),
            None => f.write_str(&self.reason),
        }
    }
}

/// Lifecycle events pushed by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(Payload),
    Close(CloseEvent),
}

/// Sending half handed to a transport when it is opened.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// One live transport instance.
pub trait Transport: Send {
    /// Queue `payload` for writing.
    fn send(&mut self, payload: Payload) -> Result<(), TransportError>;
    /// Start closing; a [`TransportEvent::Close`] follows.
    fn close(&mut self);
    /// Where this transport points, for diagnostics.
    fn url(&self) -> &str;
}

/// Creates a fresh [`Transport`] for every connection attempt.
pub trait TransportFactory: Send + Sync + 'static {
    fn open(&self, events: EventSender) -> Box<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(EventSender) -> Box<dyn Transport> + Send + Sync + 'static,
{
    fn open(&self, events: EventSender) -> Box<dyn Transport> {
        self(events)
    }
}

/// Commands from a [`ChannelTransport`] handle to its I/O task.
#[derive(Debug)]
pub(crate) enum Outbound {
    Data(Payload),
    Close,
}

/// Transport handle backed by a spawned I/O task.
pub(crate) struct ChannelTransport {
    url: String,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ChannelTransport {
    pub(crate) fn new(url: String, outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { url, outbound }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Data(payload))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Plain TCP transport: `host:port` or `tcp://host:port`.
///
/// TCP has no message boundaries, so inbound data arrives in whatever chunks
/// the socket yields; the connection's partial buffer reassembles frames.
#[derive(Debug, Clone)]
pub struct TcpTransportFactory {
    addr: String,
}

impl TcpTransportFactory {
    pub fn new(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let addr = addr.strip_prefix("tcp://").map(str::to_string).unwrap_or(addr);
        Self { addr }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl TransportFactory for TcpTransportFactory {
    fn open(&self, events: EventSender) -> Box<dyn Transport> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_tcp(self.addr.clone(), rx, events));
        Box::new(ChannelTransport::new(format!("tcp://{}", self.addr), tx))
    }
}

async fn run_tcp(addr: String, mut outbound: mpsc::UnboundedReceiver<Outbound>, events: EventSender) {
    let stream = match TcpStream::connect(&addr).await {
        Ok(s) => s,
        Err(e) => {
            debug!("tcp connect to {} failed: {}", addr, e);
            let _ = events.send(TransportEvent::Close(CloseEvent::error(e)));
            return;
        }
    };
    if events.send(TransportEvent::Open).is_err() {
        return;
    }

    let (read, write) = stream.into_split();
    let mut reader = FramedRead::new(read, BytesCodec::new());
    let mut writer = FramedWrite::new(write, BytesCodec::new());

    let reason = loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Data(payload)) => {
                    if let Err(e) = writer.send(Bytes::from(payload.into_bytes())).await {
                        break CloseEvent::error(e);
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = SinkExt::<Bytes>::close(&mut writer).await;
                    break CloseEvent::normal();
                }
            },
            inbound = reader.next() => match inbound {
                Some(Ok(chunk)) => {
                    if events.send(TransportEvent::Message(Payload::Binary(chunk.to_vec()))).is_err() {
                        return;
                    }
                }
                Some(Err(e)) => break CloseEvent::error(e),
                None => break CloseEvent::remote(),
            },
        }
    };
    let _ = events.send(TransportEvent::Close(reason));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn tcp_scheme_is_stripped() {
        assert_eq!(TcpTransportFactory::new("tcp://localhost:61613").addr(), "localhost:61613");
        assert_eq!(TcpTransportFactory::new("127.0.0.1:61613").addr(), "127.0.0.1:61613");
    }

    #[tokio::test]
    async fn tcp_transport_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            sock.read_exact(&mut buf).await.unwrap();
            sock.write_all(b"pong!").await.unwrap();
            buf
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = TcpTransportFactory::new(addr).open(tx);
        assert_eq!(rx.recv().await, Some(TransportEvent::Open));
        transport.send(Payload::Text("ping!".into())).unwrap();

        let mut received = Vec::new();
        while received.len() < 5 {
            match rx.recv().await {
                Some(TransportEvent::Message(p)) => received.extend(p.into_bytes()),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(received, b"pong!");
        assert_eq!(&server.await.unwrap(), b"ping!");

        transport.close();
        match rx.recv().await {
            Some(TransportEvent::Close(ev)) => assert!(ev.was_clean || !ev.reason.is_empty()),
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connect_failure_reports_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _transport = TcpTransportFactory::new(addr).open(tx);
        match rx.recv().await {
            Some(TransportEvent::Close(ev)) => assert!(!ev.was_clean),
            other => panic!("expected close, got {:?}", other),
        }
    }
}
