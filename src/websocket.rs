//! WebSocket transport built on `tokio-tungstenite`.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{
    ChannelTransport, CloseEvent, EventSender, Outbound, Payload, Transport, TransportEvent,
    TransportFactory,
};

/// Subprotocols offered during the WebSocket handshake.
pub const STOMP_SUBPROTOCOLS: &str = "v10.stomp, v11.stomp, v12.stomp";

/// Opens a new WebSocket to `url` (`ws://` or `wss://`) for every connect.
#[derive(Debug, Clone)]
pub struct WebSocketTransportFactory {
    url: String,
    protocols: String,
}

impl WebSocketTransportFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            protocols: STOMP_SUBPROTOCOLS.to_string(),
        }
    }

    /// Replace the offered `Sec-WebSocket-Protocol` list.
    pub fn with_protocols(mut self, protocols: impl Into<String>) -> Self {
        self.protocols = protocols.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TransportFactory for WebSocketTransportFactory {
    fn open(&self, events: EventSender) -> Box<dyn Transport> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_websocket(self.url.clone(), self.protocols.clone(), rx, events));
        Box::new(ChannelTransport::new(self.url.clone(), tx))
    }
}

async fn open_socket(
    url: &str,
    protocols: &str,
) -> Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    TransportError,
> {
    let mut request = url.into_client_request()?;
    if !protocols.is_empty() {
        let value = HeaderValue::from_str(protocols)
            .map_err(|_| TransportError::UnsupportedUrl(url.to_string()))?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }
    let (socket, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(socket)
}

async fn run_websocket(
    url: String,
    protocols: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: EventSender,
) {
    let socket = match open_socket(&url, &protocols).await {
        Ok(s) => s,
        Err(e) => {
            debug!("websocket connect to {} failed: {}", url, e);
            let _ = events.send(TransportEvent::Close(CloseEvent::error(e)));
            return;
        }
    };
    if events.send(TransportEvent::Open).is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    let reason = loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Data(payload)) => {
                    let msg = match payload {
                        Payload::Text(s) => Message::Text(s),
                        Payload::Binary(b) => Message::Binary(b),
                    };
                    if let Err(e) = sink.send(msg).await {
                        break CloseEvent::error(e);
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break CloseEvent::normal();
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(s))) => {
                    if events.send(TransportEvent::Message(Payload::Text(s))).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Binary(b))) => {
                    if events.send(TransportEvent::Message(Payload::Binary(b))).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(f) => CloseEvent {
                            code: Some(u16::from(f.code)),
                            reason: f.reason.to_string(),
                            was_clean: true,
                        },
                        None => CloseEvent::remote(),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break CloseEvent::error(e),
                None => break CloseEvent::remote(),
            },
        }
    };
    let _ = events.send(TransportEvent::Close(reason));
}
