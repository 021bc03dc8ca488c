//! Event-driven STOMP client.
//!
//! A [`Client`] owns one connection to a broker over a pluggable
//! [`Transport`]: it performs the CONNECT handshake and version negotiation,
//! keeps the link alive with heartbeats, dispatches MESSAGE, RECEIPT and
//! ERROR frames to callbacks, and reopens the transport after a failure when
//! a reconnect delay is configured.
//!
//! ```ignore
//! use stomp_ws::{Client, Config, ConnectOptions};
//!
//! let client = Client::from_url("127.0.0.1:61613", Config::default())?;
//! let c = client.clone();
//! client.connect(ConnectOptions::default().login("guest", "guest").on_connect(move |_| {
//!     let _ = c.subscribe("/queue/test", |msg| println!("{}", msg.frame.body_text()), Vec::new());
//!     let _ = c.send("/queue/test", Vec::new(), "hello");
//! }))?;
//! ```
//!
//! The frame codec is usable on its own through [`marshal`] and
//! [`unmarshal`].

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod heartbeat;
pub mod parser;
pub mod subscription;
pub mod transport;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use client::{Client, Transaction};
pub use codec::{Unmarshalled, marshal, unmarshal};
pub use config::{Config, ConnectOptions};
pub use connection::{ErrorEvent, Phase};
pub use error::{ProtocolError, StompError, TransportError};
pub use frame::{Frame, ServerCommand, Version};
pub use heartbeat::{Heartbeat, negotiate_heartbeats, parse_heartbeat_header};
pub use subscription::{AckHandle, Message, Subscription};
pub use transport::{
    CloseEvent, EventSender, Payload, TcpTransportFactory, Transport, TransportEvent,
    TransportFactory,
};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransportFactory;
