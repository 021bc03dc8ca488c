//! In-memory transport that lets a test play the broker.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use stomp_ws::{
    CloseEvent, EventSender, Payload, Transport, TransportError, TransportEvent, TransportFactory,
};

#[derive(Default)]
struct Shared {
    /// Event senders of every transport opened so far, oldest first.
    opened: Vec<EventSender>,
    /// Every write, tagged with the index of the transport it went to.
    writes: Vec<(usize, Payload)>,
    closes: usize,
}

/// Factory handing out scripted transports; clone it to keep a handle for
/// the test after moving one into the client.
#[derive(Clone, Default)]
pub struct ScriptedBroker {
    shared: Arc<Mutex<Shared>>,
}

struct ScriptedTransport {
    index: usize,
    shared: Arc<Mutex<Shared>>,
    events: EventSender,
    closed: bool,
}

impl Transport for ScriptedTransport {
    fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.shared.lock().unwrap().writes.push((self.index, payload));
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.lock().unwrap().closes += 1;
            let _ = self.events.send(TransportEvent::Close(CloseEvent::normal()));
        }
    }

    fn url(&self) -> &str {
        "mock://broker"
    }
}

impl TransportFactory for ScriptedBroker {
    fn open(&self, events: EventSender) -> Box<dyn Transport> {
        let mut shared = self.shared.lock().unwrap();
        shared.opened.push(events.clone());
        Box::new(ScriptedTransport {
            index: shared.opened.len() - 1,
            shared: self.shared.clone(),
            events,
            closed: false,
        })
    }
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.shared.lock().unwrap().opened.len()
    }

    pub fn close_count(&self) -> usize {
        self.shared.lock().unwrap().closes
    }

    fn latest(&self) -> EventSender {
        self.shared
            .lock()
            .unwrap()
            .opened
            .last()
            .cloned()
            .expect("no transport opened")
    }

    /// Report the latest transport as open.
    pub fn accept(&self) {
        let _ = self.latest().send(TransportEvent::Open);
    }

    /// Deliver raw text from the broker on the latest transport.
    pub fn push(&self, raw: &str) {
        let _ = self
            .latest()
            .send(TransportEvent::Message(Payload::Text(raw.to_string())));
    }

    /// Deliver raw bytes from the broker on the latest transport.
    pub fn push_bytes(&self, raw: &[u8]) {
        let _ = self
            .latest()
            .send(TransportEvent::Message(Payload::Binary(raw.to_vec())));
    }

    /// Simulate the broker dropping the connection.
    pub fn drop_connection(&self) {
        let _ = self.latest().send(TransportEvent::Close(CloseEvent::remote()));
    }

    /// All writes as lossy strings, in order.
    pub fn written(&self) -> Vec<String> {
        self.shared
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|(_, p)| String::from_utf8_lossy(p.as_bytes()).into_owned())
            .collect()
    }

    /// Writes that went to transport number `index`.
    pub fn written_to(&self, index: usize) -> Vec<String> {
        self.shared
            .lock()
            .unwrap()
            .writes
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, p)| String::from_utf8_lossy(p.as_bytes()).into_owned())
            .collect()
    }

    /// Raw payloads of every write.
    pub fn payloads(&self) -> Vec<Payload> {
        self.shared
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Writes whose command line is `command`.
    pub fn frames_with_command(&self, command: &str) -> Vec<String> {
        let prefix = format!("{}\n", command);
        self.written()
            .into_iter()
            .filter(|w| w.starts_with(&prefix))
            .collect()
    }

    pub fn heartbeats_sent(&self) -> usize {
        self.written().iter().filter(|w| w.as_str() == "\n").count()
    }
}

/// Let the client task process everything queued so far without moving the
/// (paused) clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Move the paused clock forward and let timers fire.
pub async fn advance(by: Duration) {
    tokio::time::advance(by).await;
    settle().await;
}

/// Shared log that callbacks can append to.
pub type Log<T> = Arc<Mutex<Vec<T>>>;

pub fn log<T>() -> Log<T> {
    Arc::new(Mutex::new(Vec::new()))
}
