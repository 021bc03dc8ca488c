use crate::client::Client;
use crate::error::StompError;
use crate::frame::{Frame, Version};

/// Identifies one delivered message for a later ACK or NACK.
///
/// Plain data: it can be stored, cloned or sent to another task and passed
/// to `Client::ack` / `Client::nack` whenever the application is done with
/// the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckHandle {
    /// Value of the `ack` (1.2) or `message-id` (1.0/1.1) header.
    pub message_id: String,
    /// Subscription the message was delivered on.
    pub subscription: String,
    /// Version negotiated when the message arrived.
    pub version: Version,
}

/// A MESSAGE frame handed to a subscription callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub frame: Frame,
    pub ack: AckHandle,
}

impl Message {
    pub fn destination(&self) -> Option<&str> {
        self.frame.get_header("destination")
    }

    pub fn body(&self) -> &[u8] {
        &self.frame.body
    }
}

/// A lightweight handle returned from `Client::subscribe`.
///
/// Holds the subscription id and destination plus a client handle so the
/// subscription can be cancelled later.
#[derive(Clone)]
pub struct Subscription {
    id: String,
    destination: String,
    client: Client,
}

impl Subscription {
    pub(crate) fn new(id: String, destination: String, client: Client) -> Self {
        Self {
            id,
            destination,
            client,
        }
    }

    /// Returns the subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the destination this subscription listens to.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Send UNSUBSCRIBE for this subscription and drop its callback.
    pub fn unsubscribe(&self, headers: Vec<(String, String)>) -> Result<(), StompError> {
        self.client.unsubscribe(&self.id, headers)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .finish()
    }
}
