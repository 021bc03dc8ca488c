use std::time::Duration;

/// Client-side heartbeat intervals in milliseconds; 0 disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// How often this client offers to send heartbeats.
    pub outgoing: u64,
    /// How often this client wants to hear from the broker.
    pub incoming: u64,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            outgoing: 10_000,
            incoming: 10_000,
        }
    }
}

impl Heartbeat {
    pub fn new(outgoing: u64, incoming: u64) -> Self {
        Self { outgoing, incoming }
    }

    /// Heartbeats switched off in both directions.
    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    /// Value for the CONNECT `heart-beat` header.
    pub fn header_value(&self) -> String {
        format!("{},{}", self.outgoing, self.incoming)
    }
}

/// Parse the STOMP `heart-beat` header value (format: "cx,cy").
///
/// Parameters
/// - `header`: header string from the server or client (for example
///   "10000,10000"). The values represent milliseconds.
///
/// Returns a tuple `(cx, cy)` where each value is the heartbeat interval in
/// milliseconds. Missing or invalid fields default to `0`.
pub fn parse_heartbeat_header(header: &str) -> (u64, u64) {
    let mut parts = header.split(',');
    let cx = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let cy = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    (cx, cy)
}

/// Negotiate heartbeat intervals between client and server.
///
/// Parameters
/// - `client_out`: client's desired outgoing heartbeat interval in
///   milliseconds (how often the client will send heartbeats).
/// - `client_in`: client's desired incoming heartbeat interval in
///   milliseconds (how often the client expects to receive heartbeats).
/// - `server_out`: server's advertised outgoing interval in milliseconds.
/// - `server_in`: server's advertised incoming interval in milliseconds.
///
/// Returns `(outgoing, incoming)`. A direction is enabled only when both
/// sides declared a non-zero value for it, and then runs at the larger of
/// the two.
pub fn negotiate_heartbeats(
    client_out: u64,
    client_in: u64,
    server_out: u64,
    server_in: u64,
) -> (Option<Duration>, Option<Duration>) {
    let direction = |ours: u64, theirs: u64| {
        if ours == 0 || theirs == 0 {
            None
        } else {
            Some(Duration::from_millis(ours.max(theirs)))
        }
    };
    (
        direction(client_out, server_in),
        direction(client_in, server_out),
    )
}
