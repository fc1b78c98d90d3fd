// Transport seam between the channels and the network.
//
// A `Transport` is one long-lived text-message connection. It never blocks
// the caller: `send` queues a frame, `poll` drains whatever the connection
// produced since the last call. Connection establishment is asynchronous
// too; the first event of a healthy transport is `Opened`, and the last
// event of any transport is `Closed`.
//
// A `Connector` opens transports for a URL. The state machine owns one
// connector and hands it to each channel when that channel needs a fresh
// connection, so tests can substitute an in-memory connector (see
// `test_support.rs`) while `ws.rs` provides the WebSocket one.

use crate::error::ClientError;

/// Something a transport reported since the last poll.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The connection is established; sends will now be delivered.
    Opened,
    /// One inbound text frame.
    Message(String),
    /// A connection-level failure. Always followed by `Closed`.
    Error(String),
    /// The connection is gone. Nothing follows.
    Closed,
}

pub trait Transport {
    /// Queue one outbound text frame.
    fn send(&mut self, text: String) -> Result<(), ClientError>;

    /// Drain pending events without blocking.
    fn poll(&mut self) -> Vec<TransportEvent>;

    /// Close the connection. Later events are discarded by the caller.
    fn close(&mut self);
}

pub trait Connector {
    fn open(&mut self, url: &str) -> Box<dyn Transport>;
}
