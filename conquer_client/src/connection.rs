// Connection manager: at most one live transport per channel.
//
// `Connection` is the explicit owner of a channel's socket. It replaces any
// notion of a shared, app-wide socket: the state machine owns exactly two
// of these (matchmaking and game), each configured with its endpoint URL
// at construction.
//
// Lifecycle: `Closed` -> `open()` -> `Connecting` -> (`Opened` event) ->
// `Open` -> (`close()` or `Closed` event) -> `Closed`. `open()` is a no-op
// while a transport exists, which makes channel `connect()` idempotent.
//
// Liveness guard: inbound events are pulled one at a time through
// `next_event()`. Connection state advances as each event is yielded, and
// `close()` discards the transport together with every buffered event, so
// a handler that closes the channel (after `game_start`, `game_win`, ...)
// can never observe a message that arrived after the terminal one.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::transport::{Connector, Transport, TransportEvent};

/// Which server a connection talks to. Used for logging and errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Matchmaking,
    Game,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Matchmaking => f.write_str("matchmaking"),
            ChannelKind::Game => f.write_str("game"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

pub struct Connection {
    kind: ChannelKind,
    url: String,
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    pending: VecDeque<TransportEvent>,
}

impl Connection {
    pub fn new(kind: ChannelKind, url: String) -> Self {
        Self {
            kind,
            url,
            transport: None,
            state: ConnectionState::Closed,
            pending: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Open or connecting.
    pub fn is_live(&self) -> bool {
        self.transport.is_some()
    }

    /// Open a transport unless one is already live. Returns whether a new
    /// connection was started.
    pub fn open(&mut self, connector: &mut dyn Connector) -> bool {
        if self.is_live() {
            return false;
        }
        info!("opening {} connection to {}", self.kind, self.url);
        self.pending.clear();
        self.transport = Some(connector.open(&self.url));
        self.state = ConnectionState::Connecting;
        true
    }

    /// Close the transport and drop anything it already delivered.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            debug!("closing {} connection", self.kind);
            transport.close();
        }
        self.pending.clear();
        self.state = ConnectionState::Closed;
    }

    /// Encode and send one request. Fails unless the connection is open.
    pub fn send<T: Serialize>(&mut self, msg: &T) -> Result<(), ClientError> {
        if !self.is_open() {
            return Err(ClientError::NotConnected(self.kind));
        }
        let text = conquer_protocol::encode(msg)?;
        debug!("{} >> {text}", self.kind);
        match self.transport.as_mut() {
            Some(transport) => transport.send(text),
            None => Err(ClientError::NotConnected(self.kind)),
        }
    }

    /// Pull newly arrived events from the transport into the local buffer.
    /// Call once per pump; `next_event` then yields them in order.
    pub fn fill(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            self.pending.extend(transport.poll());
        }
    }

    /// Yield the next buffered event, advancing connection state. Returns
    /// `None` once the connection is closed.
    pub fn next_event(&mut self) -> Option<TransportEvent> {
        self.transport.as_ref()?;
        let event = self.pending.pop_front()?;
        match &event {
            TransportEvent::Opened => self.state = ConnectionState::Open,
            TransportEvent::Closed => {
                self.transport = None;
                self.pending.clear();
                self.state = ConnectionState::Closed;
            }
            TransportEvent::Message(text) => debug!("{} << {text}", self.kind),
            TransportEvent::Error(_) => {}
        }
        Some(event)
    }
}
