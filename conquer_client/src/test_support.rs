// In-memory transport for unit tests.
//
// `MockConnector` records every transport it opens. Each one is backed by a
// `Wire`: a shared handle the test uses to inject inbound events and to
// inspect the frames the code under test sent. Everything is single-threaded
// (`Rc<RefCell<..>>`), matching the core's scheduling model.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::error::ClientError;
use crate::transport::{Connector, Transport, TransportEvent};

#[derive(Default)]
struct WireState {
    url: String,
    inbound: VecDeque<TransportEvent>,
    sent: Vec<String>,
    closed: bool,
}

/// Test-side handle to one mock connection.
#[derive(Clone)]
pub struct Wire(Rc<RefCell<WireState>>);

impl Wire {
    pub fn push(&self, event: TransportEvent) {
        self.0.borrow_mut().inbound.push_back(event);
    }

    pub fn push_text(&self, text: &str) {
        self.push(TransportEvent::Message(text.to_owned()));
    }

    pub fn push_json(&self, value: Value) {
        self.push(TransportEvent::Message(value.to_string()));
    }

    pub fn sent(&self) -> Vec<String> {
        self.0.borrow().sent.clone()
    }

    /// Sent frames parsed back into JSON values.
    pub fn sent_json(&self) -> Vec<Value> {
        self.0
            .borrow()
            .sent
            .iter()
            .map(|text| serde_json::from_str(text).expect("client sent invalid JSON"))
            .collect()
    }

    /// `command` field of every sent frame.
    pub fn sent_commands(&self) -> Vec<String> {
        self.sent_json()
            .iter()
            .map(|v| v["command"].as_str().unwrap_or_default().to_owned())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.0.borrow().closed
    }

    pub fn url(&self) -> String {
        self.0.borrow().url.clone()
    }
}

struct MockTransport {
    wire: Wire,
}

impl Transport for MockTransport {
    fn send(&mut self, text: String) -> Result<(), ClientError> {
        let mut state = self.wire.0.borrow_mut();
        if state.closed {
            return Err(ClientError::Transport("mock closed".into()));
        }
        state.sent.push(text);
        Ok(())
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        self.wire.0.borrow_mut().inbound.drain(..).collect()
    }

    fn close(&mut self) {
        self.wire.0.borrow_mut().closed = true;
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    wires: Rc<RefCell<Vec<Wire>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transports opened so far.
    pub fn opened(&self) -> usize {
        self.wires.borrow().len()
    }

    /// The `n`th transport opened (0-based).
    pub fn wire(&self, n: usize) -> Wire {
        self.wires.borrow()[n].clone()
    }

    /// Most recently opened transport whose URL contains `needle`.
    pub fn last_wire_to(&self, needle: &str) -> Option<Wire> {
        self.wires
            .borrow()
            .iter()
            .rev()
            .find(|wire| wire.url().contains(needle))
            .cloned()
    }
}

impl Connector for MockConnector {
    fn open(&mut self, url: &str) -> Box<dyn Transport> {
        let wire = Wire(Rc::new(RefCell::new(WireState {
            url: url.to_owned(),
            ..WireState::default()
        })));
        self.wires.borrow_mut().push(wire.clone());
        Box::new(MockTransport { wire })
    }
}
