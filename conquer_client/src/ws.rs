// WebSocket transport for the matchmaking and game servers.
//
// Provides a non-blocking `Transport` for the single-threaded core.
// Architecture:
// - `WsTransport::connect()` spawns one I/O thread per connection and
//   returns immediately. The thread performs the TCP connect + WebSocket
//   handshake, then reports `Opened`.
// - The I/O thread alternates between draining the outbound `mpsc` queue
//   (frames the core asked to send) and a short blocking read on the
//   socket. The read timeout bounds how long an outbound frame waits.
// - Inbound text frames are pushed into an `mpsc` channel as
//   `TransportEvent::Message`; `poll()` drains it without blocking.
//
// The I/O thread is the only owner of the socket, so reads and writes never
// race. Dropping a `WsTransport` disconnects both queues; the thread notices
// on its next loop iteration, sends a close frame and exits. The thread is
// never joined from the core, which must not block.
//
// See also: `transport.rs` for the trait, `connection.rs` for the owner
// that enforces one live connection per channel.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::error::ClientError;
use crate::transport::{Connector, Transport, TransportEvent};

enum Outbound {
    Text(String),
    Close,
}

/// WebSocket connection driven by a background I/O thread.
pub struct WsTransport {
    outbox: Sender<Outbound>,
    inbox: Receiver<TransportEvent>,
    _io_thread: Option<JoinHandle<()>>,
}

impl WsTransport {
    /// Start connecting to `url` in the background.
    pub fn connect(url: &str, read_timeout: Duration) -> Self {
        let (outbox, outbox_rx) = mpsc::channel();
        let (inbox_tx, inbox) = mpsc::channel();
        let url = url.to_owned();
        let io_thread = thread::spawn(move || {
            io_loop(&url, read_timeout, &outbox_rx, &inbox_tx);
        });
        Self {
            outbox,
            inbox,
            _io_thread: Some(io_thread),
        }
    }
}

impl Transport for WsTransport {
    fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.outbox
            .send(Outbound::Text(text))
            .map_err(|_| ClientError::Transport("I/O thread has exited".into()))
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbox.try_recv() {
            events.push(event);
        }
        events
    }

    fn close(&mut self) {
        let _ = self.outbox.send(Outbound::Close);
    }
}

/// Opens `WsTransport`s with a fixed read timeout.
pub struct WsConnector {
    read_timeout: Duration,
}

impl WsConnector {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Connector for WsConnector {
    fn open(&mut self, url: &str) -> Box<dyn Transport> {
        Box::new(WsTransport::connect(url, self.read_timeout))
    }
}

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// I/O thread body: connect, then pump outbound and inbound frames until
/// either side closes.
fn io_loop(
    url: &str,
    read_timeout: Duration,
    outbox: &Receiver<Outbound>,
    inbox: &Sender<TransportEvent>,
) {
    let mut socket = match tungstenite::connect(url) {
        Ok((socket, _response)) => socket,
        Err(e) => {
            let _ = inbox.send(TransportEvent::Error(format!("connect to {url} failed: {e}")));
            let _ = inbox.send(TransportEvent::Closed);
            return;
        }
    };
    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        if let Err(e) = stream.set_read_timeout(Some(read_timeout)) {
            warn!("could not set read timeout on {url}: {e}");
        }
    }
    if inbox.send(TransportEvent::Opened).is_err() {
        return;
    }
    debug!("connected to {url}");

    loop {
        if !flush_outbox(&mut socket, outbox, inbox) {
            return;
        }
        match socket.read() {
            Ok(Message::Text(text)) => {
                if inbox.send(TransportEvent::Message(text)).is_err() {
                    // Core dropped the transport.
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return;
                }
            }
            Ok(Message::Close(_)) => {
                // Sends the queued close reply.
                let _ = socket.flush();
                let _ = inbox.send(TransportEvent::Closed);
                return;
            }
            Ok(Message::Binary(bytes)) => {
                warn!("ignoring {} byte binary frame from {url}", bytes.len());
            }
            Ok(_) => {} // Ping/pong are answered by tungstenite.
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                let _ = inbox.send(TransportEvent::Closed);
                return;
            }
            Err(e) => {
                let _ = inbox.send(TransportEvent::Error(e.to_string()));
                let _ = inbox.send(TransportEvent::Closed);
                return;
            }
        }
    }
}

/// Write every queued outbound frame. Returns false once the connection
/// should stop (closed by the core, or a write failed).
fn flush_outbox(
    socket: &mut Socket,
    outbox: &Receiver<Outbound>,
    inbox: &Sender<TransportEvent>,
) -> bool {
    loop {
        match outbox.try_recv() {
            Ok(Outbound::Text(text)) => {
                if let Err(e) = socket.send(Message::Text(text)) {
                    let _ = inbox.send(TransportEvent::Error(format!("send failed: {e}")));
                    let _ = inbox.send(TransportEvent::Closed);
                    return false;
                }
            }
            Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => {
                let _ = socket.close(None);
                let _ = socket.flush();
                let _ = inbox.send(TransportEvent::Closed);
                return false;
            }
            Err(TryRecvError::Empty) => return true,
        }
    }
}
