// Test-only servers and client wrapper for end-to-end tests.
//
// `ScriptedServer` is a real WebSocket server on a localhost port. It does
// no matchmaking or arbitration of its own: every frame a client sends is
// surfaced to the test as a `ServerEvent`, and the test decides what to
// send back (to one connection, or to everyone but the sender, the way the
// real game server broadcasts). One instance plays the matchmaker, another
// the game server.
//
// `TestClient` wraps the real `conquer_client::Client` with its real
// WebSocket transport. The only test-specific code is the blocking poll
// loops around `Client::pump()`, each bounded by `POLL_TIMEOUT`.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use conquer_client::{Client, ClientConfig, ClientEvent};
use serde_json::Value;
use tracing::debug;
use tungstenite::{Message, WebSocket};

/// Default timeout for blocking poll operations.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Server-side read timeout; bounds how long an outbound frame waits.
const SERVER_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Index of an accepted connection, in accept order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnId(pub usize);

#[derive(Debug)]
pub enum ServerEvent {
    Connected(ConnId),
    Received(ConnId, Value),
    Disconnected(ConnId),
}

enum Outbound {
    Text(String),
    Close,
}

type Outboxes = Arc<Mutex<Vec<Sender<Outbound>>>>;

pub struct ScriptedServer {
    addr: SocketAddr,
    events: Receiver<ServerEvent>,
    outboxes: Outboxes,
    stop: Arc<AtomicBool>,
}

impl ScriptedServer {
    /// Bind to an OS-assigned localhost port and start accepting.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
        listener
            .set_nonblocking(true)
            .expect("set_nonblocking failed");
        let addr = listener.local_addr().expect("local_addr failed");
        let (events_tx, events) = mpsc::channel();
        let outboxes: Outboxes = Arc::default();
        let stop = Arc::new(AtomicBool::new(false));

        let accept_outboxes = Arc::clone(&outboxes);
        let accept_stop = Arc::clone(&stop);
        thread::spawn(move || accept_loop(&listener, &events_tx, &accept_outboxes, &accept_stop));

        Self {
            addr,
            events,
            outboxes,
            stop,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Next event of any kind. Panics after `POLL_TIMEOUT`.
    pub fn next_event(&self) -> ServerEvent {
        match self.events.recv_timeout(POLL_TIMEOUT) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => panic!("timed out waiting for a server event"),
            Err(RecvTimeoutError::Disconnected) => panic!("server accept loop exited"),
        }
    }

    /// Wait for a new connection, skipping disconnects of earlier ones.
    pub fn expect_connection(&self) -> ConnId {
        loop {
            match self.next_event() {
                ServerEvent::Connected(conn) => return conn,
                ServerEvent::Disconnected(conn) => debug!("skipping disconnect of {conn:?}"),
                other => panic!("expected a connection, got {other:?}"),
            }
        }
    }

    /// Wait for the next inbound message, skipping connection events.
    pub fn next_message(&self) -> (ConnId, Value) {
        loop {
            if let ServerEvent::Received(conn, msg) = self.next_event() {
                return (conn, msg);
            }
        }
    }

    /// Wait for the next message whose `command` is `command`, skipping
    /// everything else. Returns the sender and the message.
    pub fn expect_command(&self, command: &str) -> (ConnId, Value) {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            assert!(Instant::now() < deadline, "timed out waiting for {command}");
            let (conn, msg) = self.next_message();
            if msg["command"] == command {
                return (conn, msg);
            }
            debug!("skipping {msg} while waiting for {command}");
        }
    }

    /// Wait until `conn` disconnects, skipping everything else.
    pub fn expect_disconnect(&self, conn: ConnId) {
        loop {
            if let ServerEvent::Disconnected(closed) = self.next_event() {
                if closed == conn {
                    return;
                }
            }
        }
    }

    /// True if no event arrives within `wait`.
    pub fn is_quiet_for(&self, wait: Duration) -> bool {
        match self.events.recv_timeout(wait) {
            Ok(event) => {
                debug!("unexpected server event: {event:?}");
                false
            }
            Err(_) => true,
        }
    }

    pub fn send(&self, conn: ConnId, msg: &Value) {
        let outboxes = self.outboxes.lock().expect("outboxes poisoned");
        let _ = outboxes[conn.0].send(Outbound::Text(msg.to_string()));
    }

    /// Send to every connection except `sender`.
    pub fn broadcast_except(&self, sender: ConnId, msg: &Value) {
        let outboxes = self.outboxes.lock().expect("outboxes poisoned");
        for (i, outbox) in outboxes.iter().enumerate() {
            if i != sender.0 {
                let _ = outbox.send(Outbound::Text(msg.to_string()));
            }
        }
    }

    /// Send to every connection.
    pub fn broadcast(&self, msg: &Value) {
        let outboxes = self.outboxes.lock().expect("outboxes poisoned");
        for outbox in outboxes.iter() {
            let _ = outbox.send(Outbound::Text(msg.to_string()));
        }
    }

    pub fn close(&self, conn: ConnId) {
        let outboxes = self.outboxes.lock().expect("outboxes poisoned");
        let _ = outboxes[conn.0].send(Outbound::Close);
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Ok(outboxes) = self.outboxes.lock() {
            for outbox in outboxes.iter() {
                let _ = outbox.send(Outbound::Close);
            }
        }
    }
}

fn accept_loop(
    listener: &TcpListener,
    events: &Sender<ServerEvent>,
    outboxes: &Outboxes,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                let Some(socket) = handshake(stream) else {
                    continue;
                };
                let (outbox_tx, outbox_rx) = mpsc::channel();
                let conn = {
                    let mut outboxes = outboxes.lock().expect("outboxes poisoned");
                    outboxes.push(outbox_tx);
                    ConnId(outboxes.len() - 1)
                };
                let _ = events.send(ServerEvent::Connected(conn));
                let events = events.clone();
                thread::spawn(move || connection_loop(conn, socket, &outbox_rx, &events));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(_) => return,
        }
    }
}

fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    stream.set_nonblocking(false).ok()?;
    let socket = tungstenite::accept(stream).ok()?;
    socket
        .get_ref()
        .set_read_timeout(Some(SERVER_READ_TIMEOUT))
        .ok()?;
    Some(socket)
}

fn connection_loop(
    conn: ConnId,
    mut socket: WebSocket<TcpStream>,
    outbox: &Receiver<Outbound>,
    events: &Sender<ServerEvent>,
) {
    loop {
        loop {
            match outbox.try_recv() {
                Ok(Outbound::Text(text)) => {
                    if socket.send(Message::Text(text)).is_err() {
                        let _ = events.send(ServerEvent::Disconnected(conn));
                        return;
                    }
                }
                Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    let _ = events.send(ServerEvent::Disconnected(conn));
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        match socket.read() {
            Ok(Message::Text(text)) => {
                let msg: Value = serde_json::from_str(&text).expect("client sent invalid JSON");
                let _ = events.send(ServerEvent::Received(conn, msg));
            }
            Ok(Message::Close(_)) => {
                let _ = socket.flush();
                let _ = events.send(ServerEvent::Disconnected(conn));
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(_) => {
                let _ = events.send(ServerEvent::Disconnected(conn));
                return;
            }
        }
    }
}

/// A real `Client` plus blocking helpers for tests.
pub struct TestClient {
    pub client: Client,
}

impl TestClient {
    /// Build a client against the two servers and open the matchmaking
    /// connection. `tune` adjusts timing before the client is built.
    pub fn connect(
        matchmaker: &ScriptedServer,
        game: &ScriptedServer,
        tune: impl FnOnce(&mut ClientConfig),
    ) -> Self {
        let mut config = ClientConfig {
            host: "127.0.0.1".into(),
            matchmaking_port: matchmaker.port(),
            game_port: game.port(),
            read_timeout: Duration::from_millis(5),
            ..ClientConfig::default()
        };
        tune(&mut config);
        let mut client = Client::websocket(config).expect("client config rejected");
        client.start();
        Self { client }
    }

    /// Pump until an event matches `pred`. Returns that event; earlier
    /// events are dropped.
    pub fn pump_until(&mut self, what: &str, mut pred: impl FnMut(&ClientEvent) -> bool) -> ClientEvent {
        let start = Instant::now();
        loop {
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            if let Some(event) = self.client.pump(Instant::now()).into_iter().find(&mut pred) {
                return event;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Pump until the client's state satisfies `pred`.
    pub fn pump_until_state(&mut self, what: &str, pred: impl Fn(&Client) -> bool) {
        let start = Instant::now();
        while !pred(&self.client) {
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            self.client.pump(Instant::now());
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Pump for `duration`, collecting every event.
    pub fn pump_for(&mut self, duration: Duration) -> Vec<ClientEvent> {
        let start = Instant::now();
        let mut events = Vec::new();
        while start.elapsed() < duration {
            events.extend(self.client.pump(Instant::now()));
            thread::sleep(POLL_INTERVAL);
        }
        events
    }
}
