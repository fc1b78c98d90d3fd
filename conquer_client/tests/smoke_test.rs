// Integration smoke test for the WebSocket transport.
//
// Starts a one-connection echo server on localhost with plain `tungstenite`
// and drives a `WsTransport` against it: connect, send, receive, and both
// ways of closing. No channels or state machine involved; see
// `multiplayer_tests` for the full pipeline.

use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use conquer_client::transport::{Transport, TransportEvent};
use conquer_client::ws::WsTransport;
use tungstenite::Message;

const READ_TIMEOUT: Duration = Duration::from_millis(5);

/// Poll until `n` events have arrived or five seconds pass.
fn collect(transport: &mut WsTransport, n: usize) -> Vec<TransportEvent> {
    let start = Instant::now();
    let mut events = Vec::new();
    while events.len() < n && start.elapsed() < Duration::from_secs(5) {
        events.extend(transport.poll());
        thread::sleep(Duration::from_millis(5));
    }
    events
}

/// Accept one client, echo `echoes` text frames back uppercased, then
/// close from the server side.
fn echo_server(echoes: usize) -> (u16, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        let mut seen = Vec::new();
        while seen.len() < echoes {
            if let Message::Text(text) = socket.read().unwrap() {
                socket.send(Message::Text(text.to_uppercase())).unwrap();
                seen.push(text);
            }
        }
        socket.close(None).unwrap();
        // Drain until the client's close reply arrives.
        while socket.read().is_ok() {}
        seen
    });
    (port, handle)
}

#[test]
fn send_receive_and_server_close() {
    let (port, server) = echo_server(2);
    let mut transport = WsTransport::connect(&format!("ws://127.0.0.1:{port}"), READ_TIMEOUT);

    assert_eq!(collect(&mut transport, 1), [TransportEvent::Opened]);
    transport.send(r#"{"command":"enqueue"}"#.into()).unwrap();
    transport.send(r#"{"command":"queue_heartbeat"}"#.into()).unwrap();

    let events = collect(&mut transport, 3);
    assert_eq!(
        events,
        [
            TransportEvent::Message(r#"{"COMMAND":"ENQUEUE"}"#.into()),
            TransportEvent::Message(r#"{"COMMAND":"QUEUE_HEARTBEAT"}"#.into()),
            TransportEvent::Closed,
        ]
    );
    let seen = server.join().unwrap();
    assert_eq!(seen, [r#"{"command":"enqueue"}"#, r#"{"command":"queue_heartbeat"}"#]);
}

#[test]
fn client_close_reaches_the_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        loop {
            match socket.read() {
                Ok(Message::Close(_)) => return true,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    });

    let mut transport = WsTransport::connect(&format!("ws://127.0.0.1:{port}"), READ_TIMEOUT);
    assert_eq!(collect(&mut transport, 1), [TransportEvent::Opened]);
    transport.close();
    assert!(server.join().unwrap(), "server should see a close frame");
    assert_eq!(collect(&mut transport, 1), [TransportEvent::Closed]);
}

#[test]
fn refused_connection_reports_error_then_closed() {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut transport = WsTransport::connect(&format!("ws://127.0.0.1:{port}"), READ_TIMEOUT);
    let events = collect(&mut transport, 2);
    assert!(matches!(events[0], TransportEvent::Error(_)), "got {events:?}");
    assert_eq!(events[1], TransportEvent::Closed);
}
