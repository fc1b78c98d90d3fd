// Matchmaking channel: queue lifecycle against the matchmaking server.
//
// Owns the matchmaking `Connection`, the player's `QueueState`, the
// "queued" flag, and the queue heartbeat. Outbound commands are the three
// `MatchmakingRequest`s; inbound frames decode into `MatchmakingReply` and
// are dispatched by `command` first, then by `status`:
//
// - `game_start`: report the session and its player count, then close the
//   channel. Closing discards anything the server sent after it. A lobby
//   larger than `MAX_PLAYERS` is ignored and the channel stays up.
// - `heartbeat_timeout`: the server already dropped us from its queue, so
//   the queued flag is cleared and the heartbeat cancelled.
// - `status: success`: record `queue_length` when present; while queued,
//   re-arm the heartbeat.
// - `status: error`: logged and surfaced; queue state is left alone.
//
// Nothing here reconnects by itself. The state machine (`client.rs`) calls
// `connect()` again when it re-enters Queue and the channel isn't live.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use conquer_protocol::{
    MAX_PLAYERS, MatchmakingEvent, MatchmakingRequest, PlayerId, Reply, SessionId, StatusReply,
    decode_matchmaking,
};

use crate::connection::{ChannelKind, Connection};
use crate::error::ClientError;
use crate::heartbeat::Heartbeat;
use crate::session::QueueState;
use crate::transport::{Connector, TransportEvent};

/// What one matchmaking pump produced, in delivery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchmakingOutcome {
    Opened,
    QueueLength(u32),
    Rejected(String),
    TimedOut,
    GameStart {
        session_id: SessionId,
        number_of_players: u32,
    },
    /// The connection dropped without us closing it.
    Closed,
}

pub struct MatchmakingChannel {
    conn: Connection,
    player_id: PlayerId,
    queue: QueueState,
    queued: bool,
    heartbeat: Heartbeat,
}

impl MatchmakingChannel {
    pub fn new(url: String, player_id: PlayerId, heartbeat: Heartbeat) -> Self {
        Self {
            conn: Connection::new(ChannelKind::Matchmaking, url),
            player_id,
            queue: QueueState::default(),
            queued: false,
            heartbeat,
        }
    }

    /// Open the connection unless it is already open or connecting.
    pub fn connect(&mut self, connector: &mut dyn Connector) -> bool {
        self.conn.open(connector)
    }

    pub fn close(&mut self) {
        self.conn.close();
        self.queued = false;
        self.heartbeat.cancel();
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    pub fn is_live(&self) -> bool {
        self.conn.is_live()
    }

    pub fn queue_state(&self) -> QueueState {
        self.queue
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    pub fn heartbeat_due_at(&self) -> Option<Instant> {
        self.heartbeat.due_at()
    }

    /// Forget queue state from a previous cycle.
    pub fn reset(&mut self) {
        self.queue = QueueState::default();
        self.queued = false;
        self.heartbeat.cancel();
    }

    /// Join the queue. Logs and returns `NotConnected` if the connection
    /// isn't open; nothing is sent in that case.
    pub fn enqueue(&mut self, name: &str) -> Result<(), ClientError> {
        let request = MatchmakingRequest::Enqueue {
            uuid: self.player_id.clone(),
            name: name.to_owned(),
        };
        if let Err(e) = self.conn.send(&request) {
            warn!("enqueue as {name:?} not sent: {e}");
            return Err(e);
        }
        info!("enqueued as {name:?}");
        self.queued = true;
        Ok(())
    }

    /// Leave the queue. Local queue state is reset even if the request
    /// can't be sent.
    pub fn dequeue(&mut self) -> Result<(), ClientError> {
        self.reset();
        let request = MatchmakingRequest::RemoveFromQueue {
            uuid: self.player_id.clone(),
        };
        self.conn.send(&request).inspect_err(|e| warn!("dequeue not sent: {e}"))
    }

    pub fn heartbeat(&mut self) -> Result<(), ClientError> {
        self.conn.send(&MatchmakingRequest::QueueHeartbeat {
            uuid: self.player_id.clone(),
        })
    }

    /// Send a heartbeat if one is due. The next one is armed by the reply.
    pub fn poll_heartbeat(&mut self, now: Instant) -> bool {
        if !self.heartbeat.poll_due(now) {
            return false;
        }
        if !self.queued {
            return false;
        }
        match self.heartbeat() {
            Ok(()) => true,
            Err(e) => {
                warn!("queue heartbeat not sent: {e}");
                false
            }
        }
    }

    /// Drain the connection and apply every message that arrived.
    pub fn poll(&mut self, now: Instant) -> Vec<MatchmakingOutcome> {
        let mut outcomes = Vec::new();
        self.conn.fill();
        while let Some(event) = self.conn.next_event() {
            match event {
                TransportEvent::Opened => {
                    info!("matchmaking connection open");
                    outcomes.push(MatchmakingOutcome::Opened);
                }
                TransportEvent::Message(text) => match decode_matchmaking(&text) {
                    Ok(reply) => outcomes.extend(self.handle(reply, now)),
                    Err(e) => warn!("dropping matchmaking message: {e}"),
                },
                TransportEvent::Error(e) => error!("matchmaking transport error: {e}"),
                TransportEvent::Closed => {
                    warn!("matchmaking connection closed");
                    self.queued = false;
                    self.heartbeat.cancel();
                    outcomes.push(MatchmakingOutcome::Closed);
                }
            }
        }
        outcomes
    }

    fn handle(&mut self, reply: Reply<MatchmakingEvent>, now: Instant) -> Option<MatchmakingOutcome> {
        match reply {
            Reply::Event(MatchmakingEvent::GameStart {
                game_session_uuid,
                lobby_size,
                board_size,
                colour_selection_timeout,
            }) => {
                let number_of_players = lobby_size.unwrap_or(self.queue.number_of_players);
                if number_of_players > MAX_PLAYERS {
                    warn!(
                        "ignoring game_start for {game_session_uuid}: {number_of_players} players \
                         exceeds the limit of {MAX_PLAYERS}"
                    );
                    return None;
                }
                info!(
                    "game {game_session_uuid} starting: {number_of_players} players \
                     (board_size={board_size:?}, colour_selection_timeout={colour_selection_timeout:?})"
                );
                self.close();
                Some(MatchmakingOutcome::GameStart {
                    session_id: game_session_uuid,
                    number_of_players,
                })
            }
            Reply::Event(MatchmakingEvent::HeartbeatTimeout) => {
                warn!("matchmaker reported a heartbeat timeout; no longer queued");
                self.queued = false;
                self.heartbeat.cancel();
                Some(MatchmakingOutcome::TimedOut)
            }
            Reply::Status(StatusReply::Success { queue_length }) => {
                if self.queued {
                    self.heartbeat.schedule(now);
                }
                let length = queue_length?;
                debug!("queue length {length}");
                self.queue.number_of_players = length;
                Some(MatchmakingOutcome::QueueLength(length))
            }
            Reply::Status(StatusReply::Error { error }) => {
                warn!("matchmaker rejected request: {error}");
                Some(MatchmakingOutcome::Rejected(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::test_support::{MockConnector, Wire};

    const PERIOD: Duration = Duration::from_secs(10);

    fn open_channel() -> (MatchmakingChannel, Wire, Instant) {
        let mut connector = MockConnector::new();
        let mut channel =
            MatchmakingChannel::new("ws://mm".into(), PlayerId::from("me"), Heartbeat::new(PERIOD));
        channel.connect(&mut connector);
        let wire = connector.wire(0);
        wire.push(TransportEvent::Opened);
        let t0 = Instant::now();
        assert_eq!(channel.poll(t0), [MatchmakingOutcome::Opened]);
        (channel, wire, t0)
    }

    #[test]
    fn connect_is_idempotent() {
        let mut connector = MockConnector::new();
        let mut channel =
            MatchmakingChannel::new("ws://mm".into(), PlayerId::from("me"), Heartbeat::new(PERIOD));
        assert!(channel.connect(&mut connector));
        assert!(!channel.connect(&mut connector));
        assert_eq!(connector.opened(), 1);
    }

    #[test]
    fn enqueue_before_open_sends_nothing() {
        let mut connector = MockConnector::new();
        let mut channel =
            MatchmakingChannel::new("ws://mm".into(), PlayerId::from("me"), Heartbeat::new(PERIOD));
        assert!(matches!(
            channel.enqueue("Zoe"),
            Err(ClientError::NotConnected(ChannelKind::Matchmaking))
        ));
        channel.connect(&mut connector);
        assert!(channel.enqueue("Zoe").is_err());
        assert!(connector.wire(0).sent().is_empty());
        assert!(!channel.is_queued());
    }

    #[test]
    fn enqueue_sends_identity_and_name() {
        let (mut channel, wire, _) = open_channel();
        channel.enqueue("Zoe").unwrap();
        assert_eq!(
            wire.sent_json(),
            [json!({"command": "enqueue", "uuid": "me", "name": "Zoe"})]
        );
        assert!(channel.is_queued());
    }

    #[test]
    fn success_updates_queue_length_and_arms_heartbeat() {
        let (mut channel, wire, t0) = open_channel();
        channel.enqueue("Zoe").unwrap();
        wire.push_json(json!({"status": "success", "queue_length": 3}));
        assert_eq!(channel.poll(t0), [MatchmakingOutcome::QueueLength(3)]);
        assert_eq!(channel.queue_state().number_of_players, 3);
        assert_eq!(channel.heartbeat_due_at(), Some(t0 + PERIOD));

        assert!(!channel.poll_heartbeat(t0 + PERIOD - Duration::from_millis(1)));
        assert!(channel.poll_heartbeat(t0 + PERIOD));
        assert_eq!(wire.sent_commands(), ["enqueue", "queue_heartbeat"]);
        // One-shot until the next reply re-arms it.
        assert!(!channel.poll_heartbeat(t0 + PERIOD * 3));

        wire.push_json(json!({"status": "success", "queue_length": 4}));
        channel.poll(t0 + PERIOD);
        assert_eq!(channel.heartbeat_due_at(), Some(t0 + PERIOD * 2));
    }

    #[test]
    fn success_without_queue_length_keeps_count() {
        let (mut channel, wire, t0) = open_channel();
        channel.enqueue("Zoe").unwrap();
        wire.push_json(json!({"status": "success", "queue_length": 2}));
        wire.push_json(json!({"status": "success"}));
        assert_eq!(channel.poll(t0), [MatchmakingOutcome::QueueLength(2)]);
        assert_eq!(channel.queue_state().number_of_players, 2);
    }

    #[test]
    fn success_while_not_queued_does_not_arm_heartbeat() {
        let (mut channel, wire, t0) = open_channel();
        wire.push_json(json!({"status": "success", "queue_length": 1}));
        channel.poll(t0);
        assert_eq!(channel.heartbeat_due_at(), None);
    }

    #[test]
    fn error_status_leaves_queue_state_alone() {
        let (mut channel, wire, t0) = open_channel();
        channel.enqueue("Zoe").unwrap();
        wire.push_json(json!({"status": "success", "queue_length": 2}));
        wire.push_json(json!({"status": "error", "error": "Player already in queue"}));
        let outcomes = channel.poll(t0);
        assert_eq!(
            outcomes[1],
            MatchmakingOutcome::Rejected("Player already in queue".into())
        );
        assert_eq!(channel.queue_state().number_of_players, 2);
        assert!(channel.is_open());
    }

    #[test]
    fn dequeue_resets_queue_and_cancels_heartbeat() {
        let (mut channel, wire, t0) = open_channel();
        channel.enqueue("Zoe").unwrap();
        wire.push_json(json!({"status": "success", "queue_length": 5}));
        channel.poll(t0);
        channel.dequeue().unwrap();
        assert_eq!(channel.queue_state(), QueueState::default());
        assert!(!channel.is_queued());
        assert!(!channel.poll_heartbeat(t0 + PERIOD * 2));
        assert_eq!(
            wire.sent_json().last(),
            Some(&json!({"command": "remove_from_queue", "uuid": "me"}))
        );
    }

    #[test]
    fn heartbeat_timeout_clears_queued_flag() {
        let (mut channel, wire, t0) = open_channel();
        channel.enqueue("Zoe").unwrap();
        wire.push_json(json!({"status": "success", "queue_length": 1}));
        wire.push_json(json!({"command": "heartbeat_timeout"}));
        let outcomes = channel.poll(t0);
        assert_eq!(outcomes.last(), Some(&MatchmakingOutcome::TimedOut));
        assert!(!channel.is_queued());
        assert_eq!(channel.heartbeat_due_at(), None);
        assert!(channel.is_open());
    }

    #[test]
    fn game_start_uses_queue_length_and_closes() {
        let (mut channel, wire, t0) = open_channel();
        channel.enqueue("Zoe").unwrap();
        wire.push_json(json!({"status": "success", "queue_length": 3}));
        wire.push_json(json!({"command": "game_start", "game_session_uuid": "abc"}));
        wire.push_json(json!({"status": "success", "queue_length": 99}));
        let outcomes = channel.poll(t0);
        assert_eq!(
            outcomes,
            [
                MatchmakingOutcome::QueueLength(3),
                MatchmakingOutcome::GameStart {
                    session_id: SessionId::from("abc"),
                    number_of_players: 3,
                },
            ]
        );
        assert!(wire.is_closed());
        assert!(!channel.is_live());
        assert_eq!(channel.queue_state().number_of_players, 3, "late reply discarded");
        assert_eq!(channel.heartbeat_due_at(), None);
    }

    #[test]
    fn game_start_prefers_lobby_size() {
        let (mut channel, wire, t0) = open_channel();
        wire.push_json(json!({"status": "success", "queue_length": 5}));
        wire.push_json(json!({
            "command": "game_start",
            "game_session_uuid": "s1",
            "lobby_size": 4,
            "board_size": 4,
            "colour_selection_timeout": 10,
        }));
        let outcomes = channel.poll(t0);
        assert_eq!(
            outcomes.last(),
            Some(&MatchmakingOutcome::GameStart {
                session_id: SessionId::from("s1"),
                number_of_players: 4,
            })
        );
    }

    #[test]
    fn oversized_game_start_is_ignored() {
        let (mut channel, wire, t0) = open_channel();
        wire.push_json(json!({
            "command": "game_start",
            "game_session_uuid": "s1",
            "lobby_size": u32::MAX,
        }));
        wire.push_json(json!({"status": "success", "queue_length": 2}));
        assert_eq!(channel.poll(t0), [MatchmakingOutcome::QueueLength(2)]);
        assert!(channel.is_open());
    }

    #[test]
    fn malformed_messages_are_dropped() {
        let (mut channel, wire, t0) = open_channel();
        wire.push_text("not json");
        wire.push_json(json!({"command": "launch_missiles"}));
        wire.push_json(json!({"status": "success", "queue_length": 2}));
        assert_eq!(channel.poll(t0), [MatchmakingOutcome::QueueLength(2)]);
    }

    #[test]
    fn remote_close_is_reported_and_not_retried() {
        let (mut channel, wire, t0) = open_channel();
        channel.enqueue("Zoe").unwrap();
        wire.push(TransportEvent::Error("reset by peer".into()));
        wire.push(TransportEvent::Closed);
        assert_eq!(channel.poll(t0), [MatchmakingOutcome::Closed]);
        assert!(!channel.is_live());
        assert!(!channel.is_queued());
    }
}
