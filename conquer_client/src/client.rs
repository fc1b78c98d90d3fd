// Session state machine: the top-level client.
//
// `Client` owns everything session-scoped: both channels, the connector
// that opens their transports, the current `Mode`, and the per-session
// `GameSession` / `Board` / `Winner`. UI collaborators drive it through a
// handful of calls and read it through accessors:
//
// - `start()` opens the matchmaking connection.
// - `enqueue(name)` / `dequeue()` while in Queue.
// - `pointer_down(index, now)` / `pointer_up(now)` while in Game.
// - `pump(now)` once per frame/tick: drains both channels, applies every
//   message in delivery order, fires the queue heartbeat when due, and
//   returns `ClientEvent`s describing what changed.
// - `return_to_queue()` to start a fresh cycle after a game.
//
// Transitions:
//   Queue --game_start--> Game
//   Game --inactive_player | not_enough_players--> Queue
//   Game --game_win--> Scoreboard
//   Scoreboard --return_to_queue()--> Queue
// `Wait` is reserved; nothing enters it.
//
// Entering Queue always resets the session, board, and winner, and
// reopens the matchmaking connection if it isn't live (it was closed on
// `game_start`). That is the only place a reconnect happens.
//
// Time is passed in by the caller everywhere, so tests drive the heartbeat
// and hold durations with synthetic `Instant`s.

use std::time::Instant;

use tracing::{debug, info, warn};

use conquer_protocol::{ColourName, PlayerId, SessionId};

use crate::board::{Board, ClaimAction};
use crate::config::ClientConfig;
use crate::connection::ChannelKind;
use crate::error::ClientError;
use crate::game::{AbandonReason, GameChannel, GameOutcome};
use crate::heartbeat::Heartbeat;
use crate::identity::Identity;
use crate::matchmaking::{MatchmakingChannel, MatchmakingOutcome};
use crate::score::Scoreboard;
use crate::session::{GameSession, Mode, QueueState, Winner};
use crate::transport::Connector;
use crate::ws::WsConnector;

/// Something UI collaborators may want to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    ChannelOpened(ChannelKind),
    /// A channel dropped without the client closing it.
    ChannelClosed(ChannelKind),
    QueueLength(u32),
    QueueRejected(String),
    QueueTimedOut,
    GameStarted {
        session_id: SessionId,
        board_len: usize,
    },
    ColourAssigned(ColourName),
    RosterUpdated { players: usize },
    CellChanged { index: usize },
    SessionAbandoned(AbandonReason),
    GameWon(Winner),
}

pub struct Client {
    config: ClientConfig,
    identity: Identity,
    connector: Box<dyn Connector>,
    mode: Mode,
    matchmaking: MatchmakingChannel,
    game: GameChannel,
    session: Option<GameSession>,
    board: Option<Board>,
    winner: Option<Winner>,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        identity: Identity,
        connector: Box<dyn Connector>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let player_id = identity.player_id().clone();
        let matchmaking = MatchmakingChannel::new(
            config.matchmaking_url(),
            player_id.clone(),
            Heartbeat::new(config.heartbeat_interval),
        );
        let game = GameChannel::new(config.game_url(), player_id);
        Ok(Self {
            config,
            identity,
            connector,
            mode: Mode::Queue,
            matchmaking,
            game,
            session: None,
            board: None,
            winner: None,
        })
    }

    /// A client with a fresh identity that talks WebSocket.
    pub fn websocket(config: ClientConfig) -> Result<Self, ClientError> {
        let connector = WsConnector::new(config.read_timeout);
        Self::new(config, Identity::generate(), Box::new(connector))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn player_id(&self) -> &PlayerId {
        self.identity.player_id()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn queue_state(&self) -> QueueState {
        self.matchmaking.queue_state()
    }

    pub fn is_queued(&self) -> bool {
        self.matchmaking.is_queued()
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    pub fn is_channel_open(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Matchmaking => self.matchmaking.is_open(),
            ChannelKind::Game => self.game.is_open(),
        }
    }

    /// Final standings, available in Scoreboard mode.
    pub fn scoreboard(&self) -> Option<Scoreboard> {
        let (winner, session, board) = (self.winner.as_ref()?, self.session.as_ref()?, self.board.as_ref()?);
        Some(Scoreboard::evaluate(
            winner.clone(),
            board,
            session.roster(),
            session.own_colour(),
            self.identity.player_id(),
        ))
    }

    /// Open the matchmaking connection. Idempotent.
    pub fn start(&mut self) {
        self.matchmaking.connect(self.connector.as_mut());
    }

    pub fn enqueue(&mut self, name: &str) -> Result<(), ClientError> {
        self.require_mode("enqueue", Mode::Queue)?;
        self.matchmaking.enqueue(name)
    }

    pub fn dequeue(&mut self) -> Result<(), ClientError> {
        self.require_mode("dequeue", Mode::Queue)?;
        self.matchmaking.dequeue()
    }

    /// Start a local claim on `index`. Returns the action taken, or `None`
    /// if the board rejected it (or there's no game running).
    pub fn pointer_down(&mut self, index: usize, now: Instant) -> Option<ClaimAction> {
        if self.mode != Mode::Game {
            return None;
        }
        let action = self.board.as_mut()?.pointer_down(index, now)?;
        if let Err(e) = self.game.claim_start(index) {
            warn!("pen_down for cell {index} not sent: {e}");
        }
        Some(action)
    }

    /// Finish the active gesture, if any.
    pub fn pointer_up(&mut self, now: Instant) -> Option<ClaimAction> {
        if self.mode != Mode::Game {
            return None;
        }
        let action = self.board.as_mut()?.pointer_up(now)?;
        if let ClaimAction::End { index, claimed } = action {
            if let Err(e) = self.game.claim_end(index, claimed) {
                warn!("pen_up for cell {index} not sent: {e}");
            }
        }
        Some(action)
    }

    /// Leave the scoreboard (or an abandoned session) for a fresh Queue
    /// cycle. Already in Queue: nothing to leave, and the live queue
    /// membership is kept.
    pub fn return_to_queue(&mut self) {
        if self.mode == Mode::Queue {
            debug!("already in queue");
            return;
        }
        self.enter_queue();
    }

    /// Drive both channels and the heartbeat. Call regularly.
    pub fn pump(&mut self, now: Instant) -> Vec<ClientEvent> {
        let mut events = Vec::new();

        for outcome in self.matchmaking.poll(now) {
            self.apply_matchmaking(outcome, &mut events);
        }
        if self.mode == Mode::Queue && self.matchmaking.poll_heartbeat(now) {
            debug!("queue heartbeat sent");
        }

        for outcome in self.game.poll() {
            if self.mode != Mode::Game {
                debug!("ignoring game outcome outside a game: {outcome:?}");
                continue;
            }
            self.apply_game(outcome, &mut events);
        }

        events
    }

    fn apply_matchmaking(&mut self, outcome: MatchmakingOutcome, events: &mut Vec<ClientEvent>) {
        match outcome {
            MatchmakingOutcome::Opened => events.push(ClientEvent::ChannelOpened(ChannelKind::Matchmaking)),
            MatchmakingOutcome::QueueLength(length) => events.push(ClientEvent::QueueLength(length)),
            MatchmakingOutcome::Rejected(error) => events.push(ClientEvent::QueueRejected(error)),
            MatchmakingOutcome::TimedOut => events.push(ClientEvent::QueueTimedOut),
            MatchmakingOutcome::Closed => events.push(ClientEvent::ChannelClosed(ChannelKind::Matchmaking)),
            MatchmakingOutcome::GameStart {
                session_id,
                number_of_players,
            } => {
                if self.mode != Mode::Queue {
                    warn!("game_start for {session_id} while in {:?}; ignored", self.mode);
                    return;
                }
                let Some(board) = Board::for_players(number_of_players, self.config.claim_hold_threshold)
                else {
                    warn!("game_start for {session_id} with {number_of_players} players; ignored");
                    return;
                };
                let board_len = board.len();
                info!("entering game {session_id} with a {board_len}-cell board");
                self.session = Some(GameSession::new(session_id.clone(), number_of_players));
                self.board = Some(board);
                self.winner = None;
                self.mode = Mode::Game;
                self.game.connect(session_id.clone(), self.connector.as_mut());
                events.push(ClientEvent::GameStarted {
                    session_id,
                    board_len,
                });
            }
        }
    }

    fn apply_game(&mut self, outcome: GameOutcome, events: &mut Vec<ClientEvent>) {
        match outcome {
            GameOutcome::Opened => events.push(ClientEvent::ChannelOpened(ChannelKind::Game)),
            GameOutcome::Colour(colour) => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if session.assign_colour(colour.clone()) {
                    events.push(ClientEvent::ColourAssigned(colour));
                }
            }
            GameOutcome::Roster(roster) => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                session.replace_roster(roster);
                events.push(ClientEvent::RosterUpdated {
                    players: session.roster().len(),
                });
            }
            GameOutcome::Broadcast(broadcast) => {
                let Some(board) = self.board.as_mut() else {
                    return;
                };
                if board.apply_broadcast(&broadcast) {
                    events.push(ClientEvent::CellChanged {
                        index: broadcast.index(),
                    });
                }
            }
            GameOutcome::Win(winner) => {
                info!("game over; winner {}", winner.name);
                self.winner = Some(winner.clone());
                self.mode = Mode::Scoreboard;
                events.push(ClientEvent::GameWon(winner));
            }
            GameOutcome::Abandoned(reason) => {
                self.enter_queue();
                events.push(ClientEvent::SessionAbandoned(reason));
            }
            GameOutcome::Closed => {
                warn!("game connection lost mid-session; staying in {:?}", self.mode);
                events.push(ClientEvent::ChannelClosed(ChannelKind::Game));
            }
        }
    }

    fn enter_queue(&mut self) {
        info!("entering queue");
        self.game.close();
        self.session = None;
        self.board = None;
        self.winner = None;
        self.matchmaking.reset();
        self.mode = Mode::Queue;
        self.matchmaking.connect(self.connector.as_mut());
    }

    fn require_mode(&self, action: &'static str, expected: Mode) -> Result<(), ClientError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(ClientError::WrongMode {
                action,
                expected,
                actual: self.mode,
            })
        }
    }
}
