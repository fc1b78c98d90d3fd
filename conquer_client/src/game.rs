// Game channel: one session's traffic with the game server.
//
// Opened by the state machine on `game_start`, with the session id the
// matchmaker handed out. As soon as the transport reports `Opened` the
// channel asks for a pen colour; claims sent before the colour arrives are
// still valid protocol-wise, since the server decides.
//
// Inbound frames decode into `GameReply` and become `GameOutcome`s for the
// state machine to apply. Terminal messages (`inactive_player`,
// `not_enough_players`, `game_win`) close the channel before the outcome is
// returned, so nothing the server sent afterwards is ever looked at.
//
// The server also acknowledges each pen_down/pen_up with a bare status
// reply. Those carry no board information (the broadcast is the
// authoritative result), so they are only logged.

use tracing::{debug, error, info, warn};

use conquer_protocol::{
    ColourName, GameEvent, GameReply, GameRequest, PlayerId, Reply, SessionId, StatusReply,
    decode_game,
};

use crate::board::Broadcast;
use crate::connection::{ChannelKind, Connection};
use crate::error::ClientError;
use crate::session::{Roster, Winner};
use crate::transport::{Connector, TransportEvent};

/// Why the server ended our part in a session early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbandonReason {
    /// We didn't pick up a colour in time.
    InactivePlayer,
    /// Too few players remained.
    NotEnoughPlayers,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameOutcome {
    /// The connection came up and the colour request went out.
    Opened,
    Colour(ColourName),
    Roster(Roster),
    Broadcast(Broadcast),
    Win(Winner),
    Abandoned(AbandonReason),
    /// The connection dropped without us closing it.
    Closed,
}

pub struct GameChannel {
    conn: Connection,
    player_id: PlayerId,
    session_id: Option<SessionId>,
}

impl GameChannel {
    pub fn new(url: String, player_id: PlayerId) -> Self {
        Self {
            conn: Connection::new(ChannelKind::Game, url),
            player_id,
            session_id: None,
        }
    }

    /// Open the connection for `session_id`. No-op if a connection is
    /// already live.
    pub fn connect(&mut self, session_id: SessionId, connector: &mut dyn Connector) -> bool {
        if self.conn.is_live() {
            warn!("game connection already live; not joining {session_id}");
            return false;
        }
        self.session_id = Some(session_id);
        self.conn.open(connector)
    }

    pub fn close(&mut self) {
        self.conn.close();
        self.session_id = None;
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    pub fn is_live(&self) -> bool {
        self.conn.is_live()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    fn session(&self) -> Result<SessionId, ClientError> {
        self.session_id
            .clone()
            .ok_or(ClientError::NotConnected(ChannelKind::Game))
    }

    pub fn request_colour(&mut self) -> Result<(), ClientError> {
        let request = GameRequest::PenColourRequest {
            uuid: self.player_id.clone(),
            game_session_uuid: self.session()?,
        };
        self.conn.send(&request)
    }

    pub fn claim_start(&mut self, index: usize) -> Result<(), ClientError> {
        let request = GameRequest::PenDown {
            uuid: self.player_id.clone(),
            index,
            game_session_uuid: self.session()?,
        };
        self.conn.send(&request)
    }

    pub fn claim_end(&mut self, index: usize, claimed: bool) -> Result<(), ClientError> {
        let request = GameRequest::pen_up(self.player_id.clone(), index, self.session()?, claimed);
        self.conn.send(&request)
    }

    /// Drain the connection and translate every message that arrived.
    pub fn poll(&mut self) -> Vec<GameOutcome> {
        let mut outcomes = Vec::new();
        self.conn.fill();
        while let Some(event) = self.conn.next_event() {
            match event {
                TransportEvent::Opened => {
                    info!("game connection open");
                    if let Err(e) = self.request_colour() {
                        warn!("pen colour request not sent: {e}");
                    }
                    outcomes.push(GameOutcome::Opened);
                }
                TransportEvent::Message(text) => match decode_game(&text) {
                    Ok(reply) => outcomes.extend(self.handle(reply)),
                    Err(e) => warn!("dropping game message: {e}"),
                },
                TransportEvent::Error(e) => error!("game transport error: {e}"),
                TransportEvent::Closed => {
                    warn!("game connection closed");
                    self.session_id = None;
                    outcomes.push(GameOutcome::Closed);
                }
            }
        }
        outcomes
    }

    fn handle(&mut self, reply: GameReply) -> Option<GameOutcome> {
        let event = match reply {
            Reply::Event(event) => event,
            Reply::Status(StatusReply::Success { .. }) => {
                debug!("game server acknowledged");
                return None;
            }
            Reply::Status(StatusReply::Error { error }) => {
                warn!("game server rejected request: {error}");
                return None;
            }
        };
        let outcome = match event {
            GameEvent::InactivePlayer => self.abandon(AbandonReason::InactivePlayer),
            GameEvent::NotEnoughPlayers => self.abandon(AbandonReason::NotEnoughPlayers),
            GameEvent::PenColourResponse { colour } => {
                info!("assigned colour {colour}");
                GameOutcome::Colour(colour)
            }
            GameEvent::CurrentPlayers { players } => GameOutcome::Roster(players),
            GameEvent::PenDownBroadcast { index, colour } => {
                GameOutcome::Broadcast(Broadcast::PenDown { index, colour })
            }
            GameEvent::PenUpBroadcast {
                index,
                colour,
                status,
            } => GameOutcome::Broadcast(Broadcast::PenUp {
                index,
                colour,
                claimed: status.is_claimed(),
            }),
            GameEvent::GameWin {
                winner_colour,
                winner_uuid,
                winner_name,
            } => {
                info!("{winner_name} ({winner_colour}) won the game");
                self.close();
                GameOutcome::Win(Winner {
                    player_id: winner_uuid,
                    name: winner_name,
                    colour: winner_colour,
                })
            }
        };
        Some(outcome)
    }

    fn abandon(&mut self, reason: AbandonReason) -> GameOutcome {
        info!("session abandoned: {reason:?}");
        self.close();
        GameOutcome::Abandoned(reason)
    }
}
