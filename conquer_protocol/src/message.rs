// Protocol messages for the matchmaking and game servers.
//
// Each channel has its own closed vocabulary:
// - `MatchmakingRequest` / `MatchmakingEvent`: client <-> matchmaker.
// - `GameRequest` / `GameEvent`: client <-> game server.
//
// Both servers also send status-only replies (`{"status": "success", ...}`
// or `{"status": "error", "error": "..."}`) that carry no `command` field.
// Those decode into `StatusReply`, and `Reply<E>` joins the two halves so
// each channel dispatches on one enum. See `codec.rs` for how an inbound
// text frame is routed to the right half.
//
// All requests are flat JSON objects tagged by `"command"`; field names
// match the servers' wire names exactly (`uuid`, `game_session_uuid`, ...).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::colour::ColourName;
use crate::types::{PlayerId, SessionId};

/// Commands sent to the matchmaker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MatchmakingRequest {
    /// Join the queue under a display name.
    Enqueue { uuid: PlayerId, name: String },
    /// Leave the queue.
    RemoveFromQueue { uuid: PlayerId },
    /// Keep-alive while queued.
    QueueHeartbeat { uuid: PlayerId },
}

/// Command-tagged messages from the matchmaker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MatchmakingEvent {
    /// A lobby filled up and a game session was created for it.
    GameStart {
        game_session_uuid: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lobby_size: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        board_size: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        colour_selection_timeout: Option<u64>,
    },
    /// The matchmaker dropped us for missing heartbeats.
    HeartbeatTimeout,
}

/// Commands sent to the game server. Every variant is scoped to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GameRequest {
    PenColourRequest {
        uuid: PlayerId,
        game_session_uuid: SessionId,
    },
    PenDown {
        uuid: PlayerId,
        index: usize,
        game_session_uuid: SessionId,
    },
    PenUpTileClaimed {
        uuid: PlayerId,
        index: usize,
        game_session_uuid: SessionId,
    },
    PenUpTileNotClaimed {
        uuid: PlayerId,
        index: usize,
        game_session_uuid: SessionId,
    },
}

/// Command-tagged messages from the game server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GameEvent {
    /// We missed the colour-selection window and were removed.
    InactivePlayer,
    /// Too many players dropped out; the session is over.
    NotEnoughPlayers,
    PenColourResponse { colour: ColourName },
    /// Full roster, keyed by player id in the server's order.
    CurrentPlayers { players: IndexMap<PlayerId, PlayerInfo> },
    /// Another player started holding a cell.
    PenDownBroadcast { index: usize, colour: ColourName },
    /// Another player released a cell; `status` says whether it was claimed.
    PenUpBroadcast {
        index: usize,
        colour: ColourName,
        status: PenUpStatus,
    },
    GameWin {
        winner_colour: ColourName,
        winner_uuid: PlayerId,
        winner_name: String,
    },
}

/// Outcome carried by `pen_up_broadcast`. Reuses the pen-up command names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenUpStatus {
    PenUpTileClaimed,
    PenUpTileNotClaimed,
}

impl PenUpStatus {
    pub fn is_claimed(self) -> bool {
        self == PenUpStatus::PenUpTileClaimed
    }
}

/// Public info for one roster entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub colour: ColourName,
    pub name: String,
}

/// Status-only reply (no `command` field).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusReply {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        queue_length: Option<u32>,
    },
    Error {
        #[serde(default)]
        error: String,
    },
}

/// Anything one channel can receive: a tagged event or a bare status.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply<E> {
    Event(E),
    Status(StatusReply),
}

pub type MatchmakingReply = Reply<MatchmakingEvent>;
pub type GameReply = Reply<GameEvent>;

impl GameRequest {
    /// Build the pen-up request for a finished gesture.
    pub fn pen_up(uuid: PlayerId, index: usize, game_session_uuid: SessionId, claimed: bool) -> Self {
        if claimed {
            GameRequest::PenUpTileClaimed {
                uuid,
                index,
                game_session_uuid,
            }
        } else {
            GameRequest::PenUpTileNotClaimed {
                uuid,
                index,
                game_session_uuid,
            }
        }
    }
}
