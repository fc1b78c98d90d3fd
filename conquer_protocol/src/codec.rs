// JSON text codec for WebSocket frames.
//
// Every frame is one flat JSON object. Outbound requests are serialized
// directly. Inbound frames are validated here before any handler sees
// them: the payload must be an object, must carry a `command` or a
// `status` tag, and the tag must name a variant of the channel's closed
// vocabulary. Anything else is a `DecodeError` which the caller logs and
// drops.
//
// Routing rule: `command` wins over `status`. The game server's
// `pen_colour_response` carries both, and is a command.
//
// `MAX_MESSAGE_SIZE` bounds what we are willing to parse. Roster messages
// are the largest expected frames and are a few hundred bytes.
// `MAX_PLAYERS` bounds the lobby size a `game_start` may announce, since
// the board is sized from it.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::message::{GameEvent, GameReply, MatchmakingEvent, MatchmakingReply, Reply};

/// Maximum accepted inbound frame size (1 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Largest lobby the client will build a board for.
pub const MAX_PLAYERS: u32 = 64;

/// Why an inbound frame was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message too large: {0} bytes (max {max})", max = MAX_MESSAGE_SIZE)]
    TooLarge(usize),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("message has neither `command` nor `status`")]
    Untagged,
    #[error("unknown or malformed `{tag}` message: {source}")]
    Variant {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Serializing an outbound request failed.
#[derive(Debug, Error)]
#[error("failed to encode message: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Serialize an outbound request as a JSON text frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(msg)?)
}

/// Decode a frame received on the matchmaking channel.
pub fn decode_matchmaking(text: &str) -> Result<MatchmakingReply, DecodeError> {
    decode_reply::<MatchmakingEvent>(text)
}

/// Decode a frame received on the game channel.
pub fn decode_game(text: &str) -> Result<GameReply, DecodeError> {
    decode_reply::<GameEvent>(text)
}

fn decode_reply<E: DeserializeOwned>(text: &str) -> Result<Reply<E>, DecodeError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(DecodeError::TooLarge(text.len()));
    }
    let value: Value = serde_json::from_str(text)?;
    let Some(object) = value.as_object() else {
        return Err(DecodeError::NotAnObject);
    };
    if object.contains_key("command") {
        serde_json::from_value(value)
            .map(Reply::Event)
            .map_err(|source| DecodeError::Variant {
                tag: "command",
                source,
            })
    } else if object.contains_key("status") {
        serde_json::from_value(value)
            .map(Reply::Status)
            .map_err(|source| DecodeError::Variant {
                tag: "status",
                source,
            })
    } else {
        Err(DecodeError::Untagged)
    }
}
