// conquer_protocol: wire protocol for the Draw & Conquer servers.
//
// This crate defines the message vocabulary and text codec the client core
// (`conquer_client`) uses to talk to the matchmaking server and the game
// server. It has no I/O and no dependency on the client crate, so test
// harnesses (`multiplayer_tests`) can speak the same protocol from the
// server side.
//
// Module overview:
// - `types.rs`:   ID newtypes: `PlayerId`, `SessionId`.
// - `colour.rs`:  `ColourName` palette with pending/claimed shades.
// - `message.rs`: Per-channel request/event enums, `StatusReply`, and the
//                 `Reply<E>` union each channel dispatches on.
// - `codec.rs`:   JSON text encode/decode with boundary validation.
//
// Design decisions:
// - **Flat JSON tagged by `command`.** Matches the servers' wire format
//   exactly; serde's internally tagged enums give a closed union per channel.
// - **Unknown tags are errors.** Decoding rejects anything outside the
//   channel's vocabulary instead of passing it through as a no-op branch.
// - **Roster order is preserved.** `serde_json` is built with
//   `preserve_order` and rosters decode into an `IndexMap`, because score
//   tie-breaking uses the server's roster order.

pub mod codec;
pub mod colour;
pub mod message;
pub mod types;

pub use codec::{DecodeError, EncodeError, MAX_MESSAGE_SIZE, MAX_PLAYERS, decode_game, decode_matchmaking, encode};
pub use colour::{ColourName, NEUTRAL_SHADES, OPEN_SHADE, Shades};
pub use message::{
    GameEvent, GameReply, GameRequest, MatchmakingEvent, MatchmakingReply, MatchmakingRequest,
    PenUpStatus, PlayerInfo, Reply, StatusReply,
};
pub use types::{PlayerId, SessionId};
