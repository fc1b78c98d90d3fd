// conquer_client: session and claim-protocol core for Draw & Conquer.
//
// This crate is the client half of the grid-claiming game: it queues for a
// match on the matchmaking server, joins the game session the matchmaker
// hands out, runs the optimistic cell-claim protocol against the game
// server, and evaluates the final scores. Rendering and input widgets live
// outside; they call into `Client` and read its state.
//
// Module overview:
// - `client.rs`:      `Client`, the session state machine (Queue -> Game ->
//                     Scoreboard). Owns both channels and all session
//                     state; `pump(now)` is the single place messages are
//                     applied.
// - `matchmaking.rs`: Matchmaking channel: enqueue/dequeue/heartbeat and
//                     reply dispatch.
// - `game.rs`:        Game channel: colour request, claim messages, and
//                     translation of game-server messages into outcomes.
// - `board.rs`:       Board reconciler: local gestures vs. authoritative
//                     broadcasts.
// - `score.rs`:       Per-player scores, competition ranking, `Scoreboard`.
// - `session.rs`:     `Mode`, `QueueState`, `GameSession`, `Winner`.
// - `heartbeat.rs`:   Cancellable queue heartbeat deadline.
// - `connection.rs`:  One channel's transport lifecycle and liveness guard.
// - `transport.rs`:   `Transport` / `Connector` traits.
// - `ws.rs`:          WebSocket transport (`tungstenite`, one I/O thread per
//                     connection).
// - `identity.rs`:    Per-process player UUID.
// - `config.rs`:      Endpoints and timing.
// - `error.rs`:       `ClientError`.
//
// Scheduling: the core is single-threaded. Only the WebSocket I/O threads
// run concurrently, and they talk to the core exclusively through `mpsc`
// queues drained in `pump`. No locks guard core state.
//
// Dependencies: `conquer_protocol` for the wire vocabulary and codec.
//
// The `conquer-bot` binary (`main.rs`) drives a `Client` headlessly.

pub mod board;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod heartbeat;
pub mod identity;
pub mod matchmaking;
pub mod score;
pub mod session;
pub mod transport;
pub mod ws;

#[cfg(test)]
mod test_support;

pub use board::{Board, Broadcast, Cell, ClaimAction, Gesture};
pub use client::{Client, ClientEvent};
pub use config::ClientConfig;
pub use connection::ChannelKind;
pub use error::ClientError;
pub use game::AbandonReason;
pub use identity::Identity;
pub use score::{RankedRow, ScoreRow, Scoreboard};
pub use session::{GameSession, Mode, QueueState, Roster, Winner};
