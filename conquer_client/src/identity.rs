// Per-process player identity.
//
// The servers know a player only by the `uuid` field attached to every
// command. The client generates one UUID v4 when it starts and keeps it for
// the life of the process; it is never persisted.

use conquer_protocol::PlayerId;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Identity {
    player_id: PlayerId,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self {
            player_id: PlayerId(Uuid::new_v4().to_string()),
        }
    }

    /// Wrap a known id (tests, or a host that manages ids itself).
    pub fn with_id(player_id: PlayerId) -> Self {
        Self { player_id }
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }
}
