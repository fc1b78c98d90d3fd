// Core ID types for the Draw & Conquer protocol.
//
// Both servers identify players and game sessions by UUID strings. These
// newtypes keep the two apart in signatures while serializing as bare JSON
// strings (`#[serde(transparent)]`), so the wire shape stays `"uuid": "..."`.
//
// The client generates its own `PlayerId` once per process (see
// `conquer_client::identity`); `SessionId` is assigned by the matchmaker in
// `game_start`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client-generated player identity, attached to every outbound command.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

/// Matchmaker-assigned game session identity (`game_session_uuid`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
