// Session-scoped data model.
//
// `Mode` is the top-level state the UI switches on. `QueueState`,
// `GameSession` and `Winner` are the data each mode owns. All of them are
// plain values held by `Client` (see `client.rs`); each has exactly one
// writer:
// - `QueueState`: the matchmaking channel's reply handler.
// - `GameSession::own_colour`: the `pen_colour_response` handler, once.
// - `GameSession::roster`: the `current_players` handler, replaced whole.
// - `Winner`: the `game_win` handler, once.
//
// Everything here is reset when a fresh Queue cycle starts.

use indexmap::IndexMap;
use tracing::warn;

use conquer_protocol::{ColourName, PlayerId, PlayerInfo, SessionId};

/// Top-level client mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Matchmaking: name entry, ready toggle, queue length.
    Queue,
    /// A session is running and the board is live.
    Game,
    /// The session ended with a winner.
    Scoreboard,
    /// Reserved. Nothing transitions here yet.
    Wait,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueState {
    pub number_of_players: u32,
}

/// Roster keyed by player id, in the server's order.
pub type Roster = IndexMap<PlayerId, PlayerInfo>;

#[derive(Clone, Debug, PartialEq)]
pub struct GameSession {
    session_id: SessionId,
    number_of_players: u32,
    own_colour: Option<ColourName>,
    roster: Roster,
}

impl GameSession {
    pub fn new(session_id: SessionId, number_of_players: u32) -> Self {
        Self {
            session_id,
            number_of_players,
            own_colour: None,
            roster: Roster::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn number_of_players(&self) -> u32 {
        self.number_of_players
    }

    pub fn own_colour(&self) -> Option<&ColourName> {
        self.own_colour.as_ref()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Record our colour. Only the first assignment sticks; returns whether
    /// this call set it.
    pub(crate) fn assign_colour(&mut self, colour: ColourName) -> bool {
        match &self.own_colour {
            None => {
                self.own_colour = Some(colour);
                true
            }
            Some(existing) => {
                if *existing != colour {
                    warn!(
                        "session {}: ignoring colour {colour}, already assigned {existing}",
                        self.session_id
                    );
                }
                false
            }
        }
    }

    /// Replace the roster wholesale and re-derive the player count from it.
    pub(crate) fn replace_roster(&mut self, roster: Roster) {
        self.number_of_players = u32::try_from(roster.len()).unwrap_or(u32::MAX);
        self.roster = roster;
    }
}

/// The declared winner of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Winner {
    pub player_id: PlayerId,
    pub name: String,
    pub colour: ColourName,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(colour: &str, name: &str) -> PlayerInfo {
        PlayerInfo {
            colour: ColourName::from(colour),
            name: name.into(),
        }
    }

    #[test]
    fn colour_is_assigned_exactly_once() {
        let mut session = GameSession::new(SessionId::from("s"), 3);
        assert!(session.assign_colour(ColourName::Red));
        assert!(!session.assign_colour(ColourName::Blue));
        assert_eq!(session.own_colour(), Some(&ColourName::Red));
    }

    #[test]
    fn roster_is_replaced_not_merged() {
        let mut session = GameSession::new(SessionId::from("s"), 3);
        let mut first = Roster::new();
        first.insert(PlayerId::from("a"), info("red", "A"));
        first.insert(PlayerId::from("b"), info("blue", "B"));
        first.insert(PlayerId::from("c"), info("green", "C"));
        session.replace_roster(first);
        assert_eq!(session.number_of_players(), 3);

        let mut second = Roster::new();
        second.insert(PlayerId::from("c"), info("green", "C"));
        second.insert(PlayerId::from("a"), info("red", "A"));
        session.replace_roster(second);

        let ids: Vec<&str> = session.roster().keys().map(PlayerId::as_str).collect();
        assert_eq!(ids, ["c", "a"]);
        assert_eq!(session.number_of_players(), 2);
    }
}
