// Board reconciler: local optimistic claims vs. server broadcasts.
//
// The board is an arena of `n * n` cells, sized once when the session
// starts and addressed by index for the rest of the session. It has exactly
// three mutating entry points:
// - `pointer_down(index, now)` / `pointer_up(now)`: the local gesture.
// - `apply_broadcast(&Broadcast)`: what the server says another player did.
// Everything else (renderers, the score evaluator) reads through `cells()`
// or `shades()`.
//
// Local gesture: a pointer-down on an `Open` cell starts the single active
// gesture and marks the cell `PendingSelf` immediately. The matching
// pointer-up resolves that same cell (wherever the pointer is now): held
// strictly longer than the threshold -> `ClaimedSelf`, otherwise -> `Open`.
// Each transition returns a `ClaimAction` for the game channel to send.
//
// Race rule: a broadcast overwrites its cell unconditionally, whatever the
// local state. Two clients can both predict `PendingSelf` on the same cell;
// the server locks the cell for one of them and the broadcast that follows
// is the truth. If a broadcast lands on the gesture's cell while the pointer
// is still held, the gesture is forfeit: pointer-up leaves the broadcast's
// state in place and reports "not claimed" so the server releases any lock
// it might still hold for us.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use conquer_protocol::{ColourName, MAX_PLAYERS, NEUTRAL_SHADES, OPEN_SHADE};

/// State of one board cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Open,
    /// Held by the local pointer; not yet confirmed.
    PendingSelf,
    /// Claimed by the local player.
    ClaimedSelf,
    /// Another player is holding it (informational, not ownership).
    PendingOther(ColourName),
    ClaimedOther(ColourName),
}

impl Cell {
    pub fn is_open(&self) -> bool {
        *self == Cell::Open
    }

    /// Owner colour if the cell is claimed. `own` resolves `ClaimedSelf`.
    pub fn claimed_colour<'a>(&'a self, own: Option<&'a ColourName>) -> Option<&'a ColourName> {
        match self {
            Cell::ClaimedSelf => own,
            Cell::ClaimedOther(colour) => Some(colour),
            _ => None,
        }
    }

    /// Render shade. Self states use `own`, or the neutral pair when our
    /// colour hasn't arrived yet.
    pub fn shade(&self, own: Option<&ColourName>) -> &'static str {
        let own_shades = own.map_or(NEUTRAL_SHADES, ColourName::shades);
        match self {
            Cell::Open => OPEN_SHADE,
            Cell::PendingSelf => own_shades.pending,
            Cell::ClaimedSelf => own_shades.claimed,
            Cell::PendingOther(colour) => colour.shades().pending,
            Cell::ClaimedOther(colour) => colour.shades().claimed,
        }
    }
}

/// The one pointer gesture a client may have in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gesture {
    pub index: usize,
    pub started_at: Instant,
}

/// What the game channel must send after a local board change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimAction {
    Start { index: usize },
    End { index: usize, claimed: bool },
}

/// A server broadcast about one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Broadcast {
    PenDown { index: usize, colour: ColourName },
    PenUp {
        index: usize,
        colour: ColourName,
        claimed: bool,
    },
}

impl Broadcast {
    pub fn index(&self) -> usize {
        match self {
            Broadcast::PenDown { index, .. } | Broadcast::PenUp { index, .. } => *index,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Board {
    cells: Vec<Cell>,
    gesture: Option<Gesture>,
    hold_threshold: Duration,
}

impl Board {
    /// A board of `len` open cells.
    pub fn new(len: usize, hold_threshold: Duration) -> Self {
        Self {
            cells: vec![Cell::Open; len],
            gesture: None,
            hold_threshold,
        }
    }

    /// A square board for `number_of_players` players: `n * n` cells.
    /// `None` if the lobby exceeds `MAX_PLAYERS`.
    pub fn for_players(number_of_players: u32, hold_threshold: Duration) -> Option<Self> {
        if number_of_players > MAX_PLAYERS {
            return None;
        }
        let side = usize::try_from(number_of_players).ok()?;
        Some(Self::new(side.checked_mul(side)?, hold_threshold))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn gesture(&self) -> Option<Gesture> {
        self.gesture
    }

    pub fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    /// Start a gesture on `index`. No-op (returns `None`) if the index is
    /// out of range, the cell isn't `Open`, or a gesture is already active.
    pub fn pointer_down(&mut self, index: usize, now: Instant) -> Option<ClaimAction> {
        if self.gesture.is_some() {
            debug!("pointer-down on {index} ignored: a gesture is already active");
            return None;
        }
        let cell = self.cells.get_mut(index)?;
        if !cell.is_open() {
            return None;
        }
        *cell = Cell::PendingSelf;
        self.gesture = Some(Gesture {
            index,
            started_at: now,
        });
        Some(ClaimAction::Start { index })
    }

    /// Finish the active gesture. No-op without one.
    pub fn pointer_up(&mut self, now: Instant) -> Option<ClaimAction> {
        let Gesture { index, started_at } = self.gesture.take()?;
        let held = now.saturating_duration_since(started_at);
        let cell = &mut self.cells[index];
        if *cell != Cell::PendingSelf {
            // A broadcast took the cell while we held it.
            debug!("gesture on {index} forfeit: cell is now {cell:?}");
            return Some(ClaimAction::End {
                index,
                claimed: false,
            });
        }
        let claimed = held > self.hold_threshold;
        *cell = if claimed { Cell::ClaimedSelf } else { Cell::Open };
        Some(ClaimAction::End { index, claimed })
    }

    /// Overwrite a cell with the server's view. Returns false (and changes
    /// nothing) for out-of-range indices.
    pub fn apply_broadcast(&mut self, broadcast: &Broadcast) -> bool {
        let index = broadcast.index();
        let Some(cell) = self.cells.get_mut(index) else {
            warn!(
                "ignoring broadcast for cell {index}, board has {} cells",
                self.cells.len()
            );
            return false;
        };
        *cell = match broadcast {
            Broadcast::PenDown { colour, .. } => Cell::PendingOther(colour.clone()),
            Broadcast::PenUp {
                colour,
                claimed: true,
                ..
            } => Cell::ClaimedOther(colour.clone()),
            Broadcast::PenUp { claimed: false, .. } => Cell::Open,
        };
        true
    }

    /// Read-only render snapshot: one shade per cell.
    pub fn shades(&self, own: Option<&ColourName>) -> Vec<&'static str> {
        self.cells.iter().map(|cell| cell.shade(own)).collect()
    }
}
