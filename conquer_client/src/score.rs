// Score and win evaluation.
//
// A player's score is the number of claimed cells whose owner colour equals
// the colour the roster lists for that player. `ClaimedSelf` cells count for
// the local player's own colour; pending cells count for nobody. Ranking is
// a stable sort by score (descending) with competition ranks, so ties share
// a rank and the next distinct score skips ahead: [50, 50, 30] -> [1, 1, 3].
//
// Everything here is pure: it reads a finished board and a roster and
// returns rows. `Scoreboard` is the bundle the Scoreboard mode displays.

use conquer_protocol::{ColourName, PlayerId};

use crate::board::Board;
use crate::session::{Roster, Winner};

/// One roster player's final tally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreRow {
    pub player_id: PlayerId,
    pub name: String,
    pub colour: ColourName,
    pub score: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedRow {
    pub rank: usize,
    pub row: ScoreRow,
    /// This row is the local player.
    pub is_self: bool,
}

/// Count claimed cells per roster player, in roster order.
pub fn score_players(board: &Board, roster: &Roster, own_colour: Option<&ColourName>) -> Vec<ScoreRow> {
    roster
        .iter()
        .map(|(player_id, info)| {
            let score = board
                .cells()
                .iter()
                .filter(|cell| cell.claimed_colour(own_colour) == Some(&info.colour))
                .count();
            ScoreRow {
                player_id: player_id.clone(),
                name: info.name.clone(),
                colour: info.colour.clone(),
                score,
            }
        })
        .collect()
}

/// Competition ranks for scores already sorted descending.
pub fn competition_ranks(sorted_scores: &[usize]) -> Vec<usize> {
    let mut ranks = Vec::with_capacity(sorted_scores.len());
    for (position, score) in sorted_scores.iter().enumerate() {
        let rank = match position.checked_sub(1) {
            Some(prev) if sorted_scores[prev] == *score => ranks[prev],
            _ => position + 1,
        };
        ranks.push(rank);
    }
    ranks
}

/// Sort rows by score (ties keep their input order) and assign ranks.
pub fn rank(mut rows: Vec<ScoreRow>, self_id: &PlayerId) -> Vec<RankedRow> {
    rows.sort_by(|a, b| b.score.cmp(&a.score));
    let scores: Vec<usize> = rows.iter().map(|r| r.score).collect();
    competition_ranks(&scores)
        .into_iter()
        .zip(rows)
        .map(|(rank, row)| RankedRow {
            rank,
            is_self: row.player_id == *self_id,
            row,
        })
        .collect()
}

/// Final standings for a finished session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scoreboard {
    pub winner: Winner,
    pub rows: Vec<RankedRow>,
    pub board_len: usize,
}

impl Scoreboard {
    pub fn evaluate(
        winner: Winner,
        board: &Board,
        roster: &Roster,
        own_colour: Option<&ColourName>,
        self_id: &PlayerId,
    ) -> Self {
        let rows = rank(score_players(board, roster, own_colour), self_id);
        Self {
            winner,
            rows,
            board_len: board.len(),
        }
    }

    /// Sum of all scores. Never exceeds `board_len`.
    pub fn total_claimed(&self) -> usize {
        self.rows.iter().map(|r| r.row.score).sum()
    }
}
