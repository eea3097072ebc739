use serde::{Deserialize, Serialize};

use crate::*;

/// One square of the board.
///
/// Identity is `(row, col)`; the remaining fields are the mutable part written by the engine. Field
/// names on the wire are the short ones the browser client uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "r")]
    pub row: Coord,
    #[serde(rename = "c")]
    pub col: Coord,
    #[serde(rename = "mine")]
    pub is_mine: bool,
    #[serde(rename = "flag")]
    pub is_flagged: bool,
    #[serde(rename = "open")]
    pub is_open: bool,
    #[serde(rename = "mineNumber")]
    pub adjacent_mine_count: u8,
}

impl Cell {
    pub const fn new((row, col): Coord2) -> Self {
        Self {
            row,
            col,
            is_mine: false,
            is_flagged: false,
            is_open: false,
            adjacent_mine_count: 0,
        }
    }

    pub const fn coords(&self) -> Coord2 {
        (self.row, self.col)
    }

    /// Closed and unflagged, the only state a reveal can act on.
    pub const fn is_hidden(&self) -> bool {
        !self.is_open && !self.is_flagged
    }
}
