use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    /// Every safe cell is now open.
    Cleared,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitMine => true,
            Cleared => true,
        }
    }
}

/// Rectangular minefield. Dimensions are fixed at creation.
///
/// On the wire the board is a row-major matrix of [`Cell`]s; the derived counters are rebuilt
/// when one is received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<Cell>>", try_from = "Vec<Vec<Cell>>")]
pub struct Board {
    cells: Array2<Cell>,
    mine_count: CellCount,
    opened_count: CellCount,
    flag_count: CellCount,
}

impl Board {
    /// All cells closed, unflagged and without mines.
    pub fn new((rows, cols): Coord2) -> Self {
        let cells = Array2::from_shape_fn((rows.into(), cols.into()), |(row, col)| {
            Cell::new((row as Coord, col as Coord))
        });
        Self {
            cells,
            mine_count: 0,
            opened_count: 0,
            flag_count: 0,
        }
    }

    pub fn size(&self) -> Coord2 {
        let (rows, cols) = self.cells.dim();
        (rows as Coord, cols as Coord)
    }

    pub fn total_cells(&self) -> CellCount {
        let (rows, cols) = self.size();
        mult(rows, cols)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn flag_count(&self) -> CellCount {
        self.flag_count
    }

    /// How many mines have not been flagged yet
    pub fn mines_left(&self) -> isize {
        (self.mine_count as isize) - (self.flag_count as isize)
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let size = self.size();
        if coords.0 < size.0 && coords.1 < size.1 {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn cell_at(&self, coords: Coord2) -> Option<&Cell> {
        self.cells.get(coords.to_nd_index())
    }

    /// Row-major iteration over every cell.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        NeighborIter::new(coords, self.size())
    }

    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        self.iter_neighbors(coords)
            .filter(|&pos| self[pos].is_mine)
            .count() as u8
    }

    /// `rows × cols − mines − opened safe cells`; zero means the board is cleared.
    pub fn remaining_safe_cells(&self) -> CellCount {
        self.total_cells() - self.mine_count - self.opened_count
    }

    /// Places `count` mines by rejection sampling, keeping the 3×3 block around `first` clear.
    ///
    /// Fails with [`GameError::TooManyMines`] when there are not enough free cells outside that
    /// block, which would otherwise make the sampling loop spin forever.
    pub fn place_mines<R: Rng + ?Sized>(
        &mut self,
        first: Coord2,
        count: CellCount,
        rng: &mut R,
    ) -> Result<()> {
        let first = self.validate_coords(first)?;
        let free = self
            .cells
            .iter()
            .filter(|cell| !cell.is_mine && chebyshev_distance(cell.coords(), first) > 1)
            .count();
        if usize::from(count) > free {
            log::warn!(
                "Cannot place {} mines around {:?}, only {} cells available",
                count,
                first,
                free
            );
            return Err(GameError::TooManyMines);
        }

        let (rows, cols) = self.size();
        let mut placed = 0;
        while placed < count {
            let coords = (rng.random_range(0..rows), rng.random_range(0..cols));
            if chebyshev_distance(coords, first) <= 1 || self[coords].is_mine {
                continue;
            }
            self[coords].is_mine = true;
            placed += 1;
        }
        self.mine_count += count;
        log::debug!("Placed {} mines avoiding {:?}", count, first);
        Ok(())
    }

    /// Opens a cell, flood filling through zero-count cells.
    ///
    /// Out of bounds, open and flagged cells are left alone. The fill walks an explicit queue so
    /// stack depth does not grow with the board.
    pub fn reveal(&mut self, coords: Coord2) -> RevealOutcome {
        let Ok(coords) = self.validate_coords(coords) else {
            return RevealOutcome::NoChange;
        };
        let cell = self[coords];
        if !cell.is_hidden() {
            return RevealOutcome::NoChange;
        }
        if cell.is_mine {
            self[coords].is_open = true;
            log::debug!("Mine opened at {:?}", coords);
            return RevealOutcome::HitMine;
        }

        let mut to_visit = VecDeque::from([coords]);
        while let Some(visit_coords) = to_visit.pop_front() {
            let visit = self[visit_coords];
            if !visit.is_hidden() || visit.is_mine {
                continue;
            }

            let count = self.adjacent_mine_count(visit_coords);
            let cell = &mut self[visit_coords];
            cell.is_open = true;
            cell.adjacent_mine_count = count;
            self.opened_count += 1;
            log::trace!("Opened cell at {:?}, mine count: {}", visit_coords, count);

            if count == 0 {
                to_visit.extend(self.iter_neighbors(visit_coords).filter(|&pos| {
                    let neighbor = self[pos];
                    neighbor.is_hidden() && !neighbor.is_mine
                }));
            }
        }

        if self.remaining_safe_cells() == 0 {
            RevealOutcome::Cleared
        } else {
            RevealOutcome::Revealed
        }
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        let coords = self.validate_coords(coords)?;
        let cell = &mut self[coords];
        if cell.is_open {
            return Ok(MarkOutcome::NoChange);
        }

        cell.is_flagged = !cell.is_flagged;
        if cell.is_flagged {
            self.flag_count += 1;
        } else {
            self.flag_count -= 1;
        }
        Ok(MarkOutcome::Changed)
    }

    /// Opens every mine still hidden, for display once the match is over.
    pub fn reveal_mines(&mut self) -> CellCount {
        let mut shown = 0;
        for cell in self.cells.iter_mut().filter(|cell| cell.is_mine && !cell.is_open) {
            cell.is_open = true;
            shown += 1;
        }
        shown
    }
}

impl Index<Coord2> for Board {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.cells[coords.to_nd_index()]
    }
}

impl IndexMut<Coord2> for Board {
    fn index_mut(&mut self, coords: Coord2) -> &mut Self::Output {
        &mut self.cells[coords.to_nd_index()]
    }
}

impl From<Board> for Vec<Vec<Cell>> {
    fn from(board: Board) -> Self {
        board.cells.outer_iter().map(|row| row.to_vec()).collect()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Board {
    type Error = GameError;

    fn try_from(fields: Vec<Vec<Cell>>) -> Result<Self> {
        let rows = fields.len();
        let cols = fields.first().map_or(0, Vec::len);
        if rows == 0
            || cols == 0
            || rows > usize::from(Coord::MAX)
            || cols > usize::from(Coord::MAX)
            || fields.iter().any(|row| row.len() != cols)
        {
            return Err(GameError::InvalidBoardShape);
        }

        let flat: Vec<Cell> = fields.into_iter().flatten().collect();
        let cells = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|_| GameError::InvalidBoardShape)?;
        for ((row, col), cell) in cells.indexed_iter() {
            if usize::from(cell.row) != row || usize::from(cell.col) != col {
                return Err(GameError::InvalidBoardShape);
            }
        }

        let count =
            |pred: fn(&Cell) -> bool| cells.iter().filter(|cell| pred(cell)).count() as CellCount;
        let mine_count = count(|cell| cell.is_mine);
        let opened_count = count(|cell| cell.is_open && !cell.is_mine);
        let flag_count = count(|cell| cell.is_flagged);

        Ok(Self {
            cells,
            mine_count,
            opened_count,
            flag_count,
        })
    }
}
