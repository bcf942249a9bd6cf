//! A 2D multi-occupancy grid: every cell holds any number of individuals, and the grid either
//! wraps at its edges (torus) or is bounded.

use serde::{Deserialize, Serialize};

use crate::population::PersonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Position { x, y }
    }
}

/// Which adjacent cells count as one move away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// The eight orthogonal and diagonal cells.
    #[default]
    Moore,
    /// The four orthogonal cells.
    VonNeumann,
}

const MOORE_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const VON_NEUMANN_OFFSETS: [(i64, i64); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

impl Neighborhood {
    fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Neighborhood::Moore => &MOORE_OFFSETS,
            Neighborhood::VonNeumann => &VON_NEUMANN_OFFSETS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    torus: bool,
    neighborhood: Neighborhood,
    // Row-major occupancy lists, kept in insertion order.
    cells: Vec<Vec<PersonId>>,
}

impl Grid {
    /// # Panics
    ///
    /// Panics if either dimension is zero. Parameter validation rejects such grids first.
    #[must_use]
    pub fn new(width: u32, height: u32, torus: bool, neighborhood: Neighborhood) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Grid {
            width,
            height,
            torus,
            neighborhood,
            cells: vec![Vec::new(); width as usize * height as usize],
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    fn cell_index(&self, position: Position) -> usize {
        assert!(
            self.contains(position),
            "position ({}, {}) is outside the {}x{} grid",
            position.x,
            position.y,
            self.width,
            self.height
        );
        position.y as usize * self.width as usize + position.x as usize
    }

    /// Everyone currently placed in the cell at `position`.
    #[must_use]
    pub fn occupants(&self, position: Position) -> &[PersonId] {
        &self.cells[self.cell_index(position)]
    }

    pub(crate) fn place(&mut self, person_id: PersonId, position: Position) {
        let index = self.cell_index(position);
        self.cells[index].push(person_id);
    }

    pub(crate) fn remove(&mut self, person_id: PersonId, position: Position) {
        let index = self.cell_index(position);
        let cell = &mut self.cells[index];
        if let Some(slot) = cell.iter().position(|occupant| *occupant == person_id) {
            cell.remove(slot);
        }
    }

    pub(crate) fn relocate(&mut self, person_id: PersonId, from: Position, to: Position) {
        self.remove(person_id, from);
        self.place(person_id, to);
    }

    fn offset(value: u32, delta: i64, extent: u32, torus: bool) -> Option<u32> {
        let moved = i64::from(value) + delta;
        if torus {
            u32::try_from(moved.rem_euclid(i64::from(extent))).ok()
        } else if (0..i64::from(extent)).contains(&moved) {
            u32::try_from(moved).ok()
        } else {
            None
        }
    }

    /// The distinct cells one move away from `position`, excluding `position` itself. On small
    /// tori several offsets can wrap onto the same cell; each cell is listed once.
    #[must_use]
    pub fn neighborhood(&self, position: Position) -> Vec<Position> {
        let mut cells = Vec::with_capacity(self.neighborhood.offsets().len());
        for &(dx, dy) in self.neighborhood.offsets() {
            let x = Self::offset(position.x, dx, self.width, self.torus);
            let y = Self::offset(position.y, dy, self.height, self.torus);
            if let (Some(x), Some(y)) = (x, y) {
                let candidate = Position::new(x, y);
                if candidate != position && !cells.contains(&candidate) {
                    cells.push(candidate);
                }
            }
        }
        cells
    }
}
