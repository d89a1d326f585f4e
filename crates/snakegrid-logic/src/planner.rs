//! Move candidates for one node of the grid search.
//!
//! A [`SearchState`] is built for the cell the agent stands on. It expands
//! the neighbouring cells, drops the ones that are out of bounds, solid, the
//! cell just left, or unsafe as a final step, and orders the rest by
//! straight-line distance to the destination.
//!
//! Up moves are only generated when the level allows them: the agent is
//! gravity-bound and normally moves down, left or right.

use crate::entities::Cell;
use crate::interaction::{InteractionIndex, InteractionKind};
use serde::{Deserialize, Serialize};

/// A single step on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Left,
    Right,
    Up,
}

impl Direction {
    /// Cell reached by stepping from `(x, y)`.
    pub fn step(self, (x, y): Cell) -> Cell {
        match self {
            Direction::Down => (x, y + 1),
            Direction::Left => (x - 1, y),
            Direction::Right => (x + 1, y),
            Direction::Up => (x, y - 1),
        }
    }
}

/// A neighbouring cell and the move that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub cell: Cell,
    pub direction: Direction,
}

/// Playable area `[1, width] × [1, height]`; row and column 0 and
/// `width + 1` / `height + 1` form the border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, (x, y): Cell) -> bool {
        0 < x && x <= self.width && 0 < y && y <= self.height
    }
}

/// Inputs that stay fixed while one search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub destination: Cell,
    pub allow_up: bool,
    pub bounds: Bounds,
    pub max_depth: u32,
}

/// Euclidean distance between two cells.
pub fn heuristic(from: Cell, to: Cell) -> f64 {
    f64::from(from.0 - to.0).hypot(f64::from(from.1 - to.1))
}

/// Viable moves out of `cell`, best first.
pub fn candidate_moves(
    cell: Cell,
    parent: Option<Cell>,
    depth: u32,
    params: &SearchParams,
    index: &InteractionIndex,
) -> Vec<Candidate> {
    let mut directions = vec![Direction::Down, Direction::Left, Direction::Right];
    if params.allow_up {
        directions.push(Direction::Up);
    }

    let last_step = depth + 1 >= params.max_depth;

    let mut moves: Vec<Candidate> = directions
        .into_iter()
        .map(|direction| Candidate {
            cell: direction.step(cell),
            direction,
        })
        .filter(|c| Some(c.cell) != parent)
        .filter(|c| params.bounds.contains(c.cell))
        .filter(|c| {
            let (x, y) = c.cell;
            !index.has(x, y, InteractionKind::Wall) || index.has(x, y, InteractionKind::Food)
        })
        // the final step must land on solid ground
        .filter(|c| !last_step || index.has(c.cell.0, c.cell.1 + 1, InteractionKind::Wall))
        .collect();

    moves.sort_by(|a, b| {
        heuristic(a.cell, params.destination).total_cmp(&heuristic(b.cell, params.destination))
    });
    moves
}

/// One node of the backtracking search: a cell plus the moves out of it
/// that have not been tried yet.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub cell: Cell,
    pub depth: u32,
    /// Untried moves, worst first so the best pops off the end.
    pending: Vec<Candidate>,
}

impl SearchState {
    pub fn new(
        cell: Cell,
        parent: Option<Cell>,
        depth: u32,
        params: &SearchParams,
        index: &InteractionIndex,
    ) -> Self {
        let mut pending = candidate_moves(cell, parent, depth, params, index);
        pending.reverse();
        Self {
            cell,
            depth,
            pending,
        }
    }

    /// Take the most promising untried move.
    pub fn next_move(&mut self) -> Option<Candidate> {
        self.pending.pop()
    }

    /// Untried moves, best first.
    pub fn remaining(&self) -> impl Iterator<Item = &Candidate> {
        self.pending.iter().rev()
    }

    pub fn is_dead_end(&self) -> bool {
        self.pending.is_empty()
    }
}
