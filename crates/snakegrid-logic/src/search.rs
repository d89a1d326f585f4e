//! Backtracking search for a move sequence to a destination cell.
//!
//! Iterative deepening over an explicit stack of [`SearchState`] nodes:
//! round `n` looks for plans of exactly `n` moves, so the first plan found is
//! a shortest one, and because the planner only allows a round's last step
//! onto supported cells, every plan ends on solid ground.

use crate::config::PlannerConfig;
use crate::entities::Cell;
use crate::interaction::InteractionIndex;
use crate::planner::{Bounds, Candidate, Direction, SearchParams, SearchState};
use std::collections::HashSet;

/// A move sequence and the cells it passes through (start excluded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub moves: Vec<Direction>,
    pub cells: Vec<Cell>,
}

impl Plan {
    fn from_path(path: &[Candidate]) -> Self {
        Self {
            moves: path.iter().map(|c| c.direction).collect(),
            cells: path.iter().map(|c| c.cell).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Result of [`plan_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Plan),
    /// Every move sequence up to the depth limit was tried.
    Exhausted,
    /// Gave up after building this many nodes.
    BudgetExceeded { expansions: usize },
}

impl SearchOutcome {
    pub fn plan(&self) -> Option<&Plan> {
        match self {
            SearchOutcome::Found(plan) => Some(plan),
            _ => None,
        }
    }
}

enum Round {
    Found(Plan),
    Exhausted,
    OutOfBudget,
}

/// Find a shortest supported move sequence from `start` to `destination`.
///
/// Reads the index only. Terminates by `config.max_depth` and, if set,
/// `config.max_expansions`.
pub fn plan_path(
    index: &InteractionIndex,
    start: Cell,
    destination: Cell,
    bounds: Bounds,
    config: &PlannerConfig,
) -> SearchOutcome {
    if start == destination {
        return SearchOutcome::Found(Plan::default());
    }

    let mut expansions = 0usize;
    for limit in 1..=config.max_depth {
        let params = SearchParams {
            destination,
            allow_up: config.allow_up,
            bounds,
            max_depth: limit,
        };
        match depth_limited(index, start, &params, config.max_expansions, &mut expansions) {
            Round::Found(plan) => {
                log::debug!(
                    "Plan {:?} -> {:?}: {} moves after {} expansions",
                    start,
                    destination,
                    plan.len(),
                    expansions
                );
                return SearchOutcome::Found(plan);
            }
            Round::Exhausted => {}
            Round::OutOfBudget => {
                log::debug!(
                    "Plan {:?} -> {:?}: budget spent at depth {}",
                    start,
                    destination,
                    limit
                );
                return SearchOutcome::BudgetExceeded { expansions };
            }
        }
    }

    log::debug!(
        "Plan {:?} -> {:?}: no route within {} moves",
        start,
        destination,
        config.max_depth
    );
    SearchOutcome::Exhausted
}

fn depth_limited(
    index: &InteractionIndex,
    start: Cell,
    params: &SearchParams,
    budget: Option<usize>,
    expansions: &mut usize,
) -> Round {
    let over_budget = |spent: usize| budget.is_some_and(|b| spent >= b);

    if over_budget(*expansions) {
        return Round::OutOfBudget;
    }
    *expansions += 1;
    let mut stack = vec![SearchState::new(start, None, 0, params, index)];
    // path[i] is the move that produced stack[i + 1]
    let mut path: Vec<Candidate> = Vec::new();
    let mut on_path: HashSet<Cell> = HashSet::from([start]);

    while let Some(top) = stack.last_mut() {
        let Some(candidate) = top.next_move() else {
            if let Some(node) = stack.pop() {
                on_path.remove(&node.cell);
            }
            path.pop();
            continue;
        };
        if on_path.contains(&candidate.cell) {
            continue;
        }

        let depth = top.depth + 1;
        let parent = top.cell;
        if depth == params.max_depth {
            if candidate.cell == params.destination {
                path.push(candidate);
                return Round::Found(Plan::from_path(&path));
            }
            continue;
        }

        if over_budget(*expansions) {
            return Round::OutOfBudget;
        }
        *expansions += 1;
        stack.push(SearchState::new(
            candidate.cell,
            Some(parent),
            depth,
            params,
            index,
        ));
        on_path.insert(candidate.cell);
        path.push(candidate);
    }

    Round::Exhausted
}
