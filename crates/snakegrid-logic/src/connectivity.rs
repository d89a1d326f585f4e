//! Partitioning of conductive entities into circuits.
//!
//! A circuit is a maximal set of conductive entities whose electricity cells
//! touch. Everything in one circuit charges and discharges together.

use crate::entities::{Cell, Conductive, Footprint};
use hecs::{Entity, World};
use std::collections::{HashMap, HashSet, VecDeque};

/// Splits the conductive entities of a level into connected components.
///
/// Implementations must return a partition: every `Conductive` entity in
/// exactly one component.
pub trait ConnectivityAnalyzer {
    fn find_conductive_components(&self, world: &World) -> Vec<Vec<Entity>>;
}

/// Default analyzer: entities connect when an electricity cell of one
/// equals or is orthogonally adjacent to an electricity cell of the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchingCircuits;

const NEIGHBOR_OFFSETS: [Cell; 5] = [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)];

impl ConnectivityAnalyzer for TouchingCircuits {
    fn find_conductive_components(&self, world: &World) -> Vec<Vec<Entity>> {
        let mut conductors: Vec<(Entity, Vec<Cell>)> = world
            .query::<(&Footprint, &Conductive)>()
            .iter()
            .map(|(entity, (footprint, _))| (entity, footprint.electricity.clone()))
            .collect();
        conductors.sort_by_key(|(entity, _)| entity.id());

        // cell → conductors with an electricity cell there
        let mut by_cell: HashMap<Cell, Vec<usize>> = HashMap::new();
        for (i, (_, cells)) in conductors.iter().enumerate() {
            for &cell in cells {
                by_cell.entry(cell).or_default().push(i);
            }
        }

        let mut visited: HashSet<usize> = HashSet::new();
        let mut components = Vec::new();

        for seed in 0..conductors.len() {
            if !visited.insert(seed) {
                continue;
            }
            let mut members = vec![seed];
            let mut queue = VecDeque::from([seed]);

            while let Some(current) = queue.pop_front() {
                for &(x, y) in &conductors[current].1 {
                    for (dx, dy) in NEIGHBOR_OFFSETS {
                        let Some(touching) = by_cell.get(&(x + dx, y + dy)) else {
                            continue;
                        };
                        for &other in touching {
                            if visited.insert(other) {
                                members.push(other);
                                queue.push_back(other);
                            }
                        }
                    }
                }
            }

            members.sort_unstable();
            components.push(members.into_iter().map(|i| conductors[i].0).collect());
        }

        log::debug!(
            "Found {} circuits across {} conductive entities",
            components.len(),
            conductors.len()
        );
        components
    }
}
