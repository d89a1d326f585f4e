//! Per-cell interaction index.
//!
//! `InteractionIndex` precomputes which effects apply at each grid cell and
//! keeps that answer current as circuits are charged and food is eaten.
//!
//! Two tables back it:
//! - the group arena: `GroupId` → [`InteractionGroup`]. Ids `0..=9` are
//!   reserved for always-static categories (wall, hazard, charge, finish,
//!   food); ids from [`FIRST_DYNAMIC_ID`] up are handed out per index for
//!   food instances and circuits.
//! - the position index: cell → ordered group ids present there.
//!
//! A cell's effects are the current kinds of the groups registered there.
//! Toggling a group changes every cell it covers at once.

use crate::entities::{Cell, Charge, Conductive, Edible, Footprint, GridPos, InteractRole};
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type GroupId = usize;

/// Effect observed at a cell. Discriminants double as reserved group ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// What a charge-driven group reports while discharged, or food once eaten.
    Nothing = 0,
    Wall = 1,
    Hazard = 2,
    Charge = 3,
    Finish = 4,
    Food = 5,
}

impl InteractionKind {
    /// Reserved group id of the static group for this kind.
    pub const fn reserved_id(self) -> GroupId {
        self as GroupId
    }
}

pub const WALL_ID: GroupId = InteractionKind::Wall.reserved_id();
pub const HAZARD_ID: GroupId = InteractionKind::Hazard.reserved_id();
pub const CHARGE_ID: GroupId = InteractionKind::Charge.reserved_id();
pub const FINISH_ID: GroupId = InteractionKind::Finish.reserved_id();
pub const FOOD_ID: GroupId = InteractionKind::Food.reserved_id();

/// First id handed out to per-level groups.
pub const FIRST_DYNAMIC_ID: GroupId = 10;

/// How a group's kind reacts to toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBehavior {
    /// Never changes.
    Static,
    /// `Wall` when charged, `Nothing` when not.
    Wall,
    /// `Hazard` when charged, `Nothing` when not.
    Hazard,
    /// `Charge` when charged, `Nothing` when not.
    Charge,
    /// `Food` until eaten, then `Nothing`.
    Food,
}

impl GroupBehavior {
    /// Kind reported while charged, for charge-driven behaviors.
    pub fn charged_kind(self) -> Option<InteractionKind> {
        match self {
            GroupBehavior::Wall => Some(InteractionKind::Wall),
            GroupBehavior::Hazard => Some(InteractionKind::Hazard),
            GroupBehavior::Charge => Some(InteractionKind::Charge),
            GroupBehavior::Static | GroupBehavior::Food => None,
        }
    }
}

/// Entities a group reflects its state onto. Handles only; the world owns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMembers {
    None,
    Food {
        entity: Entity,
        /// Slot the wall marker occupied before eating, so un-eating puts it back.
        wall_slot: Option<usize>,
    },
    Circuit(Vec<Entity>),
}

/// A set of cells sharing one effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionGroup {
    pub kind: InteractionKind,
    pub behavior: GroupBehavior,
    pub members: GroupMembers,
}

impl InteractionGroup {
    fn fixed(kind: InteractionKind) -> Self {
        Self {
            kind,
            behavior: GroupBehavior::Static,
            members: GroupMembers::None,
        }
    }

    /// Entities bound to this group.
    pub fn entities(&self) -> &[Entity] {
        match &self.members {
            GroupMembers::None => &[],
            GroupMembers::Food { entity, .. } => std::slice::from_ref(entity),
            GroupMembers::Circuit(entities) => entities,
        }
    }
}

/// Cell → effect index for one loaded level.
#[derive(Debug, Clone)]
pub struct InteractionIndex {
    groups: Vec<Option<InteractionGroup>>,
    positions: HashMap<Cell, Vec<GroupId>>,
}

impl Default for InteractionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionIndex {
    /// Index with only the reserved static groups and no registered cells.
    pub fn new() -> Self {
        let mut groups: Vec<Option<InteractionGroup>> = vec![None; FIRST_DYNAMIC_ID];
        for kind in [
            InteractionKind::Wall,
            InteractionKind::Hazard,
            InteractionKind::Charge,
            InteractionKind::Finish,
            InteractionKind::Food,
        ] {
            groups[kind.reserved_id()] = Some(InteractionGroup::fixed(kind));
        }
        Self {
            groups,
            positions: HashMap::new(),
        }
    }

    /// Build the index from every static entity in `world` and the
    /// circuits found by a [`crate::connectivity::ConnectivityAnalyzer`].
    ///
    /// `circuits` must partition the world's conductive entities.
    pub fn build(world: &World, circuits: &[Vec<Entity>]) -> Self {
        let mut index = Self::new();

        let mut collision: BTreeSet<Cell> = BTreeSet::new();
        let mut hurt: BTreeSet<Cell> = BTreeSet::new();
        let mut charged: BTreeSet<Cell> = BTreeSet::new();
        let mut finish: BTreeSet<Cell> = BTreeSet::new();

        {
            let mut query = world.query::<(
                &GridPos,
                &Footprint,
                Option<&Charge>,
                Option<&InteractRole>,
            )>();
            let mut statics: Vec<_> = query.iter().collect();
            statics.sort_by_key(|(entity, _)| entity.id());

            for (entity, (pos, footprint, charge, role)) in statics {
                collision.extend(footprint.collision.iter().copied());
                hurt.extend(footprint.hurt.iter().copied());
                if charge.is_some_and(|c| c.charged) {
                    charged.extend(footprint.electricity.iter().copied());
                }

                match role {
                    Some(InteractRole::Food) => {
                        let id = index.push_group(InteractionGroup {
                            kind: InteractionKind::Food,
                            behavior: GroupBehavior::Food,
                            members: GroupMembers::Food {
                                entity,
                                wall_slot: None,
                            },
                        });
                        index.register(pos.cell(), id);
                    }
                    Some(InteractRole::Finish) => {
                        finish.extend(footprint.interact.iter().copied());
                    }
                    None => {}
                }
            }
        }

        for (cells, id) in [
            (&collision, WALL_ID),
            (&hurt, HAZARD_ID),
            (&charged, CHARGE_ID),
            (&finish, FINISH_ID),
        ] {
            for &cell in cells {
                index.register(cell, id);
            }
        }

        for circuit in circuits {
            index.register_circuit(world, GroupBehavior::Charge, circuit);
        }

        log::debug!(
            "Built interaction index: {} groups, {} occupied cells, {} circuits",
            index.group_count(),
            index.positions.len(),
            circuits.len()
        );
        index
    }

    /// Register a charge-driven group over the electricity cells of `entities`.
    ///
    /// Starts in the charged kind if any member is charged. Returns the new id.
    pub fn register_circuit(
        &mut self,
        world: &World,
        behavior: GroupBehavior,
        entities: &[Entity],
    ) -> GroupId {
        debug_assert!(behavior.charged_kind().is_some());

        let mut cells: BTreeSet<Cell> = BTreeSet::new();
        let mut any_charged = false;
        for &entity in entities {
            if let Ok(footprint) = world.get::<&Footprint>(entity) {
                cells.extend(footprint.electricity.iter().copied());
            }
            if let Ok(charge) = world.get::<&Charge>(entity) {
                any_charged |= charge.charged;
            }
            if world.get::<&Conductive>(entity).is_err() {
                log::warn!("Entity {:?} registered in a circuit without Conductive", entity);
            }
        }

        let kind = match behavior.charged_kind() {
            Some(kind) if any_charged => kind,
            _ => InteractionKind::Nothing,
        };
        let id = self.push_group(InteractionGroup {
            kind,
            behavior,
            members: GroupMembers::Circuit(entities.to_vec()),
        });
        for cell in cells {
            self.register(cell, id);
        }
        id
    }

    /// Current effects at `(x, y)`. Empty means nothing happens there.
    pub fn query(&self, x: i32, y: i32) -> BTreeSet<InteractionKind> {
        self.group_ids_at(x, y)
            .iter()
            .map(|&id| self.group(id).kind)
            .filter(|&kind| kind != InteractionKind::Nothing)
            .collect()
    }

    /// True if `(x, y)` currently reports `kind`.
    pub fn has(&self, x: i32, y: i32, kind: InteractionKind) -> bool {
        self.group_ids_at(x, y)
            .iter()
            .any(|&id| self.group(id).kind == kind)
    }

    /// Charge or discharge every charge-driven group at `(x, y)` and mirror
    /// the flag onto their entities.
    pub fn set_charge(&mut self, world: &mut World, x: i32, y: i32, charged: bool) {
        let Some(ids) = self.positions.get(&(x, y)) else {
            return;
        };
        for &id in ids {
            let group = self.groups[id]
                .as_mut()
                .unwrap_or_else(|| panic!("interaction group {id} was never registered"));
            let Some(on_kind) = group.behavior.charged_kind() else {
                continue;
            };
            group.kind = if charged {
                on_kind
            } else {
                InteractionKind::Nothing
            };
            for &entity in group.entities() {
                match world.get::<&mut Charge>(entity) {
                    Ok(mut charge) => charge.charged = charged,
                    Err(_) => log::warn!("Circuit {} lost entity {:?}", id, entity),
                }
            }
            log::trace!("Group {} at ({}, {}) charged={}", id, x, y, charged);
        }
    }

    /// Eat (`eaten = true`) or restore (`eaten = false`) the food at `(x, y)`.
    ///
    /// Eating also drops one wall marker from the cell so it becomes
    /// passable; restoring puts that marker back in its old slot.
    /// Repeating either direction is a no-op.
    pub fn set_food_eaten(&mut self, world: &mut World, x: i32, y: i32, eaten: bool) {
        let Some(ids) = self.positions.get_mut(&(x, y)) else {
            return;
        };
        let food_ids: Vec<GroupId> = ids
            .iter()
            .copied()
            .filter(|&id| id >= FIRST_DYNAMIC_ID)
            .collect();

        for id in food_ids {
            let group = self.groups[id]
                .as_mut()
                .unwrap_or_else(|| panic!("interaction group {id} was never registered"));
            let GroupMembers::Food { entity, wall_slot } = &mut group.members else {
                continue;
            };
            let Ok(mut edible) = world.get::<&mut Edible>(*entity) else {
                log::warn!("Food group {} lost entity {:?}", id, entity);
                continue;
            };

            if eaten && !edible.eaten {
                edible.eaten = true;
                group.kind = InteractionKind::Nothing;
                *wall_slot = ids.iter().position(|&other| other == WALL_ID);
                if let Some(slot) = *wall_slot {
                    ids.remove(slot);
                }
                log::trace!("Food {} at ({}, {}) eaten", id, x, y);
            } else if !eaten && edible.eaten {
                edible.eaten = false;
                group.kind = InteractionKind::Food;
                if let Some(slot) = wall_slot.take() {
                    ids.insert(slot.min(ids.len()), WALL_ID);
                }
                log::trace!("Food {} at ({}, {}) restored", id, x, y);
            }
        }
    }

    /// Group by id.
    ///
    /// # Panics
    /// If `id` was never registered. Ids only come from this index, so a
    /// miss is a bug in the caller.
    pub fn group(&self, id: GroupId) -> &InteractionGroup {
        self.groups
            .get(id)
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("interaction group {id} was never registered"))
    }

    /// Group ids at `(x, y)` in registration order.
    pub fn group_ids_at(&self, x: i32, y: i32) -> &[GroupId] {
        self.positions
            .get(&(x, y))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of registered groups, reserved ones included.
    pub fn group_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_some()).count()
    }

    /// Id the next dynamic group will get.
    pub fn next_group_id(&self) -> GroupId {
        self.groups.len()
    }

    /// Every cell with at least one registered group.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.positions.keys().copied()
    }

    /// Cells currently reporting `kind`, sorted.
    pub fn cells_with(&self, kind: InteractionKind) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .positions
            .iter()
            .filter(|(_, ids)| ids.iter().any(|&id| self.group(id).kind == kind))
            .map(|(&cell, _)| cell)
            .collect();
        cells.sort_unstable();
        cells
    }

    fn push_group(&mut self, group: InteractionGroup) -> GroupId {
        let id = self.groups.len();
        self.groups.push(Some(group));
        id
    }

    fn register(&mut self, cell: Cell, id: GroupId) {
        let ids = self.positions.entry(cell).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{ConnectivityAnalyzer, TouchingCircuits};
    use crate::entities::{spawn_static, EntityDef};

    fn build(defs: &[EntityDef]) -> (World, Vec<Entity>, InteractionIndex) {
        let mut world = World::new();
        let entities: Vec<Entity> = defs.iter().map(|d| spawn_static(&mut world, d)).collect();
        let circuits = TouchingCircuits.find_conductive_components(&world);
        let index = InteractionIndex::build(&world, &circuits);
        (world, entities, index)
    }

    fn kinds(list: &[InteractionKind]) -> BTreeSet<InteractionKind> {
        list.iter().copied().collect()
    }

    #[test]
    fn reserved_groups_exist() {
        let index = InteractionIndex::new();
        assert_eq!(index.group(WALL_ID).kind, InteractionKind::Wall);
        assert_eq!(index.group(HAZARD_ID).kind, InteractionKind::Hazard);
        assert_eq!(index.group(CHARGE_ID).kind, InteractionKind::Charge);
        assert_eq!(index.group(FINISH_ID).kind, InteractionKind::Finish);
        assert_eq!(index.group(FOOD_ID).kind, InteractionKind::Food);
        assert_eq!(index.group_count(), 5);
        assert_eq!(index.next_group_id(), FIRST_DYNAMIC_ID);
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn unknown_group_panics() {
        let index = InteractionIndex::new();
        index.group(42);
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn unused_reserved_slot_panics() {
        let index = InteractionIndex::new();
        index.group(7);
    }

    #[test]
    fn untouched_cells_are_empty() {
        let (_, _, index) = build(&[EntityDef::block(1, 1)]);
        assert!(index.query(2, 2).is_empty());
        assert!(index.query(-50, 1000).is_empty());
        assert!(index.group_ids_at(2, 2).is_empty());
    }

    #[test]
    fn static_effects_are_reported() {
        let (_, _, index) = build(&[
            EntityDef::block(1, 1),
            EntityDef::spikes(2, 1),
            EntityDef::finish(3, 1),
        ]);
        assert_eq!(index.query(1, 1), kinds(&[InteractionKind::Wall]));
        assert_eq!(index.query(2, 1), kinds(&[InteractionKind::Hazard]));
        assert_eq!(index.query(3, 1), kinds(&[InteractionKind::Finish]));
    }

    #[test]
    fn overlapping_statics_register_once() {
        let (_, _, index) = build(&[EntityDef::block(1, 1), EntityDef::block(1, 1)]);
        assert_eq!(index.group_ids_at(1, 1), &[WALL_ID]);
    }

    #[test]
    fn food_reports_wall_and_food() {
        let (_, _, index) = build(&[EntityDef::food(3, 3)]);
        assert_eq!(
            index.query(3, 3),
            kinds(&[InteractionKind::Wall, InteractionKind::Food])
        );
        assert_eq!(index.group_ids_at(3, 3), &[FIRST_DYNAMIC_ID, WALL_ID]);
    }

    #[test]
    fn eating_food_clears_cell() {
        let (mut world, e, mut index) = build(&[EntityDef::food(3, 3)]);
        index.set_food_eaten(&mut world, 3, 3, true);
        assert!(index.query(3, 3).is_empty());
        assert!(world.get::<&Edible>(e[0]).unwrap().eaten);
        assert_eq!(index.group(FIRST_DYNAMIC_ID).kind, InteractionKind::Nothing);
    }

    #[test]
    fn eating_twice_is_noop() {
        // Overlapping solids share a single wall marker; only the first eat drops it
        let mut food = EntityDef::food(3, 3);
        food.hurt = vec![(3, 3)];
        let (mut world, _, mut index) = build(&[food, EntityDef::block(3, 3)]);
        index.set_food_eaten(&mut world, 3, 3, true);
        let after_once = index.group_ids_at(3, 3).to_vec();
        index.set_food_eaten(&mut world, 3, 3, true);
        assert_eq!(index.group_ids_at(3, 3), after_once.as_slice());
        assert_eq!(after_once, vec![FIRST_DYNAMIC_ID, HAZARD_ID]);
    }

    #[test]
    fn food_round_trip_restores_order() {
        let mut food = EntityDef::food(3, 3);
        food.hurt = vec![(3, 3)];
        let (mut world, e, mut index) = build(&[food, EntityDef::finish(3, 3)]);
        let before_ids = index.group_ids_at(3, 3).to_vec();
        let before = index.query(3, 3);
        assert_eq!(before_ids, vec![FIRST_DYNAMIC_ID, WALL_ID, HAZARD_ID, FINISH_ID]);

        index.set_food_eaten(&mut world, 3, 3, true);
        assert_eq!(
            index.query(3, 3),
            kinds(&[InteractionKind::Hazard, InteractionKind::Finish])
        );
        index.set_food_eaten(&mut world, 3, 3, false);

        assert_eq!(index.group_ids_at(3, 3), before_ids.as_slice());
        assert_eq!(index.query(3, 3), before);
        assert!(!world.get::<&Edible>(e[0]).unwrap().eaten);
    }

    #[test]
    fn restoring_uneaten_food_is_noop() {
        let (mut world, _, mut index) = build(&[EntityDef::food(3, 3)]);
        index.set_food_eaten(&mut world, 3, 3, false);
        assert_eq!(index.group_ids_at(3, 3), &[FIRST_DYNAMIC_ID, WALL_ID]);
    }

    #[test]
    fn food_without_wall_marker_still_flips() {
        let mut food = EntityDef::food(4, 4);
        food.collision.clear();
        let (mut world, _, mut index) = build(&[food]);
        index.set_food_eaten(&mut world, 4, 4, true);
        assert!(index.query(4, 4).is_empty());
        index.set_food_eaten(&mut world, 4, 4, false);
        assert_eq!(index.query(4, 4), kinds(&[InteractionKind::Food]));
    }

    #[test]
    fn charged_entity_fills_static_charge() {
        let mut battery = EntityDef::wire(&[(5, 5)], true);
        battery.conductive = false;
        let (_, _, index) = build(&[battery]);
        assert_eq!(index.query(5, 5), kinds(&[InteractionKind::Charge]));
        assert_eq!(index.group_ids_at(5, 5), &[CHARGE_ID]);
    }

    #[test]
    fn circuit_starts_from_member_charge() {
        let (_, _, index) = build(&[
            EntityDef::wire(&[(1, 1)], false),
            EntityDef::wire(&[(9, 9)], false),
        ]);
        assert!(index.query(1, 1).is_empty());
        assert_eq!(index.group_ids_at(1, 1), &[FIRST_DYNAMIC_ID]);
        assert_eq!(index.group_ids_at(9, 9), &[FIRST_DYNAMIC_ID + 1]);
    }

    #[test]
    fn charging_propagates_across_circuit() {
        let (mut world, e, mut index) = build(&[
            EntityDef::wire(&[(1, 1), (2, 1)], false),
            EntityDef::wire(&[(3, 1)], false),
        ]);
        index.set_charge(&mut world, 1, 1, true);
        assert_eq!(index.query(3, 1), kinds(&[InteractionKind::Charge]));
        assert!(world.get::<&Charge>(e[0]).unwrap().charged);
        assert!(world.get::<&Charge>(e[1]).unwrap().charged);

        index.set_charge(&mut world, 3, 1, false);
        assert!(index.query(1, 1).is_empty());
        assert!(!world.get::<&Charge>(e[0]).unwrap().charged);
    }

    #[test]
    fn separate_circuits_toggle_independently() {
        let (mut world, e, mut index) = build(&[
            EntityDef::wire(&[(1, 1)], false),
            EntityDef::wire(&[(6, 6)], false),
        ]);
        index.set_charge(&mut world, 1, 1, true);
        assert!(world.get::<&Charge>(e[0]).unwrap().charged);
        assert!(!world.get::<&Charge>(e[1]).unwrap().charged);
        assert!(index.query(6, 6).is_empty());
    }

    #[test]
    fn set_charge_is_idempotent() {
        let (mut world, _, mut index) = build(&[EntityDef::wire(&[(1, 1)], false)]);
        index.set_charge(&mut world, 1, 1, true);
        let once = index.query(1, 1);
        let once_ids = index.group_ids_at(1, 1).to_vec();
        index.set_charge(&mut world, 1, 1, true);
        assert_eq!(index.query(1, 1), once);
        assert_eq!(index.group_ids_at(1, 1), once_ids.as_slice());
    }

    #[test]
    fn charge_leaves_food_and_walls_alone() {
        let mut wire = EntityDef::wire(&[(2, 2)], false);
        wire.collision = vec![(2, 2)];
        let (mut world, e, mut index) = build(&[EntityDef::food(2, 2), wire]);
        index.set_charge(&mut world, 2, 2, true);
        assert_eq!(
            index.query(2, 2),
            kinds(&[
                InteractionKind::Wall,
                InteractionKind::Charge,
                InteractionKind::Food
            ])
        );
        assert!(!world.get::<&Edible>(e[0]).unwrap().eaten);

        index.set_food_eaten(&mut world, 2, 2, true);
        assert!(index.has(2, 2, InteractionKind::Charge));
        assert!(world.get::<&Charge>(e[1]).unwrap().charged);
    }

    #[test]
    fn wrong_toggle_on_plain_cell_is_noop() {
        let (mut world, _, mut index) = build(&[EntityDef::block(1, 1), EntityDef::spikes(2, 2)]);
        index.set_charge(&mut world, 1, 1, false);
        index.set_food_eaten(&mut world, 2, 2, true);
        index.set_food_eaten(&mut world, 8, 8, true);
        assert_eq!(index.query(1, 1), kinds(&[InteractionKind::Wall]));
        assert_eq!(index.query(2, 2), kinds(&[InteractionKind::Hazard]));
    }

    #[test]
    fn wall_behavior_circuit_flips_wall() {
        let mut world = World::new();
        let gate = spawn_static(&mut world, &EntityDef::wire(&[(4, 4)], true));
        let mut index = InteractionIndex::new();
        index.register_circuit(&world, GroupBehavior::Wall, &[gate]);
        assert_eq!(index.query(4, 4), kinds(&[InteractionKind::Wall]));
        index.set_charge(&mut world, 4, 4, false);
        assert!(index.query(4, 4).is_empty());
        assert!(!world.get::<&Charge>(gate).unwrap().charged);
    }

    #[test]
    fn dynamic_ids_are_monotonic() {
        let (_, _, index) = build(&[
            EntityDef::food(1, 1),
            EntityDef::food(2, 1),
            EntityDef::wire(&[(5, 5)], false),
        ]);
        assert_eq!(index.group_ids_at(1, 1)[0], FIRST_DYNAMIC_ID);
        assert_eq!(index.group_ids_at(2, 1)[0], FIRST_DYNAMIC_ID + 1);
        assert_eq!(index.group_ids_at(5, 5), &[FIRST_DYNAMIC_ID + 2]);
        assert_eq!(index.next_group_id(), FIRST_DYNAMIC_ID + 3);
    }

    #[test]
    fn cells_with_tracks_toggles() {
        let (mut world, _, mut index) = build(&[EntityDef::food(1, 1), EntityDef::food(2, 1)]);
        assert_eq!(index.cells_with(InteractionKind::Food), vec![(1, 1), (2, 1)]);
        index.set_food_eaten(&mut world, 1, 1, true);
        assert_eq!(index.cells_with(InteractionKind::Food), vec![(2, 1)]);
        assert_eq!(index.cells_with(InteractionKind::Wall), vec![(2, 1)]);
    }
}
