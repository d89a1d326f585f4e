//! Static level entities as ECS components.
//!
//! Shape geometry lives outside this crate: an entity arrives with its
//! coordinate sets already resolved, and the index only reads those sets
//! plus the `Charge` / `Edible` flags. Entities live in a caller-owned
//! `hecs::World`; everything else holds `hecs::Entity` handles into it.

use hecs::{Entity, EntityBuilder, World};
use serde::{Deserialize, Serialize};

/// Grid cell as `(x, y)`. `y` grows downward.
pub type Cell = (i32, i32);

/// Anchor cell of an entity. Food registers its group here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn cell(&self) -> Cell {
        (self.x, self.y)
    }
}

/// Cells an entity occupies, split by effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Cells that block movement.
    pub collision: Vec<Cell>,
    /// Cells that damage whatever enters them.
    pub hurt: Vec<Cell>,
    /// Cells that carry current when the entity is charged.
    pub electricity: Vec<Cell>,
    /// Cells where the entity's role (food, finish) applies.
    pub interact: Vec<Cell>,
}

/// Charge flag, mirrored from the entity's conductive group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub charged: bool,
}

/// Marker: the entity is part of the circuit network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conductive;

/// Eaten flag, only present on food.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edible {
    pub eaten: bool,
}

/// What touching the entity's interact cells does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractRole {
    Food,
    Finish,
}

/// Serializable description of one static entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub collision: Vec<Cell>,
    #[serde(default)]
    pub hurt: Vec<Cell>,
    #[serde(default)]
    pub electricity: Vec<Cell>,
    #[serde(default)]
    pub interact: Vec<Cell>,
    #[serde(default)]
    pub charge: bool,
    #[serde(default)]
    pub conductive: bool,
    #[serde(default)]
    pub role: Option<InteractRole>,
}

impl EntityDef {
    /// Solid one-cell block at `(x, y)`.
    pub fn block(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            collision: vec![(x, y)],
            ..Default::default()
        }
    }

    /// Uneaten food at `(x, y)`. Blocks its cell until eaten.
    pub fn food(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            collision: vec![(x, y)],
            interact: vec![(x, y)],
            role: Some(InteractRole::Food),
            ..Default::default()
        }
    }

    /// Finish tile at `(x, y)`.
    pub fn finish(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            interact: vec![(x, y)],
            role: Some(InteractRole::Finish),
            ..Default::default()
        }
    }

    /// Spike-style hazard at `(x, y)`.
    pub fn spikes(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            hurt: vec![(x, y)],
            ..Default::default()
        }
    }

    /// Conductive wire covering `cells`, anchored at the first cell.
    pub fn wire(cells: &[Cell], charged: bool) -> Self {
        let (x, y) = cells.first().copied().unwrap_or((0, 0));
        Self {
            x,
            y,
            electricity: cells.to_vec(),
            charge: charged,
            conductive: true,
            ..Default::default()
        }
    }

    /// Every cell this entity touches, for bounds checks.
    pub fn all_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        std::iter::once((self.x, self.y))
            .chain(self.collision.iter().copied())
            .chain(self.hurt.iter().copied())
            .chain(self.electricity.iter().copied())
            .chain(self.interact.iter().copied())
    }
}

/// Spawn a static entity described by `def` into `world`.
pub fn spawn_static(world: &mut World, def: &EntityDef) -> Entity {
    let footprint = Footprint {
        collision: def.collision.clone(),
        hurt: def.hurt.clone(),
        electricity: def.electricity.clone(),
        interact: def.interact.clone(),
    };
    let mut builder = EntityBuilder::new();
    builder
        .add(GridPos::new(def.x, def.y))
        .add(footprint)
        .add(Charge {
            charged: def.charge,
        });
    if def.conductive {
        builder.add(Conductive);
    }
    if let Some(role) = def.role {
        builder.add(role);
        if role == InteractRole::Food {
            builder.add(Edible { eaten: false });
        }
    }
    world.spawn(builder.build())
}

/// Spawn every entity in `defs`, returning handles in input order.
pub fn spawn_all(world: &mut World, defs: &[EntityDef]) -> Vec<Entity> {
    defs.iter().map(|def| spawn_static(world, def)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_gets_edible_component() {
        let mut world = World::new();
        let food = spawn_static(&mut world, &EntityDef::food(3, 3));
        assert!(world.get::<&Edible>(food).is_ok());
        assert_eq!(*world.get::<&InteractRole>(food).unwrap(), InteractRole::Food);
        assert!(world.get::<&Conductive>(food).is_err());
    }

    #[test]
    fn wire_is_conductive_and_keeps_charge() {
        let mut world = World::new();
        let wire = spawn_static(&mut world, &EntityDef::wire(&[(1, 1), (2, 1)], true));
        assert!(world.get::<&Conductive>(wire).is_ok());
        assert!(world.get::<&Charge>(wire).unwrap().charged);
        assert_eq!(world.get::<&GridPos>(wire).unwrap().cell(), (1, 1));
    }

    #[test]
    fn block_has_no_role() {
        let mut world = World::new();
        let block = spawn_static(&mut world, &EntityDef::block(0, 0));
        assert!(world.get::<&InteractRole>(block).is_err());
        assert!(world.get::<&Edible>(block).is_err());
    }

    #[test]
    fn all_cells_includes_anchor() {
        let def = EntityDef::spikes(5, 6);
        let cells: Vec<Cell> = def.all_cells().collect();
        assert_eq!(cells, vec![(5, 6), (5, 6)]);
    }
}
