//! Level lifecycle: definition, validation, load, restart.
//!
//! A [`Level`] owns the entity world and the interaction index built from
//! it. Game logic mutates both through the level; a restart throws both away
//! and rebuilds from the stored definition.

use crate::config::{validate_config, ConfigError, PlannerConfig};
use crate::connectivity::{ConnectivityAnalyzer, TouchingCircuits};
use crate::entities::{spawn_all, Cell, Edible, EntityDef, InteractRole};
use crate::interaction::{InteractionIndex, InteractionKind};
use crate::planner::Bounds;
use crate::search::{plan_path, SearchOutcome};
use hecs::World;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Everything needed to (re)build a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDef {
    pub name: String,
    pub width: i32,
    pub height: i32,
    /// Where the agent starts.
    pub start: Cell,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub planner: PlannerConfig,
}

impl LevelDef {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }
}

/// Level validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// Width or height below 1.
    NonPositiveDimensions { width: i32, height: i32 },
    /// Start cell outside the playable area.
    StartOutOfBounds(Cell),
    /// Entity cell outside the playable area plus its one-cell border.
    EntityOutOfBounds { entity: usize, cell: Cell },
    /// Food that does not block its own cell.
    FoodNotSolid { entity: usize },
    /// Planner configuration rejected.
    Planner(ConfigError),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::NonPositiveDimensions { width, height } => {
                write!(f, "level has non-positive dimensions {}×{}", width, height)
            }
            LevelError::StartOutOfBounds((x, y)) => {
                write!(f, "start ({}, {}) is outside the playable area", x, y)
            }
            LevelError::EntityOutOfBounds {
                entity,
                cell: (x, y),
            } => write!(f, "entity #{} touches ({}, {}) outside the level", entity, x, y),
            LevelError::FoodNotSolid { entity } => {
                write!(f, "food entity #{} does not collide at its own cell", entity)
            }
            LevelError::Planner(e) => write!(f, "planner: {}", e),
        }
    }
}

impl std::error::Error for LevelError {}

/// Validate a level definition, returning all errors found.
pub fn validate_level(def: &LevelDef) -> Vec<LevelError> {
    let mut errors = Vec::new();

    if def.width < 1 || def.height < 1 {
        errors.push(LevelError::NonPositiveDimensions {
            width: def.width,
            height: def.height,
        });
        return errors;
    }

    if !def.bounds().contains(def.start) {
        errors.push(LevelError::StartOutOfBounds(def.start));
    }

    let in_frame = |(x, y): Cell| 0 <= x && x <= def.width + 1 && 0 <= y && y <= def.height + 1;
    for (i, entity) in def.entities.iter().enumerate() {
        if let Some(cell) = entity.all_cells().find(|&c| !in_frame(c)) {
            errors.push(LevelError::EntityOutOfBounds { entity: i, cell });
        }
        if entity.role == Some(InteractRole::Food) && !entity.collision.contains(&(entity.x, entity.y))
        {
            errors.push(LevelError::FoodNotSolid { entity: i });
        }
    }

    errors.extend(validate_config(&def.planner).into_iter().map(LevelError::Planner));
    errors
}

/// A loaded level: entity world plus its interaction index.
pub struct Level {
    def: LevelDef,
    world: World,
    index: InteractionIndex,
}

impl Level {
    /// Validate `def` and build it with the default circuit analyzer.
    pub fn load(def: LevelDef) -> Result<Self, Vec<LevelError>> {
        Self::load_with(def, &TouchingCircuits)
    }

    /// Validate `def` and build it with a custom circuit analyzer.
    pub fn load_with(
        def: LevelDef,
        analyzer: &dyn ConnectivityAnalyzer,
    ) -> Result<Self, Vec<LevelError>> {
        let errors = validate_level(&def);
        if !errors.is_empty() {
            log::warn!("Level '{}' rejected: {} errors", def.name, errors.len());
            return Err(errors);
        }
        let (world, index) = Self::build_state(&def, analyzer);
        log::info!(
            "Loaded level '{}' ({}×{}, {} entities)",
            def.name,
            def.width,
            def.height,
            def.entities.len()
        );
        Ok(Self { def, world, index })
    }

    fn build_state(def: &LevelDef, analyzer: &dyn ConnectivityAnalyzer) -> (World, InteractionIndex) {
        let mut world = World::new();
        spawn_all(&mut world, &def.entities);
        let circuits = analyzer.find_conductive_components(&world);
        let index = InteractionIndex::build(&world, &circuits);
        (world, index)
    }

    /// Discard all runtime state and rebuild from the definition.
    pub fn restart(&mut self) {
        self.restart_with(&TouchingCircuits);
    }

    pub fn restart_with(&mut self, analyzer: &dyn ConnectivityAnalyzer) {
        let (world, index) = Self::build_state(&self.def, analyzer);
        self.world = world;
        self.index = index;
        log::info!("Restarted level '{}'", self.def.name);
    }

    pub fn def(&self) -> &LevelDef {
        &self.def
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn index(&self) -> &InteractionIndex {
        &self.index
    }

    pub fn bounds(&self) -> Bounds {
        self.def.bounds()
    }

    pub fn interactions(&self, x: i32, y: i32) -> BTreeSet<InteractionKind> {
        self.index.query(x, y)
    }

    pub fn set_charge(&mut self, x: i32, y: i32, charged: bool) {
        self.index.set_charge(&mut self.world, x, y, charged);
    }

    pub fn set_food_eaten(&mut self, x: i32, y: i32, eaten: bool) {
        self.index.set_food_eaten(&mut self.world, x, y, eaten);
    }

    /// Food entities not yet eaten.
    pub fn remaining_food(&self) -> usize {
        self.world
            .query::<&Edible>()
            .iter()
            .filter(|(_, edible)| !edible.eaten)
            .count()
    }

    /// Cells that currently report `Finish`.
    pub fn finish_cells(&self) -> Vec<Cell> {
        self.index.cells_with(InteractionKind::Finish)
    }

    /// Search for a move sequence using the level's planner config.
    pub fn plan_to(&self, from: Cell, destination: Cell) -> SearchOutcome {
        plan_path(
            &self.index,
            from,
            destination,
            self.bounds(),
            &self.def.planner,
        )
    }
}
