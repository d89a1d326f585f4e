//! SnakeGrid Headless Level Harness
//!
//! Loads the bundled level files and sweeps the interaction index and
//! planner invariants against them and against seeded random levels.
//! Runs entirely in-process with no window or frame loop.
//!
//! Usage:
//!   cargo run -p snakegrid-simtest
//!   cargo run -p snakegrid-simtest -- --verbose
//!   RUST_LOG=debug cargo run -p snakegrid-simtest

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use snakegrid_logic::config::PlannerConfig;
use snakegrid_logic::entities::{Cell, Charge, EntityDef};
use snakegrid_logic::interaction::InteractionKind;
use snakegrid_logic::level::{validate_level, Level, LevelDef};
use snakegrid_logic::planner::{candidate_moves, heuristic, Bounds, SearchParams};
use snakegrid_logic::search::SearchOutcome;

// ── Level files ─────────────────────────────────────────────────────────
const LEVEL_FILES: [(&str, &str); 3] = [
    (
        "tutorial",
        include_str!("../../../data/levels/tutorial.json"),
    ),
    (
        "circuits",
        include_str!("../../../data/levels/circuits.json"),
    ),
    ("chasm", include_str!("../../../data/levels/chasm.json")),
];

#[derive(Debug, Deserialize)]
struct LevelFile {
    #[serde(flatten)]
    level: LevelDef,
    /// Whether the finish should be reachable from the start.
    expect_route: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::init();
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== SnakeGrid Level Harness ===\n");

    let mut results = Vec::new();

    // 1. Level files parse and validate
    let levels = parse_level_files(&mut results);

    // 2. Index invariants on every bundled level
    for file in &levels {
        results.extend(validate_index(&file.level, verbose));
    }

    // 3. Circuit isolation on the circuits level
    if let Some(file) = levels.iter().find(|f| f.level.name == "circuits") {
        results.extend(validate_circuits(&file.level));
    }

    // 4. Start → finish search on every bundled level
    for file in &levels {
        results.extend(validate_route(file, verbose));
    }

    // 5. Planner rules on seeded random levels
    results.extend(validate_random_planner(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Level Files ──────────────────────────────────────────────────────

fn parse_level_files(results: &mut Vec<TestResult>) -> Vec<LevelFile> {
    println!("--- Level Files ---");
    let mut levels = Vec::new();

    for (name, json) in LEVEL_FILES {
        let file: LevelFile = match serde_json::from_str(json) {
            Ok(f) => f,
            Err(e) => {
                results.push(TestResult {
                    name: format!("{}_parse", name),
                    passed: false,
                    detail: format!("JSON parse error: {}", e),
                });
                continue;
            }
        };

        let errors = validate_level(&file.level);
        results.push(TestResult {
            name: format!("{}_valid", name),
            passed: errors.is_empty(),
            detail: if errors.is_empty() {
                format!(
                    "{}×{} with {} entities",
                    file.level.width,
                    file.level.height,
                    file.level.entities.len()
                )
            } else {
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            },
        });
        if errors.is_empty() {
            levels.push(file);
        }
    }

    levels
}

// ── 2. Index Invariants ─────────────────────────────────────────────────

/// Every cell of the level plus a margin, so untouched cells get checked too.
fn sweep_cells(def: &LevelDef) -> Vec<Cell> {
    let mut cells = Vec::new();
    for x in -2..=def.width + 3 {
        for y in -2..=def.height + 3 {
            cells.push((x, y));
        }
    }
    cells
}

fn snapshot(level: &Level, cells: &[Cell]) -> Vec<(Vec<InteractionKind>, Vec<usize>)> {
    cells
        .iter()
        .map(|&(x, y)| {
            (
                level.interactions(x, y).into_iter().collect(),
                level.index().group_ids_at(x, y).to_vec(),
            )
        })
        .collect()
}

fn validate_index(def: &LevelDef, verbose: bool) -> Vec<TestResult> {
    println!("--- Index: {} ---", def.name);
    let mut results = Vec::new();
    let cells = sweep_cells(def);

    let mut level = match Level::load(def.clone()) {
        Ok(l) => l,
        Err(errors) => {
            results.push(TestResult {
                name: format!("{}_load", def.name),
                passed: false,
                detail: format!("{} validation errors", errors.len()),
            });
            return results;
        }
    };

    // Cells outside every entity footprint report nothing
    let touched: std::collections::HashSet<Cell> =
        def.entities.iter().flat_map(EntityDef::all_cells).collect();
    let noisy = cells
        .iter()
        .filter(|c| !touched.contains(c))
        .filter(|&&(x, y)| !level.interactions(x, y).is_empty())
        .count();
    results.push(TestResult {
        name: format!("{}_sparse", def.name),
        passed: noisy == 0,
        detail: format!("{} untouched cells report effects", noisy),
    });

    // Food round trip restores the exact cell contents
    let initial = snapshot(&level, &cells);
    let food_before = level.remaining_food();
    for &(x, y) in &cells {
        level.set_food_eaten(x, y, true);
    }
    let eaten_all = level.remaining_food() == 0;
    for &(x, y) in &cells {
        level.set_food_eaten(x, y, false);
    }
    results.push(TestResult {
        name: format!("{}_food_round_trip", def.name),
        passed: eaten_all && snapshot(&level, &cells) == initial,
        detail: format!("{} food eaten and restored", food_before),
    });

    // Repeated toggles change nothing further
    for &(x, y) in &cells {
        level.set_charge(x, y, true);
        level.set_food_eaten(x, y, true);
    }
    let once = snapshot(&level, &cells);
    for &(x, y) in &cells {
        level.set_charge(x, y, true);
        level.set_food_eaten(x, y, true);
    }
    results.push(TestResult {
        name: format!("{}_idempotent", def.name),
        passed: snapshot(&level, &cells) == once,
        detail: "second charge/eat pass is a no-op".into(),
    });

    // Charge toggles leave walls and food alone
    level.restart();
    let walls = level.index().cells_with(InteractionKind::Wall);
    let food = level.index().cells_with(InteractionKind::Food);
    for &(x, y) in &cells {
        level.set_charge(x, y, true);
    }
    for &(x, y) in &cells {
        level.set_charge(x, y, false);
    }
    let untouched = level.index().cells_with(InteractionKind::Wall) == walls
        && level.index().cells_with(InteractionKind::Food) == food;
    results.push(TestResult {
        name: format!("{}_charge_exclusive", def.name),
        passed: untouched,
        detail: format!("{} wall cells, {} food cells", walls.len(), food.len()),
    });

    if verbose {
        println!(
            "  {} groups, {} occupied cells",
            level.index().group_count(),
            level.index().occupied_cells().count()
        );
    }

    results
}

// ── 3. Circuits ─────────────────────────────────────────────────────────

fn validate_circuits(def: &LevelDef) -> Vec<TestResult> {
    println!("--- Circuits ---");
    let mut results = Vec::new();
    let Ok(mut level) = Level::load(def.clone()) else {
        return results;
    };

    let charged_count = |level: &Level| {
        level
            .world()
            .query::<&Charge>()
            .iter()
            .filter(|(_, c)| c.charged)
            .count()
    };
    let baseline = charged_count(&level);

    // (2,2)-(3,2) and (4,2) touch; (6,1) is on its own
    level.set_charge(2, 2, true);
    let joined = level.interactions(4, 2).contains(&InteractionKind::Charge);
    let isolated = level.interactions(6, 1).is_empty();
    results.push(TestResult {
        name: "circuits_propagation".into(),
        passed: joined && isolated,
        detail: format!("joined={} isolated={}", joined, isolated),
    });

    results.push(TestResult {
        name: "circuits_entity_flags".into(),
        passed: charged_count(&level) == baseline + 2,
        detail: format!("{} → {} charged entities", baseline, charged_count(&level)),
    });

    // Battery is not conductive: always charged, never toggled
    level.set_charge(1, 1, false);
    results.push(TestResult {
        name: "circuits_static_battery".into(),
        passed: level.interactions(1, 1).contains(&InteractionKind::Charge),
        detail: "static charge survives a discharge".into(),
    });

    results
}

// ── 4. Routes ───────────────────────────────────────────────────────────

fn validate_route(file: &LevelFile, verbose: bool) -> Vec<TestResult> {
    let def = &file.level;
    println!("--- Route: {} ---", def.name);
    let mut results = Vec::new();
    let Ok(level) = Level::load(def.clone()) else {
        return results;
    };

    let Some(&finish) = level.finish_cells().first() else {
        results.push(TestResult {
            name: format!("{}_has_finish", def.name),
            passed: false,
            detail: "no finish cell".into(),
        });
        return results;
    };

    let outcome = level.plan_to(def.start, finish);
    let found = matches!(outcome, SearchOutcome::Found(_));
    results.push(TestResult {
        name: format!("{}_route", def.name),
        passed: found == file.expect_route,
        detail: match &outcome {
            SearchOutcome::Found(plan) => format!("{} moves to {:?}", plan.len(), finish),
            SearchOutcome::Exhausted => "no route".into(),
            SearchOutcome::BudgetExceeded { expansions } => {
                format!("gave up after {} expansions", expansions)
            }
        },
    });

    if let (true, SearchOutcome::Found(plan)) = (verbose, &outcome) {
        println!("  {:?}", plan.moves);
    }

    results
}

// ── 5. Random Planner Sweep ─────────────────────────────────────────────

fn random_level(rng: &mut StdRng, seed: u64) -> LevelDef {
    let width = rng.gen_range(4..=9);
    let height = rng.gen_range(4..=9);
    let mut entities = Vec::new();
    for x in 0..=width + 1 {
        entities.push(EntityDef::block(x, height + 1));
    }
    for _ in 0..rng.gen_range(0..=12) {
        let x = rng.gen_range(1..=width);
        let y = rng.gen_range(1..=height);
        entities.push(match rng.gen_range(0..4) {
            0 => EntityDef::block(x, y),
            1 => EntityDef::food(x, y),
            2 => EntityDef::spikes(x, y),
            _ => EntityDef::wire(&[(x, y)], rng.gen_bool(0.5)),
        });
    }
    LevelDef {
        name: format!("random_{}", seed),
        width,
        height,
        start: (1, 1),
        entities,
        planner: PlannerConfig::default(),
    }
}

fn validate_random_planner(verbose: bool) -> Vec<TestResult> {
    println!("--- Random Planner Sweep ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let mut checked = 0usize;
    let mut violations: Vec<String> = Vec::new();

    for seed in 0..100u64 {
        let def = random_level(&mut rng, seed);
        let Ok(level) = Level::load(def.clone()) else {
            violations.push(format!("{} failed to load", def.name));
            continue;
        };
        let bounds = Bounds::new(def.width, def.height);

        for _ in 0..20 {
            let cell = (rng.gen_range(1..=def.width), rng.gen_range(1..=def.height));
            let parent = match rng.gen_range(0..3) {
                0 => None,
                1 => Some((cell.0 - 1, cell.1)),
                _ => Some((cell.0 + 1, cell.1)),
            };
            let max_depth = rng.gen_range(1..=6);
            let depth = rng.gen_range(0..max_depth);
            let params = SearchParams {
                destination: (rng.gen_range(1..=def.width), rng.gen_range(1..=def.height)),
                allow_up: rng.gen_bool(0.5),
                bounds,
                max_depth,
            };
            let moves = candidate_moves(cell, parent, depth, &params, level.index());
            checked += 1;

            for c in &moves {
                let (x, y) = c.cell;
                let here = level.interactions(x, y);
                if !bounds.contains(c.cell) {
                    violations.push(format!("{}: {:?} out of bounds", def.name, c.cell));
                }
                if Some(c.cell) == parent {
                    violations.push(format!("{}: {:?} reverses", def.name, c.cell));
                }
                if here.contains(&InteractionKind::Wall) && !here.contains(&InteractionKind::Food)
                {
                    violations.push(format!("{}: {:?} is solid", def.name, c.cell));
                }
                if depth + 1 == max_depth
                    && !level.interactions(x, y + 1).contains(&InteractionKind::Wall)
                {
                    violations.push(format!("{}: {:?} unsupported", def.name, c.cell));
                }
            }
            let ordered = moves.windows(2).all(|w| {
                heuristic(w[0].cell, params.destination) <= heuristic(w[1].cell, params.destination)
            });
            if !ordered {
                violations.push(format!("{}: candidates out of order at {:?}", def.name, cell));
            }
        }
    }

    results.push(TestResult {
        name: "random_planner_rules".into(),
        passed: violations.is_empty(),
        detail: if violations.is_empty() {
            format!("{} candidate lists checked", checked)
        } else {
            format!("{} violations, first: {}", violations.len(), violations[0])
        },
    });

    if verbose && !violations.is_empty() {
        for v in violations.iter().take(10) {
            println!("  {}", v);
        }
    }

    results
}
