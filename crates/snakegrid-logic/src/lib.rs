//! Pure level logic for SnakeGrid.
//!
//! This crate holds everything about a level that does not need a window:
//! which effect applies at each cell, how circuits and food change that, and
//! how the agent plans moves across it. Functions take plain data and an
//! `hecs::World` of static entities, so they are unit-testable and usable
//! from the game, the headless harness, or tooling.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Planner configuration and validation |
//! | [`connectivity`] | Partitioning conductive entities into circuits |
//! | [`entities`] | Static entity components and spawn helpers |
//! | [`interaction`] | Per-cell interaction index with charge/food toggles |
//! | [`level`] | Level definition, validation, load and restart |
//! | [`planner`] | Move candidates for one search node |
//! | [`search`] | Iterative-deepening backtracking over planner nodes |

pub mod config;
pub mod connectivity;
pub mod entities;
pub mod interaction;
pub mod level;
pub mod planner;
pub mod search;
