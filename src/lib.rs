//! Horde Procedural Core
//!
//! Deterministic monster behavior and procedural spawning for wave-based
//! arena play:
//! - Animation-frame state machine driving every monster (Moves, hooks)
//! - Per-kind behavior tables, attack arbitration, pain gating, leap attacks
//! - Gravity-aware spawn point validation
//! - Weighted-random creature and item selection over progress bands
//! - Horde director (warmup, rounds, spawn pacing, death drops)
//! - Monte-Carlo balance reports and hot-reloadable spawn tables

pub mod animation;
pub mod attack;
pub mod balance;
pub mod behavior;
pub mod collision;
pub mod combat;
pub mod constants;
pub mod content;
pub mod engine;
pub mod entity;
pub mod geometry;
pub mod horde;
pub mod hotreload;
pub mod leap;
pub mod logging;
pub mod loot;
pub mod monster;
pub mod pain;
pub mod physics;
pub mod selection;
pub mod spawn;
