//! Headless horde run.
//!
//! Usage: `horde-procedural-core [engine.json] [spawn_tables.ron] [rounds]`
//!
//! Builds a walled arena, drops one player in the middle and lets the horde
//! director spawn waves against it. A brute commander at the north wall calls
//! in reinforcements while it lives. Prints a per-round summary.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bevy::math::Vec3;
use tracing::info;

use horde_core::collision::brush::BrushWorld;
use horde_core::collision::Contents;
use horde_core::content::{KindRegistry, SpawnTables};
use horde_core::engine::{Actor, EngineConfig, MonsterWorld, WorldEvent};
use horde_core::horde::{HordeDirector, HordeEvent, SpawnSpot};
use horde_core::logging::{self, TimingSpan, TracingConfig};
use horde_core::spawn::{self, commander, Commander};

const ARENA_HALF: f32 = 1024.0;
const MAX_ROUND_FRAMES: usize = 3_000;
const REINFORCE_EVERY_FRAMES: usize = 50;
const REINFORCEMENTS: &str = "grunt 1; hound 2; drone 1";

fn arena() -> BrushWorld {
    let wall = Vec3::new(32.0, ARENA_HALF, 256.0);
    BrushWorld::new()
        .with_plane(Vec3::Z, 0.0, ARENA_HALF + 64.0)
        .with_box(
            Vec3::new(ARENA_HALF, -wall.y, 0.0),
            Vec3::new(ARENA_HALF + wall.x, wall.y, wall.z),
            Contents::SOLID,
        )
        .with_box(
            Vec3::new(-ARENA_HALF - wall.x, -wall.y, 0.0),
            Vec3::new(-ARENA_HALF, wall.y, wall.z),
            Contents::SOLID,
        )
        .with_box(
            Vec3::new(-wall.y, ARENA_HALF, 0.0),
            Vec3::new(wall.y, ARENA_HALF + wall.x, wall.z),
            Contents::SOLID,
        )
        .with_box(
            Vec3::new(-wall.y, -ARENA_HALF - wall.x, 0.0),
            Vec3::new(wall.y, -ARENA_HALF, wall.z),
            Contents::SOLID,
        )
}

fn spawn_spots() -> Vec<SpawnSpot> {
    let edge = ARENA_HALF - 96.0;
    [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (0.0, 1.0), (0.0, -1.0)]
        .into_iter()
        .map(|(x, y): (f32, f32)| {
            let origin = Vec3::new(x * edge, y * edge, 48.0);
            SpawnSpot::new(origin, (-origin.y).atan2(-origin.x).to_degrees())
        })
        .collect()
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    EngineConfig::from_json(&text).with_context(|| format!("parsing engine config {path}"))
}

fn load_tables(path: Option<&str>) -> Result<SpawnTables> {
    let Some(path) = path else {
        return Ok(SpawnTables::default_horde());
    };
    let (tables, errors) = SpawnTables::load(Path::new(path))
        .with_context(|| format!("loading spawn tables {path}"))?
        .sanitized();
    for error in &errors {
        logging::log_warn("content", &format!("dropped spawn table row: {error}"));
    }
    Ok(tables)
}

fn main() -> Result<()> {
    logging::init_tracing(&TracingConfig::default());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first().map(String::as_str))?;
    let tables = load_tables(args.get(1).map(String::as_str))?;
    let rounds: u32 = match args.get(2) {
        Some(n) => n.parse().with_context(|| format!("invalid round count {n}"))?,
        None => 3,
    };

    let mut world = MonsterWorld::new(
        &config,
        Arc::new(arena()),
        Arc::new(KindRegistry::with_defaults()),
        Arc::new(tables),
    );
    world.spawn_actor(Actor::player(Vec3::new(0.0, 0.0, 24.0)));
    let boss = spawn::create_actor(&mut world, "brute", Vec3::new(0.0, ARENA_HALF - 160.0, 48.0), 270.0);
    let mut reinforcements = Commander::new(commander::parse_reinforcements(REINFORCEMENTS)?, 6);
    let mut director = HordeDirector::new(config.horde.clone(), spawn_spots());

    info!(seed = config.seed, skill = ?config.skill, rounds, "horde run starting");
    for round in 1..=rounds {
        let _timing = TimingSpan::new("round");
        director.start_round(round, 4 + round * 2, world.time());

        let mut spawned = 0usize;
        let mut reinforced = 0usize;
        let mut deaths = 0usize;
        let mut drops = 0usize;
        let mut frames = 0usize;
        while frames < MAX_ROUND_FRAMES {
            for event in director.run_spawning(&mut world) {
                match event {
                    HordeEvent::MonsterSpawned { .. } => spawned += 1,
                    HordeEvent::AllSpawned { round } => {
                        logging::log_debug("horde", &format!("round {round} fully spawned"));
                    }
                    HordeEvent::RoundCleared { .. } => {}
                }
            }
            if let Some(boss) = boss.filter(|_| frames % REINFORCE_EVERY_FRAMES == 0) {
                if reinforcements.call_reinforcement(&mut world, boss).is_some() {
                    reinforced += 1;
                }
            }
            world.run_frame();
            frames += 1;
            for event in world.drain_events() {
                match event {
                    WorldEvent::Died { .. } => deaths += 1,
                    WorldEvent::ItemDropped { .. } => drops += 1,
                    WorldEvent::ContentError { message, .. } => logging::log_warn("content", &message),
                    _ => {}
                }
            }
            if director.round_cleared(&world) || !world.actors().any(|(_, a)| a.player && a.is_alive()) {
                break;
            }
        }

        info!(
            round,
            spawned,
            reinforced,
            deaths,
            drops,
            alive = world.live_monster_count(),
            secs = world.time().as_secs(),
            "round finished"
        );
        director.stop();
        if frames >= MAX_ROUND_FRAMES {
            logging::log_warn("horde", &format!("round {round} hit the frame limit"));
        }
        if !world.actors().any(|(_, a)| a.player && a.is_alive()) {
            logging::log_info("horde", &format!("player died in round {round}, ending run"));
            break;
        }
    }
    Ok(())
}
