//! Horde director: wave-based monster spawning.
//!
//! Every due spawn picks a creature kind for the current round from the
//! creature table, a spawn spot that can hold it, and an item it will drop on
//! death. The new monster immediately targets the closest live player.
//!
//! Pacing:
//! - Warmup: one spawn every few seconds while the alive count is under the cap.
//! - In round: a spawn every 0.3-0.5 s until the round's quota is out, then the
//!   "all spawned" latch holds until the next round. Failed placements retry
//!   after a fixed delay.
//! - Idle: nothing spawns.

use bevy::math::Vec3;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::plugin::engine_tick_system;
use crate::engine::{EngineResource, GameTime, HordeSettings, MonsterWorld};
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;
use crate::monster::ai;
use crate::selection::{self, WeightedEntry};
use crate::spawn::{self, SpawnQuery};

pub struct HordePlugin {
    pub settings: HordeSettings,
    pub spots: Vec<SpawnSpot>,
}

impl Plugin for HordePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(HordeDirector::new(self.settings.clone(), self.spots.clone()))
            .add_event::<HordeEvent>()
            .add_systems(FixedUpdate, horde_tick_system.after(engine_tick_system));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HordePhase {
    Warmup,
    InRound,
    #[default]
    Idle,
}

/// Map-placed location monsters may appear at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpot {
    pub origin: Vec3,
    pub yaw: f32,
}

impl SpawnSpot {
    pub fn new(origin: Vec3, yaw: f32) -> Self {
        Self { origin, yaw }
    }
}

#[derive(Event, Debug, Clone, PartialEq)]
pub enum HordeEvent {
    MonsterSpawned {
        actor: ActorHandle,
        kind: String,
        item: Option<String>,
    },
    AllSpawned {
        round: u32,
    },
    RoundCleared {
        round: u32,
    },
}

// =====================================================
// Selection
// =====================================================

/// Creature kind for `progress`. Table rows naming a kind the registry does
/// not know are weighted out instead of failing at construction time.
pub fn pick_creature_kind(world: &mut MonsterWorld, progress: u32) -> Option<String> {
    let tables = world.tables();
    let kinds = world.kinds().clone();
    let registered = |entry: &WeightedEntry, weight: f32| {
        if kinds.get(&entry.id).is_some() {
            weight
        } else {
            0.0
        }
    };
    let draw = world.random();
    selection::pick_with_draw(&tables.creatures, progress, draw, Some(&registered))
        .map(|entry| entry.id.clone())
}

/// Item a monster spawned at `progress` will carry
pub fn pick_item_drop(world: &mut MonsterWorld, progress: u32) -> Option<String> {
    let tables = world.tables();
    let draw = world.random();
    selection::pick_with_draw(&tables.items, progress, draw, None).map(|entry| entry.id.clone())
}

// =====================================================
// Queries
// =====================================================

pub fn alive_count(world: &MonsterWorld) -> usize {
    world.live_monster_count()
}

pub fn all_monsters_dead(world: &MonsterWorld) -> bool {
    alive_count(world) == 0
}

/// Any live actor overlapping `bbox` placed at `origin`
fn spot_occupied(world: &MonsterWorld, origin: Vec3, bbox: &BoundingBox) -> bool {
    let (lo, hi) = bbox.absolute(origin);
    world.actors().any(|(_, a)| {
        if !a.is_alive() {
            return false;
        }
        let (a_lo, a_hi) = a.bbox.absolute(a.origin);
        lo.cmplt(a_hi).all() && hi.cmpgt(a_lo).all()
    })
}

// =====================================================
// Director
// =====================================================

#[derive(Resource, Debug, Clone)]
pub struct HordeDirector {
    pub settings: HordeSettings,
    pub spots: Vec<SpawnSpot>,
    phase: HordePhase,
    round: u32,
    next_spawn_at: GameTime,
    remaining: u32,
    all_spawned: bool,
}

impl HordeDirector {
    pub fn new(settings: HordeSettings, spots: Vec<SpawnSpot>) -> Self {
        Self {
            settings,
            spots,
            phase: HordePhase::Idle,
            round: 0,
            next_spawn_at: GameTime::ZERO,
            remaining: 0,
            all_spawned: false,
        }
    }

    pub fn phase(&self) -> HordePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn all_spawned(&self) -> bool {
        self.all_spawned
    }

    pub fn next_spawn_at(&self) -> GameTime {
        self.next_spawn_at
    }

    pub fn start_warmup(&mut self, now: GameTime) {
        self.phase = HordePhase::Warmup;
        self.all_spawned = false;
        self.next_spawn_at = now;
    }

    /// Begin round `round` with `quota` monsters to spawn
    pub fn start_round(&mut self, round: u32, quota: u32, now: GameTime) {
        info!(round, quota, "horde round started");
        self.phase = HordePhase::InRound;
        self.round = round;
        self.remaining = quota;
        self.all_spawned = quota == 0;
        self.next_spawn_at = now;
    }

    pub fn stop(&mut self) {
        self.phase = HordePhase::Idle;
    }

    /// Spawn at most one monster if one is due
    pub fn run_spawning(&mut self, world: &mut MonsterWorld) -> Vec<HordeEvent> {
        let mut events = Vec::new();
        let warmup = match self.phase {
            HordePhase::Idle => return events,
            HordePhase::Warmup => true,
            HordePhase::InRound => false,
        };
        if warmup && alive_count(world) >= self.settings.warmup_monster_cap {
            return events;
        }
        if self.all_spawned {
            return events;
        }
        let now = world.time();
        if now < self.next_spawn_at {
            return events;
        }

        let Some((kind, point, yaw)) = self.place(world) else {
            let retry = if warmup {
                self.settings.warmup_interval_secs
            } else {
                self.settings.retry_interval_secs
            };
            debug!(round = self.round, retry, "no spawn spot available");
            self.next_spawn_at = now.after(retry);
            return events;
        };

        let item = pick_item_drop(world, self.round);
        let Some(actor) = spawn::create_actor(world, &kind, point, yaw) else {
            self.next_spawn_at = now.after(self.settings.retry_interval_secs);
            return events;
        };
        if let Some(a) = world.actor_mut(actor) {
            a.item = item.clone();
        }

        let interval = if warmup {
            self.settings.warmup_interval_secs
        } else {
            let (lo, hi) = self.settings.round_interval_secs;
            world.random_range(lo, hi)
        };
        self.next_spawn_at = now.after(interval);

        if let Some(enemy) = world.closest_player(point) {
            ai::found_target(world, actor, enemy);
        }
        events.push(HordeEvent::MonsterSpawned {
            actor,
            kind,
            item,
        });

        if !warmup {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                info!(round = self.round, "all monsters spawned");
                self.all_spawned = true;
                events.push(HordeEvent::AllSpawned { round: self.round });
            }
        }
        events
    }

    /// Round is over once everything spawned and nothing is left alive
    pub fn round_cleared(&self, world: &MonsterWorld) -> bool {
        self.phase == HordePhase::InRound && self.all_spawned && all_monsters_dead(world)
    }

    /// Pick a kind and a free spot that fits it, starting at a random spot
    fn place(&self, world: &mut MonsterWorld) -> Option<(String, Vec3, f32)> {
        let kind_name = pick_creature_kind(world, self.round)?;
        let kind = world.kinds().get(&kind_name)?;
        let start = world.random_index(self.spots.len())?;
        let gravity = world.gravity();

        for offset in 0..self.spots.len() {
            let spot = self.spots[(start + offset) % self.spots.len()];
            if spot_occupied(world, spot.origin, &kind.bbox) {
                continue;
            }
            let mut query = SpawnQuery::new(spot.origin, kind.bbox)
                .with_gravity(gravity)
                .with_max_move_up(self.settings.max_move_up);
            if kind.flying {
                query = query.without_drop();
            }
            if let Some(point) = spawn::find_spawn_point(&*world, &query) {
                return Some((kind_name, point, spot.yaw));
            }
        }
        None
    }
}

pub fn horde_tick_system(
    mut director: ResMut<HordeDirector>,
    engine_res: Res<EngineResource>,
    mut events: EventWriter<HordeEvent>,
) {
    let Ok(mut world) = engine_res.0.write() else {
        error!("monster world lock poisoned");
        return;
    };
    for event in director.run_spawning(&mut world) {
        events.send(event);
    }
    if director.round_cleared(&world) {
        let round = director.round();
        info!(round, "horde round cleared");
        director.stop();
        events.send(HordeEvent::RoundCleared { round });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::content::SpawnTables;
    use crate::engine::{Actor, EngineConfig};
    use std::sync::Arc;

    fn world() -> MonsterWorld {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 4096.0);
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(floor))
    }

    fn spots() -> Vec<SpawnSpot> {
        (0..4)
            .map(|i| SpawnSpot::new(Vec3::new(i as f32 * 200.0, 0.0, 40.0), 0.0))
            .collect()
    }

    #[test]
    fn test_unregistered_kinds_never_picked() {
        let mut w = world();
        w.set_spawn_tables(SpawnTables {
            creatures: vec![WeightedEntry::new("dragon"), WeightedEntry::new("hound")],
            items: Vec::new(),
        });
        for _ in 0..50 {
            assert_eq!(pick_creature_kind(&mut w, 1).as_deref(), Some("hound"));
        }
        assert_eq!(pick_item_drop(&mut w, 1), None);
    }

    #[test]
    fn test_idle_director_spawns_nothing() {
        let mut w = world();
        let mut director = HordeDirector::new(HordeSettings::default(), spots());
        assert!(director.run_spawning(&mut w).is_empty());
        assert_eq!(w.actor_count(), 0);
    }

    #[test]
    fn test_round_quota_latches() {
        let mut w = world();
        let player = w.spawn_actor(Actor::player(Vec3::new(-3000.0, 0.0, 24.0)));
        let mut director = HordeDirector::new(HordeSettings::default(), spots());
        director.start_round(1, 2, w.time());

        let mut spawned = Vec::new();
        for _ in 0..20 {
            for event in director.run_spawning(&mut w) {
                if let HordeEvent::MonsterSpawned { actor, .. } = event {
                    spawned.push(actor);
                }
            }
            w.run_frame();
        }
        assert_eq!(spawned.len(), 2);
        assert!(director.all_spawned());
        assert_eq!(director.remaining(), 0);
        for actor in &spawned {
            let s = w.monster(*actor).unwrap();
            assert_eq!(s.enemy(), Some(player));
            assert!(w.actor(*actor).unwrap().item.is_some());
        }
        assert!(!director.round_cleared(&w));

        for actor in spawned {
            crate::monster::kill(&mut w, actor, None, 500.0);
        }
        assert!(director.round_cleared(&w));
    }

    #[test]
    fn test_interval_between_spawns() {
        let mut w = world();
        let mut director = HordeDirector::new(HordeSettings::default(), spots());
        director.start_round(1, 10, w.time());
        assert_eq!(director.run_spawning(&mut w).len(), 1);
        let next = director.next_spawn_at();
        assert!(next.since(w.time()) >= 0.3 - 1e-3);
        // not due yet
        assert!(director.run_spawning(&mut w).is_empty());
    }

    #[test]
    fn test_no_spots_retries_later() {
        let mut w = world();
        let mut director = HordeDirector::new(HordeSettings::default(), Vec::new());
        director.start_round(1, 3, w.time());
        assert!(director.run_spawning(&mut w).is_empty());
        assert_eq!(director.next_spawn_at(), w.time().after(1.0));
        assert_eq!(director.remaining(), 3);
    }

    #[test]
    fn test_warmup_cap() {
        let mut w = world();
        let settings = HordeSettings {
            warmup_monster_cap: 1,
            ..Default::default()
        };
        let mut director = HordeDirector::new(settings, spots());
        director.start_warmup(w.time());
        assert_eq!(director.run_spawning(&mut w).len(), 1);
        for _ in 0..60 {
            w.run_frame();
            director.run_spawning(&mut w);
        }
        assert_eq!(alive_count(&w), 1);
    }
}
