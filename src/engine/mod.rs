//! Simulation world.
//!
//! [`MonsterWorld`] owns every actor plus the collaborators the behavior
//! code talks to (geometry, locomotion, damage). One call to
//! [`MonsterWorld::run_frame`] is one server frame: the clock advances, then
//! each actor runs its physics step and, when due, its think, in
//! registration order. Effects on an actor later in the order are visible
//! to it in the same frame; earlier actors see them next frame.

pub mod actor;
pub mod clock;
pub mod config;
pub mod plugin;

use std::sync::Arc;

use bevy::math::Vec3;
use bevy::prelude::Event;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, trace, warn};

use crate::collision::{clip_box, CollisionService, Contents, Trace};
use crate::combat::{DamageService, DirectDamage};
use crate::content::{KindRegistry, SpawnTables};
use crate::entity::{ActorHandle, Arena};
use crate::geometry::{normalize_gravity, BoundingBox};
use crate::monster::ActorState;
use crate::physics::{self, Locomotion, StepLocomotion};

pub use actor::{Actor, Contact, Ground, MoveType, ThinkFn, TouchFn};
pub use clock::{GameTime, LevelClock};
pub use config::{EngineConfig, HordeSettings, Skill};
pub use plugin::{EnginePlugin, EngineResource};

/// Outward-facing things that happened during a frame
#[derive(Event, Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Sound {
        actor: ActorHandle,
        sound: &'static str,
    },
    Damage {
        target: ActorHandle,
        attacker: Option<ActorHandle>,
        amount: f32,
        cause: crate::combat::DamageCause,
    },
    Died {
        actor: ActorHandle,
        class_name: String,
    },
    ItemDropped {
        item: String,
        origin: Vec3,
    },
    Spawned {
        actor: ActorHandle,
        class_name: String,
        origin: Vec3,
    },
    /// Grow-in effect at a spawner-created actor
    SpawnEffect {
        origin: Vec3,
        size: f32,
    },
    ContentError {
        actor: Option<ActorHandle>,
        message: String,
    },
}

pub struct MonsterWorld {
    clock: LevelClock,
    actors: Arena<Actor>,
    geometry: Arc<dyn CollisionService + Send + Sync>,
    locomotion: Arc<dyn Locomotion + Send + Sync>,
    damage: Arc<dyn DamageService + Send + Sync>,
    kinds: Arc<KindRegistry>,
    tables: Arc<SpawnTables>,
    skill: Skill,
    gravity: Vec3,
    rng: Xoshiro256PlusPlus,
    events: Vec<WorldEvent>,
}

impl MonsterWorld {
    pub fn new(
        config: &EngineConfig,
        geometry: Arc<dyn CollisionService + Send + Sync>,
        kinds: Arc<KindRegistry>,
        tables: Arc<SpawnTables>,
    ) -> Self {
        Self {
            clock: LevelClock::new(config.frame_time_ms),
            actors: Arena::new(),
            geometry,
            locomotion: Arc::new(StepLocomotion),
            damage: Arc::new(DirectDamage),
            kinds,
            tables,
            skill: config.skill,
            gravity: normalize_gravity(Vec3::from_array(config.gravity)),
            rng: Xoshiro256PlusPlus::seed_from_u64(config.seed),
            events: Vec::new(),
        }
    }

    /// Built-in kinds and tables over the given geometry
    pub fn with_defaults(
        config: &EngineConfig,
        geometry: Arc<dyn CollisionService + Send + Sync>,
    ) -> Self {
        Self::new(
            config,
            geometry,
            Arc::new(KindRegistry::with_defaults()),
            Arc::new(SpawnTables::default_horde()),
        )
    }

    pub fn with_locomotion(mut self, locomotion: Arc<dyn Locomotion + Send + Sync>) -> Self {
        self.locomotion = locomotion;
        self
    }

    pub fn with_damage(mut self, damage: Arc<dyn DamageService + Send + Sync>) -> Self {
        self.damage = damage;
        self
    }

    // =====================================================
    // Clock, settings, shared content
    // =====================================================

    pub fn time(&self) -> GameTime {
        self.clock.now()
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    pub fn frame_secs(&self) -> f32 {
        self.clock.frame_secs()
    }

    pub fn skill(&self) -> Skill {
        self.skill
    }

    pub fn set_skill(&mut self, skill: Skill) {
        self.skill = skill;
    }

    /// Gravity direction given to new actors
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn kinds(&self) -> &Arc<KindRegistry> {
        &self.kinds
    }

    pub fn tables(&self) -> Arc<SpawnTables> {
        self.tables.clone()
    }

    pub fn set_spawn_tables(&mut self, tables: SpawnTables) {
        debug!(
            creatures = tables.creatures.len(),
            items = tables.items.len(),
            "spawn tables replaced"
        );
        self.tables = Arc::new(tables);
    }

    pub fn locomotion(&self) -> Arc<dyn Locomotion + Send + Sync> {
        self.locomotion.clone()
    }

    pub fn damage_service(&self) -> Arc<dyn DamageService + Send + Sync> {
        self.damage.clone()
    }

    // =====================================================
    // Actors
    // =====================================================

    pub fn spawn_actor(&mut self, actor: Actor) -> ActorHandle {
        let handle = self.actors.insert(actor);
        trace!(?handle, "actor registered");
        handle
    }

    pub fn remove_actor(&mut self, handle: ActorHandle) -> Option<Actor> {
        let removed = self.actors.remove(handle);
        if removed.is_some() {
            trace!(?handle, "actor freed");
        }
        removed
    }

    pub fn actor(&self, handle: ActorHandle) -> Option<&Actor> {
        self.actors.get(handle)
    }

    pub fn actor_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        self.actors.get_mut(handle)
    }

    pub fn monster(&self, handle: ActorHandle) -> Option<&ActorState> {
        self.actors.get(handle).and_then(|a| a.monster.as_ref())
    }

    pub fn monster_mut(&mut self, handle: ActorHandle) -> Option<&mut ActorState> {
        self.actors.get_mut(handle).and_then(|a| a.monster.as_mut())
    }

    /// Resolves and is not dead
    pub fn is_alive(&self, handle: ActorHandle) -> bool {
        self.actor(handle).is_some_and(Actor::is_alive)
    }

    pub fn handles(&self) -> Vec<ActorHandle> {
        self.actors.handles()
    }

    pub fn actors(&self) -> impl Iterator<Item = (ActorHandle, &Actor)> {
        self.actors.iter()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn live_monster_count(&self) -> usize {
        self.actors
            .iter()
            .filter(|(_, a)| a.is_monster() && a.is_alive())
            .count()
    }

    /// Nearest live player to `point`
    pub fn closest_player(&self, point: Vec3) -> Option<ActorHandle> {
        self.actors
            .iter()
            .filter(|(_, a)| a.player && a.is_alive())
            .min_by(|(_, a), (_, b)| {
                a.origin
                    .distance_squared(point)
                    .total_cmp(&b.origin.distance_squared(point))
            })
            .map(|(h, _)| h)
    }

    // =====================================================
    // Randomness
    // =====================================================

    /// Uniform in [0, 1)
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Uniform in [lo, hi); returns `lo` for an empty range
    pub fn random_range(&mut self, lo: f32, hi: f32) -> f32 {
        if hi > lo {
            self.rng.gen_range(lo..hi)
        } else {
            lo
        }
    }

    /// Uniform in [-1, 1)
    pub fn crandom(&mut self) -> f32 {
        self.random() * 2.0 - 1.0
    }

    pub fn random_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }

    // =====================================================
    // Events
    // =====================================================

    pub fn emit(&mut self, event: WorldEvent) {
        self.events.push(event);
    }

    pub fn sound(&mut self, actor: ActorHandle, sound: &'static str) {
        if !sound.is_empty() {
            self.emit(WorldEvent::Sound { actor, sound });
        }
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Content problems are logged and surfaced, never fatal
    pub fn report_content_error(&mut self, actor: Option<ActorHandle>, message: &str) {
        warn!(?actor, "content error: {}", message);
        self.emit(WorldEvent::ContentError {
            actor,
            message: message.to_string(),
        });
    }

    // =====================================================
    // Frame loop
    // =====================================================

    /// Advance one server frame
    pub fn run_frame(&mut self) {
        let now = self.clock.advance();
        for handle in self.actors.handles() {
            if !self.actors.contains(handle) {
                continue;
            }
            physics::physics_step(self, handle);

            let due = self
                .actors
                .get(handle)
                .and_then(|a| a.think.filter(|_| a.next_think <= now));
            if let Some(think) = due {
                think(self, handle);
            }
        }
    }

    pub fn run_frames(&mut self, count: usize) {
        for _ in 0..count {
            self.run_frame();
        }
    }

    /// Trace against geometry only, ignoring actors
    pub fn trace_geometry(&self, start: Vec3, bbox: &BoundingBox, end: Vec3, mask: Contents) -> Trace {
        self.geometry.trace(start, bbox, end, None, mask)
    }
}

impl CollisionService for MonsterWorld {
    fn trace(
        &self,
        start: Vec3,
        bbox: &BoundingBox,
        end: Vec3,
        ignore: Option<ActorHandle>,
        mask: Contents,
    ) -> Trace {
        let mut tr = self.geometry.trace(start, bbox, end, ignore, mask);
        if tr.all_solid {
            return tr;
        }

        for (handle, actor) in self.actors.iter() {
            if Some(handle) == ignore || !actor.contents.intersects(mask) {
                continue;
            }
            let (lo, hi) = actor.bbox.absolute(actor.origin);
            let clip = clip_box(start, end, bbox, lo, hi);
            if clip.start_solid {
                tr.start_solid = true;
                tr.hit = Some(handle);
                tr.contents = actor.contents;
                if clip.all_solid {
                    tr.all_solid = true;
                    tr.fraction = 0.0;
                    tr.end_pos = start;
                    return tr;
                }
                continue;
            }
            if clip.fraction < tr.fraction {
                tr.fraction = clip.fraction;
                tr.end_pos = start + (end - start) * clip.fraction;
                tr.normal = clip.normal;
                tr.hit = Some(handle);
                tr.contents = actor.contents;
            }
        }
        tr
    }

    fn point_contents(&self, point: Vec3) -> Contents {
        let mut contents = self.geometry.point_contents(point);
        for (_, actor) in self.actors.iter() {
            let (lo, hi) = actor.bbox.absolute(actor.origin);
            if point.cmpge(lo).all() && point.cmple(hi).all() {
                contents |= actor.contents;
            }
        }
        contents
    }
}

// =====================================================
// Tests
// =====================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::collision::MASK_MONSTERSOLID;

    fn empty_world() -> MonsterWorld {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0);
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(floor))
    }

    #[test]
    fn test_frame_advances_clock() {
        let mut world = empty_world();
        assert_eq!(world.time(), GameTime::ZERO);
        world.run_frame();
        world.run_frame();
        assert_eq!(world.time().as_millis(), 200);
        assert_eq!(world.frame(), 2);
    }

    #[test]
    fn test_trace_hits_actor_box() {
        let mut world = empty_world();
        let player = world.spawn_actor(Actor::player(Vec3::new(100.0, 0.0, 24.0)));
        let tr = world.trace(
            Vec3::new(0.0, 0.0, 24.0),
            &BoundingBox::POINT,
            Vec3::new(200.0, 0.0, 24.0),
            None,
            MASK_MONSTERSOLID,
        );
        assert_eq!(tr.hit, Some(player));
        assert!(tr.fraction < 0.5);

        // ignoring the actor lets the trace through
        let tr = world.trace(
            Vec3::new(0.0, 0.0, 24.0),
            &BoundingBox::POINT,
            Vec3::new(200.0, 0.0, 24.0),
            Some(player),
            MASK_MONSTERSOLID,
        );
        assert!(tr.is_clear());
    }

    #[test]
    fn test_stale_handle_does_not_resolve() {
        let mut world = empty_world();
        let a = world.spawn_actor(Actor::player(Vec3::new(0.0, 0.0, 24.0)));
        world.remove_actor(a);
        let b = world.spawn_actor(Actor::player(Vec3::new(0.0, 0.0, 24.0)));
        assert!(world.actor(a).is_none());
        assert!(world.actor(b).is_some());
        assert!(!world.is_alive(a));
    }

    #[test]
    fn test_closest_player_skips_dead() {
        let mut world = empty_world();
        let near = world.spawn_actor(Actor::player(Vec3::new(10.0, 0.0, 24.0)));
        let far = world.spawn_actor(Actor::player(Vec3::new(500.0, 0.0, 24.0)));
        assert_eq!(world.closest_player(Vec3::ZERO), Some(near));
        if let Some(p) = world.actor_mut(near) {
            p.dead = true;
        }
        assert_eq!(world.closest_player(Vec3::ZERO), Some(far));
    }

    #[test]
    fn test_content_error_is_event() {
        let mut world = empty_world();
        world.report_content_error(None, "missing move");
        let events = world.drain_events();
        assert!(matches!(
            events.as_slice(),
            [WorldEvent::ContentError { actor: None, .. }]
        ));
        assert!(world.events().is_empty());
    }

    #[test]
    fn test_random_range_degenerate() {
        let mut world = empty_world();
        assert_eq!(world.random_range(3.0, 3.0), 3.0);
        let r = world.random_range(1.0, 2.0);
        assert!((1.0..2.0).contains(&r));
        assert_eq!(world.random_index(0), None);
    }
}
