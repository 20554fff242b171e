//! Commander reinforcements: a monster that calls in other monsters.
//!
//! Each call picks a reinforcement slot through a [`ReinforcementRotation`],
//! searches for room a short way in front of the commander, then builds the
//! new actor through the ground or airborne factory so it gets the grow
//! effect. Reinforcements cost slot strength out of the commander's budget
//! until they die.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{create_airborne_actor, create_ground_actor, find_spawn_point, SpawnQuery};
use crate::content::ContentError;
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;
use crate::geometry::{yaw_to_forward, yaw_to_right};
use crate::monster::ai;
use crate::selection::reinforcement::ReinforcementRotation;

/// Support reach for walkers placed by a commander
pub const REINFORCEMENT_GROUND_REACH: f32 = 256.0;
/// How far the search may step the volume against gravity
pub const REINFORCEMENT_MAX_MOVE_UP: f32 = 32.0;

/// One kind a commander may call, and what it costs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reinforcement {
    pub kind: String,
    pub strength: u32,
}

impl Reinforcement {
    pub fn new(kind: impl Into<String>, strength: u32) -> Self {
        Self {
            kind: kind.into(),
            strength,
        }
    }
}

/// Parse `"grunt 1; hound 2"` style lists. A missing strength counts as 1.
pub fn parse_reinforcements(list: &str) -> Result<Vec<Reinforcement>, ContentError> {
    list.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.split_whitespace();
            let kind = parts.next().unwrap_or_default();
            let strength = match parts.next() {
                Some(s) => s
                    .parse::<u32>()
                    .map_err(|_| ContentError::Parse(format!("bad reinforcement strength in '{entry}'")))?,
                None => 1,
            };
            if parts.next().is_some() || strength == 0 {
                return Err(ContentError::Parse(format!("bad reinforcement entry '{entry}'")));
            }
            Ok(Reinforcement::new(kind, strength))
        })
        .collect()
}

/// Reinforcement state owned by one commander
#[derive(Debug, Clone)]
pub struct Commander {
    pub slots: Vec<Reinforcement>,
    pub rotation: ReinforcementRotation,
    /// Total strength that may be alive at once
    pub budget: u32,
    /// Search start relative to the commander: forward, right, up
    pub offset: Vec3,
    summoned: Vec<(ActorHandle, u32)>,
}

impl Commander {
    pub fn new(slots: Vec<Reinforcement>, budget: u32) -> Self {
        let rotation = ReinforcementRotation::new(slots.len());
        Self {
            slots,
            rotation,
            budget,
            offset: Vec3::new(96.0, 0.0, 0.0),
            summoned: Vec::new(),
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn used(&self) -> u32 {
        self.summoned.iter().map(|(_, strength)| strength).sum()
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.used())
    }

    pub fn summoned(&self) -> impl Iterator<Item = ActorHandle> + '_ {
        self.summoned.iter().map(|(h, _)| *h)
    }

    /// Slots that still fit in the remaining budget
    pub fn available(&self) -> Vec<usize> {
        let remaining = self.remaining();
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, r)| r.strength <= remaining)
            .map(|(i, _)| i)
            .collect()
    }

    /// Give back the strength of reinforcements that died or were removed
    pub fn reclaim(&mut self, world: &MonsterWorld) -> usize {
        let before = self.summoned.len();
        self.summoned.retain(|(h, _)| world.is_alive(*h));
        before - self.summoned.len()
    }

    /// Call one reinforcement in front of `commander`. The new monster takes
    /// the commander's enemy when it has a live one.
    pub fn call_reinforcement(&mut self, world: &mut MonsterWorld, commander: ActorHandle) -> Option<ActorHandle> {
        let (origin, yaw, up) = {
            let a = world.actor(commander)?;
            if !a.is_alive() {
                return None;
            }
            (a.origin, a.yaw, a.up())
        };
        self.reclaim(world);

        let Some(slot) = self.rotation.select(&self.available()) else {
            debug!(?commander, remaining = self.remaining(), "no reinforcement fits the budget");
            return None;
        };
        let Reinforcement { kind: name, strength } = self.slots[slot].clone();
        let kind = match world.kinds().lookup(&name) {
            Ok(kind) => kind,
            Err(err) => {
                world.report_content_error(Some(commander), &err.to_string());
                return None;
            }
        };

        let start = origin
            + yaw_to_forward(yaw) * self.offset.x
            + yaw_to_right(yaw) * self.offset.y
            + up * self.offset.z;
        let mut query = SpawnQuery::new(start, kind.bbox)
            .with_gravity(world.gravity())
            .with_max_move_up(REINFORCEMENT_MAX_MOVE_UP);
        if kind.flying {
            query = query.without_drop();
        }
        let Some(point) = find_spawn_point(&*world, &query) else {
            debug!(?commander, kind = %name, ?start, "no room for reinforcement");
            return None;
        };

        let handle = if kind.flying {
            create_airborne_actor(world, point, yaw, &kind.bbox, &name)
        } else {
            create_ground_actor(world, point, yaw, &kind.bbox, &name, REINFORCEMENT_GROUND_REACH)
        }?;
        self.summoned.push((handle, strength));
        info!(?commander, ?handle, kind = %name, slot, used = self.used(), "reinforcement called");

        let enemy = world
            .monster(commander)
            .and_then(|s| s.enemy())
            .filter(|e| world.is_alive(*e));
        if let Some(enemy) = enemy {
            ai::found_target(world, handle, enemy);
        }
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::collision::Contents;
    use crate::engine::{Actor, EngineConfig, WorldEvent};
    use std::sync::Arc;

    fn world_with(geometry: BrushWorld) -> MonsterWorld {
        let geometry = geometry.with_plane(Vec3::Z, 0.0, 4096.0);
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(geometry))
    }

    fn commander_in(world: &mut MonsterWorld) -> ActorHandle {
        let kind = world.kinds().get("brute").unwrap();
        world.spawn_actor(Actor::monster(kind, Vec3::new(0.0, 0.0, 24.0), 0.0, Vec3::NEG_Z))
    }

    fn grow_effects(world: &MonsterWorld) -> usize {
        world
            .events()
            .iter()
            .filter(|e| matches!(e, WorldEvent::SpawnEffect { .. }))
            .count()
    }

    #[test]
    fn test_parse_reinforcements() {
        let list = parse_reinforcements("grunt 1; hound 2;drone").unwrap();
        assert_eq!(
            list,
            vec![
                Reinforcement::new("grunt", 1),
                Reinforcement::new("hound", 2),
                Reinforcement::new("drone", 1),
            ]
        );
        assert!(parse_reinforcements("grunt x").is_err());
        assert!(parse_reinforcements("grunt 0").is_err());
        assert!(parse_reinforcements("grunt 1 2").is_err());
        assert!(parse_reinforcements("").unwrap().is_empty());
    }

    #[test]
    fn test_reinforcements_rotate_and_grow_in() {
        let mut w = world_with(BrushWorld::new());
        let boss = commander_in(&mut w);
        let mut commander = Commander::new(
            vec![Reinforcement::new("grunt", 1), Reinforcement::new("hound", 1)],
            4,
        );

        let first = commander.call_reinforcement(&mut w, boss).unwrap();
        assert_eq!(w.actor(first).unwrap().class_name, "grunt");
        assert_eq!(grow_effects(&w), 1);
        // the grunt now stands in front of the commander
        commander.offset = Vec3::new(96.0, 128.0, 0.0);
        let second = commander.call_reinforcement(&mut w, boss).unwrap();
        assert_eq!(w.actor(second).unwrap().class_name, "hound");
        assert_eq!(grow_effects(&w), 2);

        assert_eq!(commander.rotation.usage, vec![1, 1]);
        assert_eq!(commander.used(), 2);
        let a = w.actor(first).unwrap();
        assert!(a.origin.x > 0.0);
        assert!((a.origin.z + a.bbox.mins.z).abs() < 0.1);
    }

    #[test]
    fn test_budget_limits_reinforcements() {
        let mut w = world_with(BrushWorld::new());
        let boss = commander_in(&mut w);
        let mut commander = Commander::new(
            vec![Reinforcement::new("brute", 3), Reinforcement::new("grunt", 1)],
            3,
        );

        let brute = commander.call_reinforcement(&mut w, boss).unwrap();
        assert_eq!(commander.remaining(), 0);
        assert!(commander.available().is_empty());
        commander.offset = Vec3::new(96.0, 128.0, 0.0);
        assert!(commander.call_reinforcement(&mut w, boss).is_none());

        // a dead reinforcement frees its strength
        w.actor_mut(brute).unwrap().dead = true;
        assert_eq!(commander.reclaim(&w), 1);
        assert_eq!(commander.available(), vec![0, 1]);
    }

    #[test]
    fn test_blocked_front_spawns_nothing() {
        let wall = BrushWorld::new().with_box(
            Vec3::new(40.0, -256.0, 0.0),
            Vec3::new(400.0, 256.0, 256.0),
            Contents::SOLID,
        );
        let mut w = world_with(wall);
        let boss = commander_in(&mut w);
        let mut commander = Commander::new(vec![Reinforcement::new("grunt", 1)], 4);
        let before = w.actor_count();
        assert!(commander.call_reinforcement(&mut w, boss).is_none());
        assert_eq!(w.actor_count(), before);
        assert_eq!(grow_effects(&w), 0);
        assert_eq!(commander.used(), 0);
    }

    #[test]
    fn test_reinforcement_inherits_enemy() {
        let mut w = world_with(BrushWorld::new());
        let boss = commander_in(&mut w);
        let player = w.spawn_actor(Actor::player(Vec3::new(-400.0, 0.0, 24.0)));
        w.monster_mut(boss).unwrap().set_enemy(Some(player));

        let mut commander = Commander::new(vec![Reinforcement::new("drone", 1)], 2);
        let drone = commander.call_reinforcement(&mut w, boss).unwrap();
        assert_eq!(w.monster(drone).unwrap().enemy(), Some(player));
        assert!(w.actor(drone).unwrap().origin.z > 24.0 - 0.1);
    }

    #[test]
    fn test_unknown_reinforcement_is_content_error() {
        let mut w = world_with(BrushWorld::new());
        let boss = commander_in(&mut w);
        let mut commander = Commander::new(vec![Reinforcement::new("dragon", 1)], 2);
        assert!(commander.call_reinforcement(&mut w, boss).is_none());
        assert!(w
            .events()
            .iter()
            .any(|e| matches!(e, WorldEvent::ContentError { actor: Some(a), .. } if *a == boss)));
    }
}
