use std::fmt;
use std::sync::Arc;

use bevy::math::Vec3;

use crate::collision::Contents;
use crate::content::KindDef;
use crate::engine::clock::GameTime;
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;
use crate::geometry::{normalize_gravity, BoundingBox};
use crate::monster::ActorState;

/// How the physics step moves an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    /// Never moved by physics
    None,
    /// Ground walker: gravity while airborne, stops on landing
    Step,
    /// No gravity, moves freely
    Fly,
    /// Ballistic body (gibs, thrown objects)
    Toss,
}

/// Supporting surface, `actor` is set when standing on another actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ground {
    pub actor: Option<ActorHandle>,
    pub normal: Vec3,
}

/// What a moving actor ran into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub other: Option<ActorHandle>,
    pub normal: Vec3,
}

pub type TouchFn = fn(&mut MonsterWorld, ActorHandle, Contact);
pub type ThinkFn = fn(&mut MonsterWorld, ActorHandle);

pub struct Actor {
    pub class_name: String,
    pub origin: Vec3,
    /// Degrees around the up axis
    pub yaw: f32,
    pub bbox: BoundingBox,
    pub velocity: Vec3,
    /// Unit vector
    pub gravity_dir: Vec3,
    pub gravity_scale: f32,
    pub mass: f32,
    pub health: f32,
    pub max_health: f32,
    pub gib_health: f32,
    pub dead: bool,
    pub takes_damage: bool,
    pub contents: Contents,
    pub move_type: MoveType,
    pub player: bool,
    pub ground: Option<Ground>,
    pub view_height: f32,
    pub touch: Option<TouchFn>,
    pub think: Option<ThinkFn>,
    pub next_think: GameTime,
    /// Item dropped on death
    pub item: Option<String>,
    /// Present for monsters only
    pub monster: Option<ActorState>,
}

impl Actor {
    pub fn new(class_name: impl Into<String>, origin: Vec3, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            origin,
            yaw: 0.0,
            bbox,
            velocity: Vec3::ZERO,
            gravity_dir: Vec3::NEG_Z,
            gravity_scale: 1.0,
            mass: 200.0,
            health: 100.0,
            max_health: 100.0,
            gib_health: -40.0,
            dead: false,
            takes_damage: true,
            contents: Contents::MONSTER,
            move_type: MoveType::Step,
            player: false,
            ground: None,
            view_height: 0.0,
            touch: None,
            think: None,
            next_think: GameTime::ZERO,
            item: None,
            monster: None,
        }
    }

    /// Standing player-sized target
    pub fn player(origin: Vec3) -> Self {
        Self {
            contents: Contents::PLAYER,
            player: true,
            view_height: 22.0,
            ..Self::new("player", origin, BoundingBox::upright(16.0, -24.0, 32.0))
        }
    }

    /// Monster built from a registered kind, not yet scheduled
    pub fn monster(kind: Arc<KindDef>, origin: Vec3, yaw: f32, gravity: Vec3) -> Self {
        let move_type = if kind.flying {
            MoveType::Fly
        } else {
            MoveType::Step
        };
        Self {
            yaw,
            gravity_dir: normalize_gravity(gravity),
            mass: kind.mass,
            health: kind.health,
            max_health: kind.health,
            gib_health: kind.gib_health,
            move_type,
            view_height: kind.view_height,
            think: Some(crate::monster::monster_think),
            monster: Some(ActorState::new(kind.clone(), yaw)),
            ..Self::new(kind.name.clone(), origin, kind.bbox)
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead && self.health > 0.0
    }

    pub fn is_monster(&self) -> bool {
        self.monster.is_some()
    }

    pub fn eye(&self) -> Vec3 {
        self.origin - self.gravity_dir * self.view_height
    }

    pub fn up(&self) -> Vec3 {
        -self.gravity_dir
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("class_name", &self.class_name)
            .field("origin", &self.origin)
            .field("health", &self.health)
            .field("dead", &self.dead)
            .field("move_type", &self.move_type)
            .field("grounded", &self.ground.is_some())
            .field("touch", &self.touch.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_defaults() {
        let p = Actor::player(Vec3::new(0.0, 0.0, 24.0));
        assert!(p.player);
        assert!(p.is_alive());
        assert!(!p.is_monster());
        assert_eq!(p.contents, Contents::PLAYER);
        assert_eq!(p.eye().z, 46.0);
    }

    #[test]
    fn test_eye_follows_gravity() {
        let mut a = Actor::new("ceiling", Vec3::ZERO, BoundingBox::POINT);
        a.view_height = 10.0;
        a.gravity_dir = Vec3::Z;
        assert_eq!(a.eye(), Vec3::new(0.0, 0.0, -10.0));
        assert_eq!(a.up(), Vec3::NEG_Z);
    }
}
