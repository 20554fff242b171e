//! Drone: hovering gunner that strafes around its target and bursts apart
//! when destroyed.

use bevy::math::Vec3;

use crate::animation::{self, Frame, Move, MovePrimitive as P};
use crate::attack::{self, AttackProfile};
use crate::behavior::BehaviorTable;
use crate::combat;
use crate::content::{KindDef, KindSounds};
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;
use crate::geometry::{angle_mod, BoundingBox};
use crate::monster::CombatStyle;

const BOLT_DAMAGE: f32 = 1.0;
const BOLT_SPEED: f32 = 1000.0;
const STRAFE_STEP: f32 = 10.0;

const fn f(primitive: P, dist: f32) -> Frame {
    Frame::new(primitive, dist, None)
}

static HOVER_FRAMES: [Frame; 10] = [f(P::Stand, 0.0); 10];
pub static HOVER: Move = Move {
    name: "drone_hover",
    first_frame: 0,
    last_frame: 9,
    frames: &HOVER_FRAMES,
    on_complete: Some(hover),
};

static PATROL_FRAMES: [Frame; 6] = [f(P::Walk, 5.0); 6];
pub static PATROL: Move = Move {
    name: "drone_patrol",
    first_frame: 10,
    last_frame: 15,
    frames: &PATROL_FRAMES,
    on_complete: Some(patrol),
};

static CHASE_FRAMES: [Frame; 6] = [f(P::Run, 10.0); 6];
pub static CHASE: Move = Move {
    name: "drone_chase",
    first_frame: 16,
    last_frame: 21,
    frames: &CHASE_FRAMES,
    on_complete: Some(chase),
};

static BURST_FRAMES: [Frame; 6] = [
    f(P::Charge, 0.0),
    Frame::new(P::Charge, 0.0, Some(fire)),
    f(P::Charge, 0.0),
    Frame::new(P::Charge, 0.0, Some(fire)),
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
];
pub static BURST: Move = Move {
    name: "drone_burst",
    first_frame: 22,
    last_frame: 27,
    frames: &BURST_FRAMES,
    on_complete: Some(chase),
};

fn hover(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&HOVER));
}

fn patrol(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&PATROL));
}

fn chase(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&CHASE));
}

fn burst(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&BURST));
}

fn fire(world: &mut MonsterWorld, actor: ActorHandle) {
    let Some(a) = world.actor(actor) else {
        return;
    };
    let start = a.eye();
    let Some(enemy) = a.monster.as_ref().and_then(|s| s.enemy()) else {
        return;
    };
    let Some(aim) = attack::predict_aim(world, actor, enemy, start, None, 0.0) else {
        return;
    };
    world.sound(actor, "drone/fire");
    combat::fire_shot(world, actor, start, aim.dir, BOLT_DAMAGE, BOLT_SPEED);
}

/// Slide sideways around the enemy; switch sides when blocked
fn side_step(world: &mut MonsterWorld, actor: ActorHandle) -> bool {
    let Some((yaw, lefty)) = world.monster(actor).map(|s| (s.ideal_yaw, s.lefty)) else {
        return false;
    };
    let offset = if lefty { 90.0 } else { -90.0 };
    let locomotion = world.locomotion();
    if locomotion.walk(world, actor, angle_mod(yaw + offset), STRAFE_STEP) {
        return true;
    }
    if let Some(s) = world.monster_mut(actor) {
        s.lefty = !lefty;
    }
    locomotion.walk(world, actor, angle_mod(yaw - offset), STRAFE_STEP)
}

/// Drones do not leave a corpse
fn explode(world: &mut MonsterWorld, actor: ActorHandle, _attacker: Option<ActorHandle>, _damage: f32) {
    let center = world.actor(actor).map(|a| a.bbox.center(a.origin));
    if let Some(origin) = center {
        world.emit(crate::engine::WorldEvent::SpawnEffect { origin, size: 32.0 });
    }
    world.remove_actor(actor);
}

pub fn def() -> KindDef {
    KindDef {
        name: "drone".into(),
        behavior: BehaviorTable {
            stand: Some(hover),
            walk: Some(patrol),
            run: Some(chase),
            attack: Some(burst),
            search: Some(patrol),
            die: Some(explode),
            side_step: Some(side_step),
            ..Default::default()
        },
        moves: vec![&HOVER, &PATROL, &CHASE, &BURST],
        health: 50.0,
        gib_health: 0.0,
        mass: 50.0,
        bbox: BoundingBox::new(Vec3::new(-16.0, -16.0, -24.0), Vec3::new(16.0, 16.0, 16.0)),
        flying: true,
        view_height: 0.0,
        yaw_speed: 30.0,
        style: CombatStyle::Ranged,
        attack: AttackProfile {
            ranged: true,
            projectile_speed: None,
            ..Default::default()
        },
        pain: None,
        leap: None,
        sounds: KindSounds {
            sight: "drone/sight",
            idle: "drone/idle",
            search: "",
            pain: "drone/pain",
            death: "drone/death",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::engine::{Actor, EngineConfig, WorldEvent};
    use crate::monster;
    use std::sync::Arc;

    fn world(walls: BrushWorld) -> MonsterWorld {
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(walls))
    }

    #[test]
    fn test_side_step_flips_when_blocked() {
        // wall one unit to the drone's left
        let walls = BrushWorld::new().with_box(
            Vec3::new(-200.0, 17.0, -200.0),
            Vec3::new(200.0, 40.0, 200.0),
            crate::collision::Contents::SOLID,
        );
        let mut w = world(walls);
        let kind = w.kinds().get("drone").unwrap();
        let h = w.spawn_actor(Actor::monster(kind, Vec3::ZERO, 0.0, Vec3::NEG_Z));
        w.monster_mut(h).unwrap().lefty = true;

        assert!(side_step(&mut w, h));
        assert!(!w.monster(h).unwrap().lefty);
        assert!(w.actor(h).unwrap().origin.y < 0.0);
    }

    #[test]
    fn test_death_leaves_no_corpse() {
        let mut w = world(BrushWorld::new());
        let kind = w.kinds().get("drone").unwrap();
        let h = w.spawn_actor(Actor::monster(kind, Vec3::new(0.0, 0.0, 200.0), 0.0, Vec3::NEG_Z));
        monster::kill(&mut w, h, None, 60.0);
        assert!(w.actor(h).is_none());
        assert!(w.events().iter().any(|e| matches!(e, WorldEvent::Died { .. })));
    }
}
