//! Grunt: rifleman that leads moving targets, blind-fires at the last
//! sighting, and ducks incoming shots.

use crate::animation::{self, Frame, Move, MovePrimitive as P};
use crate::attack::{self, AttackProfile, BlindFireProfile};
use crate::behavior::BehaviorTable;
use crate::combat;
use crate::constants::RANGE_NEAR;
use crate::content::{KindDef, KindSounds};
use crate::engine::{GameTime, MonsterWorld};
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;
use crate::monster::{self, ai, AiFlags, CombatStyle};
use crate::pain::{self, PainProfile};

const SHOT_DAMAGE: f32 = 5.0;
const SHOT_SPEED: f32 = 1200.0;
/// Height removed from the box while ducked
const DUCK_DROP: f32 = 32.0;
const FIRE_FRAME: u32 = 24;

const fn f(primitive: P, dist: f32) -> Frame {
    Frame::new(primitive, dist, None)
}

static STAND_FRAMES: [Frame; 6] = [f(P::Stand, 0.0); 6];
pub static STAND: Move = Move {
    name: "grunt_stand",
    first_frame: 0,
    last_frame: 5,
    frames: &STAND_FRAMES,
    on_complete: Some(stand),
};

static FIDGET_FRAMES: [Frame; 4] = [f(P::Stand, 0.0); 4];
pub static FIDGET: Move = Move {
    name: "grunt_fidget",
    first_frame: 6,
    last_frame: 9,
    frames: &FIDGET_FRAMES,
    on_complete: Some(stand),
};

static WALK_FRAMES: [Frame; 6] = [
    f(P::Walk, 3.0),
    f(P::Walk, 6.0),
    f(P::Walk, 2.0),
    f(P::Walk, 2.0),
    f(P::Walk, 2.0),
    f(P::Walk, 1.0),
];
pub static WALK: Move = Move {
    name: "grunt_walk",
    first_frame: 10,
    last_frame: 15,
    frames: &WALK_FRAMES,
    on_complete: Some(walk),
};

static RUN_FRAMES: [Frame; 6] = [
    f(P::Run, 10.0),
    f(P::Run, 11.0),
    f(P::Run, 11.0),
    f(P::Run, 16.0),
    f(P::Run, 10.0),
    f(P::Run, 15.0),
];
pub static RUN: Move = Move {
    name: "grunt_run",
    first_frame: 16,
    last_frame: 21,
    frames: &RUN_FRAMES,
    on_complete: Some(run),
};

static ATTACK_FRAMES: [Frame; 6] = [
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
    Frame::new(P::Charge, 0.0, Some(fire)),
    Frame::new(P::Charge, 0.0, Some(keep_firing)),
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
];
pub static ATTACK: Move = Move {
    name: "grunt_attack",
    first_frame: 22,
    last_frame: 27,
    frames: &ATTACK_FRAMES,
    on_complete: Some(run),
};

// Holds its last frame until the duck expires
static DUCK_FRAMES: [Frame; 3] = [f(P::Move, 0.0); 3];
pub static DUCK: Move = Move {
    name: "grunt_duck",
    first_frame: 28,
    last_frame: 30,
    frames: &DUCK_FRAMES,
    on_complete: None,
};

static PAIN_LIGHT_FRAMES: [Frame; 5] = [
    f(P::Move, -3.0),
    f(P::Move, 4.0),
    f(P::Move, 1.0),
    f(P::Move, 1.0),
    f(P::Move, 0.0),
];
pub static PAIN_LIGHT: Move = Move {
    name: "grunt_pain_light",
    first_frame: 31,
    last_frame: 35,
    frames: &PAIN_LIGHT_FRAMES,
    on_complete: Some(run),
};

static PAIN_HEAVY_FRAMES: [Frame; 7] = [
    f(P::Move, -8.0),
    f(P::Move, 10.0),
    f(P::Move, -4.0),
    f(P::Move, -1.0),
    f(P::Move, -3.0),
    f(P::Move, 0.0),
    f(P::Move, 3.0),
];
pub static PAIN_HEAVY: Move = Move {
    name: "grunt_pain_heavy",
    first_frame: 36,
    last_frame: 42,
    frames: &PAIN_HEAVY_FRAMES,
    on_complete: Some(run),
};

static DEATH_FRAMES: [Frame; 8] = [
    f(P::Move, 0.0),
    f(P::Move, -10.0),
    f(P::Move, -10.0),
    f(P::Move, -10.0),
    Frame::new(P::Move, -5.0, Some(super::corpse_shrink)),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
];
pub static DEATH: Move = Move {
    name: "grunt_death",
    first_frame: 43,
    last_frame: 50,
    frames: &DEATH_FRAMES,
    on_complete: None,
};

fn stand(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&STAND));
}

fn walk(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&WALK));
}

fn run(world: &mut MonsterWorld, actor: ActorHandle) {
    let hold = world
        .monster(actor)
        .is_some_and(|s| s.ai_flags.contains(AiFlags::STAND_GROUND));
    let mv = if hold { &STAND } else { &RUN };
    animation::set_animation(world, actor, Some(mv));
}

fn idle(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&FIDGET));
}

/// Start a burst; blind shots are single
fn open_fire(world: &mut MonsterWorld, actor: ActorHandle) {
    let burst = world.random_range(0.3, 1.0);
    let until = world.time().after(burst);
    if let Some(s) = world.monster_mut(actor) {
        s.fire_hold_until = if s.ai_flags.contains(AiFlags::BLIND_FIRE) {
            GameTime::ZERO
        } else {
            until
        };
    }
    animation::set_animation(world, actor, Some(&ATTACK));
}

/// Loop back to the firing frame while the burst lasts and the enemy is in view
fn keep_firing(world: &mut MonsterWorld, actor: ActorHandle) {
    let now = world.time();
    let Some(enemy) = world
        .monster(actor)
        .filter(|s| now < s.fire_hold_until)
        .and_then(|s| s.enemy())
    else {
        return;
    };
    if !world.is_alive(enemy) || !ai::visible(world, actor, enemy) {
        return;
    }
    if let Some(s) = world.monster_mut(actor) {
        s.anim.next_frame = Some(FIRE_FRAME);
    }
}

/// Fire at the enemy, or at the remembered spot when blind-firing
fn fire(world: &mut MonsterWorld, actor: ActorHandle) {
    let Some(a) = world.actor(actor) else {
        return;
    };
    let start = a.eye();
    let Some(state) = a.monster.as_ref() else {
        return;
    };
    let blind = state.ai_flags.contains(AiFlags::BLIND_FIRE);
    let blind_target = state.sighting.blind_fire_target;
    let enemy = state.enemy();
    let speed = state.kind.attack.projectile_speed;

    if blind {
        let dir = blind_target - start;
        world.sound(actor, "grunt/fire");
        combat::fire_shot(world, actor, start, dir, SHOT_DAMAGE, SHOT_SPEED);
        attack::note_blind_fire(world, actor);
        return;
    }

    let Some(enemy) = enemy.filter(|e| world.is_alive(*e)) else {
        return;
    };
    let Some(aim) = attack::predict_aim(world, actor, enemy, start, speed, 0.0) else {
        return;
    };
    if let Some(s) = world.monster_mut(actor) {
        s.aim_target = Some(enemy);
    }
    world.sound(actor, "grunt/fire");
    combat::fire_shot(world, actor, start, aim.dir, SHOT_DAMAGE, SHOT_SPEED);
}

/// Sometimes open fire the moment a distant target shows up
fn sight(world: &mut MonsterWorld, actor: ActorHandle, other: ActorHandle) {
    let far = ai::range_to(world, actor, other).is_some_and(|r| r >= RANGE_NEAR);
    if far && world.random() < 0.5 && attack::clear_shot(world, actor, other) {
        open_fire(world, actor);
    }
}

/// Drop below an incoming shot
fn duck(world: &mut MonsterWorld, actor: ActorHandle, eta: f32) -> bool {
    let now = world.time();
    let Some(a) = world.actor_mut(actor) else {
        return false;
    };
    if a.ground.is_none() {
        return false;
    }
    let Some(state) = a.monster.as_mut() else {
        return false;
    };
    let until = now.after(eta.max(0.3) + 0.5);
    if state.is_ducked() {
        state.duck_until = state.duck_until.max(until);
        return true;
    }
    state.ai_flags.insert(AiFlags::DUCKED);
    state.duck_until = until;
    a.bbox.maxs.z = (a.bbox.maxs.z - DUCK_DROP).max(a.bbox.mins.z);
    animation::set_animation(world, actor, Some(&DUCK));
    true
}

fn un_duck(world: &mut MonsterWorld, actor: ActorHandle) {
    monster::stand_up(world, actor);
    run(world, actor);
}

fn on_pain(world: &mut MonsterWorld, actor: ActorHandle, source: Option<ActorHandle>, damage: f32) {
    pain::on_damage(world, actor, damage, source);
}

fn die(world: &mut MonsterWorld, actor: ActorHandle, _attacker: Option<ActorHandle>, _damage: f32) {
    animation::set_animation(world, actor, Some(&DEATH));
}

pub fn def() -> KindDef {
    KindDef {
        name: "grunt".into(),
        behavior: BehaviorTable {
            stand: Some(stand),
            walk: Some(walk),
            run: Some(run),
            attack: Some(open_fire),
            sight: Some(sight),
            search: Some(walk),
            idle: Some(idle),
            pain: Some(on_pain),
            die: Some(die),
            duck: Some(duck),
            un_duck: Some(un_duck),
            set_skin: Some(super::damaged_skin),
            ..Default::default()
        },
        moves: vec![
            &STAND,
            &FIDGET,
            &WALK,
            &RUN,
            &ATTACK,
            &DUCK,
            &PAIN_LIGHT,
            &PAIN_HEAVY,
            &DEATH,
        ],
        health: 30.0,
        gib_health: -30.0,
        mass: 100.0,
        bbox: BoundingBox::upright(16.0, -24.0, 32.0),
        flying: false,
        view_height: 22.0,
        yaw_speed: 20.0,
        style: CombatStyle::Ranged,
        attack: AttackProfile {
            ranged: true,
            projectile_speed: Some(SHOT_SPEED),
            blind_fire: Some(BlindFireProfile::default()),
            ..Default::default()
        },
        pain: Some(PainProfile {
            light: Some(&PAIN_LIGHT),
            heavy: Some(&PAIN_HEAVY),
            attack_frames: vec![(ATTACK.first_frame, ATTACK.last_frame)],
            ..Default::default()
        }),
        leap: None,
        sounds: KindSounds {
            sight: "grunt/sight",
            idle: "grunt/idle",
            search: "grunt/search",
            pain: "grunt/pain",
            death: "grunt/death",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::engine::{Actor, EngineConfig};
    use bevy::math::Vec3;
    use std::sync::Arc;

    fn world() -> MonsterWorld {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0);
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(floor))
    }

    fn grunt(w: &mut MonsterWorld) -> ActorHandle {
        let kind = w.kinds().get("grunt").unwrap();
        let h = w.spawn_actor(Actor::monster(kind, Vec3::new(0.0, 0.0, 24.0), 0.0, Vec3::NEG_Z));
        w.run_frame();
        h
    }

    #[test]
    fn test_duck_shrinks_box_until_unduck() {
        let mut w = world();
        let h = grunt(&mut w);
        let full = w.actor(h).unwrap().bbox;
        assert!(duck(&mut w, h, 0.2));
        let ducked = w.actor(h).unwrap().bbox;
        assert_eq!(ducked.maxs.z, full.maxs.z - DUCK_DROP);
        assert!(w.monster(h).unwrap().is_ducked());

        un_duck(&mut w, h);
        assert_eq!(w.actor(h).unwrap().bbox, full);
        assert!(!w.monster(h).unwrap().is_ducked());
    }

    #[test]
    fn test_duck_expires_on_think() {
        let mut w = world();
        let h = grunt(&mut w);
        assert!(duck(&mut w, h, 0.1));
        let until = w.monster(h).unwrap().duck_until;
        while w.time() <= until {
            w.run_frame();
        }
        w.run_frame();
        assert!(!w.monster(h).unwrap().is_ducked());
        assert!(until > GameTime::ZERO);
    }

    #[test]
    fn test_blind_fire_grows_delay() {
        let mut w = world();
        let h = grunt(&mut w);
        let p = w.spawn_actor(Actor::player(Vec3::new(400.0, 0.0, 24.0)));
        {
            let s = w.monster_mut(h).unwrap();
            s.set_enemy(Some(p));
            s.sighting.remember(Vec3::new(400.0, 0.0, 24.0), Vec3::ZERO, GameTime::ZERO);
            s.ai_flags.insert(AiFlags::BLIND_FIRE);
        }
        fire(&mut w, h);
        let s = w.monster(h).unwrap();
        assert!(s.sighting.blind_fire_delay >= 5.5);
        assert!(!s.ai_flags.contains(AiFlags::BLIND_FIRE));
    }

    #[test]
    fn test_burst_loops_fire_frame() {
        let mut w = world();
        let h = grunt(&mut w);
        let p = w.spawn_actor(Actor::player(Vec3::new(400.0, 0.0, 24.0)));
        w.monster_mut(h).unwrap().set_enemy(Some(p));
        open_fire(&mut w, h);
        assert!(w.monster(h).unwrap().fire_hold_until > w.time());
        keep_firing(&mut w, h);
        assert_eq!(w.monster(h).unwrap().anim.next_frame, Some(FIRE_FRAME));
        assert!(ATTACK.frame(FIRE_FRAME).unwrap().think.is_some());

        // burst over
        w.monster_mut(h).unwrap().fire_hold_until = GameTime::ZERO;
        w.monster_mut(h).unwrap().anim.next_frame = None;
        keep_firing(&mut w, h);
        assert_eq!(w.monster(h).unwrap().anim.next_frame, None);
    }

    #[test]
    fn test_skin_follows_health() {
        let mut w = world();
        let h = grunt(&mut w);
        w.actor_mut(h).unwrap().health = 10.0;
        super::super::damaged_skin(&mut w, h);
        assert_eq!(w.monster(h).unwrap().skin, 1);
        w.actor_mut(h).unwrap().health = 30.0;
        super::super::damaged_skin(&mut w, h);
        assert_eq!(w.monster(h).unwrap().skin, 0);
    }
}
