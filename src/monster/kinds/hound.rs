//! Hound: fast biter that pounces on targets at mid range.

use bevy::math::Vec3;

use crate::animation::{self, Frame, Move, MovePrimitive as P};
use crate::attack::{self, AttackProfile};
use crate::behavior::BehaviorTable;
use crate::combat;
use crate::content::{KindDef, KindSounds};
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;
use crate::leap::{self, LeapPhase, LeapProfile};
use crate::monster::{ai, AiFlags, AttackState, CombatStyle};
use crate::pain::{self, PainProfile};

const fn f(primitive: P, dist: f32) -> Frame {
    Frame::new(primitive, dist, None)
}

static STAND_FRAMES: [Frame; 9] = [f(P::Stand, 0.0); 9];
pub static STAND: Move = Move {
    name: "hound_stand",
    first_frame: 0,
    last_frame: 8,
    frames: &STAND_FRAMES,
    on_complete: Some(stand),
};

static WALK_FRAMES: [Frame; 8] = [f(P::Walk, 8.0); 8];
pub static WALK: Move = Move {
    name: "hound_walk",
    first_frame: 9,
    last_frame: 16,
    frames: &WALK_FRAMES,
    on_complete: Some(walk),
};

static RUN_FRAMES: [Frame; 12] = [
    f(P::Run, 16.0),
    f(P::Run, 32.0),
    f(P::Run, 32.0),
    f(P::Run, 20.0),
    f(P::Run, 64.0),
    f(P::Run, 32.0),
    f(P::Run, 16.0),
    f(P::Run, 32.0),
    f(P::Run, 32.0),
    f(P::Run, 20.0),
    f(P::Run, 64.0),
    f(P::Run, 32.0),
];
pub static RUN: Move = Move {
    name: "hound_run",
    first_frame: 17,
    last_frame: 28,
    frames: &RUN_FRAMES,
    on_complete: Some(run),
};

static BITE_FRAMES: [Frame; 8] = [
    f(P::Charge, 10.0),
    f(P::Charge, 10.0),
    f(P::Charge, 10.0),
    Frame::new(P::Charge, 0.0, Some(bite)),
    f(P::Charge, 10.0),
    f(P::Charge, 10.0),
    f(P::Charge, 10.0),
    f(P::Charge, 10.0),
];
pub static BITE: Move = Move {
    name: "hound_bite",
    first_frame: 29,
    last_frame: 36,
    frames: &BITE_FRAMES,
    on_complete: Some(run),
};

// Flight frames move nothing themselves; the leap velocity carries the body
static LEAP_FRAMES: [Frame; 9] = [
    Frame::new(P::Charge, 20.0, Some(leap::windup)),
    Frame::new(P::Charge, 0.0, Some(leap::takeoff)),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    Frame::new(P::Move, 0.0, Some(leap::check_landing)),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
];
pub static LEAP: Move = Move {
    name: "hound_leap",
    first_frame: 37,
    last_frame: 45,
    frames: &LEAP_FRAMES,
    on_complete: Some(leap_done),
};

static PAIN_LIGHT_FRAMES: [Frame; 6] = [f(P::Move, 0.0); 6];
pub static PAIN_LIGHT: Move = Move {
    name: "hound_pain_light",
    first_frame: 46,
    last_frame: 51,
    frames: &PAIN_LIGHT_FRAMES,
    on_complete: Some(run),
};

static PAIN_HEAVY_FRAMES: [Frame; 16] = [
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 4.0),
    f(P::Move, 12.0),
    f(P::Move, 12.0),
    f(P::Move, 2.0),
    f(P::Move, 0.0),
    f(P::Move, 4.0),
    f(P::Move, 0.0),
    f(P::Move, 10.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
];
pub static PAIN_HEAVY: Move = Move {
    name: "hound_pain_heavy",
    first_frame: 52,
    last_frame: 67,
    frames: &PAIN_HEAVY_FRAMES,
    on_complete: Some(run),
};

static DEATH_FRAMES: [Frame; 9] = [
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    Frame::new(P::Move, 0.0, Some(super::corpse_shrink)),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
];
pub static DEATH: Move = Move {
    name: "hound_death",
    first_frame: 68,
    last_frame: 76,
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

fn melee(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&BITE));
}

/// The leap is the hound's "ranged" attack
fn pounce(world: &mut MonsterWorld, actor: ActorHandle) {
    animation::set_animation(world, actor, Some(&LEAP));
}

fn leap_done(world: &mut MonsterWorld, actor: ActorHandle) {
    leap::finish(world, actor);
    run(world, actor);
}

fn bite(world: &mut MonsterWorld, actor: ActorHandle) {
    let damage = (world.random() + world.random() + world.random()) * 8.0;
    let reach = world
        .monster(actor)
        .map_or(0.0, |s| s.kind.attack.melee_reach);
    if combat::fire_hit(world, actor, reach, damage.max(1.0), 100.0) {
        world.sound(actor, "hound/bite");
    } else {
        world.sound(actor, "hound/bite_miss");
    }
}

/// Bite when close, pounce when in the leap band
fn check_attack(world: &mut MonsterWorld, actor: ActorHandle) -> bool {
    if !ai::validate_enemy(world, actor) {
        return attack::decide(world, actor, AttackState::None);
    }
    let Some(state) = world.monster(actor) else {
        return false;
    };
    let Some(enemy) = state.enemy() else {
        return attack::decide(world, actor, AttackState::None);
    };
    let reach = state.kind.attack.melee_reach;
    let melee_ready = world.time() >= state.melee_debounce_until;

    if melee_ready && ai::range_to(world, actor, enemy).is_some_and(|r| r <= reach) {
        return attack::decide(world, actor, AttackState::Melee);
    }
    if leap::can_leap(world, actor, enemy) {
        return attack::decide(world, actor, AttackState::Missile);
    }
    attack::decide(world, actor, AttackState::None)
}

fn search(world: &mut MonsterWorld, actor: ActorHandle) {
    walk(world, actor);
}

fn on_pain(world: &mut MonsterWorld, actor: ActorHandle, source: Option<ActorHandle>, damage: f32) {
    pain::on_damage(world, actor, damage, source);
}

/// No flinching mid-pounce
fn airborne(world: &MonsterWorld, actor: ActorHandle, _damage: f32) -> bool {
    world
        .monster(actor)
        .is_some_and(|s| s.leap.phase == LeapPhase::Airborne)
}

fn die(world: &mut MonsterWorld, actor: ActorHandle, _attacker: Option<ActorHandle>, _damage: f32) {
    animation::set_animation(world, actor, Some(&DEATH));
}

pub fn def() -> KindDef {
    KindDef {
        name: "hound".into(),
        behavior: BehaviorTable {
            stand: Some(stand),
            walk: Some(walk),
            run: Some(run),
            attack: Some(pounce),
            melee: Some(melee),
            search: Some(search),
            pain: Some(on_pain),
            die: Some(die),
            set_skin: Some(super::damaged_skin),
            check_attack: Some(check_attack),
            ..Default::default()
        },
        moves: vec![
            &STAND,
            &WALK,
            &RUN,
            &BITE,
            &LEAP,
            &PAIN_LIGHT,
            &PAIN_HEAVY,
            &DEATH,
        ],
        health: 25.0,
        gib_health: -35.0,
        mass: 200.0,
        bbox: BoundingBox::new(Vec3::new(-32.0, -32.0, -24.0), Vec3::new(32.0, 32.0, 40.0)),
        flying: false,
        view_height: 20.0,
        yaw_speed: 30.0,
        style: CombatStyle::Mixed,
        attack: AttackProfile {
            melee_reach: crate::constants::RANGE_MELEE,
            ..Default::default()
        },
        pain: Some(PainProfile {
            debounce_secs: 1.5,
            light: Some(&PAIN_LIGHT),
            heavy: Some(&PAIN_HEAVY),
            attack_frames: vec![(BITE.first_frame, BITE.last_frame)],
            veto: Some(airborne),
            ..Default::default()
        }),
        leap: Some(LeapProfile::default()),
        sounds: KindSounds {
            sight: "hound/sight",
            idle: "hound/idle",
            search: "hound/search",
            pain: "hound/pain",
            death: "hound/death",
        },
    }
}
