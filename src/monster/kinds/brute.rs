//! Brute: slow, heavy melee bruiser.

use crate::animation::{self, Frame, Move, MovePrimitive as P};
use crate::attack::AttackProfile;
use crate::behavior::BehaviorTable;
use crate::combat;
use crate::content::{KindDef, KindSounds};
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;
use crate::monster::{AiFlags, CombatStyle};
use crate::pain::{self, PainProfile};

const fn f(primitive: P, dist: f32) -> Frame {
    Frame::new(primitive, dist, None)
}

static STAND_FRAMES: [Frame; 5] = [f(P::Stand, 0.0); 5];
pub static STAND: Move = Move {
    name: "brute_stand",
    first_frame: 0,
    last_frame: 4,
    frames: &STAND_FRAMES,
    on_complete: Some(stand),
};

static WALK_FRAMES: [Frame; 8] = [
    f(P::Walk, 9.1),
    f(P::Walk, 6.3),
    f(P::Walk, 4.9),
    f(P::Walk, 6.7),
    f(P::Walk, 6.0),
    f(P::Walk, 8.2),
    f(P::Walk, 7.2),
    f(P::Walk, 6.1),
];
pub static WALK: Move = Move {
    name: "brute_walk",
    first_frame: 5,
    last_frame: 12,
    frames: &WALK_FRAMES,
    on_complete: Some(walk),
};

static RUN_FRAMES: [Frame; 6] = [
    f(P::Run, 21.0),
    f(P::Run, 11.0),
    f(P::Run, 21.0),
    f(P::Run, 25.0),
    f(P::Run, 18.0),
    f(P::Run, 19.0),
];
pub static RUN: Move = Move {
    name: "brute_run",
    first_frame: 13,
    last_frame: 18,
    frames: &RUN_FRAMES,
    on_complete: Some(run),
};

static SWING_FRAMES: [Frame; 8] = [
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
    Frame::new(P::Charge, 0.0, Some(swing)),
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
    f(P::Charge, 0.0),
];
pub static SWING: Move = Move {
    name: "brute_swing",
    first_frame: 19,
    last_frame: 26,
    frames: &SWING_FRAMES,
    on_complete: Some(run),
};

static PAIN_LIGHT_FRAMES: [Frame; 4] = [f(P::Move, 0.0); 4];
pub static PAIN_LIGHT: Move = Move {
    name: "brute_pain_light",
    first_frame: 27,
    last_frame: 30,
    frames: &PAIN_LIGHT_FRAMES,
    on_complete: Some(run),
};

static PAIN_HEAVY_FRAMES: [Frame; 12] = [
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, -1.0),
    f(P::Move, -2.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
];
pub static PAIN_HEAVY: Move = Move {
    name: "brute_pain_heavy",
    first_frame: 31,
    last_frame: 42,
    frames: &PAIN_HEAVY_FRAMES,
    on_complete: Some(run),
};

static DEATH_FRAMES: [Frame; 13] = [
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
    f(P::Move, 0.0),
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
    name: "brute_death",
    first_frame: 43,
    last_frame: 55,
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
    animation::set_animation(world, actor, Some(&SWING));
}

fn swing(world: &mut MonsterWorld, actor: ActorHandle) {
    let damage = 15.0 + world.random() * 6.0;
    let reach = world
        .monster(actor)
        .map_or(0.0, |s| s.kind.attack.melee_reach);
    if combat::fire_hit(world, actor, reach, damage, 400.0) {
        world.sound(actor, "brute/hit");
    }
}

fn on_pain(world: &mut MonsterWorld, actor: ActorHandle, source: Option<ActorHandle>, damage: f32) {
    pain::on_damage(world, actor, damage, source);
}

fn die(world: &mut MonsterWorld, actor: ActorHandle, _attacker: Option<ActorHandle>, _damage: f32) {
    animation::set_animation(world, actor, Some(&DEATH));
}

pub fn def() -> KindDef {
    KindDef {
        name: "brute".into(),
        behavior: BehaviorTable {
            stand: Some(stand),
            walk: Some(walk),
            run: Some(run),
            melee: Some(melee),
            search: Some(walk),
            pain: Some(on_pain),
            die: Some(die),
            set_skin: Some(super::damaged_skin),
            ..Default::default()
        },
        moves: vec![&STAND, &WALK, &RUN, &SWING, &PAIN_LIGHT, &PAIN_HEAVY, &DEATH],
        health: 240.0,
        gib_health: -60.0,
        mass: 250.0,
        bbox: BoundingBox::upright(16.0, -24.0, 32.0),
        flying: false,
        view_height: 25.0,
        yaw_speed: 20.0,
        style: CombatStyle::Melee,
        attack: AttackProfile::default(),
        pain: Some(PainProfile {
            debounce_secs: 3.0,
            heavy_threshold: 20.0,
            light: Some(&PAIN_LIGHT),
            heavy: Some(&PAIN_HEAVY),
            attack_frames: vec![(SWING.first_frame, SWING.last_frame)],
            sound: "brute/pain",
            ..Default::default()
        }),
        leap: None,
        sounds: KindSounds {
            sight: "brute/sight",
            idle: "brute/idle",
            search: "brute/search",
            pain: "brute/pain",
            death: "brute/death",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Slot;

    #[test]
    fn test_brute_is_melee_only() {
        let d = def();
        assert!(d.behavior.supports(Slot::Melee));
        assert!(!d.behavior.supports(Slot::Attack));
        assert!(!d.attack.ranged);
        assert_eq!(d.style, CombatStyle::Melee);
    }

    #[test]
    fn test_swing_frame_is_attack_frame() {
        let d = def();
        let pain = d.pain.unwrap();
        assert!(SWING.frame(22).unwrap().think.is_some());
        assert!(pain.in_attack_frames(22));
        assert!(!pain.in_attack_frames(RUN.first_frame));
    }
}
