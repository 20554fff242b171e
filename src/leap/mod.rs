//! Ballistic leap attacks: `Idle -> Windup -> Airborne -> Landed`.
//!
//! The leap is driven from frame hooks of the kind's jump move: `windup` on
//! the crouch frame, `takeoff` on the launch frame, `check_landing` on the
//! airborne hold frame. Impact damage comes from the touch hook installed at
//! takeoff and can fire at most once per leap.

use bevy::math::Vec3;
use tracing::{debug, trace};

use crate::behavior::{self, Slot};
use crate::collision::{CollisionService, MASK_MONSTERSOLID};
use crate::combat::{DamageCause, DamageRequest};
use crate::constants::{MIN_FLOOR_NORMAL, RANGE_MELEE, STEP_SIZE};
use crate::engine::clock::GameTime;
use crate::engine::{Contact, Ground, MonsterWorld};
use crate::entity::ActorHandle;
use crate::geometry::{horizontal, yaw_to_forward};
use crate::monster::ai;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeapProfile {
    pub forward_speed: f32,
    pub up_speed: f32,
    pub flight_timeout_secs: f32,
    /// Minimum horizontal speed for a contact to count as an impact
    pub impact_speed: f32,
    pub damage: (f32, f32),
    /// Extra ground checks after the deadline before forcing a landing
    pub retry_limit: u32,
    /// Enemies this close on landing get an immediate melee
    pub chase_range: f32,
    /// Pause before the next attack after landing
    pub recover_secs: (f32, f32),
    /// Horizontal origin distance band in which a leap is considered
    pub trigger_range: (f32, f32),
    /// No leaping at enemies standing higher than this above our feet
    pub max_rise: f32,
    /// Chance per attack check once the other gates pass
    pub chance: f32,
}

impl Default for LeapProfile {
    fn default() -> Self {
        Self {
            forward_speed: 400.0,
            up_speed: 200.0,
            flight_timeout_secs: 3.0,
            impact_speed: 300.0,
            damage: (20.0, 25.0),
            retry_limit: 3,
            chase_range: RANGE_MELEE * 2.0,
            recover_secs: (0.5, 1.5),
            trigger_range: (80.0, 150.0),
            max_rise: 96.0,
            chance: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeapPhase {
    #[default]
    Idle,
    Windup,
    Airborne,
    Landed,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeapState {
    pub phase: LeapPhase,
    /// Impact damage still available for this leap
    pub armed: bool,
    pub deadline: GameTime,
    pub retries: u32,
    /// Number of times `armed` went from true to false
    pub disarm_count: u32,
}

impl LeapState {
    pub fn disarm(&mut self) {
        if self.armed {
            self.armed = false;
            self.disarm_count += 1;
        }
    }
}

fn profile_of(world: &MonsterWorld, actor: ActorHandle) -> Option<LeapProfile> {
    world.monster(actor).and_then(|s| s.kind.leap)
}

/// Whether `actor` may leap at `enemy` this think
pub fn can_leap(world: &mut MonsterWorld, actor: ActorHandle, enemy: ActorHandle) -> bool {
    let Some(profile) = profile_of(world, actor) else {
        return false;
    };
    let now = world.time();
    let (Some(a), Some(e)) = (world.actor(actor), world.actor(enemy)) else {
        return false;
    };
    let Some(state) = a.monster.as_ref() else {
        return false;
    };
    if now < state.attack_ready_at || state.leap.phase == LeapPhase::Airborne || a.ground.is_none() {
        return false;
    }

    let up = a.up();
    let feet = |origin: Vec3, mins: Vec3, maxs: Vec3| {
        if up.z >= 0.0 {
            origin + mins
        } else {
            origin + maxs
        }
    };
    let rise = (feet(e.origin, e.bbox.mins, e.bbox.maxs) - feet(a.origin, a.bbox.mins, a.bbox.maxs)).dot(up);
    if rise > profile.max_rise {
        return false;
    }
    let flat = horizontal(e.origin - a.origin, a.gravity_dir).length();
    let (near, far) = profile.trigger_range;
    if flat < near || flat > far {
        return false;
    }
    if !ai::visible(world, actor, enemy) {
        return false;
    }
    world.random() < profile.chance
}

pub fn windup(world: &mut MonsterWorld, actor: ActorHandle) {
    if let Some(s) = world.monster_mut(actor) {
        s.leap.phase = LeapPhase::Windup;
        s.leap.retries = 0;
    }
}

/// Launch forward and up, arm the impact
pub fn takeoff(world: &mut MonsterWorld, actor: ActorHandle) {
    let Some(profile) = profile_of(world, actor) else {
        world.report_content_error(Some(actor), "leap takeoff without a leap profile");
        return;
    };
    let deadline = world.time().after(profile.flight_timeout_secs);
    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    if a.dead {
        return;
    }
    let up = a.up();
    a.velocity = yaw_to_forward(a.yaw) * profile.forward_speed + up * profile.up_speed;
    a.origin += up;
    a.ground = None;
    a.touch = Some(leap_touch);
    if let Some(s) = a.monster.as_mut() {
        s.leap.phase = LeapPhase::Airborne;
        s.leap.armed = true;
        s.leap.deadline = deadline;
        s.leap.retries = 0;
    }
    trace!(?actor, ?deadline, "leap takeoff");
}

/// Touch hook while airborne
pub fn leap_touch(world: &mut MonsterWorld, actor: ActorHandle, contact: Contact) {
    let Some(a) = world.actor(actor) else {
        return;
    };
    if a.dead || a.monster.is_none() {
        if let Some(a) = world.actor_mut(actor) {
            a.touch = None;
        }
        return;
    }
    let up = a.up();
    let velocity = a.velocity;
    let speed = horizontal(velocity, a.gravity_dir).length();
    let armed = a.monster.as_ref().is_some_and(|s| s.leap.armed);
    let Some(profile) = profile_of(world, actor) else {
        return;
    };

    if let Some(other) = contact.other {
        let damageable = world
            .actor(other)
            .is_some_and(|o| o.takes_damage && !o.dead);
        if armed && damageable && speed > profile.impact_speed {
            let amount = world.random_range(profile.damage.0, profile.damage.1);
            let point = world.actor(actor).map_or(Vec3::ZERO, |a| a.origin);
            release(world, actor);
            debug!(?actor, ?other, amount, "leap impact");
            let damage = world.damage_service();
            damage.apply(
                world,
                DamageRequest {
                    target: other,
                    inflictor: actor,
                    attacker: Some(actor),
                    direction: velocity.normalize_or_zero(),
                    point,
                    amount,
                    knockback: amount,
                    cause: DamageCause::Leap,
                },
            );
            return;
        }
    }

    let floor = contact.normal.dot(up) > MIN_FLOOR_NORMAL;
    if floor || contact.other.is_some() {
        release(world, actor);
    }
}

/// Disarm and drop the touch hook
fn release(world: &mut MonsterWorld, actor: ActorHandle) {
    if let Some(a) = world.actor_mut(actor) {
        a.touch = None;
        if let Some(s) = a.monster.as_mut() {
            s.leap.disarm();
        }
    }
}

/// Frame hook on the airborne hold frame
pub fn check_landing(world: &mut MonsterWorld, actor: ActorHandle) {
    let now = world.time();
    let Some(a) = world.actor(actor) else {
        return;
    };
    if a.dead {
        return;
    }
    let grounded = a.ground.is_some();
    let Some(leap) = a.monster.as_ref().map(|s| s.leap) else {
        return;
    };
    if leap.phase != LeapPhase::Airborne {
        return;
    }
    if grounded {
        land(world, actor);
        return;
    }
    if now < leap.deadline {
        hold(world, actor);
        return;
    }

    // Past the deadline: look for ground right below
    if let Some(ground) = probe_ground(world, actor) {
        if let Some(a) = world.actor_mut(actor) {
            a.ground = Some(ground);
        }
        land(world, actor);
        return;
    }

    let limit = profile_of(world, actor).map_or(0, |p| p.retry_limit);
    let frame_secs = world.frame_secs();
    let retries = match world.monster_mut(actor) {
        Some(s) => {
            s.leap.retries += 1;
            s.leap.deadline = now.after(frame_secs);
            s.leap.retries
        }
        None => return,
    };
    if retries >= limit {
        debug!(?actor, retries, "leap suspended too long, recovering in place");
        land(world, actor);
    } else {
        hold(world, actor);
    }
}

/// Replay the current frame next think
fn hold(world: &mut MonsterWorld, actor: ActorHandle) {
    if let Some(s) = world.monster_mut(actor) {
        s.anim.next_frame = Some(s.anim.frame);
    }
}

fn probe_ground(world: &MonsterWorld, actor: ActorHandle) -> Option<Ground> {
    let a = world.actor(actor)?;
    let end = a.origin + a.gravity_dir * STEP_SIZE;
    let tr = world.trace(a.origin, &a.bbox, end, Some(actor), MASK_MONSTERSOLID);
    (tr.fraction < 1.0 && tr.normal.dot(a.up()) > MIN_FLOOR_NORMAL).then_some(Ground {
        actor: tr.hit,
        normal: tr.normal,
    })
}

fn land(world: &mut MonsterWorld, actor: ActorHandle) {
    let (lo, hi) = profile_of(world, actor).map_or((0.0, 0.0), |p| p.recover_secs);
    let recover = world.random_range(lo, hi);
    let now = world.time();
    release(world, actor);
    if let Some(a) = world.actor_mut(actor) {
        a.velocity = Vec3::ZERO;
        if let Some(s) = a.monster.as_mut() {
            s.leap.phase = LeapPhase::Landed;
            s.attack_ready_at = now.after(recover);
        }
    }
    trace!(?actor, "leap landed");

    if !ai::validate_enemy(world, actor) {
        return;
    }
    let chase = profile_of(world, actor).map_or(0.0, |p| p.chase_range);
    let close = world
        .monster(actor)
        .and_then(|s| s.enemy())
        .and_then(|e| ai::range_to(world, actor, e))
        .is_some_and(|r| r <= chase);
    if close && behavior::supports(world, actor, Slot::Melee) {
        behavior::invoke(world, actor, Slot::Melee);
    }
}

/// Leap state returns to idle once the landing move finishes
pub fn finish(world: &mut MonsterWorld, actor: ActorHandle) {
    if let Some(s) = world.monster_mut(actor) {
        s.leap.phase = LeapPhase::Idle;
    }
}
