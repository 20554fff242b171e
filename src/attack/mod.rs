//! Attack arbitration.
//!
//! [`check_attack`] is the default per-think decision between melee, a
//! ranged shot, strafing, blind fire at a remembered position, or nothing.
//! Kinds with unusual attacks (the hound's leap) plug their own check into
//! the `check_attack` slot and may reuse pieces of this one.

use bevy::math::Vec3;
use tracing::trace;

use crate::collision::{CollisionService, Contents, MASK_SHOT};
use crate::constants::{MELEE_DEBOUNCE_SECS, RANGE_MELEE, RANGE_MID, RANGE_NEAR};
use crate::engine::{MonsterWorld, MoveType};
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;
use crate::monster::{ai, AiFlags, AttackState, CombatStyle};

/// Chance per attack check of opening fire, by range band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementChances {
    pub stand_ground: f32,
    pub melee: f32,
    pub near: f32,
    pub mid: f32,
    pub far: f32,
}

impl Default for EngagementChances {
    fn default() -> Self {
        Self {
            stand_ground: 0.7,
            melee: 0.4,
            near: 0.25,
            mid: 0.06,
            far: 0.0,
        }
    }
}

impl EngagementChances {
    pub fn for_range(&self, range: f32, stand_ground: bool) -> f32 {
        if range <= RANGE_MELEE {
            self.melee
        } else if stand_ground {
            self.stand_ground
        } else if range <= RANGE_NEAR {
            self.near
        } else if range <= RANGE_MID {
            self.mid
        } else {
            self.far
        }
    }
}

/// Blind-fire tuning: confidence decays with time since the last sighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlindFireProfile {
    /// No blind fire once the sighting is older than this
    pub window_secs: f32,
    pub fresh_secs: f32,
    pub fresh_chance: f32,
    pub recent_secs: f32,
    pub recent_chance: f32,
    pub stale_chance: f32,
    /// Added to the per-sighting delay after each blind shot
    pub delay_growth: (f32, f32),
}

impl Default for BlindFireProfile {
    fn default() -> Self {
        Self {
            window_secs: 20.0,
            fresh_secs: 1.0,
            fresh_chance: 1.0,
            recent_secs: 7.5,
            recent_chance: 0.4,
            stale_chance: 0.1,
            delay_growth: (5.5, 6.5),
        }
    }
}

impl BlindFireProfile {
    pub fn chance_for(&self, elapsed: f32) -> f32 {
        if elapsed <= self.fresh_secs {
            self.fresh_chance
        } else if elapsed <= self.recent_secs {
            self.recent_chance
        } else {
            self.stale_chance
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackProfile {
    /// Box-gap distance within which melee is possible
    pub melee_reach: f32,
    pub melee_debounce_secs: f32,
    pub ranged: bool,
    /// Ranged attacks are never started beyond this gap
    pub max_range: f32,
    pub chances: EngagementChances,
    /// Chance a flyer strafes instead of holding when it does not fire
    pub strafe_chance: f32,
    /// `None` for hitscan
    pub projectile_speed: Option<f32>,
    pub blind_fire: Option<BlindFireProfile>,
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self {
            melee_reach: RANGE_MELEE,
            melee_debounce_secs: MELEE_DEBOUNCE_SECS,
            ranged: false,
            max_range: RANGE_MID,
            chances: EngagementChances::default(),
            strafe_chance: 0.6,
            projectile_speed: None,
            blind_fire: None,
        }
    }
}

/// Store the decision; true when it starts an attack this think
pub fn decide(world: &mut MonsterWorld, actor: ActorHandle, state: AttackState) -> bool {
    if let Some(s) = world.monster_mut(actor) {
        s.set_attack_state(state);
    }
    matches!(
        state,
        AttackState::Melee | AttackState::Missile | AttackState::Blind
    )
}

/// Default attack decision. First match wins: melee, ranged, blind fire, none.
pub fn check_attack(world: &mut MonsterWorld, actor: ActorHandle) -> bool {
    if !ai::validate_enemy(world, actor) {
        return decide(world, actor, AttackState::None);
    }
    let Some(state) = world.monster(actor) else {
        return false;
    };
    let Some(enemy) = state.enemy() else {
        return decide(world, actor, AttackState::None);
    };
    let kind = state.kind.clone();
    let profile = kind.attack;
    let stand_ground = state.ai_flags.contains(AiFlags::STAND_GROUND);
    let melee_ready_at = state.melee_debounce_until;
    let attack_ready_at = state.attack_ready_at;
    let sighting = state.sighting;
    let now = world.time();

    let Some(range) = ai::range_to(world, actor, enemy) else {
        return decide(world, actor, AttackState::None);
    };

    if range <= profile.melee_reach && now >= melee_ready_at && kind.behavior.melee.is_some() {
        trace!(?actor, range, "melee in reach");
        return decide(world, actor, AttackState::Melee);
    }

    if kind.style == CombatStyle::Melee || !profile.ranged || kind.behavior.attack.is_none() {
        return decide(world, actor, AttackState::None);
    }

    if ai::visible(world, actor, enemy) {
        if now < attack_ready_at || range > profile.max_range {
            return decide(world, actor, AttackState::None);
        }
        if !clear_shot(world, actor, enemy) {
            return decide(world, actor, AttackState::None);
        }
        let chance =
            profile.chances.for_range(range, stand_ground) * world.skill().attack_chance_scale();
        if world.random() < chance {
            let cooldown = world.random_range(0.0, 2.0);
            if let Some(s) = world.monster_mut(actor) {
                s.attack_ready_at = now.after(cooldown);
                s.ai_flags.remove(AiFlags::BLIND_FIRE);
            }
            return decide(world, actor, AttackState::Missile);
        }
        let flyer = world
            .actor(actor)
            .is_some_and(|a| a.move_type == MoveType::Fly);
        if flyer && world.random() < profile.strafe_chance {
            return decide(world, actor, AttackState::Sliding);
        }
        return decide(world, actor, AttackState::None);
    }

    // Enemy out of sight: maybe fire at where it was
    let Some(blind) = profile.blind_fire else {
        return decide(world, actor, AttackState::None);
    };
    if !sighting.seen {
        return decide(world, actor, AttackState::None);
    }
    let elapsed = now.since(sighting.last_seen_at);
    if elapsed > blind.window_secs
        || now < attack_ready_at
        || elapsed < sighting.blind_fire_delay
    {
        return decide(world, actor, AttackState::None);
    }
    if world.random() >= blind.chance_for(elapsed) {
        return decide(world, actor, AttackState::None);
    }
    if !blind_line_clear(world, actor, sighting.blind_fire_target) {
        trace!(?actor, "blind fire would hit a friend");
        return decide(world, actor, AttackState::None);
    }

    let cooldown = world.random_range(0.0, 2.0);
    if let Some(s) = world.monster_mut(actor) {
        s.attack_ready_at = now.after(cooldown);
        s.ai_flags.insert(AiFlags::BLIND_FIRE);
    }
    trace!(?actor, elapsed, "blind fire");
    decide(world, actor, AttackState::Blind)
}

/// Nothing but the enemy between the actor's eye and the enemy's center
pub fn clear_shot(world: &MonsterWorld, actor: ActorHandle, enemy: ActorHandle) -> bool {
    let (Some(a), Some(e)) = (world.actor(actor), world.actor(enemy)) else {
        return false;
    };
    let tr = world.trace(
        a.eye(),
        &BoundingBox::POINT,
        e.bbox.center(e.origin),
        Some(actor),
        MASK_SHOT,
    );
    if tr.start_solid {
        return false;
    }
    tr.fraction >= 1.0 || tr.hit == Some(enemy)
}

fn blind_line_clear(world: &MonsterWorld, actor: ActorHandle, target: Vec3) -> bool {
    let Some(a) = world.actor(actor) else {
        return false;
    };
    let tr = world.trace(a.eye(), &BoundingBox::POINT, target, Some(actor), MASK_SHOT);
    if tr.all_solid || tr.start_solid {
        return false;
    }
    !tr.contents.intersects(Contents::MONSTER)
}

/// Grow the delay before the next blind shot at the same sighting
pub fn note_blind_fire(world: &mut MonsterWorld, actor: ActorHandle) {
    let growth = world
        .monster(actor)
        .and_then(|s| s.kind.attack.blind_fire)
        .map(|b| b.delay_growth);
    let Some((lo, hi)) = growth else {
        return;
    };
    let extra = world.random_range(lo, hi);
    if let Some(s) = world.monster_mut(actor) {
        s.sighting.blind_fire_delay += extra;
        s.ai_flags.remove(AiFlags::BLIND_FIRE);
    }
}

/// Result of aiming at a moving target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimSolution {
    pub dir: Vec3,
    pub point: Vec3,
    /// False when the lead was rejected and the aim is straight at the target
    pub leading: bool,
}

/// Aim from `start` at `target`, leading by its velocity over the projectile
/// flight time. `speed` of `None` is hitscan (no lead). `time_offset` shortens
/// the lead, e.g. for shots fired a few frames after the aim.
pub fn predict_aim(
    world: &MonsterWorld,
    shooter: ActorHandle,
    target: ActorHandle,
    start: Vec3,
    speed: Option<f32>,
    time_offset: f32,
) -> Option<AimSolution> {
    let t = world.actor(target)?;
    let aim_at = t.bbox.center(t.origin);
    let straight = AimSolution {
        dir: (aim_at - start).normalize_or_zero(),
        point: aim_at,
        leading: false,
    };

    let Some(speed) = speed.filter(|s| *s > 0.0) else {
        return Some(straight);
    };
    let flight = start.distance(aim_at) / speed;
    let point = aim_at + t.velocity * (flight - time_offset).max(0.0);
    let dir = (point - start).normalize_or_zero();

    // Leading backwards means the target is coming at us faster than the shot
    if dir.dot(straight.dir) <= 0.0 {
        return Some(straight);
    }
    let tr = world.trace(start, &BoundingBox::POINT, point, Some(shooter), MASK_SHOT);
    if tr.fraction < 0.9 && tr.hit != Some(target) {
        return Some(straight);
    }
    Some(AimSolution {
        dir,
        point,
        leading: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::engine::{Actor, EngineConfig, GameTime};
    use std::sync::Arc;

    fn world_with(geometry: BrushWorld) -> MonsterWorld {
        let geometry = geometry.with_plane(Vec3::Z, 0.0, 4096.0);
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(geometry))
    }

    /// Grunt at the origin facing +X, player 300 units ahead
    fn grunt_and_player(world: &mut MonsterWorld) -> (ActorHandle, ActorHandle) {
        let kind = world.kinds().get("grunt").unwrap();
        let grunt = world.spawn_actor(Actor::monster(kind, Vec3::new(0.0, 0.0, 24.0), 0.0, Vec3::NEG_Z));
        let player = world.spawn_actor(Actor::player(Vec3::new(300.0, 0.0, 24.0)));
        (grunt, player)
    }

    #[test]
    fn test_engagement_bands() {
        let c = EngagementChances::default();
        assert_eq!(c.for_range(10.0, false), 0.4);
        assert_eq!(c.for_range(100.0, true), 0.7);
        assert_eq!(c.for_range(100.0, false), 0.25);
        assert_eq!(c.for_range(800.0, false), 0.06);
        assert_eq!(c.for_range(5000.0, false), 0.0);
    }

    #[test]
    fn test_blind_fire_confidence_decays() {
        let b = BlindFireProfile::default();
        assert_eq!(b.chance_for(0.5), 1.0);
        assert_eq!(b.chance_for(3.0), 0.4);
        assert_eq!(b.chance_for(12.0), 0.1);
        assert!(b.chance_for(0.0) >= b.chance_for(5.0));
    }

    #[test]
    fn test_default_profile_is_melee_only() {
        let p = AttackProfile::default();
        assert!(!p.ranged);
        assert!(p.blind_fire.is_none());
        assert_eq!(p.melee_reach, RANGE_MELEE);
    }

    #[test]
    fn test_blind_fire_at_last_sighting() {
        let wall = BrushWorld::new().with_box(
            Vec3::new(100.0, -256.0, 0.0),
            Vec3::new(132.0, 256.0, 256.0),
            Contents::SOLID,
        );
        let mut w = world_with(wall);
        let (grunt, player) = grunt_and_player(&mut w);
        assert!(!ai::visible(&w, grunt, player));

        let s = w.monster_mut(grunt).unwrap();
        s.set_enemy(Some(player));
        s.sighting.remember(Vec3::new(300.0, 0.0, 24.0), Vec3::ZERO, GameTime::ZERO);
        s.attack_ready_at = GameTime::ZERO;

        assert!(check_attack(&mut w, grunt));
        let s = w.monster(grunt).unwrap();
        assert_eq!(s.attack_state(), AttackState::Blind);
        assert!(s.ai_flags.contains(AiFlags::BLIND_FIRE));

        // the shot pushes the next blind shot at this sighting further out
        note_blind_fire(&mut w, grunt);
        let s = w.monster_mut(grunt).unwrap();
        assert!(s.sighting.blind_fire_delay >= 5.5);
        assert!(!s.ai_flags.contains(AiFlags::BLIND_FIRE));
        s.attack_ready_at = GameTime::ZERO;
        assert!(!check_attack(&mut w, grunt));
        assert_eq!(w.monster(grunt).unwrap().attack_state(), AttackState::None);
    }

    #[test]
    fn test_no_blind_fire_without_sighting() {
        let wall = BrushWorld::new().with_box(
            Vec3::new(100.0, -256.0, 0.0),
            Vec3::new(132.0, 256.0, 256.0),
            Contents::SOLID,
        );
        let mut w = world_with(wall);
        let (grunt, player) = grunt_and_player(&mut w);
        w.monster_mut(grunt).unwrap().set_enemy(Some(player));
        assert!(!check_attack(&mut w, grunt));
        assert_eq!(w.monster(grunt).unwrap().attack_state(), AttackState::None);
    }

    #[test]
    fn test_predict_aim_leads_moving_target() {
        let mut w = world_with(BrushWorld::new());
        let (grunt, player) = grunt_and_player(&mut w);
        w.actor_mut(player).unwrap().velocity = Vec3::new(0.0, 300.0, 0.0);
        let start = w.actor(grunt).unwrap().eye();

        let aim = predict_aim(&w, grunt, player, start, Some(1000.0), 0.0).unwrap();
        assert!(aim.leading);
        assert!(aim.point.y > 50.0, "lead point {:?}", aim.point);
        assert!(aim.dir.y > 0.0);

        // a later shot leads less
        let late = predict_aim(&w, grunt, player, start, Some(1000.0), 0.2).unwrap();
        assert!(late.point.y < aim.point.y);

        // hitscan never leads
        let hitscan = predict_aim(&w, grunt, player, start, None, 0.0).unwrap();
        assert!(!hitscan.leading);
        assert_eq!(hitscan.point.y, 0.0);
    }

    #[test]
    fn test_predict_aim_falls_back_when_lead_is_blocked() {
        // covers the lead point but not the straight line
        let pillar = BrushWorld::new().with_box(
            Vec3::new(200.0, 40.0, 0.0),
            Vec3::new(240.0, 256.0, 256.0),
            Contents::SOLID,
        );
        let mut w = world_with(pillar);
        let (grunt, player) = grunt_and_player(&mut w);
        w.actor_mut(player).unwrap().velocity = Vec3::new(0.0, 300.0, 0.0);
        let start = w.actor(grunt).unwrap().eye();

        let aim = predict_aim(&w, grunt, player, start, Some(1000.0), 0.0).unwrap();
        assert!(!aim.leading);
        assert_eq!(aim.point.y, 0.0);
        assert!(aim.dir.x > 0.99);
    }
}
