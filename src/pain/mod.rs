//! Pain reactions.
//!
//! Damage always makes noise; whether it also interrupts the actor with a
//! flinch is gated by a debounce, the skill level, the current attack frames
//! and an optional per-kind veto.

use tracing::trace;

use crate::animation::{self, Move};
use crate::constants::PAIN_DEBOUNCE_SECS;
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;

/// Per-kind veto, e.g. no flinching mid-jump
pub type PainVeto = fn(&MonsterWorld, ActorHandle, f32) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PainTier {
    Light,
    Medium,
    Heavy,
}

#[derive(Clone)]
pub struct PainProfile {
    pub debounce_secs: f32,
    /// Damage at or above which the medium reaction plays
    pub medium_threshold: f32,
    pub heavy_threshold: f32,
    pub light: Option<&'static Move>,
    pub medium: Option<&'static Move>,
    pub heavy: Option<&'static Move>,
    /// Inclusive frame ranges during which Hard and above ignore pain
    pub attack_frames: Vec<(u32, u32)>,
    pub veto: Option<PainVeto>,
    pub sound: &'static str,
}

impl Default for PainProfile {
    fn default() -> Self {
        Self {
            debounce_secs: PAIN_DEBOUNCE_SECS,
            medium_threshold: 10.0,
            heavy_threshold: 25.0,
            light: None,
            medium: None,
            heavy: None,
            attack_frames: Vec::new(),
            veto: None,
            sound: "",
        }
    }
}

impl PainProfile {
    /// Zero, negative or NaN damage counts as light
    pub fn tier_for(&self, damage: f32) -> PainTier {
        if damage >= self.heavy_threshold {
            PainTier::Heavy
        } else if damage >= self.medium_threshold {
            PainTier::Medium
        } else {
            PainTier::Light
        }
    }

    /// Move for `tier`, falling back to lighter tiers, then heavier ones
    pub fn move_for(&self, tier: PainTier) -> Option<&'static Move> {
        let order = match tier {
            PainTier::Heavy => [self.heavy, self.medium, self.light],
            PainTier::Medium => [self.medium, self.light, self.heavy],
            PainTier::Light => [self.light, self.medium, self.heavy],
        };
        order.into_iter().flatten().next()
    }

    pub fn in_attack_frames(&self, frame: u32) -> bool {
        self.attack_frames
            .iter()
            .any(|&(first, last)| (first..=last).contains(&frame))
    }
}

/// Returns true when a pain move was started
pub fn on_damage(
    world: &mut MonsterWorld,
    actor: ActorHandle,
    amount: f32,
    source: Option<ActorHandle>,
) -> bool {
    let Some(state) = world.monster(actor) else {
        return false;
    };
    let kind = state.kind.clone();
    let Some(profile) = kind.pain.as_ref() else {
        return false;
    };
    let debounced = world.time() < state.pain_debounce_until;
    let frame = state.anim.active.map(|_| state.anim.frame);

    let sound = if profile.sound.is_empty() {
        kind.sounds.pain
    } else {
        profile.sound
    };
    world.sound(actor, sound);

    if !world.is_alive(actor) || debounced {
        return false;
    }
    let skill = world.skill();
    if !skill.pain_enabled() {
        return false;
    }
    if skill.suppresses_pain_mid_attack() && frame.is_some_and(|f| profile.in_attack_frames(f)) {
        trace!(?actor, ?frame, "pain ignored mid-attack");
        return false;
    }
    if profile.veto.is_some_and(|veto| veto(world, actor, amount)) {
        trace!(?actor, "pain vetoed");
        return false;
    }

    let tier = profile.tier_for(amount);
    let Some(mv) = profile.move_for(tier) else {
        world.report_content_error(Some(actor), "pain profile has no moves");
        return false;
    };
    trace!(?actor, ?source, amount, ?tier, "pain reaction");
    animation::set_animation(world, actor, Some(mv));
    let until = world.time().after(profile.debounce_secs);
    if let Some(s) = world.monster_mut(actor) {
        s.pain_debounce_until = until;
    }
    true
}
