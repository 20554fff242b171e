//! Built-in creature kinds.
//!
//! Each kind is a set of static [`Move`](crate::animation::Move) tables,
//! a behavior table wiring slots to those moves, and tuning profiles.

pub mod brute;
pub mod drone;
pub mod grunt;
pub mod hound;

use crate::content::KindDef;
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;

/// Every built-in kind, in registration order
pub fn all() -> Vec<KindDef> {
    vec![hound::def(), grunt::def(), brute::def(), drone::def()]
}

// =====================================================
// Hooks shared between kinds
// =====================================================

/// Skin 1 below half health
pub(crate) fn damaged_skin(world: &mut MonsterWorld, actor: ActorHandle) {
    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    let hurt = a.health < a.max_health.max(a.health) / 2.0;
    if let Some(s) = a.monster.as_mut() {
        s.skin = u32::from(hurt);
    }
}

/// Flatten a corpse so it no longer blocks shots over it
pub(crate) fn corpse_shrink(world: &mut MonsterWorld, actor: ActorHandle) {
    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    if a.gravity_dir.z > 0.0 {
        a.bbox.mins.z = a.bbox.maxs.z.min(0.0);
    } else {
        a.bbox.maxs.z = a.bbox.mins.z.max(0.0);
    }
}
