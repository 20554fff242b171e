//! Per-kind behavior slots.
//!
//! Each kind fills in the slots it supports; an empty slot means the kind
//! simply lacks that capability, and dispatching to it is a quiet no-op.

use std::fmt;

use tracing::trace;

use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;

pub type ActorFn = fn(&mut MonsterWorld, ActorHandle);
/// `(world, actor, other)`
pub type SightFn = fn(&mut MonsterWorld, ActorHandle, ActorHandle);
/// `(world, actor, source, damage)`
pub type PainFn = fn(&mut MonsterWorld, ActorHandle, Option<ActorHandle>, f32);
/// `(world, actor, attacker, damage)`
pub type DieFn = fn(&mut MonsterWorld, ActorHandle, Option<ActorHandle>, f32);
/// `(world, actor, attacker, seconds until impact)`
pub type DodgeFn = fn(&mut MonsterWorld, ActorHandle, ActorHandle, f32);
/// `(world, actor, distance that could not be covered)`
pub type BlockedFn = fn(&mut MonsterWorld, ActorHandle, f32) -> bool;
/// `(world, actor, seconds until impact)`
pub type DuckFn = fn(&mut MonsterWorld, ActorHandle, f32) -> bool;
pub type PredicateFn = fn(&mut MonsterWorld, ActorHandle) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Stand,
    Walk,
    Run,
    Attack,
    Melee,
    Sight,
    Search,
    Idle,
    Pain,
    Die,
    Dodge,
    Blocked,
    Duck,
    UnDuck,
    SideStep,
    SetSkin,
    CheckAttack,
}

impl Slot {
    pub const ALL: [Slot; 17] = [
        Slot::Stand,
        Slot::Walk,
        Slot::Run,
        Slot::Attack,
        Slot::Melee,
        Slot::Sight,
        Slot::Search,
        Slot::Idle,
        Slot::Pain,
        Slot::Die,
        Slot::Dodge,
        Slot::Blocked,
        Slot::Duck,
        Slot::UnDuck,
        Slot::SideStep,
        Slot::SetSkin,
        Slot::CheckAttack,
    ];
}

#[derive(Clone, Copy, Default)]
pub struct BehaviorTable {
    pub stand: Option<ActorFn>,
    pub walk: Option<ActorFn>,
    pub run: Option<ActorFn>,
    pub attack: Option<ActorFn>,
    pub melee: Option<ActorFn>,
    pub sight: Option<SightFn>,
    pub search: Option<ActorFn>,
    pub idle: Option<ActorFn>,
    pub pain: Option<PainFn>,
    pub die: Option<DieFn>,
    pub dodge: Option<DodgeFn>,
    pub blocked: Option<BlockedFn>,
    pub duck: Option<DuckFn>,
    pub un_duck: Option<ActorFn>,
    pub side_step: Option<PredicateFn>,
    pub set_skin: Option<ActorFn>,
    pub check_attack: Option<PredicateFn>,
}

impl BehaviorTable {
    pub fn supports(&self, slot: Slot) -> bool {
        match slot {
            Slot::Stand => self.stand.is_some(),
            Slot::Walk => self.walk.is_some(),
            Slot::Run => self.run.is_some(),
            Slot::Attack => self.attack.is_some(),
            Slot::Melee => self.melee.is_some(),
            Slot::Sight => self.sight.is_some(),
            Slot::Search => self.search.is_some(),
            Slot::Idle => self.idle.is_some(),
            Slot::Pain => self.pain.is_some(),
            Slot::Die => self.die.is_some(),
            Slot::Dodge => self.dodge.is_some(),
            Slot::Blocked => self.blocked.is_some(),
            Slot::Duck => self.duck.is_some(),
            Slot::UnDuck => self.un_duck.is_some(),
            Slot::SideStep => self.side_step.is_some(),
            Slot::SetSkin => self.set_skin.is_some(),
            Slot::CheckAttack => self.check_attack.is_some(),
        }
    }

    pub fn supported(&self) -> Vec<Slot> {
        Slot::ALL
            .iter()
            .copied()
            .filter(|s| self.supports(*s))
            .collect()
    }

    fn simple(&self, slot: Slot) -> Option<ActorFn> {
        match slot {
            Slot::Stand => self.stand,
            Slot::Walk => self.walk,
            Slot::Run => self.run,
            Slot::Attack => self.attack,
            Slot::Melee => self.melee,
            Slot::Search => self.search,
            Slot::Idle => self.idle,
            Slot::UnDuck => self.un_duck,
            Slot::SetSkin => self.set_skin,
            _ => None,
        }
    }
}

impl fmt::Debug for BehaviorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.supported()).finish()
    }
}

/// Copy of the actor's behavior table, `None` for non-monsters and freed slots
pub fn table_of(world: &MonsterWorld, actor: ActorHandle) -> Option<BehaviorTable> {
    world.monster(actor).map(|m| m.kind.behavior)
}

pub fn supports(world: &MonsterWorld, actor: ActorHandle, slot: Slot) -> bool {
    table_of(world, actor).is_some_and(|t| t.supports(slot))
}

/// Dispatch a slot taking no arguments. Returns whether a handler ran.
pub fn invoke(world: &mut MonsterWorld, actor: ActorHandle, slot: Slot) -> bool {
    match table_of(world, actor).and_then(|t| t.simple(slot)) {
        Some(f) => {
            f(world, actor);
            true
        }
        None => {
            trace!(?actor, ?slot, "slot unsupported");
            false
        }
    }
}

pub fn invoke_sight(world: &mut MonsterWorld, actor: ActorHandle, other: ActorHandle) -> bool {
    match table_of(world, actor).and_then(|t| t.sight) {
        Some(f) => {
            f(world, actor, other);
            true
        }
        None => false,
    }
}

pub fn invoke_pain(
    world: &mut MonsterWorld,
    actor: ActorHandle,
    source: Option<ActorHandle>,
    damage: f32,
) -> bool {
    match table_of(world, actor).and_then(|t| t.pain) {
        Some(f) => {
            f(world, actor, source, damage);
            true
        }
        None => false,
    }
}

pub fn invoke_die(
    world: &mut MonsterWorld,
    actor: ActorHandle,
    attacker: Option<ActorHandle>,
    damage: f32,
) -> bool {
    match table_of(world, actor).and_then(|t| t.die) {
        Some(f) => {
            f(world, actor, attacker, damage);
            true
        }
        None => false,
    }
}

pub fn invoke_dodge(
    world: &mut MonsterWorld,
    actor: ActorHandle,
    attacker: ActorHandle,
    eta: f32,
) -> bool {
    match table_of(world, actor).and_then(|t| t.dodge) {
        Some(f) => {
            f(world, actor, attacker, eta);
            true
        }
        None => false,
    }
}

/// `false` when unsupported or when the handler could not resolve the block
pub fn invoke_blocked(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) -> bool {
    table_of(world, actor)
        .and_then(|t| t.blocked)
        .is_some_and(|f| f(world, actor, dist))
}

pub fn invoke_duck(world: &mut MonsterWorld, actor: ActorHandle, eta: f32) -> bool {
    table_of(world, actor)
        .and_then(|t| t.duck)
        .is_some_and(|f| f(world, actor, eta))
}

pub fn invoke_side_step(world: &mut MonsterWorld, actor: ActorHandle) -> bool {
    table_of(world, actor)
        .and_then(|t| t.side_step)
        .is_some_and(|f| f(world, actor))
}

/// `None` when the kind has no custom attack check
pub fn invoke_check_attack(world: &mut MonsterWorld, actor: ActorHandle) -> Option<bool> {
    table_of(world, actor)
        .and_then(|t| t.check_attack)
        .map(|f| f(world, actor))
}
