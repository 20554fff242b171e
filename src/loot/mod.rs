//! Death drops.
//!
//! A monster drops the item the spawner assigned to it. Monsters without an
//! assigned item fall back to one companion drop listed on their creature
//! entry in the spawn tables. Drops surface as [`WorldEvent::ItemDropped`];
//! placing the pickup in the world is the host's job.

use tracing::debug;

use crate::engine::{MonsterWorld, WorldEvent};
use crate::entity::ActorHandle;

/// Where an item drop came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSource {
    Assigned,
    Companion,
}

/// Emit the actor's death drop, if it has one
pub fn drop_on_death(world: &mut MonsterWorld, actor: ActorHandle) -> Option<DropSource> {
    let (assigned, class_name, origin) = {
        let a = world.actor_mut(actor)?;
        (a.item.take(), a.class_name.clone(), a.bbox.center(a.origin))
    };

    let (item, source) = match assigned {
        Some(item) => (item, DropSource::Assigned),
        None => (companion_drop(world, &class_name)?, DropSource::Companion),
    };
    debug!(?actor, item = %item, ?source, "item dropped");
    world.emit(WorldEvent::ItemDropped { item, origin });
    Some(source)
}

/// Uniform pick among the companion drops of `class_name`'s creature entry
fn companion_drop(world: &mut MonsterWorld, class_name: &str) -> Option<String> {
    let tables = world.tables();
    let drops = &tables.creature(class_name)?.drops;
    let index = world.random_index(drops.len())?;
    drops.get(index).cloned()
}
