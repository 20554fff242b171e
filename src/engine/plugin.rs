use bevy::prelude::*;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::collision::CollisionService;
use crate::engine::config::EngineConfig;
use crate::engine::{MonsterWorld, WorldEvent};

/// Runs the monster world on Bevy's fixed timestep, one world frame per tick
pub struct EnginePlugin {
    pub config: EngineConfig,
    pub geometry: Arc<dyn CollisionService + Send + Sync>,
}

impl Plugin for EnginePlugin {
    fn build(&self, app: &mut App) {
        let world = MonsterWorld::with_defaults(&self.config, self.geometry.clone());

        app.insert_resource(EngineResource(Arc::new(RwLock::new(world))))
            .insert_resource(Time::<Fixed>::from_duration(Duration::from_millis(
                self.config.frame_time_ms.max(1),
            )))
            .add_event::<WorldEvent>()
            .add_systems(FixedUpdate, engine_tick_system);
    }
}

#[derive(Resource, Clone)]
pub struct EngineResource(pub Arc<RwLock<MonsterWorld>>);

pub fn engine_tick_system(engine_res: Res<EngineResource>, mut events: EventWriter<WorldEvent>) {
    let Ok(mut world) = engine_res.0.write() else {
        error!("monster world lock poisoned");
        return;
    };
    world.run_frame();
    for event in world.drain_events() {
        events.send(event);
    }
}
