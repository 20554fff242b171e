//! Hot-reload of spawn tables.
//!
//! Watches the spawn tables file (RON or JSON) with `notify` and swaps the
//! world's tables when it changes. A file that fails to read or parse leaves
//! the previous tables in place; invalid rows are dropped individually.

use bevy::prelude::*;
use notify::{Event as FsEvent, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};

use crate::content::{ContentError, SpawnTables};
use crate::engine::EngineResource;

pub struct HotReloadPlugin {
    pub tables_path: PathBuf,
}

impl Plugin for HotReloadPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(HotReloadState {
            watched_file: Some(self.tables_path.clone()),
            ..Default::default()
        })
        .add_event::<TablesReloadEvent>()
        .add_systems(Startup, setup_tables_watcher)
        .add_systems(Update, process_tables_changes);
    }
}

/// Hot-reload state tracking
#[derive(Resource, Default)]
pub struct HotReloadState {
    pub enabled: bool,
    pub watched_file: Option<PathBuf>,
    pub reload_count: u32,
    pub last_reload_success: bool,
    pub last_reload_time: f64,
    pub last_error: Option<String>,
}

/// Sent after every reload attempt
#[derive(Event, Debug, Clone)]
pub struct TablesReloadEvent {
    pub path: PathBuf,
    pub success: bool,
    /// Rows dropped as invalid on a successful reload
    pub dropped_rows: usize,
    pub error: Option<String>,
}

#[derive(Resource)]
struct WatcherResource {
    _watcher: RecommendedWatcher,
    receiver: Arc<Mutex<Receiver<notify::Result<FsEvent>>>>,
}

fn setup_tables_watcher(mut commands: Commands, mut state: ResMut<HotReloadState>) {
    let Some(path) = state.watched_file.clone() else {
        return;
    };
    if !path.exists() {
        warn!("Spawn tables not found: {:?}", path);
        state.enabled = false;
        return;
    }

    let (tx, rx) = channel();
    let mut watcher = match notify::recommended_watcher(tx) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to create file watcher: {}", e);
            state.enabled = false;
            return;
        }
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
        error!("Failed to watch tables directory: {}", e);
        state.enabled = false;
        return;
    }

    state.enabled = true;
    commands.insert_resource(WatcherResource {
        _watcher: watcher,
        receiver: Arc::new(Mutex::new(rx)),
    });
    info!("Hot-reload enabled for {:?}", path);
}

fn process_tables_changes(
    watcher: Option<Res<WatcherResource>>,
    engine: Option<Res<EngineResource>>,
    mut state: ResMut<HotReloadState>,
    mut events: EventWriter<TablesReloadEvent>,
    time: Res<Time>,
) {
    let Some(watcher) = watcher else {
        return;
    };
    let Some(path) = state.watched_file.clone() else {
        return;
    };
    let Ok(receiver) = watcher.receiver.lock() else {
        error!("tables watcher lock poisoned");
        return;
    };

    let mut changed = false;
    while let Ok(result) = receiver.try_recv() {
        match result {
            Ok(event) => changed |= is_tables_modify_event(&event, &path),
            Err(e) => warn!("File watcher error: {}", e),
        }
    }
    if !changed {
        return;
    }

    info!("Spawn tables modified, reloading...");
    match reload_tables(&path) {
        Ok((tables, dropped_rows)) => {
            if let Some(engine) = engine.as_ref() {
                match engine.0.write() {
                    Ok(mut world) => world.set_spawn_tables(tables),
                    Err(_) => {
                        error!("monster world lock poisoned");
                        return;
                    }
                }
            }
            state.reload_count += 1;
            state.last_reload_success = true;
            state.last_reload_time = time.elapsed_secs_f64();
            state.last_error = None;
            events.send(TablesReloadEvent {
                path,
                success: true,
                dropped_rows,
                error: None,
            });
            info!("Spawn tables reloaded (count: {})", state.reload_count);
        }
        Err(e) => {
            let message = e.to_string();
            state.last_reload_success = false;
            state.last_error = Some(message.clone());
            events.send(TablesReloadEvent {
                path,
                success: false,
                dropped_rows: 0,
                error: Some(message.clone()),
            });
            error!("Spawn tables reload failed, keeping previous tables: {}", message);
        }
    }
}

/// Modify or create event touching the watched file
fn is_tables_modify_event(event: &FsEvent, watched: &Path) -> bool {
    let Some(name) = watched.file_name() else {
        return false;
    };
    let relevant = event.kind.is_modify() || event.kind.is_create();
    relevant && event.paths.iter().any(|p| p.file_name() == Some(name))
}

/// Load and clean the tables; returns them with the number of dropped rows
pub fn reload_tables(path: &Path) -> Result<(SpawnTables, usize), ContentError> {
    let (tables, errors) = SpawnTables::load(path)?.sanitized();
    Ok((tables, errors.len()))
}

/// Hot-reload status snapshot
#[derive(Debug, Serialize, Deserialize)]
pub struct HotReloadStatus {
    pub enabled: bool,
    pub watched_file: Option<String>,
    pub reload_count: u32,
    pub last_reload_success: bool,
    pub last_reload_time: f64,
    pub last_error: Option<String>,
}

impl HotReloadStatus {
    pub fn from_state(state: &HotReloadState) -> Self {
        Self {
            enabled: state.enabled,
            watched_file: state.watched_file.as_ref().map(|p| p.display().to_string()),
            reload_count: state.reload_count,
            last_reload_success: state.last_reload_success,
            last_reload_time: state.last_reload_time,
            last_error: state.last_error.clone(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn modify_event(path: &str) -> FsEvent {
        FsEvent {
            kind: notify::EventKind::Modify(notify::event::ModifyKind::Data(
                notify::event::DataChange::Any,
            )),
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_reload_valid_ron() {
        let mut temp = tempfile::Builder::new().suffix(".ron").tempfile().unwrap();
        write!(temp, "{}", SpawnTables::default_horde().to_ron().unwrap()).unwrap();
        let (tables, dropped) = reload_tables(temp.path()).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(tables.creatures.len(), 4);
    }

    #[test]
    fn test_reload_drops_bad_rows() {
        let mut temp = tempfile::Builder::new().suffix(".ron").tempfile().unwrap();
        write!(
            temp,
            r#"(creatures: [(id: "grunt"), (id: "bad", band: (min: Some(9), max: Some(2)))])"#
        )
        .unwrap();
        let (tables, dropped) = reload_tables(temp.path()).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(tables.creatures.len(), 1);
    }

    #[test]
    fn test_reload_invalid_file_is_error() {
        let mut temp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(temp, r#"{{invalid json"#).unwrap();
        assert!(matches!(reload_tables(temp.path()), Err(ContentError::Parse(_))));
        assert!(matches!(
            reload_tables(Path::new("/nonexistent/tables.ron")),
            Err(ContentError::Io(_))
        ));
    }

    #[test]
    fn test_is_tables_modify_event() {
        let watched = Path::new("config/spawn_tables.ron");
        assert!(is_tables_modify_event(&modify_event("/abs/config/spawn_tables.ron"), watched));
        assert!(!is_tables_modify_event(&modify_event("config/engine.json"), watched));

        let access = FsEvent {
            kind: notify::EventKind::Access(notify::event::AccessKind::Any),
            paths: vec![PathBuf::from("config/spawn_tables.ron")],
            attrs: Default::default(),
        };
        assert!(!is_tables_modify_event(&access, watched));
    }

    #[test]
    fn test_hotreload_status_from_state() {
        let state = HotReloadState {
            enabled: true,
            reload_count: 3,
            last_reload_success: true,
            watched_file: Some(PathBuf::from("config/spawn_tables.ron")),
            ..Default::default()
        };
        let status = HotReloadStatus::from_state(&state);
        let restored = HotReloadStatus::from_json(&status.to_json()).unwrap();
        assert!(restored.enabled);
        assert_eq!(restored.reload_count, 3);
        assert_eq!(restored.watched_file.as_deref(), Some("config/spawn_tables.ron"));
    }
}
