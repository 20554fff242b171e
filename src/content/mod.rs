//! Content registry: actor kinds and spawn tables.
//!
//! Built once at startup, validated, then shared read-only behind `Arc`.
//! Invalid content is dropped with a warning so the rest of the registry
//! stays usable.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::animation::Move;
use crate::attack::AttackProfile;
use crate::behavior::BehaviorTable;
use crate::geometry::BoundingBox;
use crate::leap::LeapProfile;
use crate::monster::CombatStyle;
use crate::pain::PainProfile;

pub mod tables;

pub use tables::SpawnTables;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown actor kind '{0}'")]
    UnknownKind(String),

    #[error("kind '{0}' is registered twice")]
    DuplicateKind(String),

    #[error("move '{name}' has inverted frame range {first}..={last}")]
    InvalidFrameRange { name: String, first: u32, last: u32 },

    #[error("move '{name}' spans {expected} frames but holds {actual}")]
    FrameCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("entry '{id}' has inverted progress band {min}..={max}")]
    InvalidProgressBand { id: String, min: u32, max: u32 },

    #[error("entry '{id}' lists {count} companion drops")]
    TooManyDrops { id: String, count: usize },

    #[error("entry '{id}' has a non-finite weight")]
    InvalidWeight { id: String },

    #[error("kind '{kind}' is missing a move for {what}")]
    MissingMove { kind: String, what: &'static str },

    #[error("failed to parse content: {0}")]
    Parse(String),

    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),
}

/// Sounds a kind emits through world events
#[derive(Debug, Clone, Copy, Default)]
pub struct KindSounds {
    pub sight: &'static str,
    pub idle: &'static str,
    pub search: &'static str,
    pub pain: &'static str,
    pub death: &'static str,
}

/// Everything needed to construct and drive one kind of actor
#[derive(Clone)]
pub struct KindDef {
    pub name: String,
    pub behavior: BehaviorTable,
    /// Every move the kind can enter, checked at registration
    pub moves: Vec<&'static Move>,
    pub health: f32,
    pub gib_health: f32,
    pub mass: f32,
    pub bbox: BoundingBox,
    pub flying: bool,
    pub view_height: f32,
    /// Degrees per think the actor can turn
    pub yaw_speed: f32,
    pub style: CombatStyle,
    pub attack: AttackProfile,
    pub pain: Option<PainProfile>,
    pub leap: Option<LeapProfile>,
    pub sounds: KindSounds,
}

impl KindDef {
    pub fn validate(&self) -> Result<(), ContentError> {
        for mv in &self.moves {
            mv.validate()?;
        }
        if let Some(pain) = &self.pain {
            if pain.light.is_none() && pain.medium.is_none() && pain.heavy.is_none() {
                return Err(ContentError::MissingMove {
                    kind: self.name.clone(),
                    what: "pain",
                });
            }
        }
        Ok(())
    }
}

/// Name -> kind lookup, in registration order
#[derive(Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, Arc<KindDef>>,
    order: Vec<String>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in kinds
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for def in crate::monster::kinds::all() {
            let name = def.name.clone();
            if let Err(e) = registry.register(def) {
                warn!(kind = %name, error = %e, "dropping invalid kind");
            }
        }
        info!(kinds = registry.len(), "kind registry ready");
        registry
    }

    pub fn register(&mut self, def: KindDef) -> Result<(), ContentError> {
        def.validate()?;
        if self.kinds.contains_key(&def.name) {
            return Err(ContentError::DuplicateKind(def.name));
        }
        self.order.push(def.name.clone());
        self.kinds.insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    /// Replace (or add) a kind, used by tests and tools that tweak tuning
    pub fn upsert(&mut self, def: KindDef) -> Result<(), ContentError> {
        def.validate()?;
        if !self.kinds.contains_key(&def.name) {
            self.order.push(def.name.clone());
        }
        self.kinds.insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<KindDef>> {
        self.kinds.get(name).cloned()
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<KindDef>, ContentError> {
        self.get(name)
            .ok_or_else(|| ContentError::UnknownKind(name.to_string()))
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
