//! Creature and item spawn tables (RON or JSON on disk).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ContentError;
use crate::selection::{CapabilityFlags, WeightedEntry};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnTables {
    #[serde(default)]
    pub creatures: Vec<WeightedEntry>,
    #[serde(default)]
    pub items: Vec<WeightedEntry>,
}

impl SpawnTables {
    pub fn from_ron_str(text: &str) -> Result<Self, ContentError> {
        ron::from_str(text).map_err(|e| ContentError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, ContentError> {
        serde_json::from_str(text).map_err(|e| ContentError::Parse(e.to_string()))
    }

    pub fn to_ron(&self) -> Result<String, ContentError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ContentError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Load by extension: `.json` is JSON, anything else is RON
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_ron_str(&text)
        }
    }

    /// Drop invalid rows, returning the cleaned tables and what was removed
    pub fn sanitized(self) -> (Self, Vec<ContentError>) {
        let mut errors = Vec::new();
        let mut keep = |table: Vec<WeightedEntry>| -> Vec<WeightedEntry> {
            table
                .into_iter()
                .filter(|entry| match entry.validate() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(entry = %entry.id, error = %e, "dropping invalid table entry");
                        errors.push(e);
                        false
                    }
                })
                .collect()
        };
        let creatures = keep(self.creatures);
        let items = keep(self.items);
        (Self { creatures, items }, errors)
    }

    pub fn creature(&self, id: &str) -> Option<&WeightedEntry> {
        self.creatures.iter().find(|e| e.id == id)
    }

    /// Stock horde tables for the built-in kinds
    pub fn default_horde() -> Self {
        let ground = CapabilityFlags::GROUND;
        let creatures = vec![
            WeightedEntry::new("grunt")
                .band(None, Some(9))
                .weight(1.4, -0.1)
                .flags(ground)
                .drops(&["ammo_bullets", "item_health_small"]),
            WeightedEntry::new("hound")
                .band(None, Some(12))
                .weight(1.0, 0.05)
                .flags(ground)
                .drops(&["item_health_small"]),
            WeightedEntry::new("brute")
                .band(Some(3), None)
                .weight(0.9, 0.1)
                .flags(ground.union(CapabilityFlags::MEDIUM))
                .drops(&["item_armor_shard", "item_health"]),
            WeightedEntry::new("drone")
                .band(Some(5), None)
                .weight(0.8, 0.08)
                .flags(ground.union(CapabilityFlags::AIR))
                .drops(&["ammo_cells"]),
        ];

        let items = vec![
            WeightedEntry::new("item_health_small"),
            WeightedEntry::new("item_health").weight(1.0, 0.0),
            WeightedEntry::new("item_health_large").weight(0.85, 0.0),
            WeightedEntry::new("item_armor_shard"),
            WeightedEntry::new("item_armor_jacket")
                .band(None, Some(4))
                .weight(0.65, 0.0),
            WeightedEntry::new("item_armor_combat")
                .band(Some(2), None)
                .weight(0.62, 0.0),
            WeightedEntry::new("item_armor_body")
                .band(Some(4), None)
                .weight(0.35, 0.0),
            WeightedEntry::new("weapon_shotgun").weight(0.98, 0.0),
            WeightedEntry::new("weapon_supershotgun")
                .band(Some(2), None)
                .weight(1.02, 0.0),
            WeightedEntry::new("weapon_machinegun").weight(1.05, 0.0),
            WeightedEntry::new("weapon_chaingun")
                .band(Some(3), None)
                .weight(1.01, 0.0),
            WeightedEntry::new("weapon_grenadelauncher")
                .band(Some(4), None)
                .weight(0.75, 0.0),
            WeightedEntry::new("ammo_shells").weight(1.25, 0.0),
            WeightedEntry::new("ammo_bullets").weight(1.25, 0.0),
            WeightedEntry::new("ammo_grenades")
                .band(Some(2), None)
                .weight(1.25, 0.0),
        ];

        Self { creatures, items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_tables_valid() {
        let (tables, errors) = SpawnTables::default_horde().sanitized();
        assert!(errors.is_empty());
        assert_eq!(tables.creatures.len(), 4);
        assert!(tables.creature("drone").is_some());
    }

    #[test]
    fn test_ron_roundtrip() {
        let tables = SpawnTables::default_horde();
        let text = tables.to_ron().unwrap();
        let restored = SpawnTables::from_ron_str(&text).unwrap();
        assert_eq!(restored, tables);
    }

    #[test]
    fn test_ron_defaults_fill_missing_fields() {
        let text = r#"(
            creatures: [
                (id: "grunt", band: (max: Some(5))),
                (id: "brute", base_weight: 0.5, weight_per_progress: 0.1),
            ],
        )"#;
        let tables = SpawnTables::from_ron_str(text).unwrap();
        assert_eq!(tables.creatures.len(), 2);
        assert_eq!(tables.creatures[0].base_weight, 1.0);
        assert_eq!(tables.creatures[0].band.max, Some(5));
        assert!(tables.items.is_empty());
    }

    #[test]
    fn test_sanitize_drops_bad_rows() {
        let mut tables = SpawnTables::default_horde();
        tables
            .creatures
            .push(WeightedEntry::new("inverted").band(Some(9), Some(1)));
        let (clean, errors) = tables.sanitized();
        assert_eq!(errors.len(), 1);
        assert!(clean.creature("inverted").is_none());
    }

    #[test]
    fn test_load_json_file() {
        let mut temp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(temp, "{}", SpawnTables::default_horde().to_json()).unwrap();
        let loaded = SpawnTables::load(temp.path()).unwrap();
        assert_eq!(loaded.items.len(), 15);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SpawnTables::from_ron_str("(creatures: [ (id: ) ])"),
            Err(ContentError::Parse(_))
        ));
    }
}
