use serde::{Deserialize, Serialize};

use crate::constants::{
    FRAME_TIME_MS, ROUND_SPAWN_INTERVAL_SECS, SPAWN_RETRY_SECS, WARMUP_MONSTER_CAP,
    WARMUP_SPAWN_INTERVAL_SECS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub seed: u64,
    pub frame_time_ms: u64,
    pub skill: Skill,
    /// Default gravity direction for new actors (normalized on use)
    pub gravity: [f32; 3],
    pub horde: HordeSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            frame_time_ms: FRAME_TIME_MS,
            skill: Skill::Medium,
            gravity: [0.0, 0.0, -1.0],
            horde: HordeSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

/// Wave pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HordeSettings {
    pub warmup_monster_cap: usize,
    pub warmup_interval_secs: f32,
    pub round_interval_secs: (f32, f32),
    pub retry_interval_secs: f32,
    /// Upward search distance used when a spawn spot is blocked
    pub max_move_up: f32,
}

impl Default for HordeSettings {
    fn default() -> Self {
        Self {
            warmup_monster_cap: WARMUP_MONSTER_CAP,
            warmup_interval_secs: WARMUP_SPAWN_INTERVAL_SECS,
            round_interval_secs: ROUND_SPAWN_INTERVAL_SECS,
            retry_interval_secs: SPAWN_RETRY_SECS,
            max_move_up: 64.0,
        }
    }
}

/// Difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    Easy,
    Medium,
    Hard,
    Nightmare,
}

impl Skill {
    pub fn from_id(id: u32) -> Self {
        match id {
            0 => Skill::Easy,
            1 => Skill::Medium,
            2 => Skill::Hard,
            _ => Skill::Nightmare,
        }
    }

    /// Nightmare never plays pain reactions
    pub fn pain_enabled(self) -> bool {
        self != Skill::Nightmare
    }

    /// From Hard upward an attack in progress is not interrupted by pain
    pub fn suppresses_pain_mid_attack(self) -> bool {
        self >= Skill::Hard
    }

    /// Multiplier on ranged attack chances
    pub fn attack_chance_scale(self) -> f32 {
        match self {
            Skill::Easy => 0.5,
            Skill::Medium => 1.0,
            Skill::Hard | Skill::Nightmare => 2.0,
        }
    }

    /// Chance that a ducking-capable actor reacts to an incoming shot
    pub fn dodge_chance(self) -> f32 {
        match self {
            Skill::Easy => 0.1,
            Skill::Medium => 0.2,
            Skill::Hard => 0.3,
            Skill::Nightmare => 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_roundtrip() {
        let config = EngineConfig {
            seed: 7,
            skill: Skill::Hard,
            ..Default::default()
        };
        let json = config.to_json();
        let restored = EngineConfig::from_json(&json).unwrap();
        assert_eq!(restored.seed, 7);
        assert_eq!(restored.skill, Skill::Hard);
        assert_eq!(restored.horde.warmup_monster_cap, WARMUP_MONSTER_CAP);
    }

    #[test]
    fn test_skill_pain_policy() {
        assert!(Skill::Easy.pain_enabled());
        assert!(!Skill::Nightmare.pain_enabled());
        assert!(!Skill::Medium.suppresses_pain_mid_attack());
        assert!(Skill::Hard.suppresses_pain_mid_attack());
    }

    #[test]
    fn test_skill_from_id() {
        assert_eq!(Skill::from_id(0), Skill::Easy);
        assert_eq!(Skill::from_id(2), Skill::Hard);
        assert_eq!(Skill::from_id(99), Skill::Nightmare);
    }
}
