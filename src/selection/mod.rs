//! Weighted-random selection over static tables.
//!
//! Each entry is eligible inside an inclusive progress band (wave number) and
//! its weight drifts linearly with progress. Used for both creature kinds and
//! item drops, each over its own table.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::MAX_COMPANION_DROPS;
use crate::content::ContentError;

pub mod reinforcement;

/// Inclusive progress band; `None` on either side means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressBand {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

impl ProgressBand {
    pub const UNBOUNDED: ProgressBand = ProgressBand {
        min: None,
        max: None,
    };

    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, progress: u32) -> bool {
        self.min.map_or(true, |m| progress >= m) && self.max.map_or(true, |m| progress <= m)
    }

    /// Origin of the per-progress weight drift
    pub fn drift_origin(&self) -> u32 {
        self.min.unwrap_or(0)
    }

    pub fn is_valid(&self) -> bool {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => lo <= hi,
            _ => true,
        }
    }
}

/// Capability flags of a creature entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityFlags(pub u8);

impl CapabilityFlags {
    pub const NONE: CapabilityFlags = CapabilityFlags(0);
    pub const GROUND: CapabilityFlags = CapabilityFlags(1);
    pub const AIR: CapabilityFlags = CapabilityFlags(1 << 1);
    pub const WATER: CapabilityFlags = CapabilityFlags(1 << 2);
    pub const MEDIUM: CapabilityFlags = CapabilityFlags(1 << 3);
    pub const BOSS: CapabilityFlags = CapabilityFlags(1 << 4);

    pub fn contains(self, other: CapabilityFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: CapabilityFlags) -> CapabilityFlags {
        CapabilityFlags(self.0 | other.0)
    }
}

/// One row of a spawn or drop table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEntry {
    pub id: String,
    #[serde(default)]
    pub band: ProgressBand,
    #[serde(default = "default_weight")]
    pub base_weight: f32,
    #[serde(default)]
    pub weight_per_progress: f32,
    #[serde(default)]
    pub flags: CapabilityFlags,
    #[serde(default)]
    pub drops: Vec<String>,
}

fn default_weight() -> f32 {
    1.0
}

impl WeightedEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            band: ProgressBand::UNBOUNDED,
            base_weight: 1.0,
            weight_per_progress: 0.0,
            flags: CapabilityFlags::NONE,
            drops: Vec::new(),
        }
    }

    pub fn band(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.band = ProgressBand::new(min, max);
        self
    }

    pub fn weight(mut self, base: f32, per_progress: f32) -> Self {
        self.base_weight = base;
        self.weight_per_progress = per_progress;
        self
    }

    pub fn flags(mut self, flags: CapabilityFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn drops(mut self, drops: &[&str]) -> Self {
        self.drops = drops.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if !self.band.is_valid() {
            return Err(ContentError::InvalidProgressBand {
                id: self.id.clone(),
                min: self.band.min.unwrap_or(0),
                max: self.band.max.unwrap_or(u32::MAX),
            });
        }
        if self.drops.len() > MAX_COMPANION_DROPS {
            return Err(ContentError::TooManyDrops {
                id: self.id.clone(),
                count: self.drops.len(),
            });
        }
        if !self.base_weight.is_finite() || !self.weight_per_progress.is_finite() {
            return Err(ContentError::InvalidWeight {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// Optional per-entry refinement applied after the linear drift
pub type WeightHook<'a> = &'a dyn Fn(&WeightedEntry, f32) -> f32;

/// Weight of `entry` at `progress`, or `None` when it is out of band or not positive
pub fn effective_weight(
    entry: &WeightedEntry,
    progress: u32,
    hook: Option<WeightHook<'_>>,
) -> Option<f32> {
    if !entry.band.contains(progress) {
        return None;
    }
    let steps = progress.saturating_sub(entry.band.drift_origin()) as f32;
    let mut weight = entry.base_weight + steps * entry.weight_per_progress;
    if let Some(hook) = hook {
        weight = hook(entry, weight);
    }
    (weight.is_finite() && weight > 0.0).then_some(weight)
}

/// Pick with an explicit unit draw in `[0, 1)`
pub fn pick_with_draw<'t>(
    table: &'t [WeightedEntry],
    progress: u32,
    draw: f32,
    hook: Option<WeightHook<'_>>,
) -> Option<&'t WeightedEntry> {
    let mut cumulative: Vec<(&WeightedEntry, f32)> = Vec::with_capacity(table.len());
    let mut total = 0.0f32;
    for entry in table {
        if let Some(w) = effective_weight(entry, progress, hook) {
            total += w;
            cumulative.push((entry, total));
        }
    }

    if cumulative.is_empty() {
        debug!(progress, "selection exhausted: no eligible entry");
        return None;
    }

    let r = draw.clamp(0.0, 1.0) * total;
    cumulative
        .iter()
        .find(|(_, c)| r < *c)
        .or_else(|| cumulative.last())
        .map(|(e, _)| *e)
}

/// Pick an entry for `progress` using `rng`
pub fn pick<'t, R: Rng + ?Sized>(
    table: &'t [WeightedEntry],
    progress: u32,
    rng: &mut R,
    hook: Option<WeightHook<'_>>,
) -> Option<&'t WeightedEntry> {
    let draw: f32 = rng.gen();
    pick_with_draw(table, progress, draw, hook)
}

/// Probability of each eligible entry at `progress`, in table order
pub fn distribution(
    table: &[WeightedEntry],
    progress: u32,
    hook: Option<WeightHook<'_>>,
) -> Vec<(String, f32)> {
    let weights: Vec<(String, f32)> = table
        .iter()
        .filter_map(|e| effective_weight(e, progress, hook).map(|w| (e.id.clone(), w)))
        .collect();
    let total: f32 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    weights
        .into_iter()
        .map(|(id, w)| (id, w / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn table() -> Vec<WeightedEntry> {
        vec![
            WeightedEntry::new("light").band(None, Some(7)).weight(1.5, -0.45),
            WeightedEntry::new("medium").band(Some(2), Some(9)).weight(1.0, 0.0),
            WeightedEntry::new("heavy").band(Some(5), None).weight(0.5, 0.25),
        ]
    }

    #[test]
    fn test_band_filter() {
        let t = table();
        assert!(effective_weight(&t[1], 1, None).is_none());
        assert!(effective_weight(&t[1], 2, None).is_some());
        assert!(effective_weight(&t[1], 9, None).is_some());
        assert!(effective_weight(&t[1], 10, None).is_none());
    }

    #[test]
    fn test_weight_drift() {
        let t = table();
        let w = effective_weight(&t[2], 7, None).unwrap();
        assert!((w - 1.0).abs() < 1e-6);
        // 1.5 - 0.45 * 3 = 0.15
        let w = effective_weight(&t[0], 3, None).unwrap();
        assert!((w - 0.15).abs() < 1e-5);
        // 1.5 - 0.45 * 4 < 0 => dropped
        assert!(effective_weight(&t[0], 4, None).is_none());
    }

    #[test]
    fn test_draw_walks_cumulative_in_table_order() {
        let t = vec![
            WeightedEntry::new("a").weight(1.0, 0.0),
            WeightedEntry::new("b").weight(1.0, 0.0),
            WeightedEntry::new("c").weight(2.0, 0.0),
        ];
        assert_eq!(pick_with_draw(&t, 0, 0.0, None).unwrap().id, "a");
        assert_eq!(pick_with_draw(&t, 0, 0.24, None).unwrap().id, "a");
        assert_eq!(pick_with_draw(&t, 0, 0.25, None).unwrap().id, "b");
        assert_eq!(pick_with_draw(&t, 0, 0.5, None).unwrap().id, "c");
        assert_eq!(pick_with_draw(&t, 0, 0.9999, None).unwrap().id, "c");
    }

    #[test]
    fn test_empty_and_exhausted() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert!(pick(&[], 3, &mut rng, None).is_none());
        let t = vec![WeightedEntry::new("late").band(Some(10), None)];
        assert!(pick(&t, 3, &mut rng, None).is_none());
        let zero = vec![WeightedEntry::new("zero").weight(0.0, 0.0)];
        assert!(pick(&zero, 3, &mut rng, None).is_none());
    }

    #[test]
    fn test_hook_refines_weight() {
        let t = vec![
            WeightedEntry::new("a").weight(1.0, 0.0),
            WeightedEntry::new("b").weight(1.0, 0.0),
        ];
        let hook = |e: &WeightedEntry, w: f32| if e.id == "a" { 0.0 } else { w };
        for draw in [0.0, 0.3, 0.7, 0.99] {
            assert_eq!(pick_with_draw(&t, 0, draw, Some(&hook)).unwrap().id, "b");
        }
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let d = distribution(&table(), 5, None);
        let sum: f32 = d.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_validate_entries() {
        assert!(WeightedEntry::new("ok").validate().is_ok());
        let bad_band = WeightedEntry::new("bad").band(Some(5), Some(2));
        assert!(matches!(
            bad_band.validate(),
            Err(ContentError::InvalidProgressBand { .. })
        ));
        let many = WeightedEntry::new("many").drops(&["a", "b", "c", "d", "e"]);
        assert!(matches!(
            many.validate(),
            Err(ContentError::TooManyDrops { count: 5, .. })
        ));
    }

    #[test]
    fn test_pick_deterministic_for_seed() {
        let t = table();
        let mut a = Xoshiro256PlusPlus::seed_from_u64(99);
        let mut b = Xoshiro256PlusPlus::seed_from_u64(99);
        for progress in 0..12 {
            let x = pick(&t, progress, &mut a, None).map(|e| e.id.clone());
            let y = pick(&t, progress, &mut b, None).map(|e| e.id.clone());
            assert_eq!(x, y);
        }
    }
}
