//! Reinforcement slot rotation for commander-style spawners.
//!
//! A commander owns a fixed list of reinforcement slots. Each call hands out
//! the least-used available slot, scanning from a round-robin cursor so ties
//! rotate instead of always favouring slot 0.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementPolicy {
    /// Amount added to a slot's usage count when it is chosen
    pub base_weight: u32,
    pub prefer_least_used: bool,
}

impl Default for ReinforcementPolicy {
    fn default() -> Self {
        Self {
            base_weight: 1,
            prefer_least_used: true,
        }
    }
}

/// Usage counts plus rotation cursor for one commander
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReinforcementRotation {
    pub usage: Vec<u32>,
    pub cursor: usize,
    pub policy: ReinforcementPolicy,
}

impl ReinforcementRotation {
    pub fn new(slot_count: usize) -> Self {
        Self {
            usage: vec![0; slot_count],
            cursor: 0,
            policy: ReinforcementPolicy::default(),
        }
    }

    /// Choose among `available` slot indices. Indices past the slot list are
    /// ignored; `None` when no valid slot remains.
    pub fn select(&mut self, available: &[usize]) -> Option<usize> {
        let count = self.usage.len();
        let valid: Vec<usize> = available.iter().copied().filter(|&s| s < count).collect();
        if valid.is_empty() {
            return None;
        }

        let min_usage = if self.policy.prefer_least_used {
            valid.iter().map(|&s| self.usage[s]).min().unwrap_or(0)
        } else {
            0
        };

        let chosen = (0..count)
            .map(|step| (self.cursor + step) % count)
            .filter(|candidate| valid.contains(candidate))
            .find(|&candidate| !self.policy.prefer_least_used || self.usage[candidate] == min_usage)?;

        self.usage[chosen] = self.usage[chosen].saturating_add(self.policy.base_weight);
        self.cursor = (chosen + 1) % count;
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_when_even() {
        let mut rot = ReinforcementRotation::new(3);
        let all = [0, 1, 2];
        assert_eq!(rot.select(&all), Some(0));
        assert_eq!(rot.cursor, 1);
        assert_eq!(rot.usage[0], 1);
        assert_eq!(rot.select(&all), Some(1));
        assert_eq!(rot.cursor, 2);
        assert_eq!(rot.select(&all), Some(2));
        assert_eq!(rot.cursor, 0);
        assert_eq!(rot.usage, vec![1, 1, 1]);
    }

    #[test]
    fn test_prefers_least_used() {
        let mut rot = ReinforcementRotation::new(3);
        rot.usage = vec![5, 2, 1];
        assert_eq!(rot.select(&[0, 1, 2]), Some(2));
        assert_eq!(rot.usage[2], 2);
        assert_eq!(rot.select(&[1, 2]), Some(1));
        assert_eq!(rot.cursor, 2);
    }

    #[test]
    fn test_without_preference_follows_cursor() {
        let mut rot = ReinforcementRotation::new(4);
        rot.policy.prefer_least_used = false;
        rot.usage = vec![9, 0, 0, 0];
        rot.cursor = 0;
        assert_eq!(rot.select(&[0, 3]), Some(0));
        assert_eq!(rot.select(&[0, 3]), Some(3));
    }

    #[test]
    fn test_nothing_available() {
        let mut rot = ReinforcementRotation::new(3);
        assert_eq!(rot.select(&[]), None);
        let mut empty = ReinforcementRotation::new(0);
        assert_eq!(empty.select(&[0]), None);
    }

    #[test]
    fn test_out_of_range_slots_are_ignored() {
        let mut rot = ReinforcementRotation::new(2);
        assert_eq!(rot.select(&[7]), None);
        assert_eq!(rot.usage, vec![0, 0]);
        assert_eq!(rot.cursor, 0);

        assert_eq!(rot.select(&[7, 1, 2]), Some(1));
        assert_eq!(rot.usage, vec![0, 1]);
        assert_eq!(rot.cursor, 0);
    }
}
