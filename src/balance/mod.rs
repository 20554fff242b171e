//! Monte-Carlo Spawn Table Balance
//!
//! Draws a spawn or drop table many times at a fixed progress value and
//! compares the observed pick frequencies with the analytic distribution.
//! A large deviation means the selector or the table content is off; a
//! sweep across rounds shows how the mix drifts as waves advance.
//!
//! Draws run in parallel chunks with rayon. Each chunk gets its own RNG
//! seeded from a SHA3 digest of the base seed and chunk index, so a report
//! is reproducible regardless of thread count.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::selection::{self, WeightedEntry};

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub draws: u64,
    pub progress: u32,
    pub base_seed: u64,
    pub chunk_size: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            draws: 100_000,
            progress: 1,
            base_seed: 42,
            chunk_size: 4_096,
        }
    }
}

/// Observed vs expected share of one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryShare {
    pub id: String,
    pub expected: f32,
    pub observed: f32,
    pub count: u64,
}

impl EntryShare {
    pub fn deviation(&self) -> f32 {
        (self.observed - self.expected).abs()
    }
}

/// Overall agreement between observed and expected shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceGrade {
    Excellent, // max deviation < 0.005
    Good,      // < 0.01
    Fair,      // < 0.02
    Poor,      // < 0.05
    Critical,  // >= 0.05
}

impl BalanceGrade {
    fn from_deviation(dev: f32) -> Self {
        if dev < 0.005 {
            Self::Excellent
        } else if dev < 0.01 {
            Self::Good
        } else if dev < 0.02 {
            Self::Fair
        } else if dev < 0.05 {
            Self::Poor
        } else {
            Self::Critical
        }
    }
}

/// Results of a distribution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub progress: u32,
    pub total_draws: u64,
    /// Draws where nothing was eligible
    pub exhausted: u64,
    /// Eligible entries in table order
    pub shares: Vec<EntryShare>,
    pub max_deviation: f32,
    pub grade: BalanceGrade,
}

impl DistributionReport {
    pub fn share(&self, id: &str) -> Option<&EntryShare> {
        self.shares.iter().find(|s| s.id == id)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// RNG seed for one chunk of draws
pub fn chunk_seed(base_seed: u64, chunk: u64) -> u64 {
    let digest = Sha3_256::new()
        .chain_update(base_seed.to_le_bytes())
        .chain_update(chunk.to_le_bytes())
        .finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Per-entry pick counts for one chunk; the last slot counts exhausted draws
fn run_chunk(table: &[WeightedEntry], progress: u32, seed: u64, draws: u64) -> Vec<u64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut counts = vec![0u64; table.len() + 1];
    for _ in 0..draws {
        let slot = selection::pick(table, progress, &mut rng, None)
            .and_then(|picked| table.iter().position(|e| std::ptr::eq(e, picked)))
            .unwrap_or(table.len());
        counts[slot] += 1;
    }
    counts
}

/// Run the Monte-Carlo distribution check with rayon parallelism
pub fn run_selection_simulation(table: &[WeightedEntry], config: &SimConfig) -> DistributionReport {
    let chunk_size = config.chunk_size.max(1);
    let chunks = config.draws.div_ceil(chunk_size);

    let counts = (0..chunks)
        .into_par_iter()
        .map(|chunk| {
            let draws = chunk_size.min(config.draws - chunk * chunk_size);
            run_chunk(table, config.progress, chunk_seed(config.base_seed, chunk), draws)
        })
        .reduce(
            || vec![0u64; table.len() + 1],
            |mut acc, part| {
                for (a, p) in acc.iter_mut().zip(part) {
                    *a += p;
                }
                acc
            },
        );

    analyze(table, config, &counts)
}

/// One report per progress value in `progress`
pub fn progression_sweep(
    table: &[WeightedEntry],
    progress: std::ops::RangeInclusive<u32>,
    config: &SimConfig,
) -> Vec<DistributionReport> {
    progress
        .map(|p| {
            let cfg = SimConfig {
                progress: p,
                ..config.clone()
            };
            run_selection_simulation(table, &cfg)
        })
        .collect()
}

fn analyze(table: &[WeightedEntry], config: &SimConfig, counts: &[u64]) -> DistributionReport {
    let expected = selection::distribution(table, config.progress, None);
    let total = config.draws.max(1) as f32;

    let shares: Vec<EntryShare> = table
        .iter()
        .zip(counts)
        .filter_map(|(entry, &count)| {
            let exp = expected.iter().find(|(id, _)| *id == entry.id)?.1;
            Some(EntryShare {
                id: entry.id.clone(),
                expected: exp,
                observed: count as f32 / total,
                count,
            })
        })
        .collect();

    let max_deviation = shares
        .iter()
        .map(EntryShare::deviation)
        .fold(0.0f32, f32::max);

    DistributionReport {
        progress: config.progress,
        total_draws: config.draws,
        exhausted: counts.last().copied().unwrap_or(0),
        shares,
        max_deviation,
        grade: BalanceGrade::from_deviation(max_deviation),
    }
}
