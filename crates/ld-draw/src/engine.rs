//! Draw engine: owns the RNG and session statistics

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use ld_core::{PrizeTier, all_exhausted};

use crate::select::{DrawOutcome, ROLL_SCALE, select_tier};

/// Per-session draw statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawStats {
    pub total_draws: u64,
    /// Wins per tier id
    pub prizes: BTreeMap<String, u64>,
    pub no_prize: u64,
    /// Random numbers actually consumed
    pub rolls: u64,
}

impl DrawStats {
    fn record(&mut self, outcome: &DrawOutcome) {
        self.total_draws += 1;
        match outcome {
            DrawOutcome::Prize(id) => *self.prizes.entry(id.clone()).or_default() += 1,
            DrawOutcome::NoPrize => self.no_prize += 1,
        }
    }

    /// Wins recorded for one tier
    pub fn wins_for(&self, tier_id: &str) -> u64 {
        self.prizes.get(tier_id).copied().unwrap_or(0)
    }

    /// Percentage of draws that produced a prize
    pub fn prize_rate(&self) -> f64 {
        if self.total_draws > 0 {
            ((self.total_draws - self.no_prize) as f64 / self.total_draws as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Weighted prize draw engine
///
/// Never mutates tiers: the caller commits a win through the store.
pub struct DrawEngine {
    rng: ChaCha8Rng,
    stats: DrawStats,
}

impl DrawEngine {
    /// Engine seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_os_rng(),
            stats: DrawStats::default(),
        }
    }

    /// Engine with a reproducible roll sequence
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: DrawStats::default(),
        }
    }

    /// Reseed RNG for reproducible results
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Get session stats
    pub fn stats(&self) -> &DrawStats {
        &self.stats
    }

    /// Reset session stats
    pub fn reset_stats(&mut self) {
        self.stats = DrawStats::default();
    }

    /// Draw once. No roll is consumed when every tier is exhausted.
    pub fn draw(&mut self, tiers: &[PrizeTier]) -> DrawOutcome {
        if all_exhausted(tiers) {
            log::debug!("All tiers exhausted, no prize");
            self.stats.record(&DrawOutcome::NoPrize);
            return DrawOutcome::NoPrize;
        }

        let r = self.rng.random_range(0.0..ROLL_SCALE);
        self.stats.rolls += 1;
        self.finish(tiers, r)
    }

    /// Draw with a caller-supplied roll (replay, tests)
    pub fn draw_with_roll(&mut self, tiers: &[PrizeTier], r: f64) -> DrawOutcome {
        self.finish(tiers, r)
    }

    fn finish(&mut self, tiers: &[PrizeTier], r: f64) -> DrawOutcome {
        let outcome = select_tier(tiers, r);
        match &outcome {
            DrawOutcome::Prize(id) => log::debug!("Won prize: {} (roll: {:.3})", id, r),
            DrawOutcome::NoPrize => log::debug!("No prize awarded (roll: {:.3})", r),
        }
        self.stats.record(&outcome);
        outcome
    }
}

impl Default for DrawEngine {
    fn default() -> Self {
        Self::new()
    }
}
