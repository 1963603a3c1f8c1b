//! Tier selection: the cumulative probability walk

use serde::{Deserialize, Serialize};

use ld_core::{CONSOLATION_TIER_ID, PrizeTier, all_exhausted};

/// Width of the roll range. Rolls are drawn from `[0, ROLL_SCALE)`.
pub const ROLL_SCALE: f64 = 100.0;

/// Result of a single draw
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tier", rename_all = "snake_case")]
pub enum DrawOutcome {
    /// The tier with this id was won
    Prize(String),
    /// Nothing left to give (or consolation is missing/exhausted)
    NoPrize,
}

impl DrawOutcome {
    /// Won tier id, if any
    pub fn tier_id(&self) -> Option<&str> {
        match self {
            Self::Prize(id) => Some(id),
            Self::NoPrize => None,
        }
    }

    /// Check if something was won
    pub fn is_prize(&self) -> bool {
        matches!(self, Self::Prize(_))
    }

    /// Check if the consolation tier was won
    pub fn is_consolation(&self) -> bool {
        self.tier_id() == Some(CONSOLATION_TIER_ID)
    }
}

/// Select a tier for the roll `r`.
///
/// Walks `tiers` in order, skipping consolation and exhausted tiers, adding
/// each remaining tier's probability to a running total and returning the
/// first tier with `r <= total`. Exhausted tiers contribute nothing, so
/// their share falls through to consolation rather than to other tiers.
/// When no tier matches, consolation wins if it has stock left.
///
/// Pure: the same tiers and roll always give the same outcome. A NaN roll
/// never matches a weighted tier.
pub fn select_tier(tiers: &[PrizeTier], r: f64) -> DrawOutcome {
    if all_exhausted(tiers) {
        return DrawOutcome::NoPrize;
    }

    let mut acc = 0.0;
    for tier in tiers.iter().filter(|t| t.is_competitive()) {
        acc += f64::from(tier.probability);
        if r <= acc {
            return DrawOutcome::Prize(tier.id.clone());
        }
    }

    match tiers.iter().find(|t| t.is_consolation()) {
        Some(consolation) if !consolation.is_exhausted() => {
            DrawOutcome::Prize(consolation.id.clone())
        }
        _ => DrawOutcome::NoPrize,
    }
}

/// Cumulative range a competitive tier occupies on the roll scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRange {
    pub id: String,
    /// Exclusive lower bound
    pub start: f64,
    /// Inclusive upper bound
    pub end: f64,
}

impl TierRange {
    /// Can any roll in `[0, ROLL_SCALE)` land in this range?
    ///
    /// Zero-width ranges count as unreachable even though a roll of exactly
    /// 0.0 at the head of the walk would match one.
    pub fn is_reachable(&self) -> bool {
        self.end > self.start && self.start < ROLL_SCALE
    }

    /// Chance of this tier winning a single draw, in percent
    pub fn chance(&self) -> f64 {
        (self.end.min(ROLL_SCALE) - self.start.min(ROLL_SCALE)).max(0.0)
    }
}

/// Ranges of every tier that currently competes, in walk order.
///
/// Cumulative probability may run past 100; tiers that start at or beyond
/// 100 can never win. This is reported, not corrected.
pub fn tier_reachability(tiers: &[PrizeTier]) -> Vec<TierRange> {
    let mut acc = 0.0;
    tiers
        .iter()
        .filter(|t| t.is_competitive())
        .map(|tier| {
            let start = acc;
            acc += f64::from(tier.probability);
            TierRange {
                id: tier.id.clone(),
                start,
                end: acc,
            }
        })
        .collect()
}

/// Sum of probabilities of the tiers that currently compete
pub fn competitive_probability_total(tiers: &[PrizeTier]) -> u32 {
    tiers
        .iter()
        .filter(|t| t.is_competitive())
        .fold(0u32, |acc, t| acc.saturating_add(t.probability))
}
