//! Draw property suite
//!
//! Exercises the engine over generated tier lists:
//! - Exhaustion always yields no prize
//! - Winners always had stock at draw time
//! - Fixed rolls are deterministic
//! - Draw + award reaches exhaustion within the total stock

use ld_core::{
    CONSOLATION_TIER_ID, PrizeTier, ResultConfig, SoundSet, all_exhausted, default_prize_tiers,
};
use ld_draw::{DrawEngine, DrawOutcome, select_tier};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

fn random_tiers(rng: &mut ChaCha8Rng) -> Vec<PrizeTier> {
    let len: usize = rng.random_range(0..6);
    let mut tiers: Vec<PrizeTier> = (0..len)
        .map(|i| {
            let count: u32 = rng.random_range(0..5);
            let won = rng.random_range(0..=count);
            let id = format!("tier{i}");
            PrizeTier::new(
                id.clone(),
                rng.random_range(0..=60u32),
                count,
                ResultConfig::new(id, SoundSet::Normal),
            )
            .with_won(won)
        })
        .collect();

    if rng.random_bool(0.7) {
        let count: u32 = rng.random_range(0..5);
        let consolation = PrizeTier::new(
            CONSOLATION_TIER_ID,
            0,
            count,
            ResultConfig::new("参加賞", SoundSet::Bad),
        )
        .with_won(rng.random_range(0..=count));
        let at = rng.random_range(0..=tiers.len());
        tiers.insert(at, consolation);
    }
    tiers
}

fn award(tiers: &mut [PrizeTier], outcome: &DrawOutcome) {
    if let Some(id) = outcome.tier_id() {
        let tier = tiers.iter_mut().find(|t| t.id == id).unwrap();
        assert!(tier.won_count < tier.count);
        tier.won_count += 1;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn exhausted_lists_never_win() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for _ in 0..500 {
        let mut tiers = random_tiers(&mut rng);
        for tier in &mut tiers {
            tier.won_count = tier.count;
        }
        let r: f64 = rng.random_range(0.0..100.0);
        assert_eq!(select_tier(&tiers, r), DrawOutcome::NoPrize);
    }
}

#[test]
fn winners_always_have_stock() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    for _ in 0..2_000 {
        let tiers = random_tiers(&mut rng);
        let r: f64 = rng.random_range(0.0..100.0);
        if let DrawOutcome::Prize(id) = select_tier(&tiers, r) {
            let tier = tiers.iter().find(|t| t.id == id).unwrap();
            assert!(tier.won_count < tier.count, "{id} won without stock");
        }
    }
}

#[test]
fn fixed_roll_is_deterministic() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..500 {
        let tiers = random_tiers(&mut rng);
        let r: f64 = rng.random_range(0.0..100.0);
        let first = select_tier(&tiers, r);
        for _ in 0..3 {
            assert_eq!(select_tier(&tiers, r), first);
        }
    }
}

/// Stock is left only in tiers no roll can reach
fn only_unwinnable_stock(tiers: &[PrizeTier]) -> bool {
    tiers
        .iter()
        .filter(|t| !t.is_exhausted())
        .all(|t| !t.is_consolation() && t.probability == 0)
}

#[test]
fn repeated_draws_exhaust_within_total_stock() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    for seed in 0..100 {
        let mut tiers = random_tiers(&mut rng);
        let bound: u32 = tiers.iter().map(|t| t.count - t.won_count).sum();
        let mut engine = DrawEngine::seeded(seed);

        let mut wins = 0;
        for _ in 0..100_000 {
            if only_unwinnable_stock(&tiers) {
                break;
            }
            let outcome = engine.draw(&tiers);
            if outcome.is_prize() {
                wins += 1;
            }
            award(&mut tiers, &outcome);
        }
        assert!(only_unwinnable_stock(&tiers), "draw loop did not converge");
        assert!(wins <= bound);
    }
}

#[test]
fn default_tiers_exhaust_in_exactly_total_stock() {
    let mut tiers = default_prize_tiers();
    let total: u32 = tiers.iter().map(|t| t.count).sum();
    let mut engine = DrawEngine::seeded(77);

    let mut wins = 0;
    loop {
        let outcome = engine.draw(&tiers);
        if outcome == DrawOutcome::NoPrize {
            break;
        }
        award(&mut tiers, &outcome);
        wins += 1;
    }
    // consolation catches every miss, so every draw wins until stock is gone
    assert_eq!(wins, total);
    assert!(all_exhausted(&tiers));
}

#[test]
fn swapping_overlapping_tiers_changes_winner() {
    let a = PrizeTier::new("a", 50, 3, ResultConfig::new("a", SoundSet::Normal));
    let b = PrizeTier::new("b", 80, 3, ResultConfig::new("b", SoundSet::Normal));

    for r in [1.0, 25.0, 49.5] {
        assert_eq!(select_tier(&[a.clone(), b.clone()], r).tier_id(), Some("a"));
        assert_eq!(select_tier(&[b.clone(), a.clone()], r).tier_id(), Some("b"));
    }
}
