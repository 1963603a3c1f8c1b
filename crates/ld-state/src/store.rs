//! Tier store: the single owner of lottery state
//!
//! Every mutation goes through a method here and is written through to the
//! backing `KvStore` before returning. Draw outcomes are committed with
//! `record_win`, which re-checks capacity at commit time.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use ld_core::{
    LdError, LdResult, LotteryState, MAX_PROBABILITY, PrizeTier, ResultConfig, Settings, SettingsPatch, SoundSet, all_exhausted,
    is_protected_id,
};
use ld_draw::competitive_probability_total;

use crate::kv::{KvStore, STORAGE_KEY};

/// Version written into the persisted envelope
pub const STATE_VERSION: u32 = 0;

/// Default weight of a user-added tier
const NEW_TIER_PROBABILITY: u32 = 20;

/// Default stock of a user-added tier
const NEW_TIER_COUNT: u32 = 5;

/// On-disk wrapper around the state
#[derive(Debug, Deserialize)]
struct PersistedState {
    state: LotteryState,
    #[serde(default)]
    version: u32,
}

/// Partial update of a tier's result metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResultConfigPatch {
    pub title: Option<String>,
    pub modal_text: Option<String>,
    pub sound1: Option<String>,
    pub sound1_volume: Option<u32>,
    pub sound2: Option<String>,
    pub sound2_volume: Option<u32>,
}

/// Partial update of a tier; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TierPatch {
    pub probability: Option<u32>,
    pub count: Option<u32>,
    pub won_count: Option<u32>,
    pub config: Option<ResultConfigPatch>,
}

impl From<PrizeTier> for TierPatch {
    fn from(tier: PrizeTier) -> Self {
        let c = tier.config;
        Self {
            probability: Some(tier.probability),
            count: Some(tier.count),
            won_count: Some(tier.won_count),
            config: Some(ResultConfigPatch {
                title: Some(c.title),
                modal_text: Some(c.modal_text),
                sound1: Some(c.sound1),
                sound1_volume: Some(c.sound1_volume),
                sound2: Some(c.sound2),
                sound2_volume: Some(c.sound2_volume),
            }),
        }
    }
}

impl ResultConfigPatch {
    fn apply_to(self, config: &mut ResultConfig) {
        if let Some(title) = self.title {
            config.title = title;
        }
        if let Some(text) = self.modal_text {
            config.modal_text = text;
        }
        if let Some(url) = self.sound1 {
            config.sound1 = url;
        }
        if let Some(volume) = self.sound1_volume {
            config.sound1_volume = volume;
        }
        if let Some(url) = self.sound2 {
            config.sound2 = url;
        }
        if let Some(volume) = self.sound2_volume {
            config.sound2_volume = volume;
        }
    }
}

impl TierPatch {
    /// Merge into `tier`.
    ///
    /// Probability is clamped to 0..=100 and counts to 0..=999. The awarded
    /// count never ends above the capacity.
    pub fn apply_to(self, tier: &mut PrizeTier) {
        if let Some(p) = self.probability {
            tier.probability = p;
        }
        if let Some(count) = self.count {
            tier.count = count;
        }
        if let Some(won) = self.won_count {
            tier.won_count = won;
        }
        if let Some(config) = self.config {
            config.apply_to(&mut tier.config);
        }
        tier.normalize();
    }
}

/// Store shared between the session and its callers
pub type SharedStore = Arc<RwLock<TierStore>>;

/// Persisted lottery state container
pub struct TierStore {
    state: LotteryState,
    backend: Box<dyn KvStore>,
}

impl TierStore {
    /// Load state from `backend`, falling back to defaults when nothing (or
    /// nothing readable) is stored.
    pub fn open(backend: impl KvStore + 'static) -> Self {
        let state = match backend.get(STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<PersistedState>(&json) {
                Ok(persisted) => {
                    if persisted.version != STATE_VERSION {
                        log::warn!(
                            "Stored state version {} differs from {}, loading anyway",
                            persisted.version,
                            STATE_VERSION
                        );
                    }
                    normalized(persisted.state)
                }
                Err(e) => {
                    log::warn!("Stored lottery state is unreadable, using defaults: {}", e);
                    LotteryState::default()
                }
            },
            Ok(None) => {
                log::info!("No stored lottery state, using defaults");
                LotteryState::default()
            }
            Err(e) => {
                log::warn!("Failed to read lottery state, using defaults: {}", e);
                LotteryState::default()
            }
        };

        Self {
            state,
            backend: Box::new(backend),
        }
    }

    /// Wrap into a shared handle
    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> &LotteryState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Tiers in draw order
    pub fn tiers(&self) -> &[PrizeTier] {
        &self.state.prize_tiers
    }

    pub fn tier(&self, id: &str) -> Option<&PrizeTier> {
        self.state.prize_tiers.iter().find(|t| t.id == id)
    }

    pub fn show_results(&self) -> bool {
        self.state.show_results
    }

    /// Every tier handed out?
    pub fn all_exhausted(&self) -> bool {
        all_exhausted(&self.state.prize_tiers)
    }

    /// Sum of probabilities of tiers still competing
    pub fn competitive_probability_total(&self) -> u32 {
        competitive_probability_total(&self.state.prize_tiers)
    }

    /// Tiers for the tally display: consolation first, the rest in draw order
    pub fn display_order(&self) -> Vec<&PrizeTier> {
        let tiers = &self.state.prize_tiers;
        tiers
            .iter()
            .filter(|t| t.is_consolation())
            .chain(tiers.iter().filter(|t| !t.is_consolation()))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Commit one award for `tier_id`.
    ///
    /// Returns `Ok(false)` and changes nothing when the tier is already at
    /// capacity.
    pub fn record_win(&mut self, tier_id: &str) -> LdResult<bool> {
        let mut state = self.state.clone();
        let tier = find_tier_mut(&mut state, tier_id)?;
        if tier.is_exhausted() {
            log::warn!("Tier '{}' is at capacity, award ignored", tier_id);
            return Ok(false);
        }
        tier.won_count += 1;
        let (won, count) = (tier.won_count, tier.count);
        self.commit(state)?;
        log::info!("Awarded '{}' ({}/{})", tier_id, won, count);
        Ok(true)
    }

    /// Merge a settings patch
    pub fn update_settings(&mut self, patch: SettingsPatch) -> LdResult<()> {
        let mut state = self.state.clone();
        state.settings.apply(patch);
        self.commit(state)
    }

    /// Merge a tier patch
    pub fn update_tier(&mut self, tier_id: &str, patch: TierPatch) -> LdResult<()> {
        let mut state = self.state.clone();
        patch.apply_to(find_tier_mut(&mut state, tier_id)?);
        self.commit(state)?;
        self.warn_if_overweight();
        Ok(())
    }

    /// Append a tier with default stock and weight; returns its id
    pub fn add_tier(&mut self) -> LdResult<String> {
        let number = self
            .state
            .prize_tiers
            .iter()
            .filter(|t| !t.is_consolation())
            .count()
            + 1;
        let id = self.fresh_tier_id();
        let mut state = self.state.clone();
        state.prize_tiers.push(PrizeTier::new(
            id.clone(),
            NEW_TIER_PROBABILITY,
            NEW_TIER_COUNT,
            ResultConfig::new(format!("{number}等"), SoundSet::Normal),
        ));
        self.commit(state)?;
        log::info!("Added tier '{}'", id);
        self.warn_if_overweight();
        Ok(id)
    }

    /// Remove a tier. `first` and `consolation` cannot be removed.
    pub fn remove_tier(&mut self, tier_id: &str) -> LdResult<PrizeTier> {
        if is_protected_id(tier_id) {
            return Err(LdError::ProtectedTier(tier_id.to_string()));
        }
        let mut state = self.state.clone();
        let index = state
            .prize_tiers
            .iter()
            .position(|t| t.id == tier_id)
            .ok_or_else(|| LdError::UnknownTier(tier_id.to_string()))?;
        let removed = state.prize_tiers.remove(index);
        self.commit(state)?;
        Ok(removed)
    }

    /// Flip tally visibility; returns the new value
    pub fn toggle_results_visibility(&mut self) -> LdResult<bool> {
        let mut state = self.state.clone();
        state.show_results = !state.show_results;
        self.commit(state)?;
        Ok(self.state.show_results)
    }

    /// Back to factory settings and tiers
    pub fn reset(&mut self) -> LdResult<()> {
        self.commit(LotteryState::default())?;
        log::info!("Lottery state reset");
        Ok(())
    }

    /// Swap in a whole state at once (document import)
    pub(crate) fn replace_state(&mut self, state: LotteryState) -> LdResult<()> {
        self.commit(state)?;
        self.warn_if_overweight();
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Write `state` to the backend, then make it current. A failed write
    /// leaves the in-memory state untouched.
    fn commit(&mut self, state: LotteryState) -> LdResult<()> {
        let envelope = serde_json::json!({
            "state": &state,
            "version": STATE_VERSION,
        });
        self.backend.set(STORAGE_KEY, envelope.to_string())?;
        self.state = state;
        Ok(())
    }

    fn fresh_tier_id(&self) -> String {
        let base = format!("tier{}", chrono::Utc::now().timestamp_millis());
        let taken = |id: &str| self.state.prize_tiers.iter().any(|t| t.id == id);
        if !taken(&base) {
            return base;
        }
        (2u32..)
            .map(|n| format!("{base}-{n}"))
            .find(|id| !taken(id))
            .unwrap_or(base)
    }

    fn warn_if_overweight(&self) {
        let total = self.competitive_probability_total();
        if total > MAX_PROBABILITY {
            log::warn!(
                "Competitive probability totals {}%; tiers past 100% can never be drawn",
                total
            );
        }
    }
}

fn find_tier_mut<'a>(state: &'a mut LotteryState, tier_id: &str) -> LdResult<&'a mut PrizeTier> {
    state
        .prize_tiers
        .iter_mut()
        .find(|t| t.id == tier_id)
        .ok_or_else(|| LdError::UnknownTier(tier_id.to_string()))
}

/// Clamp loaded tiers back into range
fn normalized(mut state: LotteryState) -> LotteryState {
    for tier in &mut state.prize_tiers {
        if tier.normalize() {
            log::warn!("Stored tier '{}' was out of range and has been corrected", tier.id);
        }
    }
    state
}

impl std::fmt::Debug for TierStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
