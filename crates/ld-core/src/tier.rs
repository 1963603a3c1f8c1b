//! Prize tiers: capacity, weight and result metadata

use serde::{Deserialize, Serialize};

/// Reserved id of the fallback tier. Never competes on probability.
pub const CONSOLATION_TIER_ID: &str = "consolation";

/// Reserved id of the top tier
pub const FIRST_TIER_ID: &str = "first";

/// Tiers that cannot be removed from the store
pub const PROTECTED_TIER_IDS: [&str; 2] = [FIRST_TIER_ID, CONSOLATION_TIER_ID];

/// Upper bound of a tier probability (percent)
pub const MAX_PROBABILITY: u32 = 100;

/// Upper bound of a tier capacity or awarded count
pub const MAX_TIER_COUNT: u32 = 999;

/// Upper bound of a sound volume (percent)
pub const MAX_VOLUME: u32 = 100;

const SOUND_BASE: &str = "https://shussher.net/static/sound";

/// Which family of result sounds a tier plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSet {
    /// Top prize fanfare
    Success,
    /// Regular prize
    Normal,
    /// Consolation jingle
    Bad,
}

impl SoundSet {
    fn slug(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Normal => "normal",
            Self::Bad => "bad",
        }
    }

    /// Effect sound played when the result is revealed
    pub fn effect_url(self) -> String {
        format!("{SOUND_BASE}/lottery-{}.mp3", self.slug())
    }

    /// Voice line played after the effect
    pub fn voice_url(self) -> String {
        format!("{SOUND_BASE}/lottery-{}-voice.mp3", self.slug())
    }
}

/// Display and audio metadata for a tier's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultConfig {
    /// Short label (footer, tier list)
    pub title: String,
    /// Text shown in the result modal
    pub modal_text: String,
    /// Effect sound URL
    pub sound1: String,
    /// Effect volume (0-100)
    pub sound1_volume: u32,
    /// Voice sound URL
    pub sound2: String,
    /// Voice volume (0-100)
    pub sound2_volume: u32,
}

impl ResultConfig {
    /// Default config for a tier title with the given sound family
    pub fn new(title: impl Into<String>, sounds: SoundSet) -> Self {
        let title = title.into();
        Self {
            modal_text: title.clone(),
            title,
            sound1: sounds.effect_url(),
            sound1_volume: 50,
            sound2: sounds.voice_url(),
            sound2_volume: 70,
        }
    }

    /// Effect volume as a 0.0-1.0 gain
    pub fn sound1_gain(&self) -> f32 {
        volume_gain(self.sound1_volume)
    }

    /// Voice volume as a 0.0-1.0 gain
    pub fn sound2_gain(&self) -> f32 {
        volume_gain(self.sound2_volume)
    }
}

fn volume_gain(volume: u32) -> f32 {
    volume.min(MAX_VOLUME) as f32 / MAX_VOLUME as f32
}

/// A single prize category
///
/// `won_count <= count` is kept by the store; the draw treats any tier with
/// `won_count >= count` as exhausted regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeTier {
    /// Unique id
    pub id: String,
    /// Weight on the 0-100 scale (ignored for consolation)
    pub probability: u32,
    /// Total prizes obtainable
    pub count: u32,
    /// Display/audio metadata
    pub config: ResultConfig,
    /// Prizes already awarded
    pub won_count: u32,
}

impl PrizeTier {
    /// Create a tier with nothing awarded yet
    pub fn new(id: impl Into<String>, probability: u32, count: u32, config: ResultConfig) -> Self {
        Self {
            id: id.into(),
            probability,
            count,
            config,
            won_count: 0,
        }
    }

    /// Builder-style awarded count
    pub fn with_won(mut self, won_count: u32) -> Self {
        self.won_count = won_count;
        self
    }

    /// Is this the reserved fallback tier?
    pub fn is_consolation(&self) -> bool {
        self.id == CONSOLATION_TIER_ID
    }

    /// Has this tier handed out everything it has?
    pub fn is_exhausted(&self) -> bool {
        self.won_count >= self.count
    }

    /// Prizes left in stock
    pub fn remaining(&self) -> u32 {
        self.count.saturating_sub(self.won_count)
    }

    /// Pull every field back into range: probability 0..=100, counts
    /// 0..=999, volumes 0..=100 and `won_count <= count`.
    ///
    /// Returns true when something had to change.
    pub fn normalize(&mut self) -> bool {
        let before = (
            self.probability,
            self.count,
            self.won_count,
            self.config.sound1_volume,
            self.config.sound2_volume,
        );
        self.probability = self.probability.min(MAX_PROBABILITY);
        self.count = self.count.min(MAX_TIER_COUNT);
        self.won_count = self.won_count.min(self.count);
        self.config.sound1_volume = self.config.sound1_volume.min(MAX_VOLUME);
        self.config.sound2_volume = self.config.sound2_volume.min(MAX_VOLUME);
        before
            != (
                self.probability,
                self.count,
                self.won_count,
                self.config.sound1_volume,
                self.config.sound2_volume,
            )
    }

    /// Takes part in the weighted walk (not consolation, not exhausted)
    pub fn is_competitive(&self) -> bool {
        !self.is_consolation() && !self.is_exhausted()
    }
}

/// Is `id` one of the undeletable tier ids?
pub fn is_protected_id(id: &str) -> bool {
    PROTECTED_TIER_IDS.contains(&id)
}

/// True when every tier is exhausted (vacuously true for an empty list)
pub fn all_exhausted(tiers: &[PrizeTier]) -> bool {
    tiers.iter().all(PrizeTier::is_exhausted)
}

/// Factory tier list: consolation, first and second prize
pub fn default_prize_tiers() -> Vec<PrizeTier> {
    vec![
        PrizeTier::new(
            CONSOLATION_TIER_ID,
            0,
            100,
            ResultConfig::new("参加賞", SoundSet::Bad),
        ),
        PrizeTier::new(FIRST_TIER_ID, 10, 2, ResultConfig::new("1等", SoundSet::Success)),
        PrizeTier::new("second", 20, 5, ResultConfig::new("2等", SoundSet::Normal)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let tiers = default_prize_tiers();
        assert_eq!(tiers.len(), 3);
        assert!(tiers[0].is_consolation());
        assert_eq!(tiers[1].id, FIRST_TIER_ID);
        assert_eq!(tiers[1].probability, 10);
        assert_eq!(tiers[2].count, 5);
        assert!(tiers.iter().all(|t| t.won_count == 0));
    }

    #[test]
    fn test_sound_sets() {
        let first = ResultConfig::new("1等", SoundSet::Success);
        assert!(first.sound1.ends_with("lottery-success.mp3"));
        assert!(first.sound2.ends_with("lottery-success-voice.mp3"));
        assert_eq!(first.modal_text, "1等");

        let consolation = ResultConfig::new("参加賞", SoundSet::Bad);
        assert!(consolation.sound1.ends_with("lottery-bad.mp3"));
    }

    #[test]
    fn test_exhaustion() {
        let tier = PrizeTier::new("x", 10, 2, ResultConfig::new("x", SoundSet::Normal));
        assert!(!tier.is_exhausted());
        assert_eq!(tier.remaining(), 2);

        let tier = tier.with_won(2);
        assert!(tier.is_exhausted());
        assert!(!tier.is_competitive());
        assert_eq!(tier.remaining(), 0);

        let empty = PrizeTier::new("y", 10, 0, ResultConfig::new("y", SoundSet::Normal));
        assert!(empty.is_exhausted());
    }

    #[test]
    fn test_consolation_never_competes() {
        let tiers = default_prize_tiers();
        assert!(!tiers[0].is_competitive());
        assert!(tiers[1].is_competitive());
    }

    #[test]
    fn test_normalize() {
        let mut tier = PrizeTier::new("x", 4_000_000_000, 5, ResultConfig::new("x", SoundSet::Normal))
            .with_won(50);
        tier.config.sound1_volume = 500;

        assert!(tier.normalize());
        assert_eq!(tier.probability, 100);
        assert_eq!(tier.won_count, 5);
        assert_eq!(tier.config.sound1_volume, 100);
        assert!(!tier.normalize());

        let mut huge = PrizeTier::new("y", 10, 5000, ResultConfig::new("y", SoundSet::Normal));
        assert!(huge.normalize());
        assert_eq!(huge.count, 999);
    }

    #[test]
    fn test_protected_ids() {
        assert!(is_protected_id("first"));
        assert!(is_protected_id("consolation"));
        assert!(!is_protected_id("second"));
    }

    #[test]
    fn test_all_exhausted() {
        assert!(all_exhausted(&[]));
        let mut tiers = default_prize_tiers();
        assert!(!all_exhausted(&tiers));
        for tier in &mut tiers {
            tier.won_count = tier.count;
        }
        assert!(all_exhausted(&tiers));
    }

    #[test]
    fn test_camel_case_fields() {
        let tier = default_prize_tiers().remove(1);
        let json = serde_json::to_value(&tier).unwrap();
        assert_eq!(json["wonCount"], 0);
        assert_eq!(json["config"]["modalText"], "1等");
        assert_eq!(json["config"]["sound1Volume"], 50);
        assert_eq!(json["config"]["sound2Volume"], 70);
    }

    #[test]
    fn test_volume_gain() {
        let mut config = ResultConfig::new("x", SoundSet::Normal);
        assert!((config.sound1_gain() - 0.5).abs() < 1e-6);
        config.sound2_volume = 250;
        assert!((config.sound2_gain() - 1.0).abs() < 1e-6);
    }
}
