//! App settings and the persisted lottery state

use serde::{Deserialize, Serialize};

use crate::tier::{PrizeTier, default_prize_tiers};

/// Logo shown in the header by default
pub const DEFAULT_LOGO_URL: &str = "https://shussher.net/static/img/icon/logo.png";

/// Sound played when the draw button is pressed
pub const BUTTON_SOUND_URL: &str = "https://shussher.net/static/sound/lottery-button.mp3";

/// Gain of the button sound (0.0 - 1.0)
pub const BUTTON_SOUND_GAIN: f32 = 0.5;

/// Default anticipation (drum roll) length in seconds
pub const DEFAULT_ANTICIPATION_SECS: f64 = 2.0;

/// Longest anticipation the settings accept, in seconds
pub const MAX_ANTICIPATION_SECS: f64 = 3.0;

/// User settings bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Seconds of anticipation before the result is revealed
    pub anticipation_duration: f64,
    /// Header logo
    pub logo_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anticipation_duration: DEFAULT_ANTICIPATION_SECS,
            logo_url: DEFAULT_LOGO_URL.to_string(),
        }
    }
}

/// Partial settings update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anticipation_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Settings {
    /// Merge a patch. Anticipation is clamped to 0..=MAX_ANTICIPATION_SECS;
    /// non-finite values are ignored.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(secs) = patch.anticipation_duration {
            if secs.is_finite() {
                self.anticipation_duration = secs.clamp(0.0, MAX_ANTICIPATION_SECS);
            } else {
                log::warn!("Ignoring non-finite anticipation duration");
            }
        }
        if let Some(url) = patch.logo_url {
            self.logo_url = url;
        }
    }
}

/// Everything the store persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LotteryState {
    pub settings: Settings,
    pub prize_tiers: Vec<PrizeTier>,
    /// Whether the tier tally is visible
    pub show_results: bool,
}

impl Default for LotteryState {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            prize_tiers: default_prize_tiers(),
            show_results: true,
        }
    }
}
