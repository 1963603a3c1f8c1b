//! Draw session: engine + store behind a one-draw-in-flight guard
//!
//! The only place a draw is both selected and committed. Presentation
//! (anticipation, sounds, effects) is driven from the returned
//! `PresentationCue` and never re-runs the selection.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use ld_core::{
    BUTTON_SOUND_GAIN, BUTTON_SOUND_URL, FIRST_TIER_ID, LdError, LdResult, PrizeTier, Settings,
};
use ld_draw::{DrawEngine, DrawOutcome, DrawStats};

use crate::store::SharedStore;

/// Button state as the front end sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Ready,
    Processing,
    /// Every tier is exhausted
    Completed,
}

/// One sound to play with the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueSound {
    pub url: String,
    /// 0.0 - 1.0
    pub gain: f32,
}

/// What the front end needs to present a won tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationCue {
    pub tier_id: String,
    pub title: String,
    pub modal_text: String,
    /// Played when the draw starts
    pub button_sound: CueSound,
    /// Effect first, then voice
    pub sounds: Vec<CueSound>,
    /// Seconds of anticipation before the reveal
    pub anticipation_secs: f64,
    /// Top prize gets the full celebration
    pub grand: bool,
}

impl PresentationCue {
    fn new(tier: &PrizeTier, settings: &Settings) -> Self {
        let config = &tier.config;
        Self {
            tier_id: tier.id.clone(),
            title: config.title.clone(),
            modal_text: config.modal_text.clone(),
            button_sound: CueSound {
                url: BUTTON_SOUND_URL.to_string(),
                gain: BUTTON_SOUND_GAIN,
            },
            sounds: vec![
                CueSound {
                    url: config.sound1.clone(),
                    gain: config.sound1_gain(),
                },
                CueSound {
                    url: config.sound2.clone(),
                    gain: config.sound2_gain(),
                },
            ],
            anticipation_secs: settings.anticipation_duration,
            grand: tier.id == FIRST_TIER_ID,
        }
    }
}

/// Result of one session draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawReport {
    pub outcome: DrawOutcome,
    /// Present when something was won
    pub cue: Option<PresentationCue>,
    /// The award reached the store
    pub committed: bool,
}

impl DrawReport {
    fn no_prize() -> Self {
        Self {
            outcome: DrawOutcome::NoPrize,
            cue: None,
            committed: false,
        }
    }
}

/// Clears the in-flight flag when the draw scope ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Draw controller
pub struct DrawSession {
    store: SharedStore,
    engine: Mutex<DrawEngine>,
    in_flight: AtomicBool,
}

impl DrawSession {
    pub fn new(store: SharedStore) -> Self {
        Self::with_engine(store, DrawEngine::new())
    }

    pub fn with_engine(store: SharedStore, engine: DrawEngine) -> Self {
        Self {
            store,
            engine: Mutex::new(engine),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Store handle
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Reseed the engine
    pub fn seed(&self, seed: u64) {
        self.engine.lock().seed(seed);
    }

    /// Engine statistics so far
    pub fn stats(&self) -> DrawStats {
        self.engine.lock().stats().clone()
    }

    pub fn state(&self) -> SessionState {
        if self.in_flight.load(Ordering::Acquire) {
            SessionState::Processing
        } else if self.store.read().all_exhausted() {
            SessionState::Completed
        } else {
            SessionState::Ready
        }
    }

    /// Draw once and commit the award.
    ///
    /// Fails with `DrawInFlight` while another draw is running. When every
    /// tier is exhausted returns a no-prize report without drawing.
    pub fn draw(&self) -> LdResult<DrawReport> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LdError::DrawInFlight)?;
        let _guard = InFlightGuard(&self.in_flight);

        let (tiers, settings) = {
            let store = self.store.read();
            (store.tiers().to_vec(), store.settings().clone())
        };
        if ld_core::all_exhausted(&tiers) {
            log::info!("All prizes distributed");
            return Ok(DrawReport::no_prize());
        }

        let outcome = self.engine.lock().draw(&tiers);
        let Some(tier_id) = outcome.tier_id() else {
            return Ok(DrawReport::no_prize());
        };

        let committed = self.store.write().record_win(tier_id)?;
        if !committed {
            log::warn!("Tier '{}' ran out before the award was committed", tier_id);
        }
        let cue = tiers
            .iter()
            .find(|t| t.id == tier_id)
            .map(|tier| PresentationCue::new(tier, &settings));

        Ok(DrawReport {
            outcome,
            cue,
            committed,
        })
    }
}
