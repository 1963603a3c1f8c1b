//! Settings documents: portable export/import of settings and tiers
//!
//! A document is `{"settings": {...}, "prizeTiers": [...]}` as pretty JSON.
//! Imports are all-or-nothing: a document that fails parsing or validation
//! leaves the store untouched.
//!
//! Merging only needs an `id` per tier; any other tier field may be left
//! out. Replacing needs complete tiers.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ld_core::{
    LdError, LdResult, LotteryState, MAX_PROBABILITY, MAX_TIER_COUNT, PROTECTED_TIER_IDS, PrizeTier,
    SettingsPatch,
};

use crate::store::{TierPatch, TierStore};

/// Default export file name
pub const DOCUMENT_FILE_NAME: &str = "lottery-settings.json";

/// How an imported document is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Merge settings; merge each tier into the existing tier with the same
    /// id. Tiers the store does not have are ignored.
    #[default]
    Merge,
    /// Replace the tier list wholesale
    Replace,
}

/// Exportable snapshot of settings and tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    pub settings: SettingsPatch,
    pub prize_tiers: Vec<PrizeTier>,
}

impl SettingsDocument {
    /// Snapshot of the given state
    pub fn from_state(state: &LotteryState) -> Self {
        Self {
            settings: SettingsPatch {
                anticipation_duration: Some(state.settings.anticipation_duration),
                logo_url: Some(state.settings.logo_url.clone()),
            },
            prize_tiers: state.prize_tiers.clone(),
        }
    }

    pub fn to_json(&self) -> LdResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a complete document. The top level must be an object carrying
    /// both `settings` and `prizeTiers`, and every tier must be complete.
    pub fn from_json(json: &str) -> LdResult<Self> {
        let value = checked_shape(json)?;
        serde_json::from_value(value).map_err(|e| LdError::InvalidDocument(e.to_string()))
    }

    /// Read a document from disk
    pub fn load<P: AsRef<Path>>(path: P) -> LdResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write a document to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> LdResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Checks a tier list must pass before it may replace the store's
    fn validate_for_replace(&self) -> LdResult<()> {
        let mut seen = HashSet::new();
        for tier in &self.prize_tiers {
            if !seen.insert(tier.id.as_str()) {
                return Err(LdError::InvalidDocument(format!("duplicate tier id '{}'", tier.id)));
            }
            if tier.won_count > tier.count {
                return Err(LdError::InvalidDocument(format!(
                    "tier '{}' has won {} of {}",
                    tier.id, tier.won_count, tier.count
                )));
            }
            if tier.count > MAX_TIER_COUNT {
                return Err(LdError::InvalidDocument(format!(
                    "tier '{}' count {} exceeds {}",
                    tier.id, tier.count, MAX_TIER_COUNT
                )));
            }
            if tier.probability > MAX_PROBABILITY {
                return Err(LdError::InvalidDocument(format!(
                    "tier '{}' probability {} exceeds {}",
                    tier.id, tier.probability, MAX_PROBABILITY
                )));
            }
        }
        for id in PROTECTED_TIER_IDS {
            if !seen.contains(id) {
                return Err(LdError::InvalidDocument(format!("missing required tier '{id}'")));
            }
        }
        Ok(())
    }
}

/// Tier entry of a merge import: an id plus whichever fields are present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierUpdate {
    pub id: String,
    #[serde(flatten)]
    pub patch: TierPatch,
}

impl From<PrizeTier> for TierUpdate {
    fn from(tier: PrizeTier) -> Self {
        Self {
            id: tier.id.clone(),
            patch: TierPatch::from(tier),
        }
    }
}

/// Document applied by merging into the existing tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDocument {
    pub settings: SettingsPatch,
    pub prize_tiers: Vec<TierUpdate>,
}

impl MergeDocument {
    /// Parse a document for merging. Only the top-level shape and each
    /// tier's `id` are required.
    pub fn from_json(json: &str) -> LdResult<Self> {
        let value = checked_shape(json)?;
        serde_json::from_value(value).map_err(|e| LdError::InvalidDocument(e.to_string()))
    }
}

impl From<SettingsDocument> for MergeDocument {
    fn from(doc: SettingsDocument) -> Self {
        Self {
            settings: doc.settings,
            prize_tiers: doc.prize_tiers.into_iter().map(TierUpdate::from).collect(),
        }
    }
}

/// Parse JSON and require an object with non-null `settings` and
/// `prizeTiers`
fn checked_shape(json: &str) -> LdResult<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| LdError::InvalidDocument(format!("not JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| LdError::InvalidDocument("top level is not an object".into()))?;
    for field in ["settings", "prizeTiers"] {
        if object.get(field).is_none_or(serde_json::Value::is_null) {
            return Err(LdError::InvalidDocument(format!("missing '{field}'")));
        }
    }
    Ok(value)
}

impl TierStore {
    /// Export current settings and tiers
    pub fn export_document(&self) -> SettingsDocument {
        SettingsDocument::from_state(self.state())
    }

    /// Apply a complete document in one step
    pub fn import_document(&mut self, doc: SettingsDocument, mode: ImportMode) -> LdResult<()> {
        match mode {
            ImportMode::Merge => self.merge_document(doc.into()),
            ImportMode::Replace => {
                doc.validate_for_replace()?;
                let mut state = self.state().clone();
                state.settings.apply(doc.settings);
                log::info!("Imported settings, replaced with {} tiers", doc.prize_tiers.len());
                state.prize_tiers = doc.prize_tiers;
                self.replace_state(state)
            }
        }
    }

    /// Merge settings and tier updates in one step. Unknown tier ids are
    /// skipped.
    pub fn merge_document(&mut self, doc: MergeDocument) -> LdResult<()> {
        let mut state = self.state().clone();
        state.settings.apply(doc.settings);

        let mut applied = 0;
        for update in doc.prize_tiers {
            match state.prize_tiers.iter_mut().find(|t| t.id == update.id) {
                Some(existing) => {
                    update.patch.apply_to(existing);
                    applied += 1;
                }
                None => log::debug!("Skipping unknown tier '{}' on import", update.id),
            }
        }
        log::info!("Imported settings, merged {} tiers", applied);

        self.replace_state(state)
    }

    /// Parse and apply a JSON document
    pub fn import_json(&mut self, json: &str, mode: ImportMode) -> LdResult<()> {
        match mode {
            ImportMode::Merge => self.merge_document(MergeDocument::from_json(json)?),
            ImportMode::Replace => self.import_document(SettingsDocument::from_json(json)?, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    fn fresh() -> TierStore {
        TierStore::open(MemoryKvStore::new())
    }

    #[test]
    fn test_export_shape() {
        let store = fresh();
        let json = store.export_document().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["settings"]["anticipationDuration"], 2.0);
        assert_eq!(value["prizeTiers"].as_array().unwrap().len(), 3);
        assert_eq!(value["prizeTiers"][1]["id"], "first");
        assert_eq!(value["prizeTiers"][1]["wonCount"], 0);
        // pretty printed
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        for json in [
            "not json",
            "[]",
            r#"{"settings": {}}"#,
            r#"{"prizeTiers": []}"#,
            r#"{"settings": null, "prizeTiers": []}"#,
            r#"{"settings": {}, "prizeTiers": [{"probability": 5}]}"#,
            r#"{"settings": {}, "prizeTiers": [{"id": "first", "count": "lots"}]}"#,
        ] {
            assert!(
                matches!(MergeDocument::from_json(json), Err(LdError::InvalidDocument(_))),
                "accepted {json}"
            );
            assert!(SettingsDocument::from_json(json).is_err());
        }
    }

    #[test]
    fn test_complete_document_needs_full_tiers() {
        let json = r#"{"settings": {}, "prizeTiers": [{"id": "first"}]}"#;
        assert!(matches!(
            SettingsDocument::from_json(json),
            Err(LdError::InvalidDocument(_))
        ));
        assert!(MergeDocument::from_json(json).is_ok());
    }

    #[test]
    fn test_merge_partial_tiers() {
        let mut store = fresh();
        let json = r#"{
            "settings": {},
            "prizeTiers": [
                {"id": "first", "probability": 5},
                {"id": "second", "config": {"title": "二等賞"}}
            ]
        }"#;
        store.import_json(json, ImportMode::Merge).unwrap();

        let first = store.tier("first").unwrap();
        assert_eq!(first.probability, 5);
        assert_eq!(first.count, 2);
        assert_eq!(first.config.title, "1等");

        let second = store.tier("second").unwrap();
        assert_eq!(second.probability, 20);
        assert_eq!(second.config.title, "二等賞");
        assert_eq!(second.config.modal_text, "2等");

        // replacing still demands complete tiers
        assert!(store.import_json(json, ImportMode::Replace).is_err());
        assert_eq!(store.tier("first").unwrap().probability, 5);
    }

    #[test]
    fn test_rejected_import_changes_nothing() {
        let kv = MemoryKvStore::new();
        let mut store = TierStore::open(kv.clone());
        let before = store.state().clone();

        assert!(store.import_json(r#"{"settings": {"logoUrl": "x"}}"#, ImportMode::Merge).is_err());
        assert_eq!(store.state(), &before);
        assert_eq!(kv.writes(), 0);
    }

    #[test]
    fn test_merge_import() {
        let mut store = fresh();
        let json = r#"{
            "settings": {"logoUrl": "custom.png"},
            "prizeTiers": [
                {
                    "id": "first",
                    "probability": 5,
                    "count": 3,
                    "wonCount": 1,
                    "config": {
                        "title": "特賞",
                        "modalText": "おめでとう",
                        "sound1": "a.mp3",
                        "sound1Volume": 40,
                        "sound2": "b.mp3",
                        "sound2Volume": 60
                    }
                },
                {
                    "id": "tier999",
                    "probability": 5,
                    "count": 3,
                    "wonCount": 0,
                    "config": {
                        "title": "x", "modalText": "x",
                        "sound1": "", "sound1Volume": 0,
                        "sound2": "", "sound2Volume": 0
                    }
                }
            ]
        }"#;
        store.import_json(json, ImportMode::Merge).unwrap();

        assert_eq!(store.settings().logo_url, "custom.png");
        assert_eq!(store.settings().anticipation_duration, 2.0);
        let first = store.tier("first").unwrap();
        assert_eq!(first.probability, 5);
        assert_eq!(first.won_count, 1);
        assert_eq!(first.config.modal_text, "おめでとう");
        assert!(store.tier("tier999").is_none());
        assert_eq!(store.tiers().len(), 3);
    }

    #[test]
    fn test_replace_import() {
        let mut source = fresh();
        source.record_win("second").unwrap();
        let extra = source.add_tier().unwrap();
        let doc = source.export_document();

        let mut target = fresh();
        target.import_document(doc, ImportMode::Replace).unwrap();
        assert_eq!(target.tiers(), source.tiers());
        assert!(target.tier(&extra).is_some());
    }

    #[test]
    fn test_replace_validation() {
        let mut store = fresh();
        let base = store.export_document();

        let mut missing_first = base.clone();
        missing_first.prize_tiers.retain(|t| t.id != "first");
        assert!(store.import_document(missing_first, ImportMode::Replace).is_err());

        let mut over_awarded = base.clone();
        over_awarded.prize_tiers[2].won_count = 99;
        assert!(store.import_document(over_awarded, ImportMode::Replace).is_err());

        let mut duplicate = base.clone();
        let copy = duplicate.prize_tiers[2].clone();
        duplicate.prize_tiers.push(copy);
        assert!(store.import_document(duplicate, ImportMode::Replace).is_err());

        let mut heavy = base.clone();
        heavy.prize_tiers[1].probability = 101;
        assert!(store.import_document(heavy, ImportMode::Replace).is_err());

        let mut overstocked = base;
        overstocked.prize_tiers[1].count = 1000;
        assert!(store.import_document(overstocked, ImportMode::Replace).is_err());

        assert_eq!(store.state(), &LotteryState::default());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOCUMENT_FILE_NAME);

        let mut store = fresh();
        store.record_win("first").unwrap();
        store.export_document().save(&path).unwrap();

        let loaded = SettingsDocument::load(&path).unwrap();
        assert_eq!(loaded, store.export_document());
    }
}
