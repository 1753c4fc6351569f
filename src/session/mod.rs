// src/session/mod.rs
//
// Per-session storage collaborator. The quiz needs nothing more than a
// stage-keyed JSON text mapping with get/set/delete, so the store is a small
// synchronous trait with an in-memory implementation, and a registry hands
// out one store per session id.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::diagnosis::validation;
use crate::error::{DiagnosisError, DiagnosisErrorCode};
use crate::models::stage::StageRecord;

/// Storage key for one quiz stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKey {
    Stage1,
    Stage2,
    Stage3,
}

impl StageKey {
    pub const ALL: [StageKey; 3] = [StageKey::Stage1, StageKey::Stage2, StageKey::Stage3];

    pub fn from_stage(stage: u8) -> Option<Self> {
        match stage {
            1 => Some(StageKey::Stage1),
            2 => Some(StageKey::Stage2),
            3 => Some(StageKey::Stage3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKey::Stage1 => "stage1",
            StageKey::Stage2 => "stage2",
            StageKey::Stage3 => "stage3",
        }
    }

    pub fn stage(&self) -> u8 {
        match self {
            StageKey::Stage1 => 1,
            StageKey::Stage2 => 2,
            StageKey::Stage3 => 3,
        }
    }
}

/// Per-session key-value collaborator. Values are JSON text; operations are
/// synchronous by contract and give no atomicity guarantees across keys.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: StageKey) -> Option<String>;
    fn set(&self, key: StageKey, json: String);
    fn delete(&self, key: StageKey);
}

/// In-memory store backing one quiz session.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<StageKey, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: StageKey) -> Option<String> {
        self.entries.lock().unwrap().get(&key).cloned()
    }

    fn set(&self, key: StageKey, json: String) {
        self.entries.lock().unwrap().insert(key, json);
    }

    fn delete(&self, key: StageKey) {
        self.entries.lock().unwrap().remove(&key);
    }
}

/// Persists a stage record, overwriting any previous submission of the same
/// stage.
pub fn save_stage_data(
    store: &dyn SessionStore,
    key: StageKey,
    record: &StageRecord,
) -> Result<(), DiagnosisError> {
    let json = serde_json::to_string(record)?;
    store.set(key, json);
    Ok(())
}

/// Strict read: a missing entry and an unparsable entry are distinct
/// classified errors.
pub fn safe_get_session_data(
    store: &dyn SessionStore,
    key: StageKey,
) -> Result<serde_json::Value, DiagnosisError> {
    let raw = store.get(key).ok_or_else(|| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::MissingStageData,
            format!("Stage {} data not found", key.stage()),
            json!({ "stage": key.stage() }),
        )
    })?;

    serde_json::from_str(&raw).map_err(|err| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::InvalidSessionData,
            "Invalid session data format",
            json!({ "stage": key.stage(), "originalError": err.to_string() }),
        )
    })
}

/// Lenient read: parse and validation failures are logged, the corrupted
/// entry is deleted so reloads do not trip over it again, and the caller
/// sees `None`. "No data" and "bad data" are indistinguishable by design.
pub fn get_validated_stage_data(store: &dyn SessionStore, key: StageKey) -> Option<StageRecord> {
    let raw = store.get(key)?;

    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(stage = key.stage(), "Failed to parse stage data: {err}");
            store.delete(key);
            return None;
        }
    };

    match validation::validate_stage_data(key.stage(), &value) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(
                stage = key.stage(),
                field = %err.field,
                "Stage data failed validation: {}",
                err.message
            );
            store.delete(key);
            None
        }
    }
}

/// Removes all three stage entries.
pub fn clear_diagnosis_data(store: &dyn SessionStore) {
    for key in StageKey::ALL {
        store.delete(key);
    }
}

/// Strict cross-stage integrity check: all three records present and valid,
/// and stage 3's embedded scores and route flag equal to what stages 1 and 2
/// actually recorded. Mismatches are failures, never silently corrected.
///
/// Returns the three records so the caller does not have to read twice.
pub fn check_session_integrity(
    store: &dyn SessionStore,
) -> Result<(StageRecord, StageRecord, StageRecord), DiagnosisError> {
    let stage1 = load_valid_record(store, StageKey::Stage1)?;
    let stage2 = load_valid_record(store, StageKey::Stage2)?;
    let stage3 = load_valid_record(store, StageKey::Stage3)?;

    if stage3.stage1_score != Some(stage1.score) {
        return Err(DiagnosisError::with_context(
            DiagnosisErrorCode::IntegrityCheckFailed,
            "Stage1 score mismatch",
            json!({ "field": "stage1Score", "value": stage3.stage1_score }),
        ));
    }
    if stage3.stage2_score != Some(stage2.score) {
        return Err(DiagnosisError::with_context(
            DiagnosisErrorCode::IntegrityCheckFailed,
            "Stage2 score mismatch",
            json!({ "field": "stage2Score", "value": stage3.stage2_score }),
        ));
    }
    if stage3.is_general != stage2.is_general {
        return Err(DiagnosisError::with_context(
            DiagnosisErrorCode::IntegrityCheckFailed,
            "isGeneral flag mismatch",
            json!({ "field": "isGeneral", "value": stage3.is_general }),
        ));
    }

    Ok((stage1, stage2, stage3))
}

/// Lenient wrapper around the integrity check: any failure is logged as a
/// warning and reported as `false`, never propagated.
pub fn validate_session_integrity(store: &dyn SessionStore) -> bool {
    match check_session_integrity(store) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(
                code = err.code.as_str(),
                "Session integrity validation failed: {}",
                err.message
            );
            false
        }
    }
}

fn load_valid_record(
    store: &dyn SessionStore,
    key: StageKey,
) -> Result<StageRecord, DiagnosisError> {
    let value = safe_get_session_data(store, key)?;
    validation::validate_stage_data(key.stage(), &value).map_err(|err| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::ValidationFailed,
            err.message.clone(),
            json!({ "stage": key.as_str(), "field": err.field, "value": err.value }),
        )
    })
}

struct SessionEntry {
    store: Arc<MemorySessionStore>,
    created_at: DateTime<Utc>,
    last_touched: DateTime<Utc>,
}

/// Sessions left untouched for this long are swept on the next allocation.
const SESSION_IDLE_TTL_SECS: i64 = 2 * 60 * 60;

/// Registry of per-session stores. A session is created when a stage is
/// submitted and torn down on reset or after going idle; nothing survives
/// the process.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store for `session_id`, creating it if absent and
    /// refreshing its idle clock. The allocation path also sweeps sessions
    /// that have gone idle, so the registry cannot grow without bound.
    pub fn get_or_create(&self, session_id: &str) -> Arc<MemorySessionStore> {
        let purged = self.purge_idle(TimeDelta::seconds(SESSION_IDLE_TTL_SECS));
        if purged > 0 {
            tracing::debug!(purged, "Swept idle sessions");
        }

        let mut sessions = self.inner.write().unwrap();
        let now = Utc::now();
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                store: Arc::new(MemorySessionStore::new()),
                created_at: now,
                last_touched: now,
            });
        entry.last_touched = now;
        Arc::clone(&entry.store)
    }

    /// Drops every session idle for at least `max_idle`. Returns the number
    /// evicted.
    pub fn purge_idle(&self, max_idle: TimeDelta) -> usize {
        let mut sessions = self.inner.write().unwrap();
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_touched < max_idle);
        before - sessions.len()
    }

    /// Looks up a session without creating it. Read-only: the idle clock is
    /// not refreshed.
    pub fn get(&self, session_id: &str) -> Option<Arc<MemorySessionStore>> {
        self.inner
            .read()
            .unwrap()
            .get(session_id)
            .map(|entry| Arc::clone(&entry.store))
    }

    /// Drops a session entirely. Returns how long it had been alive.
    pub fn remove(&self, session_id: &str) -> Option<TimeDelta> {
        self.inner
            .write()
            .unwrap()
            .remove(session_id)
            .map(|entry| Utc::now() - entry.created_at)
    }
}
