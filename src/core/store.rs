//! JSON-file persistence for user settings and session history
//!
//! Both stores keep an in-memory copy behind a lock and rewrite the whole file
//! on every change. A missing file starts empty; an unreadable one is replaced
//! by defaults on the next write.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::types::{CalibrationRecord, PhaseAdjustments, SessionSummary};
use crate::MAX_STORED_SESSIONS;

pub const SETTINGS_FILE: &str = "settings.json";
pub const SESSIONS_FILE: &str = "sessions.json";

/// Everything that survives a restart apart from the session log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub calibration: Option<CalibrationRecord>,
    pub adjustments: PhaseAdjustments,
    pub best_streak_ms: u64,
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!("{} is corrupt ({}), starting from defaults", path.display(), e);
        T::default()
    }))
}

fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized).with_context(|| format!("Failed to write {}", path.display()))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = load_or_default(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Store inside a data directory, using the default file name
    pub fn in_dir(dir: &Path) -> Result<Self> {
        Self::new(dir.join(SETTINGS_FILE))
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn calibration(&self) -> Option<CalibrationRecord> {
        self.read().calibration.clone()
    }

    pub fn save_calibration(&self, record: CalibrationRecord) -> Result<()> {
        self.update(|s| s.calibration = Some(record))
    }

    pub fn save_adjustments(&self, adjustments: PhaseAdjustments) -> Result<()> {
        self.update(|s| s.adjustments = adjustments)
    }

    /// Record a best streak; only ever raises the stored value
    pub fn save_best_streak(&self, best_ms: u64) -> Result<()> {
        if best_ms <= self.read().best_streak_ms {
            return Ok(());
        }
        self.update(|s| s.best_streak_ms = best_ms)
    }

    fn update(&self, f: impl FnOnce(&mut UserSettings)) -> Result<()> {
        let mut guard = self.write();
        f(&mut guard);
        write_json(&self.path, &*guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Saved session summaries, newest first
pub struct SessionStore {
    path: PathBuf,
    sessions: RwLock<Vec<SessionSummary>>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut sessions: Vec<SessionSummary> = load_or_default(&path)?;
        sessions.truncate(MAX_STORED_SESSIONS);
        Ok(Self {
            path,
            sessions: RwLock::new(sessions),
        })
    }

    pub fn in_dir(dir: &Path) -> Result<Self> {
        Self::new(dir.join(SESSIONS_FILE))
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn latest(&self) -> Option<SessionSummary> {
        self.list().into_iter().next()
    }

    /// Prepend a summary, dropping the oldest beyond the cap
    pub fn save(&self, summary: SessionSummary) -> Result<()> {
        let mut guard = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(0, summary);
        guard.truncate(MAX_STORED_SESSIONS);
        info!("session saved ({} stored)", guard.len());
        write_json(&self.path, &*guard)
    }

    /// Attach a reflection to the newest session.
    ///
    /// Blank text is ignored. Returns whether anything was stored.
    pub fn add_reflection(&self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        let mut guard = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(newest) = guard.first_mut() else {
            return Ok(false);
        };
        newest.reflection = Some(text.to_string());
        write_json(&self.path, &*guard)?;
        Ok(true)
    }
}
