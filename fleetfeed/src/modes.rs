//! Persisted connection-mode store.
//! Stored under XDG config dir: $XDG_CONFIG_HOME/fleetfeed/settings.json
//! (fallback ~/.config/fleetfeed/settings.json)

use std::sync::{Mutex, PoisonError};
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::status::ActiveMode;

/// Session-to-session persistence for the preferred mode. Failures are
/// non-fatal by contract: `get` returning `None` means the default mode
/// applies, and a failed `set` is logged and forgotten.
pub trait ModeStore: Send + Sync {
    fn get(&self) -> Option<ActiveMode>;
    fn set(&self, mode: ActiveMode);
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("fleetfeed")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fleetfeed")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// File-backed store under the user config dir.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileModeStore;

impl ModeStore for FileModeStore {
    fn get(&self) -> Option<ActiveMode> {
        let raw = fs::read_to_string(settings_path()).ok()?;
        let parsed: SettingsFile = serde_json::from_str(&raw).unwrap_or_default();
        parsed.mode?.parse().ok()
    }

    fn set(&self, mode: ActiveMode) {
        let path = settings_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(%e, "could not create config dir; mode not persisted");
                return;
            }
        }
        let file = SettingsFile {
            mode: Some(mode.as_str().to_owned()),
            version: 1,
        };
        match serde_json::to_vec_pretty(&file) {
            Ok(data) => {
                if let Err(e) = fs::write(&path, data) {
                    warn!(%e, "could not write settings; mode not persisted");
                }
            }
            Err(e) => warn!(%e, "could not serialize settings"),
        }
    }
}

/// In-memory store for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryModeStore(Mutex<Option<ActiveMode>>);

impl MemoryModeStore {
    pub fn new(initial: Option<ActiveMode>) -> Self {
        Self(Mutex::new(initial))
    }
}

impl ModeStore for MemoryModeStore {
    fn get(&self) -> Option<ActiveMode> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, mode: ActiveMode) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_shrugs_off_corruption() {
        // Isolate config in a temp dir; this is the only test that touches
        // process-wide environment, so no cross-test locking is needed.
        let td = tempfile::tempdir().expect("tempdir");
        std::env::set_var("XDG_CONFIG_HOME", td.path());

        let store = FileModeStore;
        assert_eq!(store.get(), None, "missing file should read as None");

        store.set(ActiveMode::Pull);
        assert_eq!(store.get(), Some(ActiveMode::Pull));
        store.set(ActiveMode::Push);
        assert_eq!(store.get(), Some(ActiveMode::Push));

        fs::write(settings_path(), b"{ not json").expect("write corrupt file");
        assert_eq!(store.get(), None, "corrupt file should read as None");

        fs::write(settings_path(), br#"{"mode":"carrier-pigeon"}"#).expect("write bogus mode");
        assert_eq!(store.get(), None, "unknown mode should read as None");
    }

    #[test]
    fn memory_store_holds_latest_value() {
        let store = MemoryModeStore::new(Some(ActiveMode::Push));
        assert_eq!(store.get(), Some(ActiveMode::Push));
        store.set(ActiveMode::Pull);
        assert_eq!(store.get(), Some(ActiveMode::Pull));
    }
}
