//! On-disk local store
//!
//! Key-value persistence for offline and unauthenticated use. Each key
//! maps to one JSON file under the store directory, so a value
//! round-trips through serialization unchanged. This is the desktop
//! analog of the browser local storage the data originally lived in.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Well-known store keys.
pub mod keys {
    /// Full task list, offline mode
    pub const TASKS: &str = "life_manager_tasks";
    /// Application settings
    pub const SETTINGS: &str = "life_manager_settings";
    /// Per-user preferences
    pub const USER_PREFS: &str = "life_manager_user_prefs";
    /// Shopping cart; carts stay local even when signed in
    pub const CART: &str = "food_manager_cart";
    /// Persisted auth session
    pub const SESSION: &str = "supabase.auth.token";
}

/// Local key-value store backed by a directory of JSON files
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a store under the user data directory
    pub fn default_location() -> StoreResult<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| StoreError::Unavailable("no user data directory".to_string()))?;
        Ok(Self::new(base.join("life-assistant")))
    }

    /// Directory the store writes into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Save a value under a key
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.key_path(key), json)?;
        Ok(())
    }

    /// Save a value under a key with owner-only file permissions
    ///
    /// Used for credentials. On non-unix platforms this behaves like
    /// [`LocalStore::save`].
    pub fn save_private<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        self.save(key, value)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(self.key_path(key), perms);
        }

        Ok(())
    }

    /// Load the value stored under a key
    ///
    /// Returns `None` when the key has never been written. A corrupt
    /// file is treated as missing rather than failing the caller.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = match fs::read_to_string(self.key_path(key)) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("failed to read store key {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("failed to parse store key {}: {}", key, e);
                None
            }
        }
    }

    /// Remove a key
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Remove all well-known keys
    pub fn clear(&self) -> StoreResult<()> {
        for key in [
            keys::TASKS,
            keys::SETTINGS,
            keys::USER_PREFS,
            keys::CART,
            keys::SESSION,
        ] {
            self.remove(key)?;
        }
        Ok(())
    }

    /// Export all well-known keys as raw JSON values
    pub fn export_all(&self) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        for key in [keys::TASKS, keys::SETTINGS, keys::USER_PREFS, keys::CART] {
            if let Some(value) = self.load::<Value>(key) {
                out.insert(key.to_string(), value);
            }
        }
        out
    }

    /// Import raw JSON values under their keys
    pub fn import_all(&self, data: &HashMap<String, Value>) -> StoreResult<()> {
        for (key, value) in data {
            self.save(key, value)?;
        }
        Ok(())
    }

    /// Check whether the store directory is writable
    pub fn is_available(&self) -> bool {
        let probe = self.key_path("__store_test__");
        if fs::create_dir_all(&self.dir).is_err() {
            return false;
        }
        if fs::write(&probe, b"test").is_err() {
            return false;
        }
        let _ = fs::remove_file(&probe);
        true
    }

    /// Total size in bytes of all well-known keys
    pub fn size(&self) -> u64 {
        [
            keys::TASKS,
            keys::SETTINGS,
            keys::USER_PREFS,
            keys::CART,
            keys::SESSION,
        ]
        .iter()
        .filter_map(|key| fs::metadata(self.key_path(key)).ok())
        .map(|m| m.len())
        .sum()
    }
}
