// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use replay_app_core::config::{ConfigError, ConfigStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory implementation of [`ConfigStore`] for testing.
///
/// Tracks load/save attempts and can be told to fail either operation.
///
/// # Example
///
/// ```
/// use replay_dry_tests::InMemoryConfigStore;
/// use replay_app_core::{ConfigService, ViewerConfig};
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
///
/// let config: ViewerConfig = service.load_or_init("viewer");
/// assert_eq!(config.frame_interval_ms, 16);
/// assert!(store.contains_key("viewer"));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create a new empty in-memory config store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `value` under `key`.
    pub fn with_entry(key: &str, value: &[u8]) -> Self {
        let store = Self::new();
        store.inner().data.insert(key.to_string(), value.to_vec());
        store
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configure the store to fail on load operations.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.inner().fail_on_load = fail;
    }

    /// Configure the store to fail on save operations.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.inner().fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.inner().load_count
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.inner().save_count
    }

    /// Check if a key exists in the store.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner().data.contains_key(key)
    }

    /// Raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner().data.get(key).cloned()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.inner();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }
        inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.inner();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }
        inner.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_app_core::{ConfigService, ViewerConfig};

    #[test]
    fn load_or_init_persists_defaults_once() {
        let store = InMemoryConfigStore::new();
        let service = ConfigService::new(store.clone());
        let first: ViewerConfig = service.load_or_init("viewer");
        let second: ViewerConfig = service.load_or_init("viewer");
        assert_eq!(first, second);
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_count(), 2);
    }

    #[test]
    fn stored_values_override_defaults() {
        let store = InMemoryConfigStore::with_entry("viewer", br#"{"paint_prefetch":2}"#);
        let service = ConfigService::new(store);
        let config: ViewerConfig = service.load_or_init("viewer");
        assert_eq!(config.paint_prefetch, 2);
        assert_eq!(config.frame_interval_ms, 16);
    }

    #[test]
    fn failing_store_falls_back_to_defaults() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_load(true);
        store.set_fail_on_save(true);
        let service = ConfigService::new(store.clone());
        let config: ViewerConfig = service.load_or_init("viewer");
        assert_eq!(config.click_threshold_ms, 200.0);
        assert!(!store.contains_key("viewer"));
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.load_raw("missing"), Err(ConfigError::NotFound)));
    }
}
