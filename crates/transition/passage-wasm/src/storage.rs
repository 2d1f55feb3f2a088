use passage_core::{PassageError, PreferenceStore, Result};
use web_sys::Storage;

use crate::dom::js_error_string;

/// `localStorage`-backed preference store. When storage is unavailable
/// (disabled, sandboxed iframe) every call fails with a storage error and
/// the core carries on without persistence.
#[derive(Clone, Default)]
pub struct LocalStore {
    storage: Option<Storage>,
}

impl LocalStore {
    pub fn from_window() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            log::warn!("localStorage unavailable; preferences will not persist");
        }
        Self { storage }
    }

    fn storage(&self, key: &str) -> Result<&Storage> {
        self.storage
            .as_ref()
            .ok_or_else(|| PassageError::storage(key, "localStorage unavailable"))
    }
}

impl PreferenceStore for LocalStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.storage(key)?
            .get_item(key)
            .map_err(|e| PassageError::storage(key, js_error_string(&e)))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.storage(key)?
            .set_item(key, value)
            .map_err(|e| PassageError::storage(key, js_error_string(&e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage(key)?
            .remove_item(key)
            .map_err(|e| PassageError::storage(key, js_error_string(&e)))
    }
}
