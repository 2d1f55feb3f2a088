//! Preference store: two scalar preferences (theme, language) in durable
//! per-origin storage.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use log::warn;

use crate::config::Config;
use crate::error::Result;
use crate::theme::ThemeValue;

/// Raw key-value persistence. Absence of a key is `Ok(None)`.
pub trait PreferenceStore {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Rc<T> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.borrow_mut().remove(key);
        Ok(())
    }
}

/// Typed view over a [`PreferenceStore`].
///
/// Storage failures are logged and swallowed: reads degrade to "no
/// preference", writes leave the in-memory state authoritative.
#[derive(Debug, Clone)]
pub struct Preferences<S> {
    store: S,
    theme_key: String,
    language_key: String,
}

impl<S: PreferenceStore> Preferences<S> {
    pub fn new(store: S, cfg: &Config) -> Self {
        Self {
            store,
            theme_key: cfg.theme_key.clone(),
            language_key: cfg.language_key.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read_logged(&self, key: &str) -> Option<String> {
        match self.store.read(key) {
            Ok(v) => v,
            Err(e) => {
                warn!("preference read failed ({}): {e}", e.category());
                None
            }
        }
    }

    fn write_logged(&self, key: &str, value: &str) -> bool {
        match self.store.write(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("preference write failed ({}): {e}", e.category());
                false
            }
        }
    }

    /// The explicitly stored theme. Unreadable or unparseable values count as absent.
    pub fn theme(&self) -> Option<ThemeValue> {
        self.read_logged(&self.theme_key)
            .as_deref()
            .and_then(ThemeValue::parse)
    }

    /// Persist the theme. Returns whether the write reached storage.
    pub fn set_theme(&self, theme: ThemeValue) -> bool {
        self.write_logged(&self.theme_key, theme.as_str())
    }

    pub fn language(&self) -> Option<String> {
        self.read_logged(&self.language_key)
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
    }

    pub fn set_language(&self, language: &str) -> bool {
        self.write_logged(&self.language_key, language)
    }

    /// Forget the stored theme only.
    pub fn clear_theme(&self) {
        if let Err(e) = self.store.remove(&self.theme_key) {
            warn!("preference remove failed: {e}");
        }
    }

    /// Forget both preferences, returning to system/default detection.
    pub fn clear(&self) {
        for key in [&self.theme_key, &self.language_key] {
            if let Err(e) = self.store.remove(key) {
                warn!("preference remove failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PassageError;

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn read(&self, key: &str) -> Result<Option<String>> {
            Err(PassageError::storage(key, "storage disabled"))
        }
        fn write(&self, key: &str, _value: &str) -> Result<()> {
            Err(PassageError::storage(key, "storage disabled"))
        }
        fn remove(&self, key: &str) -> Result<()> {
            Err(PassageError::storage(key, "storage disabled"))
        }
    }

    #[test]
    fn theme_round_trip() {
        let store = MemoryStore::new();
        let prefs = Preferences::new(store.clone(), &Config::default());
        assert_eq!(prefs.theme(), None);
        assert!(prefs.set_theme(ThemeValue::Dark));

        let reloaded = Preferences::new(store, &Config::default());
        assert_eq!(reloaded.theme(), Some(ThemeValue::Dark));
    }

    #[test]
    fn custom_keys_are_respected() {
        let store = MemoryStore::new();
        let cfg = Config {
            theme_key: "site-theme".into(),
            ..Config::default()
        };
        Preferences::new(store.clone(), &cfg).set_theme(ThemeValue::Light);
        assert_eq!(store.read("site-theme").unwrap().as_deref(), Some("light"));
        assert_eq!(store.read("theme").unwrap(), None);
    }

    #[test]
    fn garbage_values_read_as_absent() {
        let store = MemoryStore::new();
        store.write("theme", "purple").unwrap();
        store.write("language", "   ").unwrap();
        let prefs = Preferences::new(store, &Config::default());
        assert_eq!(prefs.theme(), None);
        assert_eq!(prefs.language(), None);
    }

    #[test]
    fn storage_failures_degrade_quietly() {
        let prefs = Preferences::new(BrokenStore, &Config::default());
        assert_eq!(prefs.theme(), None);
        assert!(!prefs.set_theme(ThemeValue::Dark));
        assert!(!prefs.set_language("fr"));
        prefs.clear();
    }

    #[test]
    fn clear_forgets_both_keys() {
        let store = MemoryStore::new();
        let prefs = Preferences::new(store, &Config::default());
        prefs.set_theme(ThemeValue::Dark);
        prefs.set_language("fr");
        prefs.clear();
        assert_eq!(prefs.theme(), None);
        assert_eq!(prefs.language(), None);
    }

    #[test]
    fn clear_theme_keeps_language() {
        let prefs = Preferences::new(MemoryStore::new(), &Config::default());
        prefs.set_theme(ThemeValue::Dark);
        prefs.set_language("fr");
        prefs.clear_theme();
        assert_eq!(prefs.theme(), None);
        assert_eq!(prefs.language().as_deref(), Some("fr"));
    }
}
