//! Active language: initial resolution, explicit changes and notification.

use std::cell::RefCell;

use log::{debug, info};

use crate::config::Config;
use crate::error::{PassageError, Result};
use crate::events::{EventSink, SiteEvent};
use crate::prefs::{PreferenceStore, Preferences};

pub trait LanguageHost: EventSink {
    /// Set the root `lang` attribute.
    fn apply_language(&self, language: &str);

    /// Platform language tag (e.g. `fr-CA`), if known.
    fn platform_language(&self) -> Option<String>;
}

pub struct LanguageState<H, S> {
    host: H,
    prefs: Preferences<S>,
    supported: Vec<String>,
    current: RefCell<String>,
}

/// Primary subtag, lowercased: `fr-CA` -> `fr`.
fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

impl<H: LanguageHost, S: PreferenceStore> LanguageState<H, S> {
    /// Stored preference, else the platform language if supported, else the default.
    pub fn new(host: H, prefs: Preferences<S>, cfg: &Config) -> Self {
        let supported = cfg.languages.clone();
        let is_supported = |l: &str| supported.iter().any(|s| s == l);
        let initial = prefs
            .language()
            .filter(|l| is_supported(l.as_str()))
            .or_else(|| {
                host.platform_language()
                    .map(|l| primary_subtag(&l))
                    .filter(|l| is_supported(l.as_str()))
            })
            .unwrap_or_else(|| cfg.default_language.clone());
        host.apply_language(&initial);
        info!("initial language {initial}");
        Self {
            host,
            prefs,
            supported,
            current: RefCell::new(initial),
        }
    }

    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    /// Switch language explicitly: persist, apply and notify. Setting the
    /// current language again is a no-op.
    pub fn set_language(&self, language: &str) -> Result<String> {
        let language = primary_subtag(language);
        if !self.supported.iter().any(|s| s == &language) {
            return Err(PassageError::UnsupportedLanguage { language });
        }
        if *self.current.borrow() == language {
            debug!("language {language} already active");
            return Ok(language);
        }
        self.host.apply_language(&language);
        *self.current.borrow_mut() = language.clone();
        self.prefs.set_language(&language);
        self.host.emit(&SiteEvent::LanguageChanged {
            language: language.clone(),
        });
        Ok(language)
    }

    /// Re-apply the active language to the root after a swap carried the
    /// destination's own `lang` in.
    pub fn rearm(&self) {
        self.host.apply_language(&self.current.borrow());
    }
}
