//! Site configuration for passage.

use serde::{Deserialize, Serialize};

use crate::document::Selector;
use crate::easing::CubicBezier;
use crate::error::{PassageError, Result};
use crate::selection::TransitionPolicy;

/// Top-level configuration. Every field has a default so hosts may pass a
/// partial object (or nothing at all).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Selector of the swapped content container (`#id`, `.class`, `[attr]` or a tag name).
    pub container_selector: String,
    /// Links carrying this attribute are never intercepted.
    pub no_intercept_attribute: String,
    /// Attribute naming a preferred transition on a link.
    pub transition_attribute: String,
    /// Preference store key for the theme.
    pub theme_key: String,
    /// Preference store key for the language.
    pub language_key: String,
    pub transition_policy: TransitionPolicy,
    /// Delay between the enter phase and re-initialization.
    pub settle_delay_ms: u32,
    pub theme_reveal: RevealConfig,
    /// Supported language tags, in display order.
    pub languages: Vec<String>,
    pub default_language: String,
    /// Maximum log level forwarded by the host logger (`error` .. `trace`).
    pub log_level: String,
}

/// Parameters of the animated theme reveal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub duration_ms: u32,
    /// Fraction of the reveal after which the new theme is applied.
    pub switch_at: f32,
    pub easing: CubicBezier,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            duration_ms: 600,
            switch_at: 0.5,
            easing: CubicBezier::new(0.65, 0.0, 0.35, 1.0),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container_selector: "#swup".to_string(),
            no_intercept_attribute: "data-no-swup".to_string(),
            transition_attribute: "data-transition".to_string(),
            theme_key: "theme".to_string(),
            language_key: "language".to_string(),
            transition_policy: TransitionPolicy::default(),
            settle_delay_ms: 0,
            theme_reveal: RevealConfig::default(),
            languages: vec!["en".to_string(), "fr".to_string()],
            default_language: "en".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse a JSON configuration, applying defaults for absent fields.
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Config = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        Selector::parse(&self.container_selector)?;
        if self.no_intercept_attribute.trim().is_empty() {
            return Err(PassageError::config("no_intercept_attribute is empty"));
        }
        if !(self.theme_reveal.switch_at > 0.0 && self.theme_reveal.switch_at < 1.0) {
            return Err(PassageError::config(format!(
                "theme_reveal.switch_at must lie in (0, 1), got {}",
                self.theme_reveal.switch_at
            )));
        }
        let easing = self.theme_reveal.easing;
        if ![easing.x1, easing.x2].iter().all(|x| (0.0..=1.0).contains(x)) {
            return Err(PassageError::config(format!(
                "theme_reveal.easing x control points must lie in [0, 1], got {}",
                easing.css()
            )));
        }
        if self.languages.is_empty() {
            return Err(PassageError::config("languages is empty"));
        }
        if !self.languages.iter().any(|l| l == &self.default_language) {
            return Err(PassageError::config(format!(
                "default_language {} is not among languages",
                self.default_language
            )));
        }
        Ok(())
    }

    /// Parsed container selector. Falls back to the default selector when the
    /// configured one does not parse; call `validate` to surface that case.
    pub fn selector(&self) -> Selector {
        Selector::parse(&self.container_selector)
            .unwrap_or_else(|_| Selector::Id("swup".to_string()))
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
