//! Error types for passage

use serde::{Deserialize, Serialize};

/// Every failure the orchestrator, theme machine and preference layer can report.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PassageError {
    /// The destination could not be fetched at all
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// The destination answered with a non-success status
    #[error("Destination {url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// The fetched document has no content container
    #[error("Destination {url} has no content container matching {selector}")]
    MissingContainer { url: String, selector: String },

    /// A transition phase or theme reveal failed
    #[error("Animation failed during {phase}: {reason}")]
    Animation { phase: String, reason: String },

    /// Preference persistence failed
    #[error("Storage error on key {key}: {reason}")]
    Storage { key: String, reason: String },

    /// A page re-initialization callback failed
    #[error("Re-initialization callback {name} failed: {reason}")]
    Reinit { name: String, reason: String },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("Unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

pub type Result<T> = std::result::Result<T, PassageError>;

impl PassageError {
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn animation(phase: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Animation {
            phase: phase.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Whether the failure is recovered locally (fallback, snap-to-end, isolation)
    /// rather than surfaced to the caller.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidSelector { .. } | Self::UnsupportedLanguage { .. } | Self::Config { .. }
        )
    }

    /// Error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network { .. }
            | Self::Status { .. }
            | Self::MissingContainer { .. }
            | Self::InvalidUrl { .. } => "network",
            Self::Animation { .. } => "animation",
            Self::Storage { .. } => "storage",
            Self::Reinit { .. } => "reinit",
            Self::InvalidSelector { .. } | Self::UnsupportedLanguage { .. } | Self::Config { .. } => {
                "config"
            }
        }
    }
}

impl From<serde_json::Error> for PassageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_container_is_network_class() {
        let err = PassageError::MissingContainer {
            url: "https://site.test/a".into(),
            selector: "#swup".into(),
        };
        assert_eq!(err.category(), "network");
        assert!(err.is_recoverable());
    }

    #[test]
    fn config_errors_are_not_recoverable() {
        let err = PassageError::InvalidSelector {
            selector: "".into(),
        };
        assert_eq!(err.category(), "config");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn errors_cross_serde() {
        let err = PassageError::storage("theme", "quota exceeded");
        let text = serde_json::to_string(&err).unwrap();
        let back: PassageError = serde_json::from_str(&text).unwrap();
        assert_eq!(err, back);
        assert_eq!(back.to_string(), "Storage error on key theme: quota exceeded");
    }
}
