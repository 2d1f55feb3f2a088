//! Link activation classification: decides whether a click becomes an
//! intercepted navigation or falls through to the browser.

use serde::{Deserialize, Serialize};
use url::Url;

/// What the host observed about one link activation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkActivation {
    /// Resolved (absolute) `href` of the link.
    pub href: String,
    /// URL of the page currently displayed.
    pub current_url: String,
    /// `target` attribute, if any.
    pub target: Option<String>,
    pub download: bool,
    /// The link carries the configured no-intercept marker.
    pub opted_out: bool,
    /// Mouse button; 0 is the primary button.
    pub button: i16,
    /// Any of ctrl/meta/shift/alt was held.
    pub modifier: bool,
    /// Value of the configured transition attribute.
    pub transition: Option<String>,
}

/// How the navigation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Link,
    PopState,
    Programmatic,
}

/// Created on intercepted activation, consumed by exactly one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub destination: String,
    pub trigger: TriggerKind,
    pub requested_transition: Option<String>,
}

impl NavigationRequest {
    pub fn link(destination: impl Into<String>, transition: Option<String>) -> Self {
        Self {
            destination: destination.into(),
            trigger: TriggerKind::Link,
            requested_transition: transition,
        }
    }

    pub fn pop_state(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            trigger: TriggerKind::PopState,
            requested_transition: None,
        }
    }

    pub fn programmatic(destination: impl Into<String>, transition: Option<String>) -> Self {
        Self {
            destination: destination.into(),
            trigger: TriggerKind::Programmatic,
            requested_transition: transition,
        }
    }

    /// Popstate cycles restore an entry that is already in the history.
    pub fn pushes_history(&self) -> bool {
        !matches!(self.trigger, TriggerKind::PopState)
    }
}

/// Why an activation was left to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    InvalidUrl,
    UnsupportedScheme,
    CrossOrigin,
    OptedOut,
    NewContext,
    Modified,
    Download,
    FragmentOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterceptDecision {
    Intercept(NavigationRequest),
    PassThrough(PassReason),
}

/// Classify one activation. Pure; the orchestrator adds the busy check.
pub fn classify(link: &LinkActivation) -> InterceptDecision {
    use InterceptDecision::PassThrough;

    if link.opted_out {
        return PassThrough(PassReason::OptedOut);
    }
    if link.button != 0 || link.modifier {
        return PassThrough(PassReason::Modified);
    }
    if link
        .target
        .as_deref()
        .map(str::trim)
        .is_some_and(|t| !t.is_empty() && !t.eq_ignore_ascii_case("_self"))
    {
        return PassThrough(PassReason::NewContext);
    }
    if link.download {
        return PassThrough(PassReason::Download);
    }

    let (Ok(dest), Ok(current)) = (Url::parse(&link.href), Url::parse(&link.current_url)) else {
        return PassThrough(PassReason::InvalidUrl);
    };
    if !matches!(dest.scheme(), "http" | "https") {
        return PassThrough(PassReason::UnsupportedScheme);
    }
    if dest.origin() != current.origin() {
        return PassThrough(PassReason::CrossOrigin);
    }
    if dest.fragment().is_some() && dest.path() == current.path() && dest.query() == current.query()
    {
        return PassThrough(PassReason::FragmentOnly);
    }

    InterceptDecision::Intercept(NavigationRequest::link(
        dest.to_string(),
        link.transition.clone().filter(|t| !t.trim().is_empty()),
    ))
}
