//! Theme transition state machine.
//!
//! `Idle -> Animating -> Idle` around an animated reveal. A toggle requested
//! while `Animating` is a no-op that returns the pre-toggle theme; toggles
//! are rejected, never queued.

use std::cell::Cell;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{Config, RevealConfig};
use crate::easing::CubicBezier;
use crate::error::Result;
use crate::events::{EventSink, SiteEvent};
use crate::navigation::ThemeSource;
use crate::prefs::{PreferenceStore, Preferences};
use crate::theme::ThemeValue;

/// How the reveal is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealStrategy {
    /// The platform's cooperative view transition primitive.
    Native,
    /// An expanding circular mask positioned at the triggering control.
    Overlay,
    /// No animation; the attribute flips immediately.
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeState {
    Idle,
    Animating,
}

/// Everything a host needs to draw one reveal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealPlan {
    pub strategy: RevealStrategy,
    pub target: ThemeValue,
    /// Centre of the reveal in viewport px.
    pub origin: (f64, f64),
    /// Radius that covers the whole viewport from `origin`.
    pub radius: f64,
    pub duration_ms: u32,
    /// Milliseconds into the reveal at which the host applies `target`.
    pub switch_at_ms: u32,
    pub easing: CubicBezier,
}

impl RevealPlan {
    pub fn new(
        strategy: RevealStrategy,
        target: ThemeValue,
        origin: Option<(f64, f64)>,
        viewport: (f64, f64),
        cfg: &RevealConfig,
    ) -> Self {
        let (w, h) = (viewport.0.max(0.0), viewport.1.max(0.0));
        let (x, y) = origin.unwrap_or((w / 2.0, h / 2.0));
        let radius = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
            .iter()
            .map(|(cx, cy)| ((cx - x).powi(2) + (cy - y).powi(2)).sqrt())
            .fold(0.0f64, f64::max);
        Self {
            strategy,
            target,
            origin: (x, y),
            radius,
            duration_ms: cfg.duration_ms,
            switch_at_ms: (cfg.duration_ms as f32 * cfg.switch_at).round() as u32,
            easing: cfg.easing,
        }
    }
}

/// Root-element and reveal effects the state machine drives.
#[allow(async_fn_in_trait)]
pub trait ThemeHost: EventSink {
    /// Set the root attribute/class for `theme`. Idempotent.
    fn apply_theme(&self, theme: ThemeValue);

    fn system_prefers_dark(&self) -> bool;

    fn prefers_reduced_motion(&self) -> bool;

    /// Best reveal the platform supports.
    fn reveal_strategy(&self) -> RevealStrategy;

    /// Viewport size in px.
    fn viewport(&self) -> (f64, f64);

    /// Draw the reveal, applying `plan.target` at `plan.switch_at_ms`, and
    /// resolve when it has finished.
    async fn reveal(&self, plan: &RevealPlan) -> Result<()>;
}

/// Clears `Animating` and the in-flight target however the toggle future ends.
struct AnimatingGuard<'a> {
    state: &'a Cell<ThemeState>,
    pending: &'a Cell<Option<ThemeValue>>,
}

impl Drop for AnimatingGuard<'_> {
    fn drop(&mut self) {
        self.pending.set(None);
        self.state.set(ThemeState::Idle);
    }
}

/// A key press as seen by the shortcut matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyChord<'a> {
    pub key: &'a str,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyChord<'_> {
    /// `Ctrl+Shift+D`, or `Cmd+Shift+D` on platforms with a meta key.
    pub fn is_theme_shortcut(&self) -> bool {
        (self.ctrl || self.meta) && self.shift && self.key.eq_ignore_ascii_case("d")
    }
}

pub struct ThemeMachine<H, S> {
    host: H,
    prefs: Preferences<S>,
    reveal: RevealConfig,
    state: Cell<ThemeState>,
    current: Cell<ThemeValue>,
    /// Target of the reveal in flight; already on the root past the switch point.
    pending: Cell<Option<ThemeValue>>,
    /// Set once the user has chosen a theme; system changes are then ignored.
    explicit: Cell<bool>,
}

impl<H: ThemeHost, S: PreferenceStore> ThemeMachine<H, S> {
    /// Resolve the initial theme (stored preference, else system) and apply it.
    pub fn new(host: H, prefs: Preferences<S>, cfg: &Config) -> Self {
        let stored = prefs.theme();
        let current = stored.unwrap_or_else(|| ThemeValue::from_system(host.system_prefers_dark()));
        host.apply_theme(current);
        info!(
            "initial theme {current} ({})",
            if stored.is_some() { "stored" } else { "system" }
        );
        Self {
            host,
            prefs,
            reveal: cfg.theme_reveal.clone(),
            state: Cell::new(ThemeState::Idle),
            current: Cell::new(current),
            pending: Cell::new(None),
            explicit: Cell::new(stored.is_some()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn current(&self) -> ThemeValue {
        self.current.get()
    }

    /// The theme the page is committed to: the reveal target while a toggle
    /// is in flight, else [`current`](Self::current).
    #[inline]
    pub fn in_effect(&self) -> ThemeValue {
        self.pending.get().unwrap_or_else(|| self.current.get())
    }

    #[inline]
    pub fn state(&self) -> ThemeState {
        self.state.get()
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        self.state.get() == ThemeState::Animating
    }

    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.explicit.get()
    }

    /// Switch to the complementary theme with an animated reveal centred on
    /// `origin` (viewport px). Returns the theme in effect afterwards, or the
    /// unchanged current theme if a switch was already in flight.
    pub async fn toggle(&self, origin: Option<(f64, f64)>) -> ThemeValue {
        if self.is_animating() {
            debug!("theme toggle ignored: reveal in flight");
            return self.current();
        }
        let target = self.current().toggled();
        self.state.set(ThemeState::Animating);
        self.pending.set(Some(target));
        let _guard = AnimatingGuard {
            state: &self.state,
            pending: &self.pending,
        };

        let strategy = if self.host.prefers_reduced_motion() {
            RevealStrategy::Instant
        } else {
            self.host.reveal_strategy()
        };
        debug!("theme {} -> {target} via {strategy:?}", self.current());

        if strategy != RevealStrategy::Instant {
            let plan = RevealPlan::new(strategy, target, origin, self.host.viewport(), &self.reveal);
            if let Err(e) = self.host.reveal(&plan).await {
                warn!("theme reveal failed, switching without animation: {e}");
            }
        }
        // The reveal applied the target partway through; re-apply so the end
        // state never depends on the animation having run.
        self.host.apply_theme(target);

        self.current.set(target);
        self.explicit.set(true);
        self.prefs.set_theme(target);
        self.host.emit(&SiteEvent::ThemeChanged { theme: target });
        target
    }

    /// React to a platform light/dark change. Honoured only while no explicit
    /// preference exists and no reveal is in flight; returns the new theme if
    /// it changed.
    pub fn on_system_change(&self, prefers_dark: bool) -> Option<ThemeValue> {
        if self.is_explicit() {
            debug!("system theme change ignored: explicit preference");
            return None;
        }
        if self.is_animating() {
            debug!("system theme change ignored: reveal in flight");
            return None;
        }
        let theme = ThemeValue::from_system(prefers_dark);
        if theme == self.current() {
            return None;
        }
        self.host.apply_theme(theme);
        self.current.set(theme);
        self.host.emit(&SiteEvent::ThemeChanged { theme });
        Some(theme)
    }

    /// Forget the stored preference and follow the platform again. Rejected
    /// while a reveal is in flight; returns the theme now in effect.
    pub fn reset_to_system(&self) -> Option<ThemeValue> {
        if self.is_animating() {
            debug!("theme reset ignored: reveal in flight");
            return None;
        }
        self.prefs.clear_theme();
        self.explicit.set(false);
        let theme = ThemeValue::from_system(self.host.system_prefers_dark());
        self.host.apply_theme(theme);
        if theme != self.current() {
            self.current.set(theme);
            self.host.emit(&SiteEvent::ThemeChanged { theme });
        }
        info!("theme reset to system ({theme})");
        Some(theme)
    }

    /// Re-apply the theme in effect to the root element.
    pub fn rearm(&self) {
        self.host.apply_theme(self.in_effect());
    }
}

impl<H: ThemeHost, S: PreferenceStore> ThemeSource for ThemeMachine<H, S> {
    fn current_theme(&self) -> ThemeValue {
        self.in_effect()
    }
}
