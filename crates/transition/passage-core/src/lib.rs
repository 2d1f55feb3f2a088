//! passage-core
//!
//! Host-agnostic core of a static site's view-transition layer:
//!
//! - [`NavigationOrchestrator`]: intercepts same-origin navigation, fetches
//!   the destination and swaps its content container between a leave and an
//!   enter transition phase, then re-runs page initializers.
//! - [`ThemeMachine`]: race-free animated light/dark switching with a
//!   re-entrancy guard and system-preference tracking.
//! - [`Preferences`], [`LanguageState`], [`Translations`] and the
//!   [`ReinitRegistry`] around them.
//!
//! Browser effects reach the core only through the [`NavigationHost`],
//! [`ThemeHost`], [`LanguageHost`], [`EventSink`] and [`PreferenceStore`]
//! traits; `passage-wasm` implements them on top of `web-sys`.

pub mod catalog;
pub mod config;
pub mod document;
pub mod easing;
pub mod error;
pub mod events;
pub mod i18n;
pub mod intercept;
pub mod language;
pub mod navigation;
pub mod prefs;
pub mod registry;
pub mod selection;
pub mod theme;
pub mod theme_machine;

pub use catalog::{PhaseKind, PhasePlan, TransitionDescriptor, TransitionName, VisualState};
pub use config::{Config, RevealConfig};
pub use document::{parse_destination, DestinationDocument, Selector};
pub use easing::CubicBezier;
pub use error::{PassageError, Result};
pub use events::{EventSink, SiteEvent};
pub use i18n::{interpolate, TranslationTarget, Translations};
pub use intercept::{classify, LinkActivation, NavigationRequest, PassReason, TriggerKind};
pub use language::{LanguageHost, LanguageState};
pub use navigation::{
    ActivationDecision, CycleState, FetchResponse, NavigationCycle, NavigationHost,
    NavigationOrchestrator, NavigationOutcome, SwapPlan, ThemeSource,
};
pub use prefs::{MemoryStore, PreferenceStore, Preferences};
pub use registry::{ReinitFn, ReinitRegistry, ReinitReport};
pub use selection::{TransitionPicker, TransitionPolicy};
pub use theme::ThemeValue;
pub use theme_machine::{
    KeyChord, RevealPlan, RevealStrategy, ThemeHost, ThemeMachine, ThemeState,
};
