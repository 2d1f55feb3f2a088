//! Notifications surfaced to the rest of the page.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::theme::ThemeValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SiteEvent {
    ThemeChanged { theme: ThemeValue },
    LanguageChanged { language: String },
}

impl SiteEvent {
    /// DOM event name the host dispatches this as.
    pub fn dom_name(&self) -> &'static str {
        match self {
            Self::ThemeChanged { .. } => "themechange",
            Self::LanguageChanged { .. } => "languagechange",
        }
    }
}

/// Receiver of [`SiteEvent`]s. Consumers learn about state changes only
/// through this; they never poll.
pub trait EventSink {
    fn emit(&self, event: &SiteEvent);
}

impl<T: EventSink + ?Sized> EventSink for Rc<T> {
    fn emit(&self, event: &SiteEvent) {
        (**self).emit(event)
    }
}
