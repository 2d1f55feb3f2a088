//! DOM plumbing shared by the host and the site: link activation
//! extraction, control binding and the translation pass.

use js_sys::{Function, Reflect};
use passage_core::{LinkActivation, ThemeValue, TranslationTarget, Translations};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{Document, Element, Event, EventTarget, HtmlAnchorElement, MouseEvent};

pub const THEME_TOGGLE_SELECTOR: &str = "[data-theme-toggle]";
pub const LANGUAGE_ATTRIBUTE: &str = "data-set-language";
pub const BOUND_MARKER: &str = "data-passage-bound";
pub const I18N_ATTRIBUTE: &str = "data-i18n";
pub const CURRENT_THEME_ATTRIBUTE: &str = "data-current-theme";

/// Best-effort human readable text for a thrown JS value.
pub fn js_error_string(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Describe a click for the interceptor, or `None` if it did not land on
/// an anchor or something else already handled it.
pub fn link_activation(
    event: &MouseEvent,
    current_url: String,
    no_intercept_attribute: &str,
    transition_attribute: &str,
) -> Option<LinkActivation> {
    if event.default_prevented() {
        return None;
    }
    // composedPath reaches anchors inside shadow roots too.
    let anchor = event
        .composed_path()
        .iter()
        .find_map(|node| node.dyn_into::<HtmlAnchorElement>().ok())?;
    let opted_out = anchor
        .closest(&format!("[{no_intercept_attribute}]"))
        .ok()
        .flatten()
        .is_some();
    Some(LinkActivation {
        href: anchor.href(),
        current_url,
        target: Some(anchor.target()).filter(|t| !t.is_empty()),
        download: anchor.has_attribute("download"),
        opted_out,
        button: event.button(),
        modifier: event.meta_key() || event.ctrl_key() || event.shift_key() || event.alt_key(),
        transition: anchor.get_attribute(transition_attribute),
    })
}

/// Centre of an element's box in viewport px.
pub fn element_centre(element: &Element) -> (f64, f64) {
    let rect = element.get_bounding_client_rect();
    (
        rect.left() + rect.width() / 2.0,
        rect.top() + rect.height() / 2.0,
    )
}

/// The control the listener was attached to.
pub fn current_element(event: &Event) -> Option<Element> {
    event.current_target()?.dyn_into::<Element>().ok()
}

fn elements(document: &Document, selector: &str) -> Result<Vec<Element>, JsValue> {
    let list = document.query_selector_all(selector)?;
    Ok((0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

/// Attach `handler` as a click listener to every control matching
/// `selector` that is not yet marked bound, then mark it. Returns how many
/// controls were newly bound.
pub fn bind_controls(
    document: &Document,
    selector: &str,
    handler: &Function,
) -> Result<usize, JsValue> {
    let fresh = elements(document, &format!("{selector}:not([{BOUND_MARKER}])"))?;
    for control in &fresh {
        control.add_event_listener_with_callback("click", handler)?;
        control.set_attribute(BOUND_MARKER, "")?;
    }
    Ok(fresh.len())
}

/// Detach `handlers` from every bound control and clear the marker.
pub fn unbind_controls(document: &Document, handlers: &[&Function]) -> Result<(), JsValue> {
    for control in elements(document, &format!("[{BOUND_MARKER}]"))? {
        for handler in handlers {
            control.remove_event_listener_with_callback("click", handler)?;
        }
        control.remove_attribute(BOUND_MARKER)?;
    }
    Ok(())
}

/// Apply the entry for `language` to every `[data-i18n]` element: form
/// fields get a placeholder, images alt text, anything else its text.
/// Elements whose key is missing are left alone.
pub fn translate(
    document: &Document,
    translations: &Translations,
    language: &str,
) -> Result<usize, JsValue> {
    let mut applied = 0;
    for element in elements(document, &format!("[{I18N_ATTRIBUTE}]"))? {
        let Some(key) = element.get_attribute(I18N_ATTRIBUTE) else {
            continue;
        };
        let Some(text) = translations.lookup(language, &key) else {
            continue;
        };
        match TranslationTarget::for_tag(&element.tag_name()) {
            TranslationTarget::Placeholder => element.set_attribute("placeholder", text)?,
            TranslationTarget::Alt => element.set_attribute("alt", text)?,
            TranslationTarget::Text => element.set_text_content(Some(text)),
        }
        applied += 1;
    }
    Ok(applied)
}

/// Label every theme toggle for the theme now shown.
pub fn sync_theme_controls(document: &Document, theme: ThemeValue) -> Result<(), JsValue> {
    let label = theme.toggle_label();
    for control in elements(document, THEME_TOGGLE_SELECTOR)? {
        control.set_attribute("aria-label", label)?;
        control.set_attribute("title", label)?;
        control.set_attribute(CURRENT_THEME_ATTRIBUTE, theme.as_str())?;
    }
    Ok(())
}

/// An event listener that detaches itself when dropped.
pub struct Listener {
    target: EventTarget,
    kind: &'static str,
    capture: bool,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn attach(
        target: &EventTarget,
        kind: &'static str,
        capture: bool,
        closure: Closure<dyn FnMut(Event)>,
    ) -> Result<Self, JsValue> {
        target.add_event_listener_with_callback_and_bool(
            kind,
            closure.as_ref().unchecked_ref(),
            capture,
        )?;
        Ok(Self {
            target: target.clone(),
            kind,
            capture,
            closure,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self.target.remove_event_listener_with_callback_and_bool(
            self.kind,
            self.closure.as_ref().unchecked_ref(),
            self.capture,
        );
    }
}
