//! `web-sys` implementation of the core's host traits.

use futures_util::future::join;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Function, Object, Promise, Reflect};
use log::{debug, warn};
use passage_core::{
    EventSink, FetchResponse, LanguageHost, NavigationHost, PassageError, PhasePlan, Result,
    RevealPlan, RevealStrategy, Selector, SiteEvent, SwapPlan, ThemeHost, ThemeValue,
    VisualState,
};
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CustomEvent, CustomEventInit, Document, Element, HtmlElement, Response, Window};

use crate::dom::{self, js_error_string};

const THEME_ATTRIBUTE: &str = "data-theme";
const DARK_CLASS: &str = "dark";
const REVEAL_PSEUDO: &str = "::view-transition-new(root)";

fn set(target: &Object, key: &str, value: impl Into<JsValue>) -> std::result::Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), &value.into()).map(|_| ())
}

fn keyframe(state: &VisualState) -> std::result::Result<Object, JsValue> {
    let frame = Object::new();
    set(&frame, "opacity", state.opacity as f64)?;
    set(&frame, "transform", state.css_transform())?;
    set(&frame, "filter", state.css_filter())?;
    Ok(frame)
}

fn clip_frame(plan: &RevealPlan, radius: f64) -> std::result::Result<Object, JsValue> {
    let frame = Object::new();
    let (x, y) = plan.origin;
    set(&frame, "clipPath", format!("circle({radius}px at {x}px {y}px)"))?;
    Ok(frame)
}

/// Call `target.animate(keyframes, options)` and wait for `finished`.
async fn run_animation(
    target: &JsValue,
    keyframes: &Array,
    options: &Object,
) -> std::result::Result<(), JsValue> {
    let animate: Function = Reflect::get(target, &JsValue::from_str("animate"))?.dyn_into()?;
    let animation = animate.call2(target, keyframes, options)?;
    let finished: Promise = Reflect::get(&animation, &JsValue::from_str("finished"))?.dyn_into()?;
    JsFuture::from(finished).await?;
    Ok(())
}

/// Cancel any running or filled animations so inline style wins.
fn cancel_animations(element: &Element) {
    let Ok(get) = Reflect::get(element, &JsValue::from_str("getAnimations")) else {
        return;
    };
    let Ok(get) = get.dyn_into::<Function>() else {
        return;
    };
    let Ok(list) = get.call0(element) else {
        return;
    };
    for animation in Array::from(&list).iter() {
        if let Ok(cancel) = Reflect::get(&animation, &JsValue::from_str("cancel")) {
            if let Ok(cancel) = cancel.dyn_into::<Function>() {
                let _ = cancel.call0(&animation);
            }
        }
    }
}

/// Handle on the live page. Clones share the same window and document.
#[derive(Clone)]
pub struct BrowserHost {
    window: Window,
    document: Document,
    container: String,
}

impl BrowserHost {
    pub fn new(container: &Selector) -> Result<Self> {
        let window =
            web_sys::window().ok_or_else(|| PassageError::config("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| PassageError::config("window has no document"))?;
        Ok(Self {
            window,
            document,
            container: container.to_string(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn current_url(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn container_element(&self) -> Result<HtmlElement> {
        self.document
            .query_selector(&self.container)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| PassageError::MissingContainer {
                url: self.current_url(),
                selector: self.container.clone(),
            })
    }

    fn matches_media(&self, query: &str) -> bool {
        self.window
            .match_media(query)
            .ok()
            .flatten()
            .map(|list| list.matches())
            .unwrap_or(false)
    }

    fn reduced_motion(&self) -> bool {
        self.matches_media("(prefers-reduced-motion: reduce)")
    }

    fn pin_style(&self, element: &HtmlElement, state: &VisualState) -> std::result::Result<(), JsValue> {
        let style = element.style();
        if state.is_rest() {
            for property in ["opacity", "transform", "filter"] {
                style.remove_property(property)?;
            }
            return Ok(());
        }
        style.set_property("opacity", &state.opacity.to_string())?;
        style.set_property("transform", &state.css_transform())?;
        style.set_property("filter", &state.css_filter())
    }

    /// Platform view transition: the update callback flips the theme and the
    /// new snapshot is clipped in from `plan.origin`.
    async fn reveal_native(&self, plan: &RevealPlan) -> std::result::Result<(), JsValue> {
        let start: Function =
            Reflect::get(&self.document, &JsValue::from_str("startViewTransition"))?.dyn_into()?;
        let host = self.clone();
        let target = plan.target;
        let update = Closure::once_into_js(move || host.apply_theme(target));
        let transition = start.call1(&self.document, &update)?;

        let ready: Promise = Reflect::get(&transition, &JsValue::from_str("ready"))?.dyn_into()?;
        JsFuture::from(ready).await?;

        let keyframes = Array::of2(&clip_frame(plan, 0.0)?.into(), &clip_frame(plan, plan.radius)?.into());
        let options = Object::new();
        set(&options, "duration", plan.duration_ms as f64)?;
        set(&options, "easing", plan.easing.css())?;
        set(&options, "pseudoElement", REVEAL_PSEUDO)?;
        if let Some(root) = self.document.document_element() {
            run_animation(&root, &keyframes, &options).await?;
        }

        let finished: Promise =
            Reflect::get(&transition, &JsValue::from_str("finished"))?.dyn_into()?;
        JsFuture::from(finished).await?;
        Ok(())
    }

    /// Overlay reveal: a fixed layer painted in the target theme grows from
    /// `plan.origin`, the theme flips at the switch point, and the layer
    /// fades out over the now-switched page.
    async fn reveal_overlay(&self, plan: &RevealPlan) -> std::result::Result<(), JsValue> {
        let body = self
            .document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        let overlay: HtmlElement = self.document.create_element("div")?.dyn_into()?;
        overlay.set_attribute("data-passage-reveal", plan.target.as_str())?;
        overlay.set_attribute("aria-hidden", "true")?;
        let fallback = match plan.target {
            ThemeValue::Dark => "#111111",
            ThemeValue::Light => "#ffffff",
        };
        let style = overlay.style();
        style.set_property("position", "fixed")?;
        style.set_property("inset", "0")?;
        style.set_property("z-index", "2147483647")?;
        style.set_property("pointer-events", "none")?;
        style.set_property(
            "background",
            &format!("var(--passage-reveal-{}, {fallback})", plan.target),
        )?;
        body.append_child(&overlay)?;

        let switch = plan.switch_at_ms as f64 / plan.duration_ms.max(1) as f64;
        let grow = clip_frame(plan, 0.0)?;
        set(&grow, "offset", 0.0)?;
        let covered = clip_frame(plan, plan.radius)?;
        set(&covered, "offset", switch)?;
        set(&covered, "opacity", 1.0)?;
        let gone = clip_frame(plan, plan.radius)?;
        set(&gone, "offset", 1.0)?;
        set(&gone, "opacity", 0.0)?;
        let keyframes = Array::of3(&grow, &covered, &gone);

        let options = Object::new();
        set(&options, "duration", plan.duration_ms as f64)?;
        set(&options, "easing", plan.easing.css())?;

        let host = self.clone();
        let target = plan.target;
        let switch_ms = plan.switch_at_ms;
        let switch_point = async move {
            TimeoutFuture::new(switch_ms).await;
            host.apply_theme(target);
        };
        let (result, ()) = join(run_animation(&overlay, &keyframes, &options), switch_point).await;
        overlay.remove();
        result
    }
}

impl NavigationHost for BrowserHost {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let fail = |e: JsValue| PassageError::network(url, js_error_string(&e));
        let response: Response = JsFuture::from(self.window.fetch_with_str(url))
            .await
            .map_err(fail)?
            .dyn_into()
            .map_err(fail)?;
        let status = response.status();
        let body = JsFuture::from(response.text().map_err(fail)?)
            .await
            .map_err(fail)?
            .as_string()
            .unwrap_or_default();
        debug!("fetched {url}: {status}");
        Ok(FetchResponse { status, body })
    }

    async fn animate(&self, plan: &PhasePlan) -> Result<()> {
        let element = self.container_element()?;
        let fail = |e: JsValue| PassageError::animation(plan.label(), js_error_string(&e));
        let keyframes = Array::of2(
            &keyframe(&plan.from).map_err(fail)?.into(),
            &keyframe(&plan.to).map_err(fail)?.into(),
        );
        let options = Object::new();
        set(&options, "duration", plan.duration_ms as f64).map_err(fail)?;
        set(&options, "easing", plan.easing.css()).map_err(fail)?;
        set(&options, "fill", "forwards").map_err(fail)?;
        run_animation(&element, &keyframes, &options)
            .await
            .map_err(fail)
    }

    fn commit_visual(&self, state: &VisualState) {
        let element = match self.container_element() {
            Ok(element) => element,
            Err(e) => {
                debug!("nothing to commit: {e}");
                return;
            }
        };
        if let Err(e) = self.pin_style(&element, state) {
            warn!("could not pin container style: {}", js_error_string(&e));
        }
        cancel_animations(&element);
    }

    fn swap(&self, plan: &SwapPlan) -> Result<()> {
        let element = self.container_element()?;
        // Inserted scripts do not execute.
        element.set_inner_html(&plan.container_html);
        if let Some(title) = &plan.title {
            self.document.set_title(title);
        }
        if let Some(language) = &plan.language {
            self.apply_language(language);
        }
        if let Some(theme) = plan.theme {
            self.apply_theme(theme);
        }
        self.window.scroll_to_with_x_and_y(0.0, 0.0);
        Ok(())
    }

    fn push_history(&self, url: &str) {
        let pushed = self
            .window
            .history()
            .and_then(|h| h.push_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = pushed {
            warn!("pushState({url}) failed: {}", js_error_string(&e));
        }
    }

    fn native_navigate(&self, url: &str) {
        if let Err(e) = self.window.location().set_href(url) {
            warn!("native navigation to {url} failed: {}", js_error_string(&e));
        }
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion()
    }

    async fn sleep(&self, ms: u32) {
        TimeoutFuture::new(ms).await;
    }
}

impl EventSink for BrowserHost {
    fn emit(&self, event: &SiteEvent) {
        let init = CustomEventInit::new();
        match swb::to_value(event) {
            Ok(detail) => init.set_detail(&detail),
            Err(e) => warn!("could not encode {} detail: {e}", event.dom_name()),
        }
        let dispatched = CustomEvent::new_with_event_init_dict(event.dom_name(), &init)
            .and_then(|custom| self.document.dispatch_event(&custom));
        if let Err(e) = dispatched {
            warn!("could not dispatch {}: {}", event.dom_name(), js_error_string(&e));
        }
    }
}

impl ThemeHost for BrowserHost {
    fn apply_theme(&self, theme: ThemeValue) {
        let Some(root) = self.document.document_element() else {
            return;
        };
        let applied = root
            .set_attribute(THEME_ATTRIBUTE, theme.as_str())
            .and_then(|_| root.class_list().toggle_with_force(DARK_CLASS, theme.is_dark()))
            .map(|_| ());
        if let Err(e) = applied {
            warn!("could not apply theme {theme}: {}", js_error_string(&e));
        }
        if let Err(e) = dom::sync_theme_controls(&self.document, theme) {
            warn!("could not update theme controls: {}", js_error_string(&e));
        }
    }

    fn system_prefers_dark(&self) -> bool {
        self.matches_media("(prefers-color-scheme: dark)")
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion()
    }

    fn reveal_strategy(&self) -> RevealStrategy {
        let native = Reflect::has(&self.document, &JsValue::from_str("startViewTransition"))
            .unwrap_or(false);
        if native {
            RevealStrategy::Native
        } else {
            RevealStrategy::Overlay
        }
    }

    fn viewport(&self) -> (f64, f64) {
        let size = |v: std::result::Result<JsValue, JsValue>| {
            v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        (size(self.window.inner_width()), size(self.window.inner_height()))
    }

    async fn reveal(&self, plan: &RevealPlan) -> Result<()> {
        let drawn = match plan.strategy {
            RevealStrategy::Native => self.reveal_native(plan).await,
            RevealStrategy::Overlay => self.reveal_overlay(plan).await,
            RevealStrategy::Instant => {
                self.apply_theme(plan.target);
                Ok(())
            }
        };
        drawn.map_err(|e| PassageError::animation("theme reveal", js_error_string(&e)))
    }
}

impl LanguageHost for BrowserHost {
    fn apply_language(&self, language: &str) {
        if let Some(root) = self.document.document_element() {
            if let Err(e) = root.set_attribute("lang", language) {
                warn!("could not set lang={language}: {}", js_error_string(&e));
            }
        }
    }

    fn platform_language(&self) -> Option<String> {
        self.window.navigator().language()
    }
}
