//! passage-wasm
//!
//! Browser binding for `passage-core`: [`BrowserHost`] implements the core's
//! host traits on `web-sys`, and [`PassageSite`] wires the orchestrator, the
//! theme machine and the language state to the live page.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use js_sys::{Function, Promise, JSON};
use log::{debug, info, warn};
use passage_core::{
    ActivationDecision, Config, KeyChord, LanguageState, NavigationHost, NavigationOrchestrator,
    NavigationOutcome, NavigationRequest, PassageError, Preferences, ThemeMachine, ThemeSource,
    TransitionDescriptor, Translations,
};
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Event, KeyboardEvent, MouseEvent};

pub mod dom;
mod host;
mod logger;
mod storage;

pub use host::BrowserHost;
pub use storage::LocalStore;

use dom::{js_error_string, Listener};

type Themes = ThemeMachine<BrowserHost, LocalStore>;

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn to_js_error(e: PassageError) -> JsError {
    JsError::new(&format!("{} error: {e}", e.category()))
}

/// Click handlers shared by every bound control.
struct Controls {
    theme: Closure<dyn FnMut(Event)>,
    language: Closure<dyn FnMut(Event)>,
}

struct SiteInner {
    host: BrowserHost,
    orchestrator: NavigationOrchestrator<BrowserHost>,
    themes: Rc<Themes>,
    language: LanguageState<BrowserHost, LocalStore>,
    default_language: String,
    translations: RefCell<Option<Translations>>,
    controls: RefCell<Option<Controls>>,
}

impl SiteInner {
    fn switch_language(&self, language: &str) -> passage_core::Result<String> {
        let language = self.language.set_language(language)?;
        self.translate();
        Ok(language)
    }

    fn translate(&self) -> usize {
        let translations = self.translations.borrow();
        let Some(table) = translations.as_ref() else {
            return 0;
        };
        match dom::translate(self.host.document(), table, &self.language.current()) {
            Ok(applied) => applied,
            Err(e) => {
                warn!("translation pass failed: {}", js_error_string(&e));
                0
            }
        }
    }

    fn bind_controls(&self) -> Result<usize, JsValue> {
        let controls = self.controls.borrow();
        let Some(controls) = controls.as_ref() else {
            return Ok(0);
        };
        let document = self.host.document();
        let themed = dom::bind_controls(
            document,
            dom::THEME_TOGGLE_SELECTOR,
            controls.theme.as_ref().unchecked_ref(),
        )?;
        let languages = dom::bind_controls(
            document,
            &format!("[{}]", dom::LANGUAGE_ATTRIBUTE),
            controls.language.as_ref().unchecked_ref(),
        )?;
        Ok(themed + languages)
    }

    fn unbind_controls(&self) {
        let controls = self.controls.borrow();
        let Some(controls) = controls.as_ref() else {
            return;
        };
        let handlers: [&Function; 2] = [
            controls.theme.as_ref().unchecked_ref(),
            controls.language.as_ref().unchecked_ref(),
        ];
        if let Err(e) = dom::unbind_controls(self.host.document(), &handlers) {
            warn!("could not unbind controls: {}", js_error_string(&e));
        }
    }
}

fn install_controls(inner: &Rc<SiteInner>) {
    let weak = Rc::downgrade(inner);
    let theme = Closure::wrap(Box::new(move |event: Event| {
        let Some(site) = weak.upgrade() else {
            return;
        };
        event.prevent_default();
        let origin = dom::current_element(&event).map(|el| dom::element_centre(&el));
        spawn_local(async move {
            site.themes.toggle(origin).await;
        });
    }) as Box<dyn FnMut(Event)>);

    let weak = Rc::downgrade(inner);
    let language = Closure::wrap(Box::new(move |event: Event| {
        let Some(site) = weak.upgrade() else {
            return;
        };
        let Some(language) = dom::current_element(&event)
            .and_then(|el| el.get_attribute(dom::LANGUAGE_ATTRIBUTE))
        else {
            return;
        };
        event.prevent_default();
        if let Err(e) = site.switch_language(&language) {
            warn!("{e}");
        }
    }) as Box<dyn FnMut(Event)>);

    *inner.controls.borrow_mut() = Some(Controls { theme, language });
}

fn register_builtin_reinit(inner: &Rc<SiteInner>) -> passage_core::Result<()> {
    let registry = inner.orchestrator.registry();

    let weak: Weak<SiteInner> = Rc::downgrade(inner);
    registry.register("theme-controls", move || {
        if let Some(site) = weak.upgrade() {
            site.themes.rearm();
            site.bind_controls()
                .map_err(|e| anyhow::anyhow!("binding controls: {}", js_error_string(&e)))?;
        }
        Ok(())
    })?;

    let weak: Weak<SiteInner> = Rc::downgrade(inner);
    registry.register("translations", move || {
        if let Some(site) = weak.upgrade() {
            site.language.rearm();
            site.translate();
        }
        Ok(())
    })
}

fn run_reinit(inner: &SiteInner) -> passage_core::ReinitReport {
    let report = inner.orchestrator.registry().run_all();
    for failure in &report.failures {
        warn!("{failure}");
    }
    report
}

fn click_listener(inner: &Rc<SiteInner>) -> Result<Listener, JsValue> {
    let weak = Rc::downgrade(inner);
    let closure = Closure::wrap(Box::new(move |event: Event| {
        let Some(site) = weak.upgrade() else {
            return;
        };
        let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let Some(link) = dom::link_activation(
            mouse,
            site.host.current_url(),
            site.orchestrator.no_intercept_attribute(),
            site.orchestrator.transition_attribute(),
        ) else {
            return;
        };
        match site.orchestrator.intercept(&link) {
            ActivationDecision::Navigate(request) => {
                event.prevent_default();
                spawn_local(async move {
                    site.orchestrator.navigate(request).await;
                });
            }
            ActivationDecision::Busy => event.prevent_default(),
            ActivationDecision::PassThrough(_) => {}
        }
    }) as Box<dyn FnMut(Event)>);
    // Capture phase, so the cycle starts before page handlers see the click.
    Listener::attach(inner.host.document(), "click", true, closure)
}

fn popstate_listener(inner: &Rc<SiteInner>) -> Result<Listener, JsValue> {
    let weak = Rc::downgrade(inner);
    let closure = Closure::wrap(Box::new(move |_event: Event| {
        let Some(site) = weak.upgrade() else {
            return;
        };
        let url = site.host.current_url();
        spawn_local(async move {
            let outcome = site
                .orchestrator
                .navigate(NavigationRequest::pop_state(url.clone()))
                .await;
            // History already moved; a busy page must still follow it.
            if outcome == NavigationOutcome::Ignored {
                warn!("popstate during a live cycle, loading {url} natively");
                site.host.native_navigate(&url);
            }
        });
    }) as Box<dyn FnMut(Event)>);
    Listener::attach(inner.host.window(), "popstate", false, closure)
}

fn shortcut_listener(inner: &Rc<SiteInner>) -> Result<Listener, JsValue> {
    let weak = Rc::downgrade(inner);
    let closure = Closure::wrap(Box::new(move |event: Event| {
        let Some(site) = weak.upgrade() else {
            return;
        };
        let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        let chord = KeyChord {
            key: &keyboard.key(),
            ctrl: keyboard.ctrl_key(),
            meta: keyboard.meta_key(),
            shift: keyboard.shift_key(),
        };
        if !chord.is_theme_shortcut() {
            return;
        }
        event.prevent_default();
        debug!("theme shortcut");
        spawn_local(async move {
            site.themes.toggle(None).await;
        });
    }) as Box<dyn FnMut(Event)>);
    Listener::attach(inner.host.document(), "keydown", false, closure)
}

fn system_theme_listener(inner: &Rc<SiteInner>) -> Result<Option<Listener>, JsValue> {
    let Some(query) = inner
        .host
        .window()
        .match_media("(prefers-color-scheme: dark)")?
    else {
        return Ok(None);
    };
    let weak = Rc::downgrade(inner);
    let list = query.clone();
    let closure = Closure::wrap(Box::new(move |_event: Event| {
        if let Some(site) = weak.upgrade() {
            site.themes.on_system_change(list.matches());
        }
    }) as Box<dyn FnMut(Event)>);
    Listener::attach(&query, "change", false, closure).map(Some)
}

#[wasm_bindgen]
pub struct PassageSite {
    inner: Rc<SiteInner>,
    _listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl PassageSite {
    /// Install the transition layer on the current page. Pass a config object
    /// or undefined/null for defaults.
    /// Example:
    ///   new PassageSite({ container_selector: "#main", transition_policy: { kind: "cycle" } })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PassageSite, JsError> {
        #[cfg(feature = "console_error")]
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        cfg.validate().map_err(to_js_error)?;
        logger::init(cfg.log_level_filter());

        let host = BrowserHost::new(&cfg.selector()).map_err(to_js_error)?;
        let store = LocalStore::from_window();
        let themes = Rc::new(ThemeMachine::new(
            host.clone(),
            Preferences::new(store.clone(), &cfg),
            &cfg,
        ));
        let language = LanguageState::new(host.clone(), Preferences::new(store, &cfg), &cfg);
        let entropy = (js_sys::Math::random() * u64::MAX as f64) as u64;
        let orchestrator = NavigationOrchestrator::new(host.clone(), &cfg, entropy)
            .with_theme_source(Rc::clone(&themes) as Rc<dyn ThemeSource>);

        let inner = Rc::new(SiteInner {
            host,
            orchestrator,
            themes,
            language,
            default_language: cfg.default_language.clone(),
            translations: RefCell::new(None),
            controls: RefCell::new(None),
        });
        install_controls(&inner);
        register_builtin_reinit(&inner).map_err(to_js_error)?;

        let js = |e: JsValue| JsError::new(&format!("listener error: {}", js_error_string(&e)));
        let mut listeners = vec![
            click_listener(&inner).map_err(js)?,
            popstate_listener(&inner).map_err(js)?,
            shortcut_listener(&inner).map_err(js)?,
        ];
        listeners.extend(system_theme_listener(&inner).map_err(js)?);

        // Initial page gets the same treatment as a swapped one.
        run_reinit(&inner);
        info!(
            "passage installed on {} ({} re-init callbacks)",
            inner.orchestrator.selector(),
            inner.orchestrator.registry().len()
        );

        Ok(PassageSite {
            inner,
            _listeners: listeners,
        })
    }

    /// Switch to the complementary theme. `x`/`y` place the reveal origin in
    /// viewport px; omitted, the reveal starts at the viewport centre.
    /// Resolves to the theme in effect afterwards.
    #[wasm_bindgen(js_name = toggle_theme)]
    pub fn toggle_theme(&self, x: Option<f64>, y: Option<f64>) -> Promise {
        let site = Rc::clone(&self.inner);
        let origin = x.zip(y);
        future_to_promise(async move {
            let theme = site.themes.toggle(origin).await;
            Ok(JsValue::from_str(theme.as_str()))
        })
    }

    /// Drop the stored theme and follow the platform preference again.
    /// Returns the theme now shown, or undefined while a reveal is running.
    #[wasm_bindgen(js_name = reset_theme)]
    pub fn reset_theme(&self) -> Option<String> {
        self.inner
            .themes
            .reset_to_system()
            .map(|theme| theme.as_str().to_string())
    }

    /// Navigate programmatically with the full transition cycle. Resolves to
    /// the navigation outcome object.
    #[wasm_bindgen(js_name = navigate)]
    pub fn navigate(&self, url: String, transition: Option<String>) -> Result<Promise, JsError> {
        let absolute = web_sys::Url::new_with_base(&url, &self.inner.host.current_url())
            .map_err(|e| JsError::new(&format!("invalid url {url}: {}", js_error_string(&e))))?
            .href();
        let site = Rc::clone(&self.inner);
        Ok(future_to_promise(async move {
            let outcome = site
                .orchestrator
                .navigate(NavigationRequest::programmatic(absolute, transition))
                .await;
            swb::to_value(&outcome).map_err(JsValue::from)
        }))
    }

    /// Persist and apply a language, then re-run the translation pass.
    #[wasm_bindgen(js_name = set_language)]
    pub fn set_language(&self, language: &str) -> Result<String, JsError> {
        self.inner.switch_language(language).map_err(to_js_error)
    }

    /// Load a `{ language: { key: text } }` table and translate the page.
    /// Returns the number of elements translated.
    #[wasm_bindgen(js_name = load_translations)]
    pub fn load_translations(&self, table: JsValue) -> Result<usize, JsError> {
        if jsvalue_is_undefined_or_null(&table) {
            return Err(JsError::new("load_translations: table is null/undefined"));
        }
        let text = JSON::stringify(&table)
            .map_err(|e| JsError::new(&format!("load_translations stringify error: {e:?}")))?
            .as_string()
            .ok_or_else(|| JsError::new("load_translations: stringify produced non-string"))?;
        let translations =
            Translations::from_json(&self.inner.default_language, &text).map_err(to_js_error)?;
        *self.inner.translations.borrow_mut() = Some(translations);
        Ok(self.inner.translate())
    }

    /// Text for `key` in the active language with `{{name}}` placeholders
    /// filled from `params` (a `{ name: text }` object, or undefined). An
    /// unknown key comes back unchanged.
    #[wasm_bindgen(js_name = translate)]
    pub fn translate(&self, key: &str, params: JsValue) -> Result<String, JsError> {
        let params: HashMap<String, String> = if jsvalue_is_undefined_or_null(&params) {
            HashMap::new()
        } else {
            swb::from_value(params).map_err(|e| JsError::new(&format!("params error: {e}")))?
        };
        let translations = self.inner.translations.borrow();
        Ok(match translations.as_ref() {
            Some(table) => table.translate(&self.inner.language.current(), key, &params),
            None => passage_core::interpolate(key, &params),
        })
    }

    /// Re-run every page initializer against the current DOM, as after a
    /// swap, for markup the page inserted itself. Returns the run report.
    #[wasm_bindgen(js_name = refresh)]
    pub fn refresh(&self) -> Result<JsValue, JsError> {
        let report = run_reinit(&self.inner);
        swb::to_value(&report).map_err(|e| JsError::new(&format!("report serialize error: {e}")))
    }

    /// Register a page initializer re-run after every swap. A thrown error
    /// is logged and does not stop the other initializers.
    #[wasm_bindgen(js_name = register_reinit)]
    pub fn register_reinit(&self, name: String, callback: Function) -> Result<(), JsError> {
        self.inner
            .orchestrator
            .registry()
            .register(name, move || {
                callback
                    .call0(&JsValue::UNDEFINED)
                    .map(|_| ())
                    .map_err(|e| anyhow::anyhow!(js_error_string(&e)))
            })
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = current_theme)]
    pub fn current_theme(&self) -> String {
        self.inner.themes.current().as_str().to_string()
    }

    #[wasm_bindgen(js_name = current_language)]
    pub fn current_language(&self) -> String {
        self.inner.language.current()
    }

    #[wasm_bindgen(js_name = is_theme_animating)]
    pub fn is_theme_animating(&self) -> bool {
        self.inner.themes.is_animating()
    }

    /// Current navigation cycle as `{ state, destination, transition }`.
    #[wasm_bindgen(js_name = state)]
    pub fn state(&self) -> Result<JsValue, JsError> {
        swb::to_value(&self.inner.orchestrator.cycle())
            .map_err(|e| JsError::new(&format!("state serialize error: {e}")))
    }

    /// Number of settled navigations since install.
    #[wasm_bindgen(js_name = navigation_count)]
    pub fn navigation_count(&self) -> f64 {
        self.inner.orchestrator.epoch() as f64
    }

    /// Names of every transition in the catalog.
    #[wasm_bindgen(js_name = transition_names)]
    pub fn transition_names(&self) -> Vec<String> {
        TransitionDescriptor::all()
            .iter()
            .map(|d| d.name.as_str().to_string())
            .collect()
    }
}

impl Drop for PassageSite {
    fn drop(&mut self) {
        self.inner.unbind_controls();
    }
}

/// ABI version of the JS surface.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
