#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::channel::oneshot;

use passage_core::{
    EventSink, FetchResponse, LanguageHost, NavigationHost, PassageError, PhasePlan,
    PreferenceStore, Result, RevealPlan, RevealStrategy, SiteEvent, SwapPlan, ThemeHost,
    ThemeValue, VisualState,
};

/// Everything the fake page records, plus the knobs tests turn.
#[derive(Default)]
pub struct PageState {
    pub pages: RefCell<HashMap<String, FetchResponse>>,
    pub offline: Cell<bool>,
    pub reduced_motion: Cell<bool>,
    pub system_dark: Cell<bool>,
    pub strategy: Cell<Option<RevealStrategy>>,
    pub platform_language: RefCell<Option<String>>,
    pub fail_animations: Cell<bool>,
    pub fail_swap: Cell<bool>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,

    pub timeline: RefCell<Vec<String>>,
    pub commits: RefCell<Vec<VisualState>>,
    pub animations: RefCell<Vec<PhasePlan>>,
    pub swaps: RefCell<Vec<SwapPlan>>,
    pub history: RefCell<Vec<String>>,
    pub native: RefCell<Vec<String>>,
    pub reveals: RefCell<Vec<RevealPlan>>,
    pub root_theme: Cell<Option<ThemeValue>>,
    pub root_lang: RefCell<Option<String>>,
    pub events: RefCell<Vec<SiteEvent>>,
    pub sleeps: RefCell<Vec<u32>>,
}

#[derive(Clone, Default)]
pub struct FakeHost(pub Rc<PageState>);

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.0.pages.borrow_mut().insert(
            url.to_string(),
            FetchResponse {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Serve a fixture page and return its URL.
    pub fn serve_fixture(&self, name: &str) -> String {
        let url = passage_test_fixtures::pages::url(name).expect("fixture url");
        let html = passage_test_fixtures::pages::html(name).expect("fixture html");
        self.serve(&url, 200, &html);
        url
    }

    /// Hold the next animation or reveal until the returned sender fires.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.0.gate.borrow_mut() = Some(rx);
        tx
    }

    async fn pass_gate(&self) {
        let gate = self.0.gate.borrow_mut().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }

    fn log(&self, entry: impl Into<String>) {
        self.0.timeline.borrow_mut().push(entry.into());
    }

    pub fn timeline(&self) -> Vec<String> {
        self.0.timeline.borrow().clone()
    }

    pub fn last_commit(&self) -> Option<VisualState> {
        self.0.commits.borrow().last().copied()
    }

    pub fn events(&self) -> Vec<SiteEvent> {
        self.0.events.borrow().clone()
    }
}

impl NavigationHost for FakeHost {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        self.log(format!("fetch {url}"));
        if self.0.offline.get() {
            return Err(PassageError::network(url, "offline"));
        }
        Ok(self
            .0
            .pages
            .borrow()
            .get(url)
            .cloned()
            .unwrap_or(FetchResponse {
                status: 404,
                body: "not found".to_string(),
            }))
    }

    async fn animate(&self, plan: &PhasePlan) -> Result<()> {
        self.log(format!("animate {}", plan.label()));
        self.0.animations.borrow_mut().push(*plan);
        self.pass_gate().await;
        if self.0.fail_animations.get() {
            return Err(PassageError::animation(plan.label(), "element detached"));
        }
        Ok(())
    }

    fn commit_visual(&self, state: &VisualState) {
        self.log(format!("commit opacity={}", state.opacity));
        self.0.commits.borrow_mut().push(*state);
    }

    fn swap(&self, plan: &SwapPlan) -> Result<()> {
        if self.0.fail_swap.get() {
            return Err(PassageError::config("live container missing"));
        }
        self.log("swap");
        if let Some(theme) = plan.theme {
            self.0.root_theme.set(Some(theme));
        }
        if let Some(lang) = &plan.language {
            *self.0.root_lang.borrow_mut() = Some(lang.clone());
        }
        self.0.swaps.borrow_mut().push(plan.clone());
        Ok(())
    }

    fn push_history(&self, url: &str) {
        self.log(format!("push {url}"));
        self.0.history.borrow_mut().push(url.to_string());
    }

    fn native_navigate(&self, url: &str) {
        self.log(format!("native {url}"));
        self.0.native.borrow_mut().push(url.to_string());
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.0.reduced_motion.get()
    }

    async fn sleep(&self, ms: u32) {
        self.log(format!("sleep {ms}"));
        self.0.sleeps.borrow_mut().push(ms);
    }
}

impl EventSink for FakeHost {
    fn emit(&self, event: &SiteEvent) {
        self.0.events.borrow_mut().push(event.clone());
    }
}

impl ThemeHost for FakeHost {
    fn apply_theme(&self, theme: ThemeValue) {
        self.log(format!("theme {theme}"));
        self.0.root_theme.set(Some(theme));
    }

    fn system_prefers_dark(&self) -> bool {
        self.0.system_dark.get()
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.0.reduced_motion.get()
    }

    fn reveal_strategy(&self) -> RevealStrategy {
        self.0.strategy.get().unwrap_or(RevealStrategy::Overlay)
    }

    fn viewport(&self) -> (f64, f64) {
        (1280.0, 800.0)
    }

    async fn reveal(&self, plan: &RevealPlan) -> Result<()> {
        self.log("reveal start");
        self.0.reveals.borrow_mut().push(*plan);
        if self.0.fail_animations.get() {
            return Err(PassageError::animation("theme reveal", "startViewTransition threw"));
        }
        // Switch point.
        self.apply_theme(plan.target);
        self.pass_gate().await;
        self.log("reveal end");
        Ok(())
    }
}

impl LanguageHost for FakeHost {
    fn apply_language(&self, language: &str) {
        *self.0.root_lang.borrow_mut() = Some(language.to_string());
    }

    fn platform_language(&self) -> Option<String> {
        self.0.platform_language.borrow().clone()
    }
}

/// Storage that is switched off, as in private browsing with storage disabled.
#[derive(Clone, Default)]
pub struct DisabledStore;

impl PreferenceStore for DisabledStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Err(PassageError::storage(key, "SecurityError"))
    }

    fn write(&self, key: &str, _value: &str) -> Result<()> {
        Err(PassageError::storage(key, "SecurityError"))
    }

    fn remove(&self, key: &str) -> Result<()> {
        Err(PassageError::storage(key, "SecurityError"))
    }
}
