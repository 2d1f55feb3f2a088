//! Navigation orchestrator: turns same-origin link activations into a
//! single continuous page by fetching the destination, running a leave /
//! enter transition pair around a content swap and re-running page
//! initializers.
//!
//! Within one cycle the phases run strictly
//! `Fetching -> Leaving -> Swapping -> Entering -> Settled`; suspension
//! happens only at the fetch, at each phase's completion signal and at the
//! optional settle delay. At most one cycle is live at a time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::{PhasePlan, TransitionDescriptor, TransitionName, VisualState};
use crate::config::Config;
use crate::document::{parse_destination, DestinationDocument, Selector};
use crate::error::{PassageError, Result};
use crate::intercept::{classify, InterceptDecision, LinkActivation, NavigationRequest, PassReason};
use crate::registry::{ReinitRegistry, ReinitReport};
use crate::selection::TransitionPicker;
use crate::theme::ThemeValue;

/// Raw result of fetching a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What the live page gets during the swap step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapPlan {
    pub container_html: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub theme: Option<ThemeValue>,
}

/// Browser-side effects the orchestrator drives.
#[allow(async_fn_in_trait)]
pub trait NavigationHost {
    /// Fetch destination markup. Transport failures are errors; HTTP
    /// statuses are reported in the response.
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;

    /// Animate the live container through `plan`, resolving when the
    /// animation's completion signal fires.
    async fn animate(&self, plan: &PhasePlan) -> Result<()>;

    /// Pin the container's visual properties to `state` without animating.
    fn commit_visual(&self, state: &VisualState);

    /// Replace the container content, title, root `lang`/`data-theme` and
    /// reset scroll to the top. Must not animate.
    fn swap(&self, plan: &SwapPlan) -> Result<()>;

    fn push_history(&self, url: &str);

    /// Leave the page with a normal browser load.
    fn native_navigate(&self, url: &str);

    fn prefers_reduced_motion(&self) -> bool;

    async fn sleep(&self, ms: u32);
}

/// Current theme, consulted at swap time so a navigation never reverts the
/// user's theme to whatever the destination declared statically.
pub trait ThemeSource {
    fn current_theme(&self) -> ThemeValue;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Fetching,
    Leaving,
    Swapping,
    Entering,
    Settled,
    Aborted,
}

impl CycleState {
    /// A live cycle blocks new ones.
    #[inline]
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Idle | Self::Settled | Self::Aborted)
    }
}

/// The one navigation cycle the orchestrator owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationCycle {
    pub state: CycleState,
    pub destination: Option<String>,
    pub transition: Option<TransitionName>,
}

impl Default for NavigationCycle {
    fn default() -> Self {
        Self {
            state: CycleState::Idle,
            destination: None,
            transition: None,
        }
    }
}

/// What a click should do, as decided by [`NavigationOrchestrator::intercept`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationDecision {
    /// Prevent the default and run this request.
    Navigate(NavigationRequest),
    /// Prevent the default and drop the click; a cycle is live.
    Busy,
    /// Let the browser handle it.
    PassThrough(PassReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Settled {
        url: String,
        transition: TransitionName,
        reinit: ReinitReport,
    },
    /// The cycle aborted and the host performed a native load of `url`.
    Fallback { url: String, error: PassageError },
    /// Another cycle was live; nothing happened.
    Ignored,
}

/// Resets a cycle to `Idle` if its future is dropped mid-flight.
struct CycleGuard<'a> {
    cycle: &'a RefCell<NavigationCycle>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut cycle = self.cycle.borrow_mut();
        if cycle.state.is_live() {
            warn!("navigation cycle dropped in {:?}, resetting", cycle.state);
        }
        *cycle = NavigationCycle::default();
    }
}

pub struct NavigationOrchestrator<H> {
    host: H,
    selector: Selector,
    no_intercept_attribute: String,
    transition_attribute: String,
    settle_delay_ms: u32,
    picker: TransitionPicker,
    registry: ReinitRegistry,
    theme_source: Option<Rc<dyn ThemeSource>>,
    cycle: RefCell<NavigationCycle>,
    /// Count of settled cycles.
    epoch: Cell<u64>,
}

impl<H: NavigationHost> NavigationOrchestrator<H> {
    /// `entropy` seeds the random pick policy when the config gives no seed.
    pub fn new(host: H, cfg: &Config, entropy: u64) -> Self {
        Self {
            host,
            selector: cfg.selector(),
            no_intercept_attribute: cfg.no_intercept_attribute.clone(),
            transition_attribute: cfg.transition_attribute.clone(),
            settle_delay_ms: cfg.settle_delay_ms,
            picker: TransitionPicker::new(cfg.transition_policy.clone(), entropy),
            registry: ReinitRegistry::new(),
            theme_source: None,
            cycle: RefCell::new(NavigationCycle::default()),
            epoch: Cell::new(0),
        }
    }

    /// Re-arm the root theme from `source` on every swap.
    pub fn with_theme_source(mut self, source: Rc<dyn ThemeSource>) -> Self {
        self.theme_source = Some(source);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn registry(&self) -> &ReinitRegistry {
        &self.registry
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn no_intercept_attribute(&self) -> &str {
        &self.no_intercept_attribute
    }

    pub fn transition_attribute(&self) -> &str {
        &self.transition_attribute
    }

    pub fn state(&self) -> CycleState {
        self.cycle.borrow().state
    }

    pub fn cycle(&self) -> NavigationCycle {
        self.cycle.borrow().clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.get()
    }

    fn set_state(&self, state: CycleState) {
        let mut cycle = self.cycle.borrow_mut();
        debug!("navigation {:?} -> {:?}", cycle.state, state);
        cycle.state = state;
    }

    /// Decide what a link activation does.
    pub fn intercept(&self, link: &LinkActivation) -> ActivationDecision {
        match classify(link) {
            InterceptDecision::PassThrough(reason) => {
                debug!("passing {} through: {reason:?}", link.href);
                ActivationDecision::PassThrough(reason)
            }
            InterceptDecision::Intercept(_) if self.state().is_live() => {
                debug!("ignoring {} while a cycle is live", link.href);
                ActivationDecision::Busy
            }
            InterceptDecision::Intercept(req) => ActivationDecision::Navigate(req),
        }
    }

    async fn load(&self, url: &str) -> Result<DestinationDocument> {
        let response = self.host.fetch(url).await?;
        if !response.is_success() {
            return Err(PassageError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        parse_destination(url, &response.body, &self.selector)
    }

    /// Run one phase to its terminal visual state. Animation failures and
    /// the reduced-motion branch both end in an instant commit.
    async fn run_phase(&self, plan: PhasePlan) {
        if !plan.is_instant() {
            if let Err(e) = self.host.animate(&plan).await {
                warn!("{} failed, snapping to end state: {e}", plan.label());
            }
        }
        self.host.commit_visual(&plan.terminal());
    }

    fn abort(&self, url: &str, error: PassageError) -> NavigationOutcome {
        warn!("navigation to {url} aborted ({}): {error}", error.category());
        self.set_state(CycleState::Aborted);
        self.host.commit_visual(&VisualState::REST);
        self.host.native_navigate(url);
        NavigationOutcome::Fallback {
            url: url.to_string(),
            error,
        }
    }

    /// Run a full navigation cycle for `request`.
    ///
    /// Returns [`NavigationOutcome::Ignored`] without side effects if a cycle
    /// is already live.
    pub async fn navigate(&self, request: NavigationRequest) -> NavigationOutcome {
        {
            let mut cycle = self.cycle.borrow_mut();
            if cycle.state.is_live() {
                debug!("navigation to {} ignored: {:?}", request.destination, cycle.state);
                return NavigationOutcome::Ignored;
            }
            *cycle = NavigationCycle {
                state: CycleState::Fetching,
                destination: Some(request.destination.clone()),
                transition: None,
            };
        }
        let _guard = CycleGuard { cycle: &self.cycle };
        let url = request.destination.as_str();
        debug!("navigation Idle -> Fetching {url}");

        let destination = match self.load(url).await {
            Ok(doc) => doc,
            Err(e) => return self.abort(url, e),
        };

        let name = self.picker.pick(request.requested_transition.as_deref());
        self.cycle.borrow_mut().transition = Some(name);
        let descriptor = TransitionDescriptor::lookup(name);
        let reduced = self.host.prefers_reduced_motion();

        self.set_state(CycleState::Leaving);
        self.run_phase(descriptor.leave_plan(reduced)).await;

        self.set_state(CycleState::Swapping);
        let plan = SwapPlan {
            theme: self
                .theme_source
                .as_ref()
                .map(|s| s.current_theme())
                .or(destination.theme),
            container_html: destination.container_html,
            title: destination.title,
            language: destination.language,
        };
        if let Err(e) = self.host.swap(&plan) {
            return self.abort(url, e);
        }
        if request.pushes_history() {
            self.host.push_history(url);
        }

        self.set_state(CycleState::Entering);
        self.run_phase(descriptor.enter_plan(reduced)).await;

        if self.settle_delay_ms > 0 {
            self.host.sleep(self.settle_delay_ms).await;
        }
        let reinit = self.registry.run_all();

        self.set_state(CycleState::Settled);
        self.epoch.set(self.epoch.get().wrapping_add(1));
        info!("navigated to {url} with {name}");

        NavigationOutcome::Settled {
            url: url.to_string(),
            transition: name,
            reinit,
        }
    }
}
