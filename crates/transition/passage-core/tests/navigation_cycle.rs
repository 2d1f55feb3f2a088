mod common;

use std::rc::Rc;

use futures::executor::block_on;
use futures::{pin_mut, poll};

use common::FakeHost;
use passage_core::{
    ActivationDecision, Config, CycleState, LinkActivation, NavigationOrchestrator,
    NavigationOutcome, NavigationRequest, PassageError, ThemeSource, ThemeValue, TransitionName,
    TransitionPolicy, VisualState,
};

fn fixed(name: TransitionName) -> Config {
    Config {
        transition_policy: TransitionPolicy::Fixed { name },
        ..Config::default()
    }
}

fn orchestrator(host: &FakeHost) -> NavigationOrchestrator<FakeHost> {
    NavigationOrchestrator::new(host.clone(), &fixed(TransitionName::Fade), 1)
}

fn link_to(url: &str) -> LinkActivation {
    LinkActivation {
        href: url.to_string(),
        current_url: "https://atelier.test/".to_string(),
        ..LinkActivation::default()
    }
}

#[test]
fn settled_cycle_swaps_content_and_leaves_container_at_rest() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    let orch = orchestrator(&host);

    let outcome = block_on(orch.navigate(NavigationRequest::link(url.clone(), None)));

    match outcome {
        NavigationOutcome::Settled {
            url: settled,
            transition,
            reinit,
        } => {
            assert_eq!(settled, url);
            assert_eq!(transition, TransitionName::Fade);
            assert!(reinit.is_clean());
        }
        other => panic!("expected settled cycle, got {other:?}"),
    }
    assert_eq!(orch.state(), CycleState::Idle);
    assert_eq!(orch.epoch(), 1);
    assert_eq!(host.last_commit(), Some(VisualState::REST));

    let swaps = host.0.swaps.borrow();
    assert_eq!(swaps.len(), 1);
    assert_eq!(swaps[0].title.as_deref(), Some("Works | Atelier Rivage"));
    assert_eq!(swaps[0].language.as_deref(), Some("en"));
    assert!(swaps[0].container_html.contains("<li>Tea bowl</li>"));
    assert!(!swaps[0].container_html.contains("site-header"));
    assert_eq!(*host.0.history.borrow(), vec![url]);
    assert!(host.0.native.borrow().is_empty());
}

#[test]
fn phases_run_in_strict_order() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    let orch = orchestrator(&host);
    let recorder = host.clone();
    orch.registry()
        .register("recorder", move || {
            recorder.0.timeline.borrow_mut().push("reinit recorder".into());
            Ok(())
        })
        .unwrap();

    block_on(orch.navigate(NavigationRequest::link(url.clone(), None)));

    assert_eq!(
        host.timeline(),
        vec![
            format!("fetch {url}"),
            "animate fade:leave".to_string(),
            "commit opacity=0".to_string(),
            "swap".to_string(),
            format!("push {url}"),
            "animate fade:enter".to_string(),
            "commit opacity=1".to_string(),
            "reinit recorder".to_string(),
        ]
    );
}

#[test]
fn second_navigation_while_live_is_ignored() {
    let host = FakeHost::new();
    let works = host.serve_fixture("works");
    let about = host.serve_fixture("about-fr");
    let orch = orchestrator(&host);

    block_on(async {
        let release = host.hold_next();
        let first = orch.navigate(NavigationRequest::link(works.clone(), None));
        pin_mut!(first);
        assert!(poll!(first.as_mut()).is_pending());
        assert_eq!(orch.state(), CycleState::Leaving);

        let second = orch
            .navigate(NavigationRequest::link(about.clone(), None))
            .await;
        assert_eq!(second, NavigationOutcome::Ignored);
        assert_eq!(orch.intercept(&link_to(&about)), ActivationDecision::Busy);

        release.send(()).unwrap();
        assert!(matches!(first.await, NavigationOutcome::Settled { .. }));
    });

    assert_eq!(orch.state(), CycleState::Idle);
    assert_eq!(host.0.swaps.borrow().len(), 1);
    assert_eq!(*host.0.history.borrow(), vec![works]);
    assert!(matches!(
        orch.intercept(&link_to(&about)),
        ActivationDecision::Navigate(_)
    ));
}

#[test]
fn network_failure_falls_back_to_native_navigation() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    host.0.offline.set(true);
    let orch = orchestrator(&host);

    let outcome = block_on(orch.navigate(NavigationRequest::link(url.clone(), None)));

    assert!(matches!(
        outcome,
        NavigationOutcome::Fallback { error: PassageError::Network { .. }, .. }
    ));
    assert_eq!(*host.0.native.borrow(), vec![url]);
    assert!(host.0.swaps.borrow().is_empty());
    assert!(host.0.animations.borrow().is_empty());
    assert_eq!(orch.state(), CycleState::Idle);
    assert_eq!(orch.epoch(), 0);
}

#[test]
fn non_success_status_falls_back() {
    let host = FakeHost::new();
    let orch = orchestrator(&host);
    let url = "https://atelier.test/gone/";

    let outcome = block_on(orch.navigate(NavigationRequest::link(url, None)));

    match outcome {
        NavigationOutcome::Fallback { url: fell_back, error } => {
            assert_eq!(fell_back, url);
            assert_eq!(
                error,
                PassageError::Status {
                    url: url.to_string(),
                    status: 404
                }
            );
        }
        other => panic!("{other:?}"),
    }
    assert_eq!(*host.0.native.borrow(), vec![url.to_string()]);
}

#[test]
fn destination_without_container_falls_back() {
    let host = FakeHost::new();
    let url = host.serve_fixture("no-container");
    let orch = orchestrator(&host);

    let outcome = block_on(orch.navigate(NavigationRequest::link(url.clone(), None)));

    match outcome {
        NavigationOutcome::Fallback { error, .. } => {
            assert_eq!(error.category(), "network");
            assert!(matches!(error, PassageError::MissingContainer { .. }));
        }
        other => panic!("{other:?}"),
    }
    assert_eq!(*host.0.native.borrow(), vec![url]);
    assert!(host.0.swaps.borrow().is_empty());
    assert_eq!(orch.state(), CycleState::Idle);
}

#[test]
fn animation_failures_still_settle_fully_visible() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    host.0.fail_animations.set(true);
    let orch = NavigationOrchestrator::new(host.clone(), &fixed(TransitionName::Zoom), 1);

    let outcome = block_on(orch.navigate(NavigationRequest::link(url, None)));

    assert!(matches!(outcome, NavigationOutcome::Settled { .. }));
    let commits = host.0.commits.borrow();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].opacity, 0.0);
    assert_eq!(commits[0].scale, 0.92);
    assert_eq!(commits[1], VisualState::REST);
    assert_eq!(orch.state(), CycleState::Idle);
}

#[test]
fn reduced_motion_uses_instant_branch() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    host.0.reduced_motion.set(true);
    let orch = orchestrator(&host);

    let outcome = block_on(orch.navigate(NavigationRequest::link(url, None)));

    assert!(matches!(outcome, NavigationOutcome::Settled { .. }));
    assert!(host.0.animations.borrow().is_empty());
    assert_eq!(host.last_commit(), Some(VisualState::REST));
    assert_eq!(orch.state(), CycleState::Idle);
}

#[test]
fn failing_reinit_callback_does_not_block_siblings() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    let orch = orchestrator(&host);
    orch.registry()
        .register("effects", || Err(anyhow::anyhow!("tilt target missing")))
        .unwrap();
    orch.registry().register("i18n", || Ok(())).unwrap();

    let outcome = block_on(orch.navigate(NavigationRequest::link(url, None)));

    match outcome {
        NavigationOutcome::Settled { reinit, .. } => {
            assert_eq!(reinit.ran, vec!["i18n".to_string()]);
            assert_eq!(reinit.failures.len(), 1);
            assert_eq!(reinit.failures[0].category(), "reinit");
        }
        other => panic!("{other:?}"),
    }
}

struct PinnedTheme(ThemeValue);

impl ThemeSource for PinnedTheme {
    fn current_theme(&self) -> ThemeValue {
        self.0
    }
}

#[test]
fn swap_rearms_current_theme_instead_of_destination_theme() {
    let host = FakeHost::new();
    let url = host.serve_fixture("about-fr");
    let orch = orchestrator(&host).with_theme_source(Rc::new(PinnedTheme(ThemeValue::Light)));

    block_on(orch.navigate(NavigationRequest::link(url, None)));

    let swaps = host.0.swaps.borrow();
    assert_eq!(swaps[0].theme, Some(ThemeValue::Light));
    assert_eq!(swaps[0].language.as_deref(), Some("fr"));
}

#[test]
fn without_theme_source_destination_theme_is_used() {
    let host = FakeHost::new();
    let url = host.serve_fixture("about-fr");
    let orch = orchestrator(&host);

    block_on(orch.navigate(NavigationRequest::link(url, None)));

    assert_eq!(host.0.swaps.borrow()[0].theme, Some(ThemeValue::Dark));
}

#[test]
fn popstate_does_not_push_history() {
    let host = FakeHost::new();
    let url = host.serve_fixture("home");
    let orch = orchestrator(&host);

    let outcome = block_on(orch.navigate(NavigationRequest::pop_state(url)));

    assert!(matches!(outcome, NavigationOutcome::Settled { .. }));
    assert!(host.0.history.borrow().is_empty());
}

#[test]
fn requested_transition_overrides_policy() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    let orch = orchestrator(&host);

    let outcome = block_on(orch.navigate(NavigationRequest::link(url, Some("slide-up".into()))));

    assert!(matches!(
        outcome,
        NavigationOutcome::Settled { transition: TransitionName::SlideUp, .. }
    ));
    let animations = host.0.animations.borrow();
    assert_eq!(animations.len(), 2);
    assert!(animations.iter().all(|p| p.transition == TransitionName::SlideUp));
}

#[test]
fn settle_delay_runs_before_reinit() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    let cfg = Config {
        settle_delay_ms: 120,
        ..fixed(TransitionName::Fade)
    };
    let orch = NavigationOrchestrator::new(host.clone(), &cfg, 1);
    let recorder = host.clone();
    orch.registry()
        .register("recorder", move || {
            recorder.0.timeline.borrow_mut().push("reinit recorder".into());
            Ok(())
        })
        .unwrap();

    block_on(orch.navigate(NavigationRequest::link(url, None)));

    let timeline = host.timeline();
    let sleep = timeline.iter().position(|e| e == "sleep 120").expect("slept");
    let reinit = timeline.iter().position(|e| e == "reinit recorder").expect("reinit");
    assert!(sleep < reinit);
}

#[test]
fn swap_failure_falls_back_with_visible_container() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    host.0.fail_swap.set(true);
    let orch = orchestrator(&host);

    let outcome = block_on(orch.navigate(NavigationRequest::link(url.clone(), None)));

    assert!(matches!(outcome, NavigationOutcome::Fallback { .. }));
    assert_eq!(host.last_commit(), Some(VisualState::REST));
    assert_eq!(*host.0.native.borrow(), vec![url]);
    assert_eq!(orch.state(), CycleState::Idle);
}

#[test]
fn dropping_a_live_cycle_resets_to_idle() {
    let host = FakeHost::new();
    let url = host.serve_fixture("works");
    let orch = orchestrator(&host);

    block_on(async {
        let _release = host.hold_next();
        {
            let cycle = orch.navigate(NavigationRequest::link(url.clone(), None));
            pin_mut!(cycle);
            assert!(poll!(cycle.as_mut()).is_pending());
            assert!(orch.state().is_live());
        }
        assert_eq!(orch.state(), CycleState::Idle);
    });
}

#[test]
fn intercept_passes_cross_origin_links_through() {
    let host = FakeHost::new();
    let orch = orchestrator(&host);
    assert!(matches!(
        orch.intercept(&link_to("https://instagram.test/atelier")),
        ActivationDecision::PassThrough(_)
    ));
}
