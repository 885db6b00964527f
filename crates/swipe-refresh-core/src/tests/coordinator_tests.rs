use super::*;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use crate::diagnostics::Diagnostics;
use crate::environment::{AlwaysAtTop, EnvironmentOverride, ScrollPosition};
use crate::error::RefreshError;
use crate::event::{ListenerOptions, TouchPoint, TouchTarget};
use crate::indicator::VisualSink;
use crate::platform::DefaultScheduler;
use crate::refresh::RefreshFuture;
use crate::runtime::Runtime;

// Mock touch target
#[derive(Default)]
struct MockTarget {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, TouchEventKind, ListenerOptions, TouchHandler)>>,
}

impl MockTarget {
    fn fire(&self, event: TouchEvent) {
        let handlers: Vec<TouchHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, kind, _, _)| *kind == event.kind)
            .map(|(_, _, _, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }

    fn count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn options_for(&self, kind: TouchEventKind) -> Option<ListenerOptions> {
        self.listeners
            .borrow()
            .iter()
            .find(|(_, k, _, _)| *k == kind)
            .map(|(_, _, options, _)| *options)
    }
}

impl TouchTarget for MockTarget {
    fn add_listener(
        &self,
        kind: TouchEventKind,
        options: ListenerOptions,
        handler: TouchHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .push((id, kind, options, handler));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(listener, _, _, _)| *listener != id);
    }
}

#[derive(Default)]
struct MockSink {
    frames: RefCell<Vec<IndicatorFrame>>,
}

impl MockSink {
    fn last(&self) -> Option<IndicatorFrame> {
        self.frames.borrow().last().copied()
    }

    fn len(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl VisualSink for MockSink {
    fn render(&self, frame: IndicatorFrame) {
        self.frames.borrow_mut().push(frame);
    }
}

#[derive(Default)]
struct MockEnvironment {
    calls: RefCell<Vec<String>>,
}

impl EnvironmentOverride for MockEnvironment {
    fn disable_overscroll(&self) {
        self.calls.borrow_mut().push("disable".into());
    }

    fn restore_overscroll(&self) {
        self.calls.borrow_mut().push("restore".into());
    }

    fn set_custom_property(&self, name: &str, value: &str) {
        self.calls.borrow_mut().push(format!("set {name}={value}"));
    }

    fn remove_custom_property(&self, name: &str) {
        self.calls.borrow_mut().push(format!("remove {name}"));
    }
}

#[derive(Default)]
struct MockDiagnostics {
    failures: RefCell<Vec<GestureFailure>>,
}

impl Diagnostics for MockDiagnostics {
    fn report(&self, failure: &GestureFailure) {
        self.failures.borrow_mut().push(failure.clone());
    }
}

// Refresh future settled from the test body
#[derive(Default)]
struct PendingRefresh {
    result: RefCell<Option<RefreshResult>>,
    waker: RefCell<Option<Waker>>,
}

impl PendingRefresh {
    fn settle(&self, result: RefreshResult) {
        *self.result.borrow_mut() = Some(result);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

struct PendingRefreshFuture(Rc<PendingRefresh>);

impl Future for PendingRefreshFuture {
    type Output = RefreshResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<RefreshResult> {
        match self.0.result.borrow_mut().take() {
            Some(result) => Poll::Ready(result),
            None => {
                *self.0.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

struct Fixture {
    runtime: Runtime,
    time: Cell<Duration>,
    target: Rc<MockTarget>,
    sink: Rc<MockSink>,
    environment: Rc<MockEnvironment>,
    diagnostics: Rc<MockDiagnostics>,
    refresh: Rc<PendingRefresh>,
    action_calls: Rc<Cell<usize>>,
    starts: Rc<Cell<usize>>,
    ends: Rc<Cell<usize>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            runtime: Runtime::new(Rc::new(DefaultScheduler)),
            time: Cell::new(Duration::ZERO),
            target: Rc::new(MockTarget::default()),
            sink: Rc::new(MockSink::default()),
            environment: Rc::new(MockEnvironment::default()),
            diagnostics: Rc::new(MockDiagnostics::default()),
            refresh: Rc::new(PendingRefresh::default()),
            action_calls: Rc::new(Cell::new(0)),
            starts: Rc::new(Cell::new(0)),
            ends: Rc::new(Cell::new(0)),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators::new()
            .with_target(self.target.clone())
            .with_sink(self.sink.clone())
            .with_scroll(Rc::new(AlwaysAtTop))
            .with_environment(self.environment.clone())
            .with_diagnostics(self.diagnostics.clone())
    }

    fn action(&self) -> RefreshAction {
        let refresh = Rc::clone(&self.refresh);
        let calls = Rc::clone(&self.action_calls);
        Rc::new(move || -> RefreshFuture {
            calls.set(calls.get() + 1);
            Box::pin(PendingRefreshFuture(Rc::clone(&refresh)))
        })
    }

    fn settings(&self) -> SwipeRefreshSettings {
        let starts = Rc::clone(&self.starts);
        let ends = Rc::clone(&self.ends);
        SwipeRefreshSettings::default()
            .on_start_refresh(move || starts.set(starts.get() + 1))
            .on_end_refresh(move || ends.set(ends.get() + 1))
    }

    fn coordinator(&self) -> GestureCoordinator {
        self.coordinator_with(self.collaborators(), self.settings())
    }

    fn coordinator_with(
        &self,
        collaborators: Collaborators,
        settings: SwipeRefreshSettings,
    ) -> GestureCoordinator {
        let coordinator =
            GestureCoordinator::new(self.runtime.handle(), collaborators, self.action(), settings)
                .expect("valid settings");
        coordinator.register_listeners();
        coordinator
    }

    fn advance(&self, delta: Duration) {
        self.time.set(self.time.get() + delta);
        self.runtime.pump(self.time.get());
    }

    fn frame(&self) {
        self.advance(Duration::from_millis(16));
    }

    fn drag(&self, from: f32, to: f32) {
        self.target.fire(TouchEvent::start(from));
        self.target.fire(TouchEvent::moved(to));
    }
}

#[test]
fn registers_four_listeners_with_passive_flags() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    assert!(coordinator.is_registered());
    assert_eq!(fixture.target.count(), 4);
    assert_eq!(
        fixture.target.options_for(TouchEventKind::Move),
        Some(ListenerOptions { passive: false })
    );
    for kind in [
        TouchEventKind::Start,
        TouchEventKind::End,
        TouchEventKind::Cancel,
    ] {
        assert_eq!(
            fixture.target.options_for(kind),
            Some(ListenerOptions { passive: true })
        );
    }

    coordinator.register_listeners();
    assert_eq!(fixture.target.count(), 4);
}

#[test]
fn constructor_applies_environment_and_cleanup_reverts_it_once() {
    let fixture = Fixture::new();
    let settings = fixture
        .settings()
        .with_progress_background_color("#fff")
        .with_progress_stroke_color("#333");
    let coordinator = fixture.coordinator_with(fixture.collaborators(), settings);

    assert_eq!(
        *fixture.environment.calls.borrow(),
        vec![
            "disable".to_string(),
            "set --sdr-progress-background=#fff".to_string(),
            "set --sdr-progress-stroke=#333".to_string(),
        ]
    );

    coordinator.cleanup();
    coordinator.cleanup();
    assert_eq!(
        fixture.environment.calls.borrow()[3..],
        [
            "restore".to_string(),
            "remove --sdr-progress-background".to_string(),
            "remove --sdr-progress-stroke".to_string(),
        ]
    );
}

#[test]
fn environment_is_untouched_without_override() {
    let fixture = Fixture::new();
    let settings = fixture.settings().with_override_browser_refresh(false);
    let coordinator = fixture.coordinator_with(fixture.collaborators(), settings);
    coordinator.cleanup();
    assert!(fixture.environment.calls.borrow().is_empty());
}

#[test]
fn invalid_settings_are_rejected() {
    let fixture = Fixture::new();
    let result = GestureCoordinator::new(
        fixture.runtime.handle(),
        fixture.collaborators(),
        fixture.action(),
        SwipeRefreshSettings::default().with_slingshot_distance(-5.0),
    );
    assert!(matches!(
        result,
        Err(SettingsError::NonPositiveSlingshot { .. })
    ));
    assert!(fixture.environment.calls.borrow().is_empty());
}

#[test]
fn drag_past_slingshot_renders_damped_frame_on_next_frame() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 200.0);
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.state, GestureState::Swiping);
    assert!((snapshot.movement_y - (60.0 + 40f32.sqrt())).abs() < 1e-4);
    assert_eq!(snapshot.opacity, 1.0);
    assert_eq!(snapshot.rotation, 397.9);
    assert!(snapshot.has_pending_frame);
    assert_eq!(fixture.sink.len(), 0);

    fixture.frame();
    assert_eq!(
        fixture.sink.last(),
        Some(IndicatorFrame::new(66.32, 397.9, 1.0, 1.0))
    );
}

#[test]
fn moves_before_a_frame_coalesce_into_one_write() {
    let fixture = Fixture::new();
    let _coordinator = fixture.coordinator();

    fixture.target.fire(TouchEvent::start(100.0));
    fixture.target.fire(TouchEvent::moved(110.0));
    fixture.target.fire(TouchEvent::moved(120.0));
    fixture.target.fire(TouchEvent::moved(130.0));
    fixture.frame();

    assert_eq!(fixture.sink.len(), 1);
    assert_eq!(fixture.sink.last().map(|frame| frame.offset), Some(30.0));
}

#[test]
fn release_before_slingshot_snaps_back_without_refreshing() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 130.0);
    fixture.target.fire(TouchEvent::end());

    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(fixture.action_calls.get(), 0);
    assert_eq!(fixture.starts.get(), 0);
    assert_eq!(fixture.ends.get(), 1);
    assert_eq!(fixture.sink.last(), Some(IndicatorFrame::resting(-30.0)));

    // The queued swipe frame was dropped by the reset.
    fixture.frame();
    assert_eq!(fixture.sink.len(), 1);
}

#[test]
fn full_refresh_cycle_hides_then_resets_after_scale_down() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 200.0);
    fixture.frame();
    fixture.target.fire(TouchEvent::end());

    assert_eq!(coordinator.state(), GestureState::Refreshing);
    assert_eq!(fixture.action_calls.get(), 1);
    assert_eq!(fixture.starts.get(), 1);

    fixture.frame();
    assert_eq!(
        fixture.sink.last(),
        Some(IndicatorFrame::new(30.0, 397.9, 1.0, 1.0))
    );

    fixture.refresh.settle(Ok(()));
    fixture.frame();
    assert_eq!(
        fixture.sink.last(),
        Some(IndicatorFrame::new(30.0, 397.9, 0.01, 0.0))
    );
    assert!(coordinator.snapshot().has_pending_timeout);
    assert_eq!(fixture.ends.get(), 0);

    fixture.advance(Duration::from_millis(299));
    assert_eq!(coordinator.state(), GestureState::Refreshing);

    fixture.advance(Duration::from_millis(1));
    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(fixture.sink.last(), Some(IndicatorFrame::resting(-30.0)));
    assert_eq!(fixture.ends.get(), 1);
    assert_eq!(fixture.starts.get(), 1);
    assert!(!fixture.runtime.needs_frame());
}

#[test]
fn action_swapped_mid_drag_keeps_gesture_and_runs_on_release() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();
    let replacement_calls = Rc::new(Cell::new(0));

    fixture.drag(100.0, 200.0);
    fixture.frame();
    let before = coordinator.snapshot();
    assert_eq!(before.state, GestureState::Swiping);

    let calls = Rc::clone(&replacement_calls);
    coordinator.set_refresh_action(Rc::new(move || -> RefreshFuture {
        calls.set(calls.get() + 1);
        Box::pin(std::future::ready(Ok::<(), RefreshError>(())))
    }));
    assert_eq!(coordinator.snapshot(), before);

    fixture.target.fire(TouchEvent::end());
    assert_eq!(coordinator.state(), GestureState::Refreshing);
    fixture.frame();

    assert_eq!(fixture.action_calls.get(), 0);
    assert_eq!(replacement_calls.get(), 1);
    assert_eq!(fixture.starts.get(), 1);
}

#[test]
fn touches_are_ignored_while_refreshing() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 200.0);
    fixture.target.fire(TouchEvent::end());
    fixture.drag(100.0, 300.0);
    fixture.target.fire(TouchEvent::end());

    assert_eq!(coordinator.state(), GestureState::Refreshing);
    assert_eq!(coordinator.snapshot().movement_y, 30.0);
    assert_eq!(fixture.action_calls.get(), 1);
    assert_eq!(fixture.starts.get(), 1);
}

#[test]
fn multi_touch_start_is_ignored() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.target.fire(TouchEvent::new(
        TouchEventKind::Start,
        [TouchPoint::at_y(100.0), TouchPoint::new(1, 50.0, 100.0)],
    ));
    assert_eq!(coordinator.state(), GestureState::Idle);
    fixture.target.fire(TouchEvent::moved(200.0));
    assert_eq!(coordinator.state(), GestureState::Idle);
}

#[test]
fn scrolled_container_does_not_track_drag() {
    let fixture = Fixture::new();
    let scroll_top = Rc::new(Cell::new(120.0_f32));
    let reader = Rc::clone(&scroll_top);
    let scroll: Rc<dyn ScrollPosition> = Rc::new(move || Some(reader.get()));
    let coordinator =
        fixture.coordinator_with(fixture.collaborators().with_scroll(scroll), fixture.settings());

    fixture.drag(100.0, 200.0);
    assert_eq!(coordinator.state(), GestureState::TouchStart);
    assert_eq!(coordinator.snapshot().movement_y, 0.0);

    scroll_top.set(0.0);
    fixture.target.fire(TouchEvent::moved(200.0));
    assert_eq!(coordinator.state(), GestureState::Swiping);
}

#[test]
fn scroll_override_takes_precedence_over_platform_scroll() {
    let fixture = Fixture::new();
    let scroll: Rc<dyn ScrollPosition> = Rc::new(|| Some(500.0_f32));
    let settings = fixture.settings().with_scroll_top_override(|| 0.0);
    let coordinator = fixture.coordinator_with(fixture.collaborators().with_scroll(scroll), settings);

    fixture.drag(100.0, 150.0);
    assert_eq!(coordinator.state(), GestureState::Swiping);
}

#[test]
fn upward_moves_are_ignored() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();
    fixture.drag(200.0, 150.0);
    assert_eq!(coordinator.state(), GestureState::TouchStart);
}

#[test]
fn threshold_delays_drag_recognition() {
    let fixture = Fixture::new();
    let settings = fixture.settings().with_threshold(20.0);
    let coordinator = fixture.coordinator_with(fixture.collaborators(), settings);

    fixture.drag(100.0, 110.0);
    assert_eq!(coordinator.state(), GestureState::TouchStart);

    fixture.target.fire(TouchEvent::moved(150.0));
    assert_eq!(coordinator.state(), GestureState::Swiping);
    assert_eq!(coordinator.snapshot().movement_y, 30.0);
}

#[test]
fn cancel_mid_swipe_resets_and_fires_end_once() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 150.0);
    fixture.target.fire(TouchEvent::cancel());

    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(coordinator.snapshot().start_y, None);
    assert_eq!(fixture.ends.get(), 1);
    assert!(!coordinator.snapshot().has_pending_frame);
}

#[test]
fn rejected_refresh_is_reported_and_still_hides() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 200.0);
    fixture.target.fire(TouchEvent::end());
    fixture.refresh.settle(Err(RefreshError::new("offline")));
    fixture.frame();
    fixture.advance(Duration::from_millis(300));

    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(
        *fixture.diagnostics.failures.borrow(),
        vec![GestureFailure::RefreshRejected(RefreshError::new("offline"))]
    );
    assert_eq!(fixture.ends.get(), 1);
}

#[test]
fn completion_after_forced_reset_is_ignored() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 200.0);
    fixture.target.fire(TouchEvent::end());
    fixture.frame();
    coordinator.set_refreshing(false);
    assert_eq!(fixture.ends.get(), 1);
    let writes = fixture.sink.len();

    fixture.refresh.settle(Ok(()));
    fixture.frame();
    fixture.advance(Duration::from_millis(400));

    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(fixture.ends.get(), 1);
    assert_eq!(fixture.sink.len(), writes);
}

#[test]
fn unregister_mid_refresh_resets_and_detaches() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.drag(100.0, 200.0);
    fixture.target.fire(TouchEvent::end());
    coordinator.unregister_listeners();

    assert!(!coordinator.is_registered());
    assert_eq!(fixture.target.count(), 0);
    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(fixture.ends.get(), 1);

    coordinator.unregister_listeners();
    assert_eq!(fixture.target.count(), 0);
}

#[test]
fn set_refreshing_true_shows_indicator_without_running_action() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    coordinator.set_refreshing(true);
    coordinator.set_refreshing(true);
    assert!(coordinator.is_refreshing());
    assert_eq!(fixture.starts.get(), 1);
    assert_eq!(fixture.action_calls.get(), 0);

    fixture.frame();
    assert_eq!(
        fixture.sink.last(),
        Some(IndicatorFrame::new(30.0, 0.0, 1.0, 1.0))
    );

    coordinator.set_refreshing(false);
    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(fixture.ends.get(), 1);
}

#[test]
fn without_sink_completion_resets_immediately() {
    let fixture = Fixture::new();
    let collaborators = Collaborators::new()
        .with_target(fixture.target.clone())
        .with_scroll(Rc::new(AlwaysAtTop))
        .with_diagnostics(fixture.diagnostics.clone());
    let coordinator = fixture.coordinator_with(collaborators, fixture.settings());

    fixture.drag(100.0, 200.0);
    assert!(!coordinator.snapshot().has_pending_frame);
    fixture.target.fire(TouchEvent::end());
    fixture.refresh.settle(Ok(()));
    fixture.frame();

    assert_eq!(coordinator.state(), GestureState::Idle);
    assert!(!fixture.runtime.has_pending_timeouts());
    assert_eq!(fixture.ends.get(), 1);
}

#[test]
fn move_without_touch_point_is_reported() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.target.fire(TouchEvent::start(100.0));
    fixture
        .target
        .fire(TouchEvent::new(TouchEventKind::Move, []));

    assert_eq!(coordinator.state(), GestureState::TouchStart);
    assert_eq!(
        *fixture.diagnostics.failures.borrow(),
        vec![GestureFailure::MissingTouchPoint {
            kind: TouchEventKind::Move
        }]
    );
}

#[test]
fn non_finite_coordinates_are_reported_and_ignored() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    fixture.target.fire(TouchEvent::start(f32::NAN));
    assert_eq!(coordinator.state(), GestureState::Idle);
    assert_eq!(fixture.diagnostics.failures.borrow().len(), 1);
}

#[test]
fn dead_runtime_renders_and_settles_synchronously() {
    let fixture = Fixture::new();
    let dead = Runtime::new(Rc::new(DefaultScheduler));
    let dead_handle = dead.handle();
    drop(dead);
    let target = Rc::new(MockTarget::default());
    let sink = Rc::new(MockSink::default());
    let orphan = GestureCoordinator::new(
        dead_handle,
        Collaborators::new()
            .with_target(target.clone())
            .with_sink(sink.clone())
            .with_scroll(Rc::new(AlwaysAtTop))
            .with_diagnostics(fixture.diagnostics.clone()),
        fixture.action(),
        SwipeRefreshSettings::default(),
    )
    .expect("valid settings");
    orphan.register_listeners();

    target.fire(TouchEvent::start(100.0));
    target.fire(TouchEvent::moved(200.0));
    assert_eq!(sink.last().map(|frame| frame.offset), Some(66.32));

    target.fire(TouchEvent::end());
    assert_eq!(orphan.state(), GestureState::Idle);
    assert_eq!(sink.last(), Some(IndicatorFrame::resting(-30.0)));
    assert!(fixture
        .diagnostics
        .failures
        .borrow()
        .contains(&GestureFailure::RuntimeUnavailable));
}

#[test]
fn dropping_coordinator_detaches_listeners() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();
    assert_eq!(fixture.target.count(), 4);
    drop(coordinator);
    assert_eq!(fixture.target.count(), 0);
}
