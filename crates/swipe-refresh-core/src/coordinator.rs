//! Pull-to-refresh gesture coordinator.
//!
//! [`GestureCoordinator`] listens to touch events on a scroll container,
//! converts vertical travel into indicator frames and invokes the refresh
//! action once the drag is released past the slingshot distance.
//!
//! # State Machine
//!
//! ```text
//!   Idle ──start──▶ TouchStart ──move ≥ threshold──▶ Swiping ──end, armed──▶ Refreshing
//!    ▲                                                  │                        │
//!    └────────────── end (not armed) / cancel ──────────┘                        │
//!    └──────────────────── action settled, hide, scale-down delay ◀──────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. The refresh action runs at most once per commit. Touches are ignored
//!    while `Refreshing`.
//! 2. At most one settle timeout and one deferred frame are pending. A reset
//!    cancels both, so nothing is written to the sink after it.
//! 3. A completion whose cycle was already reset (cancel, unregister,
//!    `set_refreshing(false)`) is dropped; `on_end_refresh` fires once.
//! 4. No `RefCell` borrow is held while calling into a collaborator or a
//!    user callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::collaborators::Collaborators;
use crate::environment::{PROGRESS_BACKGROUND_PROPERTY, PROGRESS_STROKE_PROPERTY};
use crate::error::{GestureFailure, SettingsError};
use crate::event::{ListenerId, TouchEvent, TouchEventKind, TouchHandler};
use crate::indicator::{IndicatorFrame, HIDDEN_SCALE};
use crate::physics::{round_significant, DisplacementCurve};
use crate::refresh::{RefreshAction, RefreshResult};
use crate::runtime::{FrameCallbackRegistration, RuntimeHandle, TimeoutRegistration};
use crate::settings::SwipeRefreshSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureState {
    Idle,
    TouchStart,
    Swiping,
    Refreshing,
}

/// Read-only copy of the tracker, for adapters and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSnapshot {
    pub state: GestureState,
    pub start_y: Option<f32>,
    pub movement_y: f32,
    pub opacity: f32,
    pub rotation: f32,
    pub has_pending_timeout: bool,
    pub has_pending_frame: bool,
}

/// Per-cycle gesture state. Reset to idle after every gesture.
struct GestureTracker {
    state: GestureState,
    start_y: Option<f32>,
    movement_y: f32,
    opacity: f32,
    rotation: f32,
    pending_timeout: Option<TimeoutRegistration>,
    pending_frame: Option<FrameCallbackRegistration>,
    queued_frame: Option<IndicatorFrame>,
    refresh_cycle: Option<u64>,
}

impl GestureTracker {
    fn new() -> Self {
        Self {
            state: GestureState::Idle,
            start_y: None,
            movement_y: 0.0,
            opacity: 0.0,
            rotation: 0.0,
            pending_timeout: None,
            pending_frame: None,
            queued_frame: None,
            refresh_cycle: None,
        }
    }

    fn snapshot(&self) -> GestureSnapshot {
        GestureSnapshot {
            state: self.state,
            start_y: self.start_y,
            movement_y: self.movement_y,
            opacity: self.opacity,
            rotation: self.rotation,
            has_pending_timeout: self.pending_timeout.is_some(),
            has_pending_frame: self.pending_frame.is_some(),
        }
    }

    fn frame(&self, scale: f32) -> IndicatorFrame {
        IndicatorFrame::new(self.movement_y, self.rotation, scale, self.opacity)
    }
}

/// What the constructor changed in the environment, so cleanup reverts exactly that.
#[derive(Default)]
struct AppliedEnvironment {
    overscroll: bool,
    properties: SmallVec<[&'static str; 2]>,
}

struct CoordinatorInner {
    runtime: RuntimeHandle,
    collaborators: Collaborators,
    settings: SwipeRefreshSettings,
    curve: DisplacementCurve,
    action: RefreshAction,
    tracker: GestureTracker,
    listeners: Option<SmallVec<[ListenerId; 4]>>,
    applied: AppliedEnvironment,
    next_cycle: u64,
}

type Shared = Rc<RefCell<CoordinatorInner>>;

pub struct GestureCoordinator {
    inner: Shared,
}

impl fmt::Debug for GestureCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("GestureCoordinator")
                .field("state", &inner.tracker.state)
                .field("registered", &inner.listeners.is_some())
                .finish(),
            Err(_) => f.write_str("GestureCoordinator { <busy> }"),
        }
    }
}

impl GestureCoordinator {
    /// Validates `settings` and applies the environment overrides they ask for.
    ///
    /// Listeners are not attached until [`register_listeners`](Self::register_listeners).
    pub fn new(
        runtime: RuntimeHandle,
        collaborators: Collaborators,
        action: RefreshAction,
        settings: SwipeRefreshSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;

        let mut applied = AppliedEnvironment::default();
        if let Some(environment) = collaborators.environment.as_ref() {
            if settings.override_browser_refresh {
                environment.disable_overscroll();
                applied.overscroll = true;
            }
            for (name, color) in [
                (
                    PROGRESS_BACKGROUND_PROPERTY,
                    &settings.progress_background_color,
                ),
                (PROGRESS_STROKE_PROPERTY, &settings.progress_stroke_color),
            ] {
                if let Some(color) = color {
                    environment.set_custom_property(name, color);
                    applied.properties.push(name);
                }
            }
        }

        let inner = CoordinatorInner {
            runtime,
            collaborators,
            curve: settings.curve(),
            settings,
            action,
            tracker: GestureTracker::new(),
            listeners: None,
            applied,
            next_cycle: 1,
        };
        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
        })
    }

    pub fn state(&self) -> GestureState {
        self.inner.borrow().tracker.state
    }

    pub fn is_refreshing(&self) -> bool {
        self.state() == GestureState::Refreshing
    }

    pub fn is_registered(&self) -> bool {
        self.inner.borrow().listeners.is_some()
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        self.inner.borrow().tracker.snapshot()
    }

    pub fn settings(&self) -> SwipeRefreshSettings {
        self.inner.borrow().settings.clone()
    }

    /// Attaches the four touch listeners. Start, end and cancel are passive;
    /// move is not.
    ///
    /// Calling it again while registered does nothing. Without a bound
    /// target this is a no-op.
    pub fn register_listeners(&self) {
        let target = {
            let inner = self.inner.borrow();
            if inner.listeners.is_some() {
                log::debug!("swipe refresh listeners already registered");
                return;
            }
            match inner.collaborators.target.clone() {
                Some(target) => target,
                None => return,
            }
        };

        let mut ids = SmallVec::new();
        for kind in TouchEventKind::ALL {
            let weak = Rc::downgrade(&self.inner);
            let handler: TouchHandler = Rc::new(move |event: &TouchEvent| {
                Self::dispatch(&weak, kind, event);
            });
            ids.push(target.add_listener(kind, kind.listener_options(), handler));
        }
        self.inner.borrow_mut().listeners = Some(ids);
        log::debug!("swipe refresh listeners registered");
    }

    /// Resets the gesture synchronously and detaches the listeners added by
    /// [`register_listeners`](Self::register_listeners).
    ///
    /// Safe to call repeatedly. Without a bound target this is a no-op.
    pub fn unregister_listeners(&self) {
        let target = match self.inner.borrow().collaborators.target.clone() {
            Some(target) => target,
            None => return,
        };
        Self::reset(&self.inner);
        let ids = self.inner.borrow_mut().listeners.take();
        if let Some(ids) = ids {
            for id in ids {
                target.remove_listener(id);
            }
            log::debug!("swipe refresh listeners removed");
        }
    }

    /// Swaps the refresh action. An in-progress drag is left alone.
    pub fn set_refresh_action(&self, action: RefreshAction) {
        self.inner.borrow_mut().action = action;
    }

    /// `false` resets like a touch cancel. `true` shows the indicator in the
    /// refreshing position without invoking the action; the host then ends
    /// it with `set_refreshing(false)`.
    pub fn set_refreshing(&self, active: bool) {
        if active {
            Self::show_refreshing(&self.inner);
        } else {
            Self::reset(&self.inner);
        }
    }

    /// Reverts the overscroll override and custom properties applied at
    /// construction. Idempotent.
    pub fn cleanup(&self) {
        let (environment, applied) = {
            let mut inner = self.inner.borrow_mut();
            (
                inner.collaborators.environment.clone(),
                std::mem::take(&mut inner.applied),
            )
        };
        let Some(environment) = environment else {
            return;
        };
        if applied.overscroll {
            environment.restore_overscroll();
        }
        for name in applied.properties {
            environment.remove_custom_property(name);
        }
        log::debug!("swipe refresh environment restored");
    }

    fn dispatch(weak: &Weak<RefCell<CoordinatorInner>>, kind: TouchEventKind, event: &TouchEvent) {
        let Some(this) = weak.upgrade() else {
            return;
        };
        // Stale handler the target failed to drop.
        if this.borrow().listeners.is_none() {
            return;
        }
        match kind {
            TouchEventKind::Start => Self::handle_touch_start(&this, event),
            TouchEventKind::Move => {
                if let Err(failure) = Self::handle_touch_move(&this, event) {
                    Self::report(&this, &failure);
                }
            }
            TouchEventKind::End => Self::handle_touch_end(&this),
            TouchEventKind::Cancel => Self::reset(&this),
        }
    }

    fn handle_touch_start(this: &Shared, event: &TouchEvent) {
        if event.touches.len() != 1 {
            return;
        }
        let y = event.touches[0].client_y;
        if !y.is_finite() {
            Self::report(this, &GestureFailure::NonFiniteCoordinate { value: y });
            return;
        }
        let mut inner = this.borrow_mut();
        let tracker = &mut inner.tracker;
        if tracker.state == GestureState::Refreshing {
            return;
        }
        tracker.state = GestureState::TouchStart;
        tracker.start_y = Some(y);
        tracker.movement_y = 0.0;
        tracker.opacity = 0.0;
        log::trace!("touch start at y={y}");
    }

    fn handle_touch_move(this: &Shared, event: &TouchEvent) -> Result<(), GestureFailure> {
        let (scroll_override, scroll_default) = {
            let inner = this.borrow();
            if !matches!(
                inner.tracker.state,
                GestureState::TouchStart | GestureState::Swiping
            ) {
                return Ok(());
            }
            (
                inner.settings.scroll_top_override.clone(),
                inner.collaborators.scroll.clone(),
            )
        };

        let point = event.primary().ok_or(GestureFailure::MissingTouchPoint {
            kind: TouchEventKind::Move,
        })?;
        let y = point.client_y;
        if !y.is_finite() {
            return Err(GestureFailure::NonFiniteCoordinate { value: y });
        }
        let scroll_top = match (scroll_override, scroll_default) {
            (Some(scroll_top), _) => Some(scroll_top()),
            (None, Some(scroll)) => scroll.scroll_top(),
            (None, None) => None,
        };

        let frame = {
            let mut inner = this.borrow_mut();
            let curve = inner.curve;
            let tracker = &mut inner.tracker;
            // The scroll callback ran without a borrow; it may have reset us.
            if !matches!(
                tracker.state,
                GestureState::TouchStart | GestureState::Swiping
            ) {
                return Ok(());
            }
            let start_y = tracker
                .start_y
                .ok_or(GestureFailure::MissingStartCoordinate)?;
            if scroll_top != Some(0.0) || y <= start_y {
                return Ok(());
            }

            let dy = y - start_y;
            if tracker.state == GestureState::TouchStart {
                if !curve.exceeds_threshold(dy) {
                    return Ok(());
                }
                tracker.state = GestureState::Swiping;
                log::trace!("drag recognised after {dy}px");
            }

            tracker.movement_y = curve.movement(dy);
            tracker.opacity = round_significant(curve.opacity(tracker.movement_y));
            tracker.rotation = round_significant(curve.rotation(tracker.movement_y));
            tracker.frame(1.0)
        };
        Self::queue_frame(this, frame);
        Ok(())
    }

    fn handle_touch_end(this: &Shared) {
        let armed = {
            let inner = this.borrow();
            if inner.tracker.state != GestureState::Swiping {
                return;
            }
            inner.curve.is_armed(inner.tracker.movement_y)
        };
        if armed {
            Self::commit(this);
        } else {
            Self::reset(this);
        }
    }

    fn commit(this: &Shared) {
        let (frame, on_start, action, runtime, cycle) = {
            let mut guard = this.borrow_mut();
            let inner = &mut *guard;
            let cycle = inner.next_cycle;
            inner.next_cycle += 1;
            let progress_view_offset = inner.settings.progress_view_offset;
            let tracker = &mut inner.tracker;
            tracker.state = GestureState::Refreshing;
            tracker.movement_y = progress_view_offset;
            tracker.refresh_cycle = Some(cycle);
            (
                tracker.frame(1.0),
                inner.settings.on_start_refresh.clone(),
                inner.action.clone(),
                inner.runtime.clone(),
                cycle,
            )
        };
        log::debug!("swipe refresh committed, cycle {cycle}");
        Self::queue_frame(this, frame);
        if let Some(on_start) = on_start {
            on_start();
        }

        let future = action();
        let weak = Rc::downgrade(this);
        let spawned = runtime.spawn_ui(async move {
            let result = future.await;
            if let Some(this) = weak.upgrade() {
                Self::on_refresh_settled(&this, cycle, result);
            }
        });
        if spawned.is_none() {
            Self::report(this, &GestureFailure::RuntimeUnavailable);
            Self::on_refresh_settled(this, cycle, Ok(()));
        }
    }

    fn on_refresh_settled(this: &Shared, cycle: u64, result: RefreshResult) {
        if let Err(err) = result {
            Self::report(this, &GestureFailure::RefreshRejected(err));
        }
        let current = {
            let mut inner = this.borrow_mut();
            let tracker = &mut inner.tracker;
            let current = tracker.state == GestureState::Refreshing
                && tracker.refresh_cycle == Some(cycle);
            if current {
                tracker.refresh_cycle = None;
            }
            current
        };
        if !current {
            log::debug!("refresh cycle {cycle} settled after reset, ignoring");
            return;
        }
        Self::hide_indicator(this);
    }

    /// Shrinks and fades the indicator, then resets after the scale-down delay.
    fn hide_indicator(this: &Shared) {
        let (has_sink, frame, delay, runtime) = {
            let inner = this.borrow();
            (
                inner.collaborators.sink.is_some(),
                IndicatorFrame {
                    opacity: 0.0,
                    ..inner.tracker.frame(HIDDEN_SCALE)
                },
                inner.settings.scale_down_duration,
                inner.runtime.clone(),
            )
        };
        if !has_sink {
            Self::reset(this);
            return;
        }

        Self::render_now(this, frame);
        let weak = Rc::downgrade(this);
        let registration = runtime.set_timeout(delay, move || {
            if let Some(this) = weak.upgrade() {
                Self::reset(&this);
            }
        });
        match registration {
            // Replacing the slot drops, and so clears, any earlier timeout.
            Some(registration) => {
                let previous = this
                    .borrow_mut()
                    .tracker
                    .pending_timeout
                    .replace(registration);
                drop(previous);
            }
            None => Self::reset(this),
        }
    }

    fn show_refreshing(this: &Shared) {
        let (frame, on_start) = {
            let mut guard = this.borrow_mut();
            let inner = &mut *guard;
            if inner.tracker.state == GestureState::Refreshing {
                return;
            }
            let progress_view_offset = inner.settings.progress_view_offset;
            let tracker = &mut inner.tracker;
            tracker.state = GestureState::Refreshing;
            tracker.start_y = None;
            tracker.movement_y = progress_view_offset;
            tracker.opacity = 1.0;
            tracker.rotation = 0.0;
            tracker.refresh_cycle = None;
            (tracker.frame(1.0), inner.settings.on_start_refresh.clone())
        };
        Self::queue_frame(this, frame);
        if let Some(on_start) = on_start {
            on_start();
        }
    }

    /// Back to idle: cancels pending work, parks the indicator synchronously
    /// and fires `on_end_refresh`.
    fn reset(this: &Shared) {
        let (pending_timeout, pending_frame, sink, frame, on_end) = {
            let mut guard = this.borrow_mut();
            let inner = &mut *guard;
            let resting_offset = inner.settings.resting_offset;
            let tracker = &mut inner.tracker;
            let pending_timeout = tracker.pending_timeout.take();
            let pending_frame = tracker.pending_frame.take();
            tracker.queued_frame = None;
            tracker.state = GestureState::Idle;
            tracker.start_y = None;
            tracker.movement_y = 0.0;
            tracker.opacity = 0.0;
            tracker.rotation = 0.0;
            tracker.refresh_cycle = None;
            (
                pending_timeout,
                pending_frame,
                inner.collaborators.sink.clone(),
                IndicatorFrame::resting(resting_offset),
                inner.settings.on_end_refresh.clone(),
            )
        };
        drop(pending_timeout);
        drop(pending_frame);
        log::trace!("swipe refresh reset");
        if let Some(sink) = sink {
            sink.render(frame.rounded());
        }
        if let Some(on_end) = on_end {
            on_end();
        }
    }

    /// Defers a sink write to the next animation frame. Writes queued before
    /// that frame collapse into the latest one.
    fn queue_frame(this: &Shared, frame: IndicatorFrame) {
        let runtime = {
            let mut inner = this.borrow_mut();
            if inner.collaborators.sink.is_none() {
                return;
            }
            inner.tracker.queued_frame = Some(frame);
            if inner.tracker.pending_frame.is_some() {
                return;
            }
            inner.runtime.clone()
        };
        let weak = Rc::downgrade(this);
        let registration = runtime.register_frame_callback(move |_| {
            if let Some(this) = weak.upgrade() {
                Self::flush_frame(&this);
            }
        });
        match registration {
            Some(registration) => this.borrow_mut().tracker.pending_frame = Some(registration),
            None => Self::flush_frame(this),
        }
    }

    fn flush_frame(this: &Shared) {
        let (registration, frame, sink) = {
            let mut inner = this.borrow_mut();
            (
                inner.tracker.pending_frame.take(),
                inner.tracker.queued_frame.take(),
                inner.collaborators.sink.clone(),
            )
        };
        drop(registration);
        if let (Some(frame), Some(sink)) = (frame, sink) {
            sink.render(frame.rounded());
        }
    }

    /// Writes immediately, discarding any deferred frame.
    fn render_now(this: &Shared, frame: IndicatorFrame) {
        let (registration, sink) = {
            let mut inner = this.borrow_mut();
            inner.tracker.queued_frame = None;
            (
                inner.tracker.pending_frame.take(),
                inner.collaborators.sink.clone(),
            )
        };
        drop(registration);
        if let Some(sink) = sink {
            sink.render(frame.rounded());
        }
    }

    fn report(this: &Shared, failure: &GestureFailure) {
        let diagnostics = this.borrow().collaborators.diagnostics.clone();
        diagnostics.report(failure);
    }
}

impl Drop for GestureCoordinator {
    fn drop(&mut self) {
        let detached = self
            .inner
            .try_borrow_mut()
            .ok()
            .and_then(|mut inner| {
                let ids = inner.listeners.take()?;
                let target = inner.collaborators.target.clone()?;
                Some((target, ids))
            });
        if let Some((target, ids)) = detached {
            for id in ids {
                target.remove_listener(id);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
