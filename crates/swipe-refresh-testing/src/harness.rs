//! Robot-style harness driving a coordinator through a deterministic runtime.
//!
//! # Example
//!
//! ```
//! use swipe_refresh_testing::SwipeHarness;
//!
//! let harness = SwipeHarness::new();
//! let coordinator = harness.coordinator();
//!
//! harness.robot().pull(100.0, 200.0);
//! harness.refresh.resolve();
//! harness.run_for(std::time::Duration::from_millis(400));
//!
//! assert!(!coordinator.is_refreshing());
//! assert_eq!(harness.refresh.calls(), 1);
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use swipe_refresh_core::{
    Collaborators, DefaultScheduler, GestureCoordinator, Runtime, SwipeRefreshController,
    SwipeRefreshSettings, TouchEvent, TouchEventKind, TouchPoint,
};

use crate::fakes::{
    CallCounter, ControlledRefresh, FakeTouchTarget, ManualScroll, RecordingDiagnostics,
    RecordingEnvironment, RecordingSink,
};

/// Duration of one simulated animation frame.
pub const FRAME: Duration = Duration::from_millis(16);

/// Bundles a runtime with one of every fake.
///
/// Time only moves when the test calls [`advance`](Self::advance) or one of
/// its wrappers.
pub struct SwipeHarness {
    pub runtime: Runtime,
    pub target: Rc<FakeTouchTarget>,
    pub sink: Rc<RecordingSink>,
    pub scroll: Rc<ManualScroll>,
    pub environment: Rc<RecordingEnvironment>,
    pub diagnostics: Rc<RecordingDiagnostics>,
    pub refresh: Rc<ControlledRefresh>,
    pub started: CallCounter,
    pub ended: CallCounter,
    now: Cell<Duration>,
}

impl Default for SwipeHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl SwipeHarness {
    pub fn new() -> Self {
        Self {
            runtime: Runtime::new(Rc::new(DefaultScheduler)),
            target: FakeTouchTarget::new(),
            sink: RecordingSink::new(),
            scroll: ManualScroll::new(),
            environment: RecordingEnvironment::new(),
            diagnostics: RecordingDiagnostics::new(),
            refresh: ControlledRefresh::new(),
            started: CallCounter::new(),
            ended: CallCounter::new(),
            now: Cell::new(Duration::ZERO),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new()
            .with_target(self.target.clone())
            .with_sink(self.sink.clone())
            .with_scroll(self.scroll.clone())
            .with_environment(self.environment.clone())
            .with_diagnostics(self.diagnostics.clone())
    }

    /// Default settings with the lifecycle callbacks wired to the counters.
    pub fn settings(&self) -> SwipeRefreshSettings {
        SwipeRefreshSettings::default()
            .on_start_refresh(self.started.callback())
            .on_end_refresh(self.ended.callback())
    }

    /// Registered coordinator with default settings.
    pub fn coordinator(&self) -> GestureCoordinator {
        self.coordinator_with(self.settings())
    }

    /// Registered coordinator.
    ///
    /// # Panics
    ///
    /// If `settings` fail validation.
    pub fn coordinator_with(&self, settings: SwipeRefreshSettings) -> GestureCoordinator {
        let coordinator = GestureCoordinator::new(
            self.runtime.handle(),
            self.collaborators(),
            self.refresh.action(),
            settings,
        )
        .unwrap_or_else(|err| panic!("invalid settings: {err}"));
        coordinator.register_listeners();
        coordinator
    }

    /// Disabled controller with default settings.
    pub fn controller(&self) -> SwipeRefreshController {
        SwipeRefreshController::new(
            self.runtime.handle(),
            self.collaborators(),
            self.refresh.action(),
            self.settings(),
        )
        .unwrap_or_else(|err| panic!("invalid settings: {err}"))
    }

    pub fn robot(&self) -> SwipeRobot<'_> {
        SwipeRobot { harness: self }
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Moves time forward by `delta` and pumps once.
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
        self.runtime.pump(self.now.get());
    }

    pub fn frame(&self) {
        self.advance(FRAME);
    }

    pub fn frames(&self, count: usize) {
        for _ in 0..count {
            self.frame();
        }
    }

    /// Pumps frame by frame until `duration` has elapsed.
    pub fn run_for(&self, duration: Duration) {
        let deadline = self.now.get() + duration;
        while self.now.get() < deadline {
            let step = FRAME.min(deadline - self.now.get());
            self.advance(step);
        }
    }

    /// Pumps frames until the runtime has nothing left, up to `max_frames`.
    ///
    /// Returns whether the runtime went idle.
    pub fn wait_for_idle(&self, max_frames: usize) -> bool {
        for _ in 0..max_frames {
            if !self.runtime.needs_frame() {
                return true;
            }
            self.frame();
        }
        !self.runtime.needs_frame()
    }
}

/// Finger gestures against the harness target.
pub struct SwipeRobot<'a> {
    harness: &'a SwipeHarness,
}

impl SwipeRobot<'_> {
    pub fn touch_start(&self, y: f32) -> &Self {
        self.harness.target.dispatch(&TouchEvent::start(y));
        self
    }

    pub fn touch_move(&self, y: f32) -> &Self {
        self.harness.target.dispatch(&TouchEvent::moved(y));
        self
    }

    pub fn touch_end(&self) -> &Self {
        self.harness.target.dispatch(&TouchEvent::end());
        self
    }

    pub fn touch_cancel(&self) -> &Self {
        self.harness.target.dispatch(&TouchEvent::cancel());
        self
    }

    /// Two fingers down at once.
    pub fn pinch_start(&self, y: f32) -> &Self {
        self.harness.target.dispatch(&TouchEvent::new(
            TouchEventKind::Start,
            [TouchPoint::new(0, 0.0, y), TouchPoint::new(1, 40.0, y)],
        ));
        self
    }

    /// Start, single move to `to`, no release.
    pub fn drag(&self, from: f32, to: f32) -> &Self {
        self.touch_start(from).touch_move(to)
    }

    /// Start at `from`, move in `steps` even increments to `to`, pumping a
    /// frame after each move. No release.
    pub fn drag_in_steps(&self, from: f32, to: f32, steps: usize) -> &Self {
        self.touch_start(from);
        let steps = steps.max(1);
        for step in 1..=steps {
            let y = from + (to - from) * step as f32 / steps as f32;
            self.touch_move(y);
            self.harness.frame();
        }
        self
    }

    /// Drag and release.
    pub fn pull(&self, from: f32, to: f32) -> &Self {
        self.drag(from, to).touch_end()
    }
}
