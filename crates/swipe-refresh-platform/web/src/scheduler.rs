use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use swipe_refresh_core::{RuntimeHandle, RuntimeScheduler};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

/// Pumps a runtime from `requestAnimationFrame`.
///
/// One frame is requested at a time. After each pump another is requested
/// while frame callbacks or timeouts are outstanding, since runtime time only
/// advances on a pump. Pending refresh promises do not keep the loop alive;
/// their wakers request a frame when they settle.
pub struct AnimationFrameScheduler {
    window: Window,
    runtime: RefCell<Option<RuntimeHandle>>,
    scheduled: Cell<bool>,
    this: Weak<AnimationFrameScheduler>,
}

impl AnimationFrameScheduler {
    pub fn new(window: Window) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            window,
            runtime: RefCell::new(None),
            scheduled: Cell::new(false),
            this: this.clone(),
        })
    }

    /// Sets the runtime to pump. The runtime is created with this scheduler,
    /// so it can only be bound afterwards.
    pub fn bind(&self, runtime: RuntimeHandle) {
        *self.runtime.borrow_mut() = Some(runtime);
    }

    fn run_frame(&self) {
        self.scheduled.set(false);
        let runtime = self
            .runtime
            .borrow()
            .as_ref()
            .and_then(RuntimeHandle::upgrade);
        let Some(runtime) = runtime else {
            return;
        };
        runtime.pump_now();
        if runtime.has_frame_callbacks() || runtime.has_pending_timeouts() {
            self.schedule_frame();
        }
    }
}

impl RuntimeScheduler for AnimationFrameScheduler {
    fn schedule_frame(&self) {
        if self.scheduled.replace(true) {
            return;
        }
        let this = self.this.clone();
        let callback = Closure::once_into_js(move |_timestamp: f64| {
            if let Some(this) = this.upgrade() {
                this.run_frame();
            }
        });
        if let Err(err) = self
            .window
            .request_animation_frame(callback.unchecked_ref())
        {
            self.scheduled.set(false);
            log::warn!("requestAnimationFrame failed: {:?}", err);
        }
    }
}
