//! In-memory collaborators that record what the coordinator does to them.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use swipe_refresh_core::{
    Diagnostics, EnvironmentOverride, GestureFailure, IndicatorFrame, ListenerId,
    ListenerOptions, RefreshAction, RefreshError, RefreshFuture, RefreshResult, ScrollPosition,
    TouchEvent, TouchEventKind, TouchHandler, TouchTarget, VisualSink,
};

struct Listener {
    id: ListenerId,
    kind: TouchEventKind,
    options: ListenerOptions,
    handler: TouchHandler,
}

/// Touch target that dispatches synthetic events to whatever is attached.
#[derive(Default)]
pub struct FakeTouchTarget {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
    added: Cell<usize>,
    removed: Cell<usize>,
}

impl FakeTouchTarget {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Delivers `event` to every listener of its kind, in registration order.
    pub fn dispatch(&self, event: &TouchEvent) {
        let handlers: Vec<TouchHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.kind == event.kind)
            .map(|listener| Rc::clone(&listener.handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn listeners_of(&self, kind: TouchEventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|listener| listener.kind == kind)
            .count()
    }

    pub fn options_for(&self, kind: TouchEventKind) -> Option<ListenerOptions> {
        self.listeners
            .borrow()
            .iter()
            .find(|listener| listener.kind == kind)
            .map(|listener| listener.options)
    }

    /// Total `add_listener` calls so far.
    pub fn added(&self) -> usize {
        self.added.get()
    }

    /// Total `remove_listener` calls that matched a live listener.
    pub fn removed(&self) -> usize {
        self.removed.get()
    }
}

impl TouchTarget for FakeTouchTarget {
    fn add_listener(
        &self,
        kind: TouchEventKind,
        options: ListenerOptions,
        handler: TouchHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.added.set(self.added.get() + 1);
        self.listeners.borrow_mut().push(Listener {
            id,
            kind,
            options,
            handler,
        });
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        if listeners.len() != before {
            self.removed.set(self.removed.get() + 1);
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    frames: RefCell<Vec<IndicatorFrame>>,
}

impl RecordingSink {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<IndicatorFrame> {
        self.frames.borrow().clone()
    }

    pub fn last(&self) -> Option<IndicatorFrame> {
        self.frames.borrow().last().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.frames.borrow_mut().clear();
    }
}

impl VisualSink for RecordingSink {
    fn render(&self, frame: IndicatorFrame) {
        log::trace!("render {}", frame.transform_css());
        self.frames.borrow_mut().push(frame);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvironmentCall {
    DisableOverscroll,
    RestoreOverscroll,
    SetProperty { name: String, value: String },
    RemoveProperty { name: String },
}

#[derive(Default)]
pub struct RecordingEnvironment {
    calls: RefCell<Vec<EnvironmentCall>>,
}

impl RecordingEnvironment {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<EnvironmentCall> {
        self.calls.borrow().clone()
    }

    /// Whether overscroll is currently suppressed, replaying the call log.
    pub fn overscroll_disabled(&self) -> bool {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find_map(|call| match call {
                EnvironmentCall::DisableOverscroll => Some(true),
                EnvironmentCall::RestoreOverscroll => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Current value of a custom property, replaying the call log.
    pub fn property(&self, name: &str) -> Option<String> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find_map(|call| match call {
                EnvironmentCall::SetProperty { name: set, value } if set == name => {
                    Some(Some(value.clone()))
                }
                EnvironmentCall::RemoveProperty { name: removed } if removed == name => {
                    Some(None)
                }
                _ => None,
            })
            .flatten()
    }
}

impl EnvironmentOverride for RecordingEnvironment {
    fn disable_overscroll(&self) {
        self.calls
            .borrow_mut()
            .push(EnvironmentCall::DisableOverscroll);
    }

    fn restore_overscroll(&self) {
        self.calls
            .borrow_mut()
            .push(EnvironmentCall::RestoreOverscroll);
    }

    fn set_custom_property(&self, name: &str, value: &str) {
        self.calls.borrow_mut().push(EnvironmentCall::SetProperty {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_custom_property(&self, name: &str) {
        self.calls.borrow_mut().push(EnvironmentCall::RemoveProperty {
            name: name.to_string(),
        });
    }
}

/// Scroll position the test moves by hand. Starts at the top.
pub struct ManualScroll {
    top: Cell<Option<f32>>,
}

impl Default for ManualScroll {
    fn default() -> Self {
        Self {
            top: Cell::new(Some(0.0)),
        }
    }
}

impl ManualScroll {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn scroll_to(&self, top: f32) {
        self.top.set(Some(top));
    }

    /// Simulates a container whose position cannot be read.
    pub fn detach(&self) {
        self.top.set(None);
    }
}

impl ScrollPosition for ManualScroll {
    fn scroll_top(&self) -> Option<f32> {
        self.top.get()
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    failures: RefCell<Vec<GestureFailure>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn failures(&self) -> Vec<GestureFailure> {
        self.failures.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.borrow().is_empty()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, failure: &GestureFailure) {
        self.failures.borrow_mut().push(failure.clone());
    }
}

#[derive(Default)]
struct RefreshSlot {
    result: RefCell<Option<RefreshResult>>,
    waker: RefCell<Option<Waker>>,
}

impl RefreshSlot {
    fn settle(&self, result: RefreshResult) {
        *self.result.borrow_mut() = Some(result);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    fn is_settled(&self) -> bool {
        self.result.borrow().is_some()
    }
}

struct ControlledFuture {
    slot: Rc<RefreshSlot>,
}

impl Future for ControlledFuture {
    type Output = RefreshResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<RefreshResult> {
        match self.slot.result.borrow_mut().take() {
            Some(result) => Poll::Ready(result),
            None => {
                *self.slot.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// Refresh action whose futures stay pending until the test settles them.
#[derive(Default)]
pub struct ControlledRefresh {
    pending: RefCell<Vec<Rc<RefreshSlot>>>,
    calls: Cell<usize>,
}

impl ControlledRefresh {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn action(self: &Rc<Self>) -> RefreshAction {
        let this = Rc::clone(self);
        Rc::new(move || -> RefreshFuture {
            this.calls.set(this.calls.get() + 1);
            let slot = Rc::new(RefreshSlot::default());
            this.pending.borrow_mut().push(Rc::clone(&slot));
            Box::pin(ControlledFuture { slot })
        })
    }

    /// How many times the action was invoked.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn pending(&self) -> usize {
        self.pending
            .borrow()
            .iter()
            .filter(|slot| !slot.is_settled())
            .count()
    }

    /// Fulfils every outstanding invocation.
    pub fn resolve(&self) {
        self.settle_all(|| Ok(()));
    }

    /// Rejects every outstanding invocation with `message`.
    pub fn reject(&self, message: &str) {
        self.settle_all(|| Err(RefreshError::new(message)));
    }

    fn settle_all(&self, result: impl Fn() -> RefreshResult) {
        let slots = std::mem::take(&mut *self.pending.borrow_mut());
        for slot in slots {
            slot.settle(result());
        }
    }
}

/// Counts invocations of a lifecycle callback.
#[derive(Clone, Default)]
pub struct CallCounter {
    count: Rc<Cell<usize>>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl Fn() + 'static {
        let count = Rc::clone(&self.count);
        move || count.set(count.get() + 1)
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}
