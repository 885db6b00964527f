//! Single-threaded cooperative runtime.
//!
//! Holds the three kinds of deferred work the coordinator needs: animation
//! frame callbacks, settle timeouts and the refresh futures. Nothing here
//! runs on its own; the host calls [`Runtime::pump`] (usually from
//! `requestAnimationFrame`) and every callback executes inside that call on
//! the UI thread.
//!
//! Time is whatever the host passes to `pump`. Timeouts are measured from the
//! most recently pumped instant, which keeps tests fully deterministic.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, ThreadId};
use std::thread_local;
use std::time::Duration;

use web_time::Instant;

use crate::platform::RuntimeScheduler;

pub type FrameCallbackId = u64;
pub type TimeoutId = u64;
pub type TaskId = u64;

type FrameCallback = Box<dyn FnOnce(Duration) + 'static>;
type TimeoutCallback = Box<dyn FnOnce() + 'static>;
type TaskFuture = Pin<Box<dyn Future<Output = ()> + 'static>>;

struct FrameCallbackEntry {
    id: FrameCallbackId,
    callback: Option<FrameCallback>,
}

struct TimeoutEntry {
    id: TimeoutId,
    deadline: Duration,
    callback: TimeoutCallback,
}

struct TaskEntry {
    id: TaskId,
    future: TaskFuture,
}

struct RuntimeInner {
    id: u64,
    scheduler: Rc<dyn RuntimeScheduler>,
    origin: Instant,
    now: Cell<Duration>,
    frame_callbacks: RefCell<VecDeque<FrameCallbackEntry>>,
    next_frame_callback_id: Cell<u64>,
    timeouts: RefCell<Vec<TimeoutEntry>>,
    next_timeout_id: Cell<u64>,
    tasks: RefCell<Vec<TaskEntry>>,
    next_task_id: Cell<u64>,
    woken: Arc<AtomicBool>,
    task_waker: Waker,
}

impl RuntimeInner {
    fn new(scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        let id = NEXT_RUNTIME_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        let woken = Arc::new(AtomicBool::new(false));
        let task_waker = RuntimeTaskWaker::new(id, Arc::clone(&woken)).into_waker();
        Self {
            id,
            scheduler,
            origin: Instant::now(),
            now: Cell::new(Duration::ZERO),
            frame_callbacks: RefCell::new(VecDeque::new()),
            next_frame_callback_id: Cell::new(1),
            timeouts: RefCell::new(Vec::new()),
            next_timeout_id: Cell::new(1),
            tasks: RefCell::new(Vec::new()),
            next_task_id: Cell::new(1),
            woken,
            task_waker,
        }
    }

    fn schedule(&self) {
        self.scheduler.schedule_frame();
    }

    fn register_frame_callback(&self, callback: FrameCallback) -> FrameCallbackId {
        let id = self.next_frame_callback_id.get();
        self.next_frame_callback_id.set(id + 1);
        self.frame_callbacks
            .borrow_mut()
            .push_back(FrameCallbackEntry {
                id,
                callback: Some(callback),
            });
        self.schedule();
        id
    }

    fn cancel_frame_callback(&self, id: FrameCallbackId) {
        let mut callbacks = self.frame_callbacks.borrow_mut();
        if let Some(index) = callbacks.iter().position(|entry| entry.id == id) {
            callbacks.remove(index);
        }
    }

    fn set_timeout(&self, delay: Duration, callback: TimeoutCallback) -> TimeoutId {
        let id = self.next_timeout_id.get();
        self.next_timeout_id.set(id + 1);
        let deadline = self.now.get() + delay;
        self.timeouts.borrow_mut().push(TimeoutEntry {
            id,
            deadline,
            callback,
        });
        self.schedule();
        id
    }

    fn clear_timeout(&self, id: TimeoutId) {
        self.timeouts.borrow_mut().retain(|entry| entry.id != id);
    }

    fn spawn_ui_task(&self, future: TaskFuture) -> TaskId {
        let id = self.next_task_id.get();
        self.next_task_id.set(id + 1);
        self.tasks.borrow_mut().push(TaskEntry { id, future });
        // A fresh task has never been polled, treat it as woken.
        self.woken.store(true, Ordering::SeqCst);
        self.schedule();
        id
    }

    fn cancel_task(&self, id: TaskId) {
        let mut tasks = self.tasks.borrow_mut();
        if tasks.iter().any(|entry| entry.id == id) {
            tasks.retain(|entry| entry.id != id);
        }
    }

    fn drain_frame_callbacks(&self) {
        let frame_time = self.now.get();
        let mut callbacks = self.frame_callbacks.borrow_mut();
        let mut pending: Vec<FrameCallback> = Vec::with_capacity(callbacks.len());
        while let Some(mut entry) = callbacks.pop_front() {
            if let Some(callback) = entry.callback.take() {
                pending.push(callback);
            }
        }
        drop(callbacks);
        for callback in pending {
            callback(frame_time);
        }
    }

    fn fire_due_timeouts(&self) {
        let now = self.now.get();
        // Timeouts created by callbacks in this pass wait for the next pump.
        let last_id = self.next_timeout_id.get();
        loop {
            let next = {
                let mut timeouts = self.timeouts.borrow_mut();
                let index = timeouts
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.deadline <= now && entry.id < last_id)
                    .min_by_key(|(_, entry)| (entry.deadline, entry.id))
                    .map(|(index, _)| index);
                index.map(|index| timeouts.swap_remove(index))
            };
            match next {
                // Looked up one at a time so a callback can still clear a later one.
                Some(entry) => (entry.callback)(),
                None => break,
            }
        }
    }

    fn poll_async_tasks(&self) -> bool {
        if !self.woken.swap(false, Ordering::SeqCst) {
            return false;
        }
        let mut cx = Context::from_waker(&self.task_waker);
        let mut tasks_ref = self.tasks.borrow_mut();
        let tasks = std::mem::take(&mut *tasks_ref);
        drop(tasks_ref);
        let mut pending = Vec::with_capacity(tasks.len());
        let mut made_progress = false;
        for mut entry in tasks.into_iter() {
            match entry.future.as_mut().poll(&mut cx) {
                Poll::Ready(()) => {
                    made_progress = true;
                }
                Poll::Pending => {
                    pending.push(entry);
                }
            }
        }
        if !pending.is_empty() {
            // Tasks spawned while polling were pushed into the emptied vector.
            let mut tasks = self.tasks.borrow_mut();
            pending.append(&mut tasks);
            *tasks = pending;
        }
        made_progress
    }

    fn has_frame_callbacks(&self) -> bool {
        !self.frame_callbacks.borrow().is_empty()
    }

    fn has_timeouts(&self) -> bool {
        !self.timeouts.borrow().is_empty()
    }

    fn has_tasks(&self) -> bool {
        !self.tasks.borrow().is_empty()
    }
}

/// Owner of the runtime state. Dropping it invalidates every handle.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("now", &self.inner.now.get())
            .field("frame_callbacks", &self.inner.frame_callbacks.borrow().len())
            .field("timeouts", &self.inner.timeouts.borrow().len())
            .field("tasks", &self.inner.tasks.borrow().len())
            .finish()
    }
}

impl Runtime {
    pub fn new(scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        let inner = Rc::new(RuntimeInner::new(scheduler));
        WAKE_TARGETS.with(|targets| {
            targets
                .borrow_mut()
                .push((inner.id, Rc::downgrade(&inner)));
        });
        Self { inner }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Last instant passed to [`pump`](Self::pump), relative to runtime creation.
    pub fn now(&self) -> Duration {
        self.inner.now.get()
    }

    /// Runs one frame worth of work at `now`.
    ///
    /// Order: frame callbacks registered before this call, then timeouts whose
    /// deadline has passed, then woken tasks. Work queued by those callbacks
    /// waits for the next pump. Time never moves backwards; an earlier `now`
    /// is clamped to the last pumped instant.
    pub fn pump(&self, now: Duration) {
        let now = now.max(self.inner.now.get());
        self.inner.now.set(now);
        self.inner.drain_frame_callbacks();
        self.inner.fire_due_timeouts();
        while self.inner.poll_async_tasks() {}
    }

    /// Pumps with the wall-clock time elapsed since the runtime was created.
    pub fn pump_now(&self) {
        self.pump(self.inner.origin.elapsed());
    }

    /// Whether any frame callback, timeout or task is still outstanding.
    pub fn needs_frame(&self) -> bool {
        self.inner.has_frame_callbacks() || self.inner.has_timeouts() || self.inner.has_tasks()
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.inner.has_tasks()
    }

    pub fn has_pending_timeouts(&self) -> bool {
        self.inner.has_timeouts()
    }

    pub fn has_frame_callbacks(&self) -> bool {
        self.inner.has_frame_callbacks()
    }
}

/// Weak, cloneable access to a [`Runtime`].
///
/// Every registering method returns `None` once the runtime is gone.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn now(&self) -> Option<Duration> {
        self.inner.upgrade().map(|inner| inner.now.get())
    }

    /// Strong runtime, for schedulers that pump it.
    pub fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }

    /// Runs `callback` on the next pump.
    pub fn register_frame_callback(
        &self,
        callback: impl FnOnce(Duration) + 'static,
    ) -> Option<FrameCallbackRegistration> {
        let inner = self.inner.upgrade()?;
        let id = inner.register_frame_callback(Box::new(callback));
        Some(FrameCallbackRegistration {
            runtime: self.clone(),
            id: Some(id),
        })
    }

    pub fn cancel_frame_callback(&self, id: FrameCallbackId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel_frame_callback(id);
        }
    }

    /// Runs `callback` on the first pump at least `delay` after the current instant.
    pub fn set_timeout(
        &self,
        delay: Duration,
        callback: impl FnOnce() + 'static,
    ) -> Option<TimeoutRegistration> {
        let inner = self.inner.upgrade()?;
        let id = inner.set_timeout(delay, Box::new(callback));
        Some(TimeoutRegistration {
            runtime: self.clone(),
            id: Some(id),
        })
    }

    pub fn clear_timeout(&self, id: TimeoutId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.clear_timeout(id);
        }
    }

    /// Spawns a future polled from [`Runtime::pump`].
    ///
    /// Dropping the returned handle does not cancel the task.
    pub fn spawn_ui<F>(&self, fut: F) -> Option<TaskHandle>
    where
        F: Future<Output = ()> + 'static,
    {
        self.inner.upgrade().map(|inner| {
            let id = inner.spawn_ui_task(Box::pin(fut));
            TaskHandle {
                id,
                runtime: self.clone(),
            }
        })
    }

    pub fn cancel_task(&self, id: TaskId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel_task(id);
        }
    }
}

/// Pending frame callback; dropping it cancels the callback.
pub struct FrameCallbackRegistration {
    runtime: RuntimeHandle,
    id: Option<FrameCallbackId>,
}

impl FrameCallbackRegistration {
    pub fn id(&self) -> Option<FrameCallbackId> {
        self.id
    }

    pub fn cancel(mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.cancel_frame_callback(id);
        }
    }
}

impl Drop for FrameCallbackRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.cancel_frame_callback(id);
        }
    }
}

impl fmt::Debug for FrameCallbackRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrameCallbackRegistration")
            .field(&self.id)
            .finish()
    }
}

/// Pending timeout; dropping it clears the timeout.
pub struct TimeoutRegistration {
    runtime: RuntimeHandle,
    id: Option<TimeoutId>,
}

impl TimeoutRegistration {
    pub fn id(&self) -> Option<TimeoutId> {
        self.id
    }

    pub fn cancel(mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.clear_timeout(id);
        }
    }
}

impl Drop for TimeoutRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.clear_timeout(id);
        }
    }
}

impl fmt::Debug for TimeoutRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimeoutRegistration").field(&self.id).finish()
    }
}

#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    runtime: RuntimeHandle,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancel(self) {
        self.runtime.cancel_task(self.id);
    }
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        let id = self.id;
        // The thread-local may already be gone during thread teardown.
        let _ = WAKE_TARGETS.try_with(|targets| {
            targets.borrow_mut().retain(|(target, _)| *target != id);
        });
    }
}

thread_local! {
    static NEXT_RUNTIME_ID: Cell<u64> = const { Cell::new(1) };
    static WAKE_TARGETS: RefCell<Vec<(u64, Weak<RuntimeInner>)>> = const { RefCell::new(Vec::new()) };
}

fn request_frame_for(runtime_id: u64) {
    let inner = WAKE_TARGETS
        .try_with(|targets| {
            targets
                .borrow()
                .iter()
                .find(|(target, _)| *target == runtime_id)
                .and_then(|(_, inner)| inner.upgrade())
        })
        .ok()
        .flatten();
    if let Some(inner) = inner {
        inner.schedule();
    }
}

struct RuntimeTaskWaker {
    runtime_id: u64,
    ui_thread: ThreadId,
    woken: Arc<AtomicBool>,
}

impl RuntimeTaskWaker {
    fn new(runtime_id: u64, woken: Arc<AtomicBool>) -> Self {
        Self {
            runtime_id,
            ui_thread: thread::current().id(),
            woken,
        }
    }

    fn into_waker(self) -> Waker {
        futures_task::waker(Arc::new(self))
    }
}

impl futures_task::ArcWake for RuntimeTaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.woken.store(true, Ordering::SeqCst);
        // Off the UI thread only the flag is set; the next pump picks it up.
        if thread::current().id() == arc_self.ui_thread {
            request_frame_for(arc_self.runtime_id);
        }
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
