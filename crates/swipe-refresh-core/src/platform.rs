//! Platform abstraction traits for the swipe-refresh runtime.
//!
//! The coordinator never talks to an event loop directly. It queues frame
//! callbacks, timeouts and refresh tasks on a [`Runtime`](crate::Runtime),
//! and the host decides when that runtime gets pumped.

/// Asks the host to pump the runtime.
///
/// Called whenever new work is queued and whenever a spawned task is woken on
/// the UI thread. Implementations typically request an animation frame and
/// call [`Runtime::pump`](crate::Runtime::pump) from it. Everything runs on
/// the UI thread, so no `Send` bound is required.
pub trait RuntimeScheduler {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);
}

/// Scheduler for hosts that pump the runtime on their own cadence.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}
