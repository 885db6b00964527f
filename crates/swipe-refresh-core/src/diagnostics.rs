//! Where swallowed failures go.

use crate::error::GestureFailure;

/// Receives failures that must not abort a gesture.
pub trait Diagnostics {
    fn report(&self, failure: &GestureFailure);
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, failure: &GestureFailure) {
        match failure {
            // Rejections are the caller's business; they observe their own future.
            GestureFailure::RefreshRejected(_) => {
                log::debug!("{failure}");
            }
            _ => log::warn!("swipe refresh: {failure}"),
        }
    }
}
