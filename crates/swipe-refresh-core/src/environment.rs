//! Host capabilities outside the scroll container itself.

/// Custom property carrying the indicator background color.
pub const PROGRESS_BACKGROUND_PROPERTY: &str = "--sdr-progress-background";
/// Custom property carrying the indicator stroke color.
pub const PROGRESS_STROKE_PROPERTY: &str = "--sdr-progress-stroke";

/// Page-wide overrides applied for as long as swipe-to-refresh is enabled.
///
/// The coordinator calls these from its constructor and reverts them from
/// `cleanup`. Passing no environment turns both into no-ops, which is what
/// tests and hosts without a document want.
pub trait EnvironmentOverride {
    /// Suppress the browser's own overscroll / pull-to-refresh.
    fn disable_overscroll(&self);

    fn restore_overscroll(&self);

    fn set_custom_property(&self, name: &str, value: &str);

    fn remove_custom_property(&self, name: &str);
}

/// Reports how far the host container is scrolled from its top.
pub trait ScrollPosition {
    /// `None` when the position cannot be read; treated as "not at top".
    fn scroll_top(&self) -> Option<f32>;
}

impl<F> ScrollPosition for F
where
    F: Fn() -> Option<f32>,
{
    fn scroll_top(&self) -> Option<f32> {
        self()
    }
}

/// Scroll provider for containers that can never scroll.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAtTop;

impl ScrollPosition for AlwaysAtTop {
    fn scroll_top(&self) -> Option<f32> {
        Some(0.0)
    }
}
