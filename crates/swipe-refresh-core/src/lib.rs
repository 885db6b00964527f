//! Pull-to-refresh gesture handling for touch scroll containers
//!
//! This crate turns raw touch events into indicator frames and refresh
//! invocations. Platform adapters supply the touch target, indicator sink and
//! frame scheduling; the logic here is platform independent.

pub mod collaborators;
pub mod controller;
pub mod coordinator;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod event;
pub mod indicator;
pub mod physics;
pub mod platform;
pub mod refresh;
pub mod runtime;
pub mod settings;

pub use collaborators::Collaborators;
pub use controller::SwipeRefreshController;
pub use coordinator::{GestureCoordinator, GestureSnapshot, GestureState};
pub use diagnostics::{Diagnostics, LogDiagnostics};
pub use environment::{
    AlwaysAtTop, EnvironmentOverride, ScrollPosition, PROGRESS_BACKGROUND_PROPERTY,
    PROGRESS_STROKE_PROPERTY,
};
pub use error::{GestureFailure, RefreshError, SettingsError};
pub use event::{
    ListenerId, ListenerOptions, TouchEvent, TouchEventKind, TouchHandler, TouchPoint, TouchTarget,
};
pub use indicator::{IndicatorFrame, VisualSink, HIDDEN_SCALE};
pub use physics::{round_significant, DisplacementCurve};
pub use platform::{DefaultScheduler, RuntimeScheduler};
pub use refresh::{refresh_action, RefreshAction, RefreshFuture, RefreshResult};
pub use runtime::{
    FrameCallbackRegistration, Runtime, RuntimeHandle, TaskHandle, TimeoutRegistration,
};
pub use settings::SwipeRefreshSettings;

pub mod prelude {
    pub use crate::{
        refresh_action, Collaborators, GestureCoordinator, GestureState, IndicatorFrame,
        RefreshError, Runtime, SwipeRefreshController, SwipeRefreshSettings, TouchEvent,
        TouchTarget, VisualSink,
    };
}
