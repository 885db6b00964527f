//! The objects a coordinator is bound to.

use std::fmt;
use std::rc::Rc;

use crate::diagnostics::{Diagnostics, LogDiagnostics};
use crate::environment::{EnvironmentOverride, ScrollPosition};
use crate::event::TouchTarget;
use crate::indicator::VisualSink;

/// Everything besides settings and the refresh action.
///
/// `target` and `sink` are optional because the host may not have mounted
/// the elements yet; operations needing them become no-ops.
#[derive(Clone)]
pub struct Collaborators {
    pub target: Option<Rc<dyn TouchTarget>>,
    pub sink: Option<Rc<dyn VisualSink>>,
    /// Platform default, consulted when settings carry no override.
    pub scroll: Option<Rc<dyn ScrollPosition>>,
    pub environment: Option<Rc<dyn EnvironmentOverride>>,
    pub diagnostics: Rc<dyn Diagnostics>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            target: None,
            sink: None,
            scroll: None,
            environment: None,
            diagnostics: Rc::new(LogDiagnostics),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("target", &self.target.is_some())
            .field("sink", &self.sink.is_some())
            .field("scroll", &self.scroll.is_some())
            .field("environment", &self.environment.is_some())
            .finish()
    }
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: Rc<dyn TouchTarget>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_sink(mut self, sink: Rc<dyn VisualSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_scroll(mut self, scroll: Rc<dyn ScrollPosition>) -> Self {
        self.scroll = Some(scroll);
        self
    }

    pub fn with_environment(mut self, environment: Rc<dyn EnvironmentOverride>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Rc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}
