//! Coordinator configuration.
//!
//! Every field has a default, so hosts usually start from
//! `SwipeRefreshSettings::default()` and chain `with_*` calls. String
//! attributes (for example HTML `data-*` attributes) go through
//! [`SwipeRefreshSettings::apply_attribute`].

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::error::SettingsError;
use crate::physics::DisplacementCurve;

pub const DEFAULT_SLINGSHOT_DISTANCE: f32 = 60.0;
pub const DEFAULT_THRESHOLD: f32 = 0.0;
pub const DEFAULT_PROGRESS_VIEW_OFFSET: f32 = 30.0;
pub const RESTING_OFFSET: f32 = -30.0;
pub const DEFAULT_DAMPING_EXPONENT: f32 = 0.5;
pub const SCALE_DOWN_DURATION: Duration = Duration::from_millis(300);

pub type LifecycleCallback = Rc<dyn Fn()>;
pub type ScrollTopOverride = Rc<dyn Fn() -> f32>;

#[derive(Clone)]
pub struct SwipeRefreshSettings {
    /// Travel past the threshold needed to commit a refresh.
    pub slingshot_distance: f32,
    /// Minimum travel before a touch counts as a drag.
    pub threshold: f32,
    /// Indicator offset while the refresh runs.
    pub progress_view_offset: f32,
    /// Indicator offset while hidden.
    pub resting_offset: f32,
    /// Length of the shrink-and-fade after a refresh completes.
    pub scale_down_duration: Duration,
    pub damping_exponent: f32,
    pub progress_background_color: Option<String>,
    pub progress_stroke_color: Option<String>,
    pub override_browser_refresh: bool,
    pub on_start_refresh: Option<LifecycleCallback>,
    pub on_end_refresh: Option<LifecycleCallback>,
    pub scroll_top_override: Option<ScrollTopOverride>,
}

impl Default for SwipeRefreshSettings {
    fn default() -> Self {
        Self {
            slingshot_distance: DEFAULT_SLINGSHOT_DISTANCE,
            threshold: DEFAULT_THRESHOLD,
            progress_view_offset: DEFAULT_PROGRESS_VIEW_OFFSET,
            resting_offset: RESTING_OFFSET,
            scale_down_duration: SCALE_DOWN_DURATION,
            damping_exponent: DEFAULT_DAMPING_EXPONENT,
            progress_background_color: None,
            progress_stroke_color: None,
            override_browser_refresh: true,
            on_start_refresh: None,
            on_end_refresh: None,
            scroll_top_override: None,
        }
    }
}

impl fmt::Debug for SwipeRefreshSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwipeRefreshSettings")
            .field("slingshot_distance", &self.slingshot_distance)
            .field("threshold", &self.threshold)
            .field("progress_view_offset", &self.progress_view_offset)
            .field("resting_offset", &self.resting_offset)
            .field("scale_down_duration", &self.scale_down_duration)
            .field("damping_exponent", &self.damping_exponent)
            .field("progress_background_color", &self.progress_background_color)
            .field("progress_stroke_color", &self.progress_stroke_color)
            .field("override_browser_refresh", &self.override_browser_refresh)
            .field("on_start_refresh", &self.on_start_refresh.is_some())
            .field("on_end_refresh", &self.on_end_refresh.is_some())
            .field("scroll_top_override", &self.scroll_top_override.is_some())
            .finish()
    }
}

impl SwipeRefreshSettings {
    pub fn with_slingshot_distance(mut self, distance: f32) -> Self {
        self.slingshot_distance = distance;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_progress_view_offset(mut self, offset: f32) -> Self {
        self.progress_view_offset = offset;
        self
    }

    pub fn with_resting_offset(mut self, offset: f32) -> Self {
        self.resting_offset = offset;
        self
    }

    pub fn with_scale_down_duration(mut self, duration: Duration) -> Self {
        self.scale_down_duration = duration;
        self
    }

    pub fn with_damping_exponent(mut self, exponent: f32) -> Self {
        self.damping_exponent = exponent;
        self
    }

    pub fn with_progress_background_color(mut self, color: impl Into<String>) -> Self {
        self.progress_background_color = Some(color.into());
        self
    }

    pub fn with_progress_stroke_color(mut self, color: impl Into<String>) -> Self {
        self.progress_stroke_color = Some(color.into());
        self
    }

    pub fn with_override_browser_refresh(mut self, enabled: bool) -> Self {
        self.override_browser_refresh = enabled;
        self
    }

    pub fn on_start_refresh(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_start_refresh = Some(Rc::new(callback));
        self
    }

    pub fn on_end_refresh(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_end_refresh = Some(Rc::new(callback));
        self
    }

    pub fn with_scroll_top_override(mut self, scroll_top: impl Fn() -> f32 + 'static) -> Self {
        self.scroll_top_override = Some(Rc::new(scroll_top));
        self
    }

    pub fn curve(&self) -> DisplacementCurve {
        DisplacementCurve::new(
            self.threshold,
            self.slingshot_distance,
            self.damping_exponent,
        )
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("slingshot_distance", self.slingshot_distance),
            ("threshold", self.threshold),
            ("progress_view_offset", self.progress_view_offset),
            ("resting_offset", self.resting_offset),
            ("damping_exponent", self.damping_exponent),
        ] {
            if !value.is_finite() {
                return Err(SettingsError::NonFinite { field });
            }
        }
        if self.slingshot_distance <= 0.0 {
            return Err(SettingsError::NonPositiveSlingshot {
                value: self.slingshot_distance,
            });
        }
        if self.threshold < 0.0 {
            return Err(SettingsError::NegativeThreshold {
                value: self.threshold,
            });
        }
        if self.damping_exponent <= 0.0 || self.damping_exponent >= 1.0 {
            return Err(SettingsError::DampingExponentOutOfRange {
                value: self.damping_exponent,
            });
        }
        Ok(())
    }

    /// Applies one kebab-case attribute such as `slingshot-distance="80"`.
    ///
    /// The value is parsed but not range checked; call [`validate`](Self::validate)
    /// once all attributes are in.
    pub fn apply_attribute(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        match name {
            "slingshot-distance" => self.slingshot_distance = parse_number(name, value)?,
            "threshold" => self.threshold = parse_number(name, value)?,
            "progress-view-offset" => self.progress_view_offset = parse_number(name, value)?,
            "resting-offset" => self.resting_offset = parse_number(name, value)?,
            "damping-exponent" => self.damping_exponent = parse_number(name, value)?,
            "scale-down-duration" => {
                let millis = value.parse::<u64>().map_err(|_| invalid(name, value))?;
                self.scale_down_duration = Duration::from_millis(millis);
            }
            "progress-background-color" => {
                self.progress_background_color = non_empty(value);
            }
            "progress-stroke-color" => {
                self.progress_stroke_color = non_empty(value);
            }
            "override-browser-refresh" => {
                self.override_browser_refresh = match value {
                    "" | "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return Err(invalid(name, value)),
                };
            }
            _ => {
                return Err(SettingsError::UnknownAttribute {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> Result<f32, SettingsError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| invalid(name, value))
}

fn invalid(name: &str, value: &str) -> SettingsError {
    SettingsError::InvalidAttribute {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
