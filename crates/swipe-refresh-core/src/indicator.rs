//! Progress indicator output.

use crate::physics::round_significant;

/// Scale used while the indicator shrinks away after a refresh.
pub const HIDDEN_SCALE: f32 = 0.01;

/// Visual parameters for one indicator write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndicatorFrame {
    /// Vertical translation in CSS pixels.
    pub offset: f32,
    /// Rotation in degrees. Not wrapped at 360.
    pub rotation: f32,
    pub scale: f32,
    pub opacity: f32,
}

impl IndicatorFrame {
    pub fn new(offset: f32, rotation: f32, scale: f32, opacity: f32) -> Self {
        Self {
            offset,
            rotation,
            scale,
            opacity,
        }
    }

    /// Parked above the container, fully transparent.
    pub fn resting(offset: f32) -> Self {
        Self::new(offset, 0.0, 1.0, 0.0)
    }

    /// Same frame with every component rounded to four significant digits.
    pub fn rounded(self) -> Self {
        Self {
            offset: round_significant(self.offset),
            rotation: round_significant(self.rotation),
            scale: round_significant(self.scale),
            opacity: round_significant(self.opacity),
        }
    }

    /// CSS `transform` value; the indicator is centred horizontally.
    pub fn transform_css(&self) -> String {
        format!(
            "translate(-50%, {}px) rotate({}deg) scale({})",
            self.offset, self.rotation, self.scale
        )
    }

    pub fn opacity_css(&self) -> String {
        format!("{}", self.opacity)
    }
}

/// Write-only view of the indicator element.
pub trait VisualSink {
    fn render(&self, frame: IndicatorFrame);
}
