//! Displacement to indicator mapping.
//!
//! A drag is linear up to the slingshot distance. Past it the overshoot is
//! raised to an exponent below one, so the indicator keeps moving but
//! resists like a rubber band.

/// Significant digits kept for anything written to the indicator.
pub const OUTPUT_PRECISION: i32 = 4;

/// Opacity of the indicator as soon as a drag is recognised.
const BASE_OPACITY: f32 = 0.4;
/// Opacity gained over the slingshot distance.
const OPACITY_RANGE: f32 = 0.6;
const FULL_TURN_DEGREES: f32 = 360.0;

/// Rounds to [`OUTPUT_PRECISION`] significant digits.
///
/// Zero and non-finite values pass through unchanged.
pub fn round_significant(value: f32) -> f32 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let value = value as f64;
    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(OUTPUT_PRECISION - 1 - magnitude);
    ((value * scale).round() / scale) as f32
}

/// Mapping parameters, taken from the coordinator settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplacementCurve {
    pub threshold: f32,
    pub slingshot_distance: f32,
    pub damping_exponent: f32,
}

impl DisplacementCurve {
    pub fn new(threshold: f32, slingshot_distance: f32, damping_exponent: f32) -> Self {
        Self {
            threshold,
            slingshot_distance,
            damping_exponent,
        }
    }

    /// Whether a raw delta is large enough to be a drag rather than a tap.
    pub fn exceeds_threshold(&self, raw_delta: f32) -> bool {
        raw_delta >= self.threshold
    }

    /// Mapped movement for a raw drag delta. Never negative.
    pub fn movement(&self, raw_delta: f32) -> f32 {
        let effective = (raw_delta - self.threshold).max(0.0);
        if effective <= self.slingshot_distance {
            effective
        } else {
            let overshoot = effective - self.slingshot_distance;
            self.slingshot_distance + overshoot.powf(self.damping_exponent)
        }
    }

    /// Linear in movement, capped at fully opaque.
    pub fn opacity(&self, movement: f32) -> f32 {
        (OPACITY_RANGE / self.slingshot_distance * movement + BASE_OPACITY).min(1.0)
    }

    /// One full turn per slingshot distance; keeps spinning past it.
    pub fn rotation(&self, movement: f32) -> f32 {
        FULL_TURN_DEGREES / self.slingshot_distance * movement
    }

    pub fn is_armed(&self, movement: f32) -> bool {
        movement >= self.slingshot_distance
    }
}

#[cfg(test)]
#[path = "tests/physics_tests.rs"]
mod tests;
