//! Range mapping and snapping for parameter values.
//!
//! A [`ParameterRange`] maps between plain values (natural units such as dB,
//! Hz or a plain gain factor) and normalized values (0.0 to 1.0) used by hosts
//! and automation. It optionally carries a step interval, used to snap writes
//! to legal values, and a skew factor for non-linear UI feel.
//!
//! # Example
//!
//! ```ignore
//! use procstate_core::ParameterRange;
//!
//! let volume = ParameterRange::new(0.0..=2.0);
//! assert_eq!(volume.normalize(1.0), 0.5);
//!
//! // More resolution near the low end of a frequency control.
//! let cutoff = ParameterRange::new(20.0..=20000.0).with_skew_for_centre(1000.0);
//! assert!((cutoff.denormalize(0.5) - 1000.0).abs() < 1e-6);
//!
//! // Snapped to whole semitones.
//! let pitch = ParameterRange::new(-24.0..=24.0).with_interval(1.0);
//! assert_eq!(pitch.snap(3.4), 3.0);
//! ```

use std::ops::RangeInclusive;

/// Step count reported for continuous parameters (no step interval).
pub const DEFAULT_NUM_STEPS: i32 = 0x7fff_ffff;

/// Value range with optional step interval and skew.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    /// Lowest legal value.
    pub start: f64,
    /// Highest legal value.
    pub end: f64,
    /// Step interval. `0.0` means continuous.
    pub interval: f64,
    /// Skew exponent applied to the normalized proportion. `1.0` is linear,
    /// values below 1.0 expand the low end of the range.
    pub skew: f64,
    /// Apply the skew symmetrically around the centre of the range.
    pub symmetric_skew: bool,
}

impl ParameterRange {
    /// Create a continuous, linear range.
    ///
    /// # Panics
    ///
    /// Panics if `end <= start`.
    pub fn new(range: RangeInclusive<f64>) -> Self {
        let (start, end) = (*range.start(), *range.end());
        assert!(end > start, "range end must exceed start, got {start}..={end}");
        Self {
            start,
            end,
            interval: 0.0,
            skew: 1.0,
            symmetric_skew: false,
        }
    }

    /// Set the step interval used by [`snap`](Self::snap).
    ///
    /// # Panics
    ///
    /// Panics if `interval` is negative.
    pub fn with_interval(mut self, interval: f64) -> Self {
        assert!(interval >= 0.0, "interval must not be negative, got {interval}");
        self.interval = interval;
        self
    }

    /// Set the skew exponent.
    ///
    /// # Panics
    ///
    /// Panics if `skew <= 0.0`.
    pub fn with_skew(mut self, skew: f64) -> Self {
        assert!(skew > 0.0, "skew must be positive, got {skew}");
        self.skew = skew;
        self
    }

    /// Choose the skew so that `centre` sits at normalized 0.5.
    ///
    /// # Panics
    ///
    /// Panics if `centre` is not strictly inside the range.
    pub fn with_skew_for_centre(mut self, centre: f64) -> Self {
        assert!(
            centre > self.start && centre < self.end,
            "skew centre must be inside the range, got {centre}"
        );
        self.skew = 0.5f64.ln() / ((centre - self.start) / (self.end - self.start)).ln();
        self.symmetric_skew = false;
        self
    }

    /// Apply the skew symmetrically around the centre of the range.
    pub fn symmetric(mut self) -> Self {
        self.symmetric_skew = true;
        self
    }

    /// Range width.
    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Convert a plain value to normalized (0.0-1.0).
    ///
    /// Values outside the range are clamped.
    pub fn normalize(&self, plain: f64) -> f64 {
        let proportion = ((plain - self.start) / self.length()).clamp(0.0, 1.0);

        if self.skew == 1.0 {
            return proportion;
        }

        if !self.symmetric_skew {
            return proportion.powf(self.skew);
        }

        let distance = 2.0 * proportion - 1.0;
        (1.0 + distance.abs().powf(self.skew) * distance.signum()) / 2.0
    }

    /// Convert a normalized value (0.0-1.0) to plain.
    ///
    /// Values outside 0.0-1.0 are clamped.
    pub fn denormalize(&self, normalized: f64) -> f64 {
        let mut proportion = normalized.clamp(0.0, 1.0);

        if !self.symmetric_skew {
            if self.skew != 1.0 && proportion > 0.0 {
                proportion = (proportion.ln() / self.skew).exp();
            }
            return self.start + self.length() * proportion;
        }

        let mut distance = 2.0 * proportion - 1.0;
        if self.skew != 1.0 && distance != 0.0 {
            distance = (distance.abs().ln() / self.skew).exp() * distance.signum();
        }
        self.start + self.length() / 2.0 * (1.0 + distance)
    }

    /// Snap a plain value to the nearest legal value.
    ///
    /// Rounds to the nearest step counted from `start`, then clamps to
    /// `[start, end]`. Continuous ranges only clamp.
    pub fn snap(&self, plain: f64) -> f64 {
        if self.interval > 0.0 {
            snap_to_step(plain, self.interval, self.start, self.end)
        } else {
            plain.clamp(self.start, self.end)
        }
    }

    /// Number of legal values for UI purposes.
    ///
    /// `floor(length / interval) + 1` with an interval, otherwise
    /// [`DEFAULT_NUM_STEPS`]. Saturates at `i32::MAX`.
    pub fn num_steps(&self) -> i32 {
        if self.interval > 0.0 {
            ((self.length() / self.interval) as i32).saturating_add(1)
        } else {
            DEFAULT_NUM_STEPS
        }
    }

    /// Check whether a plain value lies within the range.
    #[inline]
    pub fn contains(&self, plain: f64) -> bool {
        plain >= self.start && plain <= self.end
    }
}

/// Snap a value to the nearest step counted from `min`, clamped to the range.
#[inline]
fn snap_to_step(value: f64, step_size: f64, min: f64, max: f64) -> f64 {
    let steps_from_min = ((value - min) / step_size).round();
    (min + steps_from_min * step_size).clamp(min, max)
}
