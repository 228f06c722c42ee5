//! Controller configuration.
//!
//! `PidConfig` is what a firmware bakes in or a host loads from JSON. Only the
//! three gain shifts are mandatory; everything else falls back to the
//! controller defaults.
//!
//! ```json
//! { "kp_shift": 2, "ki_shift": 0, "kd_shift": 1, "output_max": 100 }
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::math::{
    pid::{DEFAULT_OUTPUT_MAX, DEFAULT_OUTPUT_MIN, DEFAULT_SCALE_SHIFT},
    shift::Shift,
};

/// Construction parameters for a [`Controller`](crate::utils::math::pid::Controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidConfig {
    pub kp_shift: Shift,
    pub ki_shift: Shift,
    pub kd_shift: Shift,
    #[serde(default = "default_scale_shift")]
    pub scale_shift: Shift,
    #[serde(default = "default_output_min")]
    pub output_min: i32,
    #[serde(default = "default_output_max")]
    pub output_max: i32,
    #[serde(default)]
    pub integral_disabled: bool,
    #[serde(default)]
    pub derivative_disabled: bool,
}

fn default_scale_shift() -> Shift {
    DEFAULT_SCALE_SHIFT
}

fn default_output_min() -> i32 {
    DEFAULT_OUTPUT_MIN
}

fn default_output_max() -> i32 {
    DEFAULT_OUTPUT_MAX
}

/// Reasons a configuration falls outside the safe operating envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `output_min` is above `output_max`.
    InvertedBounds { min: i32, max: i32 },
    /// `output_max` is negative, which makes the integral limit negative.
    NegativeMaximum(i32),
    /// `output_max << scale_shift` does not fit in an `i32`.
    IntegralLimitOverflow { output_max: i32, scale: Shift },
    /// A saturated integral shifted by `ki_shift` does not fit in an `i32`.
    IntegralTermOverflow { limit: i32, ki: Shift },
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigError::InvertedBounds { min, max } => {
                write!(f, "output_min {} is greater than output_max {}", min, max)
            }
            ConfigError::NegativeMaximum(max) => write!(f, "output_max {} is negative", max),
            ConfigError::IntegralLimitOverflow { output_max, scale } => write!(
                f,
                "integral limit {} << {} overflows i32",
                output_max,
                scale.magnitude()
            ),
            ConfigError::IntegralTermOverflow { limit, ki } => write!(
                f,
                "integral term {} << {} overflows i32",
                limit,
                ki.magnitude()
            ),
        }
    }
}

impl PidConfig {
    /// Configuration with the given gains and default scale and bounds.
    pub fn new(
        kp_shift: Shift,
        ki_shift: Shift,
        kd_shift: Shift,
    ) -> Self {
        Self {
            kp_shift,
            ki_shift,
            kd_shift,
            scale_shift: DEFAULT_SCALE_SHIFT,
            output_min: DEFAULT_OUTPUT_MIN,
            output_max: DEFAULT_OUTPUT_MAX,
            integral_disabled: false,
            derivative_disabled: false,
        }
    }

    /// Check the bounds and the integral headroom once, before any tick runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_min > self.output_max {
            return Err(ConfigError::InvertedBounds {
                min: self.output_min,
                max: self.output_max,
            });
        }
        if self.output_max < 0 {
            return Err(ConfigError::NegativeMaximum(self.output_max));
        }

        let limit = fits_i32(i64::from(self.output_max) << self.scale_shift.magnitude()).ok_or(
            ConfigError::IntegralLimitOverflow {
                output_max: self.output_max,
                scale: self.scale_shift,
            },
        )?;
        fits_i32(i64::from(limit) << self.ki_shift.magnitude()).ok_or(
            ConfigError::IntegralTermOverflow {
                limit,
                ki: self.ki_shift,
            },
        )?;

        Ok(())
    }
}

fn fits_i32(value: i64) -> Option<i32> {
    i32::try_from(value).ok()
}
