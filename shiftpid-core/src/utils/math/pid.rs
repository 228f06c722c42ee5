//! Fixed-point PID controller using power-of-two gains.
//!
//! `Controller` replaces every gain multiplication with a left shift and the
//! final normalisation with a right shift, so a control tick costs a handful
//! of integer additions, shifts and comparisons.
//!
//! # Numeric envelope
//!
//! Arithmetic is 32-bit two's complement and wraps on overflow. Results are
//! only meaningful while
//!
//! - `|setpoint - input| << max(kp, kd)` fits in an `i32`,
//! - `(output_max << scale) << ki` fits in an `i32` (saturated integral term).
//!
//! Nothing is checked per tick; `PidConfig::validate` checks the second
//! bound once, up front.
//!
//! # Example
//! ```rust
//! use shiftpid_core::utils::math::{pid::Controller, shift::Shift};
//! let mut pid = Controller::with_scale(Shift::X4, Shift::X1, Shift::X2, Shift::X1, -100, 100);
//! assert_eq!(pid.compute(10, 0), 70);
//! assert_eq!(pid.compute(10, 0), 60);
//! ```

use super::shift::Shift;
use crate::utils::controllers::config::PidConfig;

/// Scale shift used when none is given (factor 1024).
pub const DEFAULT_SCALE_SHIFT: Shift = Shift::X1024;
/// Lower output bound used when none is given.
pub const DEFAULT_OUTPUT_MIN: i32 = -255;
/// Upper output bound used when none is given.
pub const DEFAULT_OUTPUT_MAX: i32 = 255;

/// Bit-shift PID controller.
///
/// Owns the accumulated integral and the previous error; both persist for the
/// lifetime of the controller and are only ever reset by the anti-windup rules
/// or by disabling the integral term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    kp: Shift,
    ki: Shift,
    kd: Shift,
    scale: Shift,
    output_min: i32,
    output_max: i32,
    integral: i32,
    previous_error: i32,
    integral_disabled: bool,
    derivative_disabled: bool,
}

impl Controller {
    /// Controller with the default scale shift and output bounds (±255).
    pub fn new(
        kp: Shift,
        ki: Shift,
        kd: Shift,
    ) -> Self {
        Self::with_scale(
            kp,
            ki,
            kd,
            DEFAULT_SCALE_SHIFT,
            DEFAULT_OUTPUT_MIN,
            DEFAULT_OUTPUT_MAX,
        )
    }

    /// Controller with explicit scale shift and output bounds.
    ///
    /// No validation is done; `output_min <= output_max` is up to the caller.
    pub fn with_scale(
        kp: Shift,
        ki: Shift,
        kd: Shift,
        scale: Shift,
        output_min: i32,
        output_max: i32,
    ) -> Self {
        Self {
            kp,
            ki,
            kd,
            scale,
            output_min,
            output_max,
            integral: 0,
            previous_error: 0,
            integral_disabled: false,
            derivative_disabled: false,
        }
    }

    /// Build a controller from a (possibly deserialized) configuration.
    pub fn from_config(config: &PidConfig) -> Self {
        let mut pid = Self::with_scale(
            config.kp_shift,
            config.ki_shift,
            config.kd_shift,
            config.scale_shift,
            config.output_min,
            config.output_max,
        );
        pid.integral_disabled = config.integral_disabled;
        pid.derivative_disabled = config.derivative_disabled;
        pid
    }

    /// Run one control tick and return the bounded output.
    pub fn compute(
        &mut self,
        setpoint: i32,
        input: i32,
    ) -> i32 {
        let error = setpoint.wrapping_sub(input);

        self.integral = if self.integral_disabled {
            0
        } else {
            self.next_integral(error)
        };

        let p_term = self.kp.apply(error);
        let i_term = self.ki.apply(self.integral);
        let d_term = if self.derivative_disabled {
            0
        } else {
            self.kd.apply(error.wrapping_sub(self.previous_error))
        };

        let combined = p_term.wrapping_add(i_term).wrapping_add(d_term);
        let output = self.clamp_output(self.scale.unapply(combined));

        self.previous_error = error;

        tracing::trace!(error, integral = self.integral, output, "pid tick");
        output
    }

    /// Anti-windup integral update for `error`.
    ///
    /// The accumulator is dropped when the error is zero or points against the
    /// accumulated direction, otherwise it grows by `error`; either way the
    /// result is bounded by `±integral_limit()`.
    fn next_integral(
        &self,
        error: i32,
    ) -> i32 {
        let reversed = (error > 0 && self.integral < 0) || (error < 0 && self.integral > 0);
        let integral = if error == 0 || reversed {
            0
        } else {
            self.integral.wrapping_add(error)
        };

        let limit = self.integral_limit();
        if integral > limit {
            limit
        } else if integral < limit.wrapping_neg() {
            limit.wrapping_neg()
        } else {
            integral
        }
    }

    // Explicit comparisons: `Ord::clamp` panics on inverted bounds.
    fn clamp_output(
        &self,
        output: i32,
    ) -> i32 {
        if output > self.output_max {
            self.output_max
        } else if output < self.output_min {
            self.output_min
        } else {
            output
        }
    }

    pub fn set_kp_shift(
        &mut self,
        shift: Shift,
    ) {
        tracing::debug!(%shift, "kp shift set");
        self.kp = shift;
    }

    /// Takes effect on the next tick; the accumulated integral is kept as is.
    pub fn set_ki_shift(
        &mut self,
        shift: Shift,
    ) {
        tracing::debug!(%shift, "ki shift set");
        self.ki = shift;
    }

    pub fn set_kd_shift(
        &mut self,
        shift: Shift,
    ) {
        tracing::debug!(%shift, "kd shift set");
        self.kd = shift;
    }

    /// Set all three gain shifts at once.
    pub fn set_shifts(
        &mut self,
        kp: Shift,
        ki: Shift,
        kd: Shift,
    ) {
        self.set_kp_shift(kp);
        self.set_ki_shift(ki);
        self.set_kd_shift(kd);
    }

    /// Enable or disable the integral term from the next tick on.
    ///
    /// While disabled the accumulator is held at zero.
    pub fn set_integral_disabled(
        &mut self,
        disabled: bool,
    ) {
        if self.integral_disabled != disabled {
            tracing::debug!(disabled, "integral term toggled");
        }
        self.integral_disabled = disabled;
    }

    /// Enable or disable the derivative term from the next tick on.
    ///
    /// The previous error keeps being tracked while disabled.
    pub fn set_derivative_disabled(
        &mut self,
        disabled: bool,
    ) {
        if self.derivative_disabled != disabled {
            tracing::debug!(disabled, "derivative term toggled");
        }
        self.derivative_disabled = disabled;
    }

    /// Bound on the integral magnitude, `output_max << scale`.
    pub fn integral_limit(&self) -> i32 {
        self.scale.apply(self.output_max)
    }

    pub fn integral(&self) -> i32 {
        self.integral
    }

    pub fn previous_error(&self) -> i32 {
        self.previous_error
    }

    pub fn kp_shift(&self) -> Shift {
        self.kp
    }

    pub fn ki_shift(&self) -> Shift {
        self.ki
    }

    pub fn kd_shift(&self) -> Shift {
        self.kd
    }

    pub fn scale_shift(&self) -> Shift {
        self.scale
    }

    pub fn output_min(&self) -> i32 {
        self.output_min
    }

    pub fn output_max(&self) -> i32 {
        self.output_max
    }

    pub fn integral_disabled(&self) -> bool {
        self.integral_disabled
    }

    pub fn derivative_disabled(&self) -> bool {
        self.derivative_disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// kp = 4, ki = 1, kd = 2, unscaled, bounds ±100.
    fn scenario() -> Controller {
        Controller::with_scale(Shift::X4, Shift::X1, Shift::X2, Shift::X1, -100, 100)
    }

    /// Unit gains, unscaled, wide bounds.
    fn unity() -> Controller {
        Controller::with_scale(Shift::X1, Shift::X1, Shift::X1, Shift::X1, -10_000, 10_000)
    }

    #[test]
    fn test_concrete_scenario() {
        let mut pid = scenario();

        // p = 40, i = 10, d = 20
        assert_eq!(pid.compute(10, 0), 70);
        assert_eq!(pid.integral(), 10);
        assert_eq!(pid.previous_error(), 10);

        // p = 40, i = 20, d = 0
        assert_eq!(pid.compute(10, 0), 60);
        assert_eq!(pid.integral(), 20);
    }

    #[test]
    fn test_defaults() {
        let mut pid = Controller::new(Shift::X1, Shift::X1, Shift::X1);
        assert_eq!(pid.scale_shift(), Shift::X1024);
        assert_eq!(pid.output_min(), -255);
        assert_eq!(pid.output_max(), 255);
        assert_eq!(pid.integral_limit(), 255 << 10);
        // (1024 + 1024 + 1024) >> 10
        assert_eq!(pid.compute(1024, 0), 3);
    }

    #[test]
    fn test_zero_error_steady_state() {
        let mut pid = scenario();
        pid.compute(50, 0);
        pid.compute(20, 3);

        // First zero-error tick still sees the derivative of the step back to zero.
        let transient = pid.compute(7, 7);
        assert_eq!(pid.integral(), 0);
        assert_eq!(transient, -34);

        for _ in 0..100 {
            assert_eq!(pid.compute(7, 7), 0);
            assert_eq!(pid.integral(), 0);
            assert_eq!(pid.previous_error(), 0);
        }
    }

    #[test]
    fn test_anti_windup_bound() {
        let mut pid = Controller::with_scale(Shift::X1, Shift::X1, Shift::X1, Shift::X1024, -255, 255);
        let limit = pid.integral_limit();

        for _ in 0..1_000 {
            pid.compute(1_000, 0);
            assert!(pid.integral().abs() <= limit);
        }
        assert_eq!(pid.integral(), limit);

        // reversal drops the accumulator, then it winds up the other way
        pid.compute(0, 1_000);
        assert_eq!(pid.integral(), 0);
        for _ in 0..1_000 {
            pid.compute(0, 1_000);
            assert!(pid.integral().abs() <= limit);
        }
        assert_eq!(pid.integral(), -limit);
    }

    #[test]
    fn test_sign_reversal_resets_integral() {
        let mut pid = unity();
        pid.compute(10, 0);
        pid.compute(10, 0);
        pid.compute(10, 0);
        assert_eq!(pid.integral(), 30);

        pid.compute(0, 5);
        assert_eq!(pid.integral(), 0);

        // zero integral has no sign, so accumulation resumes
        pid.compute(0, 5);
        assert_eq!(pid.integral(), -5);
    }

    #[test]
    fn test_zero_error_resets_integral() {
        let mut pid = unity();
        pid.compute(10, 0);
        pid.compute(10, 0);
        pid.compute(3, 3);
        assert_eq!(pid.integral(), 0);
    }

    #[test]
    fn test_output_clamping() {
        let mut pid = Controller::with_scale(Shift::X16, Shift::X4, Shift::X8, Shift::X1, -10, 100);
        for (setpoint, input) in [(1_000, 0), (0, 1_000), (5, 4), (-3, 2), (i16::MAX as i32, i16::MIN as i32)] {
            let out = pid.compute(setpoint, input);
            assert!((-10..=100).contains(&out), "{out} out of bounds");
        }

        let mut pid = Controller::new(Shift::X4096, Shift::X1, Shift::X1);
        assert_eq!(pid.compute(10_000, 0), 255);
        assert_eq!(pid.compute(-10_000, 0), -255);
    }

    #[test]
    fn test_integral_disabled() {
        let mut pid = scenario();
        pid.set_integral_disabled(true);

        // p = 40, d = 20
        assert_eq!(pid.compute(10, 0), 60);
        assert_eq!(pid.integral(), 0);
        // p = 40, d = 0
        assert_eq!(pid.compute(10, 0), 40);
        assert_eq!(pid.integral(), 0);
    }

    #[test]
    fn test_disabling_integral_drops_accumulator() {
        let mut pid = unity();
        pid.compute(10, 0);
        pid.compute(10, 0);
        assert_eq!(pid.integral(), 20);

        pid.set_integral_disabled(true);
        pid.compute(10, 0);
        assert_eq!(pid.integral(), 0);

        pid.set_integral_disabled(false);
        pid.compute(10, 0);
        assert_eq!(pid.integral(), 10);
    }

    #[test]
    fn test_derivative_disabled() {
        let mut pid = Controller::with_scale(Shift::X4, Shift::X1, Shift::X2, Shift::X1, -1_000, 1_000);
        pid.set_derivative_disabled(true);

        // p = 40, i = 10
        assert_eq!(pid.compute(10, 0), 50);
        // p = 120, i = 40; the derivative of 20 is ignored
        assert_eq!(pid.compute(30, 0), 160);
        assert_eq!(pid.previous_error(), 30);

        // re-enabled derivative differentiates against the tracked error:
        // p = 120, i = 70, d = 0
        pid.set_derivative_disabled(false);
        assert_eq!(pid.compute(30, 0), 190);
    }

    #[test]
    fn test_disable_toggle_idempotent() {
        let mut once = scenario();
        let mut twice = scenario();

        once.set_integral_disabled(true);
        once.set_derivative_disabled(true);
        twice.set_integral_disabled(true);
        twice.set_integral_disabled(true);
        twice.set_derivative_disabled(true);
        twice.set_derivative_disabled(true);
        assert_eq!(once, twice);

        for (setpoint, input) in [(10, 0), (12, 3), (-4, 9), (0, 0)] {
            assert_eq!(once.compute(setpoint, input), twice.compute(setpoint, input));
        }
        assert_eq!(once, twice);
    }

    #[test]
    fn test_shift_change_not_retroactive() {
        let mut pid = unity();
        pid.compute(10, 0);
        pid.compute(10, 0);
        assert_eq!(pid.integral(), 20);

        pid.set_shifts(Shift::X1, Shift::X4, Shift::X1);
        assert_eq!(pid.integral(), 20);
        assert_eq!(pid.ki_shift(), Shift::X4);

        // p = 10, i = 30 << 2, d = 0
        assert_eq!(pid.compute(10, 0), 130);
    }

    #[test]
    fn test_scale_floors_negative_output() {
        let mut pid = Controller::with_scale(Shift::X1, Shift::X1, Shift::X1, Shift::X4, -100, 100);
        // (-1 + -1 + -1) >> 2
        assert_eq!(pid.compute(0, 1), -1);
    }
}
