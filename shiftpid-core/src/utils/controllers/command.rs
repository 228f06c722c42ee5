//! Runtime retuning commands.
//!
//! Commands arrive over `PID_CHANNEL` (or any channel handed to a
//! `ControlLoop`) and are applied between ticks.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use serde::{Deserialize, Serialize};

use crate::utils::math::{pid::Controller, shift::Shift};

/// Depth of the command queue feeding a control loop.
pub const COMMAND_QUEUE_DEPTH: usize = 16;

/// Channel used to receive PID commands (`PidCommand` messages).
pub static PID_CHANNEL: Channel<CriticalSectionRawMutex, PidCommand, COMMAND_QUEUE_DEPTH> =
    Channel::new();

/// PID command variants for retuning a running loop.
///
/// Serialized as JSON with tag `"pc"`, shifts as magnitudes `0..=12`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "pc", rename_all = "snake_case")] // pc = pid command
pub enum PidCommand {
    /// Move the setpoint.
    Setpoint { value: i32 },
    /// Proportional gain shift.
    Kp { shift: Shift },
    /// Integral gain shift.
    Ki { shift: Shift },
    /// Derivative gain shift.
    Kd { shift: Shift },
    /// All three gain shifts at once.
    Gains { kp: Shift, ki: Shift, kd: Shift },
    DisableIntegral { disabled: bool },
    DisableDerivative { disabled: bool },
}

impl PidCommand {
    /// Apply the command to a controller and the setpoint it is tracking.
    pub fn apply(
        self,
        pid: &mut Controller,
        setpoint: &mut i32,
    ) {
        match self {
            PidCommand::Setpoint { value } => {
                tracing::debug!(from = *setpoint, to = value, "setpoint moved");
                *setpoint = value;
            }
            PidCommand::Kp { shift } => pid.set_kp_shift(shift),
            PidCommand::Ki { shift } => pid.set_ki_shift(shift),
            PidCommand::Kd { shift } => pid.set_kd_shift(shift),
            PidCommand::Gains { kp, ki, kd } => pid.set_shifts(kp, ki, kd),
            PidCommand::DisableIntegral { disabled } => pid.set_integral_disabled(disabled),
            PidCommand::DisableDerivative { disabled } => pid.set_derivative_disabled(disabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_gains_and_flags() {
        let mut pid = Controller::new(Shift::X1, Shift::X1, Shift::X1);
        let mut setpoint = 0;

        PidCommand::Gains {
            kp: Shift::X4,
            ki: Shift::X2,
            kd: Shift::X8,
        }
        .apply(&mut pid, &mut setpoint);
        PidCommand::Kd { shift: Shift::X16 }.apply(&mut pid, &mut setpoint);
        PidCommand::DisableIntegral { disabled: true }.apply(&mut pid, &mut setpoint);
        PidCommand::Setpoint { value: 42 }.apply(&mut pid, &mut setpoint);

        assert_eq!(pid.kp_shift(), Shift::X4);
        assert_eq!(pid.ki_shift(), Shift::X2);
        assert_eq!(pid.kd_shift(), Shift::X16);
        assert!(pid.integral_disabled());
        assert!(!pid.derivative_disabled());
        assert_eq!(setpoint, 42);
    }
}
