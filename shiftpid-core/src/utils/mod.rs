//! Utility re-exports for the bit-shift PID controller.
//!
//! - `math`: the fixed-point controller and its shift magnitudes
//! - `controllers`: configuration, runtime commands and the control loop

pub mod controllers;
pub mod math;

pub use controllers::{
    Actuator, ControlLoop, PidCommand, PidConfig, ProcessSensor, TickReport, PID_CHANNEL,
};
pub use embassy_time::Duration;
pub use math::{pid::Controller, shift::Shift};
