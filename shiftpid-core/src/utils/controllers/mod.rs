//! Module Exports
//!
//! Everything around the controller that a firmware wires up:
//!
//! - `config`: construction parameters and envelope checks
//! - `command`: runtime retuning commands and their channel
//! - `control_loop`: sensor → controller → actuator tick driver

pub mod command;
pub mod config;
pub mod control_loop;

pub use command::{PidCommand, COMMAND_QUEUE_DEPTH, PID_CHANNEL};
pub use config::{ConfigError, PidConfig};
pub use control_loop::{Actuator, ControlLoop, ProcessSensor, TickError, TickReport};
