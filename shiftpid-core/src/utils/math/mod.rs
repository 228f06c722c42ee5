//! Fixed-point math for the controller.
//!
//! - `shift`: power-of-two gain magnitudes
//! - `pid`: the bit-shift PID controller

pub mod pid;
pub mod shift;
