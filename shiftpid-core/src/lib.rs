//! Fixed-point bit-shift PID control for no-std embedded platforms.
//!
//! Gains are powers of two, so a control tick needs only integer additions,
//! shifts and comparisons. See `utils::math::pid::Controller` for the
//! controller itself and `utils::controllers` for the loop that drives it.
#![no_std]

pub mod utils;
