//! Fixed-rate control loop.
//!
//! A `ControlLoop` owns one `Controller` and wires it between a process sensor
//! and an actuator. Each tick drains pending `PidCommand`s, samples the
//! process, computes the output and hands it to the actuator.

use core::fmt;

use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Receiver};
use embassy_time::{Duration, Ticker};
use serde::Serialize;

use super::command::{PidCommand, COMMAND_QUEUE_DEPTH};
use crate::utils::math::pid::Controller;

/// Source of the measured process value, already in controller units.
pub trait ProcessSensor {
    type Error: fmt::Debug;

    fn sample(&mut self) -> Result<i32, Self::Error>;
}

/// Sink for the controller output.
pub trait Actuator {
    type Error: fmt::Debug;

    fn apply(
        &mut self,
        output: i32,
    ) -> Result<(), Self::Error>;
}

/// Errors that can end a tick early.
#[derive(Debug)]
pub enum TickError<SE: fmt::Debug, AE: fmt::Debug> {
    /// The sensor could not be read; the controller did not run.
    Sensor(SE),
    /// The output was computed but could not be applied.
    Actuator(AE),
}

impl<SE: fmt::Debug, AE: fmt::Debug> fmt::Display for TickError<SE, AE> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            TickError::Sensor(e) => write!(f, "sensor read failed: {:?}", e),
            TickError::Actuator(e) => write!(f, "actuator write failed: {:?}", e),
        }
    }
}

/// Outcome of one successful tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub setpoint: i32,
    pub input: i32,
    pub output: i32,
    pub integral: i32,
}

/// Drives one `Controller` between a process sensor and an actuator.
pub struct ControlLoop<'ch, M: RawMutex, S, A> {
    pid: Controller,
    setpoint: i32,
    sensor: S,
    actuator: A,
    commands: Receiver<'ch, M, PidCommand, COMMAND_QUEUE_DEPTH>,
}

impl<'ch, M, S, A> ControlLoop<'ch, M, S, A>
where
    M: RawMutex,
    S: ProcessSensor,
    A: Actuator,
{
    pub fn new(
        pid: Controller,
        setpoint: i32,
        sensor: S,
        actuator: A,
        commands: Receiver<'ch, M, PidCommand, COMMAND_QUEUE_DEPTH>,
    ) -> Self {
        Self {
            pid,
            setpoint,
            sensor,
            actuator,
            commands,
        }
    }

    /// Run one control cycle.
    ///
    /// Commands queued before the tick are applied first. A sensor failure
    /// leaves the controller untouched; an actuator failure happens after the
    /// controller has already advanced.
    pub fn tick(&mut self) -> Result<TickReport, TickError<S::Error, A::Error>> {
        while let Ok(command) = self.commands.try_receive() {
            self.handle_command(command);
        }

        let input = self.sensor.sample().map_err(TickError::Sensor)?;
        let output = self.pid.compute(self.setpoint, input);
        self.actuator.apply(output).map_err(TickError::Actuator)?;

        Ok(TickReport {
            setpoint: self.setpoint,
            input,
            output,
            integral: self.pid.integral(),
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn handle_command(
        &mut self,
        command: PidCommand,
    ) {
        command.apply(&mut self.pid, &mut self.setpoint);
    }

    /// Tick every `period`, stopping after `limit` ticks if one is given.
    ///
    /// Failed ticks are logged and the loop carries on.
    pub async fn run(
        &mut self,
        period: Duration,
        limit: Option<u32>,
    ) {
        tracing::info!(period_us = period.as_micros(), ?limit, "control loop started");
        let mut ticker = Ticker::every(period);
        let mut remaining = limit;
        loop {
            if remaining == Some(0) {
                break;
            }
            ticker.next().await;

            match self.tick() {
                Ok(report) => tracing::debug!(?report, "tick"),
                Err(e) => tracing::error!("Control tick failed: {}", e),
            }
            remaining = remaining.map(|n| n - 1);
        }
        tracing::info!("control loop finished");
    }

    pub fn controller(&self) -> &Controller {
        &self.pid
    }

    pub fn setpoint(&self) -> i32 {
        self.setpoint
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }
}
