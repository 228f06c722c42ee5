use clap::Parser;
use core::cell::RefCell;
use embassy_executor::{Executor, Spawner};
use shiftpid_core::utils::controllers::ConfigError;
use shiftpid_core::utils::{
    Actuator, ControlLoop, Controller, Duration, PID_CHANNEL, PidCommand, PidConfig,
    ProcessSensor, Shift,
};
use static_cell::StaticCell;
use std::convert::Infallible;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(version = "1.0", about = "Drive a simulated integrating plant with the bit-shift PID")]
struct Opts {
    /// proportional gain shift (0..=12)
    #[arg(long, default_value = "10", value_parser = parse_shift)]
    kp: Shift,
    /// integral gain shift (0..=12)
    #[arg(long, default_value = "2", value_parser = parse_shift)]
    ki: Shift,
    /// derivative gain shift (0..=12)
    #[arg(long, default_value = "8", value_parser = parse_shift)]
    kd: Shift,
    /// output scale shift (0..=12)
    #[arg(long, default_value = "10", value_parser = parse_shift)]
    scale: Shift,
    #[arg(long, default_value_t = -255, allow_negative_numbers = true)]
    output_min: i32,
    #[arg(long, default_value_t = 255, allow_negative_numbers = true)]
    output_max: i32,
    /// JSON controller config; replaces the gain and bound flags
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    setpoint: i32,
    /// initial plant value
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    initial: i32,
    /// plant responds with output >> lag per tick
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=16))]
    lag: u8,
    /// number of control ticks before exiting
    #[arg(long, default_value_t = 200)]
    ticks: u32,
    #[arg(long, default_value_t = 10)]
    period_ms: u64,
    /// ignore JSON commands on stdin
    #[arg(long)]
    no_stdin: bool,
}

fn parse_shift(s: &str) -> Result<Shift, String> {
    let magnitude: u8 = s.parse().map_err(|e| format!("{e}"))?;
    Shift::try_from(magnitude).map_err(|e| e.to_string())
}

#[derive(Debug)]
enum SetupError {
    Read(std::io::Error),
    Parse(serde_json::Error),
    Invalid(ConfigError),
}

impl std::fmt::Display for SetupError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SetupError::Read(e) => write!(f, "cannot read config file: {}", e),
            SetupError::Parse(e) => write!(f, "cannot parse config file: {}", e),
            SetupError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl Opts {
    fn pid_config(&self) -> Result<PidConfig, SetupError> {
        let config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(SetupError::Read)?;
                serde_json::from_str(&raw).map_err(SetupError::Parse)?
            }
            None => PidConfig {
                scale_shift: self.scale,
                output_min: self.output_min,
                output_max: self.output_max,
                ..PidConfig::new(self.kp, self.ki, self.kd)
            },
        };
        config.validate().map_err(SetupError::Invalid)?;
        Ok(config)
    }
}

/// Integrating plant: every tick the value moves by `output >> lag`.
struct Plant {
    value: i32,
    lag: u8,
}

impl Plant {
    fn drive(
        &mut self,
        output: i32,
    ) {
        self.value = self.value.saturating_add(output >> self.lag);
    }
}

struct PlantSensor(&'static RefCell<Plant>);
struct PlantDrive(&'static RefCell<Plant>);

impl ProcessSensor for PlantSensor {
    type Error = Infallible;

    fn sample(&mut self) -> Result<i32, Self::Error> {
        Ok(self.0.borrow().value)
    }
}

impl Actuator for PlantDrive {
    type Error = Infallible;

    fn apply(
        &mut self,
        output: i32,
    ) -> Result<(), Self::Error> {
        self.0.borrow_mut().drive(output);
        Ok(())
    }
}

struct Simulation {
    config: PidConfig,
    setpoint: i32,
    plant: &'static RefCell<Plant>,
    ticks: u32,
    period: Duration,
}

#[embassy_executor::task]
async fn control_task(sim: Simulation) {
    let mut lp = ControlLoop::new(
        Controller::from_config(&sim.config),
        sim.setpoint,
        PlantSensor(sim.plant),
        PlantDrive(sim.plant),
        PID_CHANNEL.receiver(),
    );
    lp.run(sim.period, Some(sim.ticks)).await;

    let value = sim.plant.borrow().value;
    info!(
        value,
        setpoint = lp.setpoint(),
        integral = lp.controller().integral(),
        "Simulation finished"
    );
    std::process::exit(0);
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    sim: Simulation,
) {
    info!(
        kp = %sim.config.kp_shift,
        ki = %sim.config.ki_shift,
        kd = %sim.config.kd_shift,
        scale = %sim.config.scale_shift,
        "Starting simulation"
    );
    spawner.spawn(control_task(sim)).unwrap();
}

/// Forward JSON `PidCommand` lines from stdin to the control loop.
fn spawn_command_reader() {
    std::thread::spawn(|| {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PidCommand>(&line) {
                Ok(cmd) => {
                    if let Err(e) = PID_CHANNEL.try_send(cmd) {
                        warn!("Command queue full, dropping: {:?}", e);
                    }
                }
                Err(e) => warn!("Ignoring malformed command {:?}: {}", line, e),
            }
        }
    });
}

static PLANT: StaticCell<RefCell<Plant>> = StaticCell::new();
static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let config = match opts.pid_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid controller configuration: {}", e);
            std::process::exit(1);
        }
    };

    if !opts.no_stdin {
        spawn_command_reader();
    }

    let sim = Simulation {
        config,
        setpoint: opts.setpoint,
        plant: PLANT.init(RefCell::new(Plant {
            value: opts.initial,
            lag: opts.lag,
        })),
        ticks: opts.ticks,
        period: Duration::from_millis(opts.period_ms),
    };

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, sim)).unwrap();
    });
}
