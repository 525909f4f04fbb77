//! Gridsim - Power Network Simulator
//!
//! Runs the reference synchronous generator feeding a balanced resistive
//! load and writes the logged solution rows as CSV.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info gridsim --domain emt --method euler --time-step 1e-5 --voltages v.csv
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use gridsim_core::{
    error::Result,
    output::CsvSink,
    scenarios::{balanced_resistive_load, Fault, GENERATOR, REFERENCE_LOAD},
    solver::{DEFAULT_FINAL_TIME, DEFAULT_SYSTEM_FREQUENCY, DEFAULT_TIME_STEP},
    Domain, NumericalMethod, SimulationConfig, Simulator,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DomainArg {
    /// Instantaneous values
    Emt,
    /// Dynamic phasors
    Dp,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Euler,
    Trapezoidal,
}

/// Synchronous generator network simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Representation of network quantities
    #[arg(long, value_enum, default_value = "dp")]
    domain: DomainArg,

    /// Integration rule for the machine
    #[arg(long, value_enum, default_value = "trapezoidal")]
    method: MethodArg,

    /// Time step in seconds
    #[arg(long, default_value_t = DEFAULT_TIME_STEP)]
    time_step: f64,

    /// Simulated duration in seconds
    #[arg(long, default_value_t = DEFAULT_FINAL_TIME)]
    final_time: f64,

    /// System frequency in Hz
    #[arg(long, default_value_t = DEFAULT_SYSTEM_FREQUENCY)]
    frequency: f64,

    /// Log every n-th step
    #[arg(long, default_value_t = 1)]
    downsampling: usize,

    /// Per-phase load resistance in ohms
    #[arg(long, default_value_t = REFERENCE_LOAD)]
    load: f64,

    /// Close a three-phase fault to ground at this time (seconds)
    #[arg(long)]
    fault_time: Option<f64>,

    /// Fault resistance per phase in ohms
    #[arg(long, default_value_t = 0.01)]
    fault_resistance: f64,

    /// Voltage output CSV file (defaults to stdout)
    #[arg(long, value_name = "FILE")]
    voltages: Option<PathBuf>,

    /// Current output CSV file (discarded if omitted)
    #[arg(long, value_name = "FILE")]
    currents: Option<PathBuf>,
}

fn open_output(path: Option<&PathBuf>, fallback: Box<dyn Write>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => fallback,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let domain = match args.domain {
        DomainArg::Emt => Domain::Emt,
        DomainArg::Dp => Domain::DynamicPhasor,
    };
    let method = match args.method {
        MethodArg::Euler => NumericalMethod::Euler,
        MethodArg::Trapezoidal => NumericalMethod::Trapezoidal,
    };
    let config = SimulationConfig::new()
        .with_domain(domain)
        .with_method(method)
        .with_time_step(args.time_step)
        .with_final_time(args.final_time)
        .with_system_frequency(args.frequency)
        .with_downsampling(args.downsampling);

    let fault = args.fault_time.map(|time| Fault {
        time,
        resistance: args.fault_resistance,
    });
    let circuit = balanced_resistive_load(args.load, fault)?;
    let mut simulator = Simulator::new(circuit, config)?;

    let stdout: Box<dyn Write> = Box::new(BufWriter::new(io::stdout().lock()));
    let mut voltages = CsvSink::new(open_output(args.voltages.as_ref(), stdout)?, "v");
    let mut currents = CsvSink::new(open_output(args.currents.as_ref(), Box::new(io::sink()))?, "j");
    simulator.run(&mut voltages, &mut currents)?;
    voltages.flush()?;
    currents.flush()?;

    if let Some(generator) = simulator.generator(GENERATOR) {
        if let Some(state) = generator.state() {
            info!(
                omega = state.omega,
                theta = state.theta,
                electrical_torque = state.electrical_torque,
                "final generator state"
            );
        }
    }
    Ok(())
}
