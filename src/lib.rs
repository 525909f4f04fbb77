//! # Gridsim Core
//!
//! A time-domain simulator for electrical power networks.
//!
//! This library provides:
//! - Modified Nodal Analysis (MNA) based network simulation
//! - Two representations of network quantities: instantaneous values (EMT)
//!   and dynamic phasors around the system frequency
//! - Linear components (R, L, C, switches, sources) and a three-phase
//!   synchronous generator in the rotor reference frame
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Network graph representation and validation
//! - [`components`] - Component models (resistors, sources, generator, etc.)
//! - [`solver`] - MNA system assembly, integration rules and the driver
//! - [`output`] - Sinks for logged solution rows
//! - [`scenarios`] - Reference machine and test networks
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! RUST_LOG=info gridsim --domain dp --method trapezoidal --final-time 0.1 > voltages.csv
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use gridsim_core::output::RowBuffer;
//! use gridsim_core::scenarios::{balanced_resistive_load, REFERENCE_LOAD};
//! use gridsim_core::{SimulationConfig, Simulator};
//!
//! let circuit = balanced_resistive_load(REFERENCE_LOAD, None)?;
//! let mut sim = Simulator::new(circuit, SimulationConfig::new())?;
//! let (mut voltages, mut currents) = (RowBuffer::new(), RowBuffer::new());
//! sim.run(&mut voltages, &mut currents)?;
//! # Ok::<(), gridsim_core::GridsimError>(())
//! ```
//!
//! ## Simulation Method
//!
//! For each time step dt:
//!
//! 1. Every component updates its history terms and stamps its current
//!    injection into the right-hand side J
//! 2. If any admittance changed, the system matrix G is reassembled
//! 3. Solve G v = J for the node voltages
//! 4. Every component reads the solution back into its state
//!
//! Reactive elements (C, L) are discretized using the trapezoidal rule. The
//! generator's flux and swing equations use forward Euler or the trapezoidal
//! rule as configured.

pub mod circuit;
pub mod components;
pub mod error;
pub mod output;
pub mod scenarios;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{Circuit, NodeId};
pub use error::{ErrorKind, GridsimError, Result};
pub use solver::{Domain, NumericalMethod, SimulationConfig, Simulator};
