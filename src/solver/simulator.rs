//! Main simulator interface.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use tracing::{debug, info, trace};

use crate::circuit::{validate_circuit, Circuit, NodeId};
use crate::components::{Component, MnaComponent, SynchronousGenerator};
use crate::error::{GridsimError, Result};
use crate::output::DataSink;

use super::mna::MnaSystem;
use super::{
    Domain, NumericalMethod, SolverSettings, DEFAULT_FINAL_TIME, DEFAULT_SYSTEM_FREQUENCY,
    DEFAULT_TIME_STEP,
};

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Time step in seconds.
    pub time_step: f64,
    /// Simulated duration in seconds.
    pub final_time: f64,
    /// System frequency in Hz.
    pub system_frequency: f64,
    /// Quantity representation.
    pub domain: Domain,
    /// Integration rule for machine states.
    pub method: NumericalMethod,
    /// Log every n-th step.
    pub downsampling: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            final_time: DEFAULT_FINAL_TIME,
            system_frequency: DEFAULT_SYSTEM_FREQUENCY,
            domain: Domain::default(),
            method: NumericalMethod::default(),
            downsampling: 1,
        }
    }
}

impl SimulationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time step (in seconds).
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the simulated duration (in seconds).
    pub fn with_final_time(mut self, final_time: f64) -> Self {
        self.final_time = final_time;
        self
    }

    /// Set the system frequency (in Hz).
    pub fn with_system_frequency(mut self, frequency: f64) -> Self {
        self.system_frequency = frequency;
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_method(mut self, method: NumericalMethod) -> Self {
        self.method = method;
        self
    }

    /// Log only every `downsampling`-th step.
    pub fn with_downsampling(mut self, downsampling: usize) -> Self {
        self.downsampling = downsampling;
        self
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(GridsimError::invalid_simulation(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        if !(self.final_time.is_finite() && self.final_time > 0.0) {
            return Err(GridsimError::invalid_simulation(format!(
                "final time must be positive, got {}",
                self.final_time
            )));
        }
        if !(self.system_frequency.is_finite() && self.system_frequency > 0.0) {
            return Err(GridsimError::invalid_simulation(format!(
                "system frequency must be positive, got {}",
                self.system_frequency
            )));
        }
        if self.downsampling == 0 {
            return Err(GridsimError::invalid_simulation(
                "downsampling factor must be at least 1",
            ));
        }
        Ok(())
    }

    /// Settings handed to the system model and components.
    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            domain: self.domain,
            method: self.method,
            time_step: self.time_step,
            omega: 2.0 * std::f64::consts::PI * self.system_frequency,
        }
    }
}

/// The main network simulator.
///
/// Owns the circuit and its MNA system. Simulation time is derived from the
/// step count, so `time = k * dt` carries no accumulated rounding.
#[derive(Debug)]
pub struct Simulator {
    /// The circuit being simulated
    circuit: Circuit,
    /// MNA system
    system: MnaSystem,
    config: SimulationConfig,
    /// Completed steps
    step_count: u64,
}

impl Simulator {
    /// Validate the circuit and assemble the initial system.
    ///
    /// Every generator must be initialized before this call.
    pub fn new(circuit: Circuit, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        validate_circuit(&circuit)?;

        let mut system = MnaSystem::new(circuit.num_nodes(), config.solver_settings());
        for component in circuit.components() {
            component.stamp_matrix(&mut system)?;
        }
        for component in circuit.components() {
            component.stamp_rhs(&mut system)?;
        }

        info!(
            nodes = circuit.num_nodes(),
            components = circuit.components().len(),
            domain = %config.domain,
            method = ?config.method,
            time_step = config.time_step,
            "simulator initialized"
        );

        Ok(Self {
            circuit,
            system,
            config,
            step_count: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.step_count as f64 * self.config.time_step
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Number of steps needed for the time to reach the final time.
    pub fn total_steps(&self) -> u64 {
        let ratio = self.config.final_time / self.config.time_step;
        // Tolerance absorbs rounding in tf / dt for exact multiples
        (ratio - 1e-9 * ratio.max(1.0)).ceil().max(0.0) as u64
    }

    /// Whether the time has reached the configured final time.
    pub fn is_finished(&self) -> bool {
        self.step_count >= self.total_steps()
    }

    /// Advance the simulation by one time step.
    ///
    /// Components are stepped and read back at the current time `t`; the
    /// time then advances to `t + dt`.
    pub fn step(&mut self) -> Result<()> {
        let time = self.time();

        self.system.clear_rhs();
        for component in self.circuit.components_mut() {
            component.step(&mut self.system, time)?;
        }

        if self.circuit.components().iter().any(|c| c.admittance_changed()) {
            self.system.clear_matrix();
            for component in self.circuit.components() {
                component.stamp_matrix(&mut self.system)?;
            }
            trace!(time, "reassembled system matrix");
        }

        self.system.solve()?;

        for component in self.circuit.components_mut() {
            component.post_step(&self.system, time)?;
        }
        self.step_count += 1;
        Ok(())
    }

    /// Run until the final time, logging every `downsampling`-th step.
    ///
    /// Voltage rows hold the solution vector, current rows the right-hand
    /// side. In the phasor domain real parts come first, then imaginary
    /// parts.
    pub fn run(&mut self, voltages: &mut dyn DataSink, currents: &mut dyn DataSink) -> Result<()> {
        info!(
            start = self.time(),
            final_time = self.config.final_time,
            "starting simulation"
        );
        let downsampling = self.config.downsampling as u64;
        let mut rows = 0usize;
        while !self.is_finished() {
            self.step()?;
            if self.step_count % downsampling == 0 {
                let time = self.time();
                voltages.append_row(time, self.system.solution().as_slice())?;
                currents.append_row(time, self.system.rhs().as_slice())?;
                rows += 1;
            }
        }
        debug!(factorizations = self.system.factorization_count(), "solver statistics");
        info!(steps = self.step_count, rows, time = self.time(), "simulation finished");
        Ok(())
    }

    /// Get the MNA system.
    pub fn system(&self) -> &MnaSystem {
        &self.system
    }

    /// System matrix as last assembled.
    pub fn system_matrix(&self) -> &DMatrix<f64> {
        self.system.matrix()
    }

    pub fn solution(&self) -> &DVector<f64> {
        self.system.solution()
    }

    pub fn rhs(&self) -> &DVector<f64> {
        self.system.rhs()
    }

    /// Voltage of a node in the network domain.
    pub fn node_voltage(&self, node: NodeId) -> Result<Complex64> {
        self.system.node_value(node)
    }

    /// Instantaneous voltage of a node at the current time.
    pub fn instantaneous_voltage(&self, node: NodeId) -> Result<f64> {
        let value = self.system.node_value(node)?;
        Ok(self.system.settings().instantaneous(value, self.time()))
    }

    /// Get a reference to the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Mutable access for operating components between steps.
    pub fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.circuit.component(name)
    }

    pub fn generator(&self, name: &str) -> Option<&SynchronousGenerator> {
        self.circuit.generator(name)
    }
}
