//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for network simulation.
//!
//! ## Modified Nodal Analysis
//!
//! Every element is reduced to a Norton equivalent (conductance plus current
//! injection), so the assembled system contains node voltages only:
//! ```text
//! G v = J
//! ```
//!
//! where:
//! - G is the conductance/admittance matrix, one row per non-ground node
//! - v is the vector of node voltages
//! - J is the sum of current injections into each node
//!
//! ## Domains
//!
//! In the EMT domain every unknown is an instantaneous real value. In the
//! dynamic phasor domain each node carries a complex envelope `V` with
//! `v(t) = Re{V e^{jωt}}`; real and imaginary parts are separate unknowns
//! (`i` and `i + n`), so the system stays real-valued and can also hold
//! couplings that are real-linear but not complex-linear.

mod integration;
mod mna;
mod simulator;

use std::fmt;

use num_complex::Complex64;

pub use integration::{DiscreteStep, NumericalMethod};
pub use mna::{MnaSystem, Part};
pub use simulator::{SimulationConfig, Simulator};

/// Default simulation time step in seconds.
pub const DEFAULT_TIME_STEP: f64 = 1e-6;

/// Default simulated duration in seconds.
pub const DEFAULT_FINAL_TIME: f64 = 0.1;

/// Default system frequency in Hz.
pub const DEFAULT_SYSTEM_FREQUENCY: f64 = 60.0;

/// Representation of network quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Domain {
    /// Instantaneous real values (electromagnetic transients).
    Emt,
    /// Complex envelopes around the system frequency.
    #[default]
    DynamicPhasor,
}

impl Domain {
    /// Number of real unknowns per node.
    pub fn width(self) -> usize {
        match self {
            Domain::Emt => 1,
            Domain::DynamicPhasor => 2,
        }
    }

    /// Short name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Domain::Emt => "EMT",
            Domain::DynamicPhasor => "dynamic phasor",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings shared by the system model and every component call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Quantity representation.
    pub domain: Domain,
    /// Integration rule for state-carrying components.
    pub method: NumericalMethod,
    /// Time step in seconds.
    pub time_step: f64,
    /// System angular frequency in rad/s.
    pub omega: f64,
}

impl SolverSettings {
    /// Value of a sinusoidal source with the given phasor at `time`, in the
    /// representation of the active domain.
    ///
    /// EMT yields the instantaneous value `Re{X e^{jωt}}` (imaginary part
    /// zero), the phasor domain yields the phasor itself.
    pub fn source_value(&self, phasor: Complex64, time: f64) -> Complex64 {
        match self.domain {
            Domain::Emt => {
                let value = phasor * Complex64::from_polar(1.0, self.omega * time);
                Complex64::new(value.re, 0.0)
            }
            Domain::DynamicPhasor => phasor,
        }
    }

    /// Instantaneous value of a domain quantity at `time`.
    pub fn instantaneous(&self, value: Complex64, time: f64) -> f64 {
        match self.domain {
            Domain::Emt => value.re,
            Domain::DynamicPhasor => (value * Complex64::from_polar(1.0, self.omega * time)).re,
        }
    }

    /// Frequency shift seen by reactive elements: ω for phasors, 0 for EMT.
    pub fn envelope_omega(&self) -> f64 {
        match self.domain {
            Domain::Emt => 0.0,
            Domain::DynamicPhasor => self.omega,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn settings(domain: Domain) -> SolverSettings {
        SolverSettings {
            domain,
            method: NumericalMethod::Trapezoidal,
            time_step: 1e-6,
            omega: 2.0 * PI * 50.0,
        }
    }

    #[test]
    fn test_source_value_per_domain() {
        let phasor = Complex64::from_polar(10.0, PI / 3.0);
        let t = 0.004;

        let emt = settings(Domain::Emt).source_value(phasor, t);
        assert_abs_diff_eq!(emt.re, 10.0 * (2.0 * PI * 50.0 * t + PI / 3.0).cos(), epsilon = 1e-12);
        assert_eq!(emt.im, 0.0);

        let dp = settings(Domain::DynamicPhasor).source_value(phasor, t);
        assert_eq!(dp, phasor);
    }

    #[test]
    fn test_instantaneous_matches_between_domains() {
        let phasor = Complex64::new(3.0, -4.0);
        let t = 0.0123;
        let emt = settings(Domain::Emt);
        let dp = settings(Domain::DynamicPhasor);
        let from_emt = emt.instantaneous(emt.source_value(phasor, t), t);
        let from_dp = dp.instantaneous(dp.source_value(phasor, t), t);
        assert_abs_diff_eq!(from_emt, from_dp, epsilon = 1e-12);
    }
}
