//! Voltage and current sources.
//!
//! Sources are sinusoids at the system frequency given as peak phasors. In
//! the phasor domain they inject a constant value; in EMT the instantaneous
//! value is re-evaluated at every step.

use num_complex::Complex64;

use super::MnaComponent;
use crate::circuit::NodeId;
use crate::error::{require_positive, GridsimError, Result};
use crate::solver::MnaSystem;

fn require_finite(component: &str, param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GridsimError::invalid_parameter(
            component,
            param,
            format!("must be finite, got {value}"),
        ))
    }
}

/// An ideal sinusoidal voltage source behind a series resistance.
///
/// Stamped as its Norton equivalent: conductance 1/R in parallel with the
/// current V/R injected into the positive node.
#[derive(Debug, Clone)]
pub struct VoltageSourceRes {
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    voltage: Complex64,
    resistance: f64,
    time: f64,
    current: Complex64,
}

impl VoltageSourceRes {
    /// Create a new source with peak voltage `magnitude` at phase angle
    /// `phase` (rad).
    pub fn new(
        name: impl Into<String>,
        nodes: [NodeId; 2],
        magnitude: f64,
        phase: f64,
        resistance: f64,
    ) -> Result<Self> {
        let name = name.into();
        require_finite(&name, "voltage", magnitude)?;
        require_finite(&name, "phase", phase)?;
        require_positive(&name, "resistance", resistance)?;
        Ok(Self {
            name,
            nodes,
            voltage: Complex64::from_polar(magnitude, phase),
            resistance,
            time: 0.0,
            current: Complex64::new(0.0, 0.0),
        })
    }

    /// Source voltage phasor.
    pub fn voltage(&self) -> Complex64 {
        self.voltage
    }

    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    /// Current delivered out of the positive terminal after the last solve.
    pub fn current(&self) -> Complex64 {
        self.current
    }
}

impl MnaComponent for VoltageSourceRes {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn conductive_paths(&self) -> Vec<(NodeId, NodeId)> {
        vec![(self.nodes[0], self.nodes[1])]
    }

    fn stamp_matrix(&self, system: &mut MnaSystem) -> Result<()> {
        system.stamp_conductance(
            self.nodes[0].matrix_index(),
            self.nodes[1].matrix_index(),
            Complex64::new(1.0 / self.resistance, 0.0),
        )
    }

    fn stamp_rhs(&self, system: &mut MnaSystem) -> Result<()> {
        let injection = system
            .settings()
            .source_value(self.voltage / self.resistance, self.time);
        system.stamp_current_injection(
            self.nodes[0].matrix_index(),
            self.nodes[1].matrix_index(),
            injection,
        )
    }

    fn step(&mut self, system: &mut MnaSystem, time: f64) -> Result<()> {
        self.time = time;
        self.stamp_rhs(system)
    }

    fn post_step(&mut self, system: &MnaSystem, time: f64) -> Result<()> {
        let source = system.settings().source_value(self.voltage, time);
        let across = system.node_value(self.nodes[0])? - system.node_value(self.nodes[1])?;
        self.current = (source - across) / self.resistance;
        Ok(())
    }
}

/// An ideal sinusoidal current source.
///
/// The current is injected into `nodes[0]` and drawn from `nodes[1]`.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub name: String,
    pub nodes: [NodeId; 2],
    current: Complex64,
    time: f64,
}

impl CurrentSource {
    /// Create a new source with peak current `magnitude` at phase angle
    /// `phase` (rad).
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], magnitude: f64, phase: f64) -> Result<Self> {
        let name = name.into();
        require_finite(&name, "current", magnitude)?;
        require_finite(&name, "phase", phase)?;
        Ok(Self {
            name,
            nodes,
            current: Complex64::from_polar(magnitude, phase),
            time: 0.0,
        })
    }

    /// Source current phasor.
    pub fn current(&self) -> Complex64 {
        self.current
    }

    /// Set the current phasor, effective from the next step.
    pub fn set_current(&mut self, magnitude: f64, phase: f64) -> Result<()> {
        require_finite(&self.name, "current", magnitude)?;
        require_finite(&self.name, "phase", phase)?;
        self.current = Complex64::from_polar(magnitude, phase);
        Ok(())
    }
}

impl MnaComponent for CurrentSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn stamp_matrix(&self, _system: &mut MnaSystem) -> Result<()> {
        Ok(())
    }

    fn stamp_rhs(&self, system: &mut MnaSystem) -> Result<()> {
        let injection = system.settings().source_value(self.current, self.time);
        system.stamp_current_injection(
            self.nodes[0].matrix_index(),
            self.nodes[1].matrix_index(),
            injection,
        )
    }

    fn step(&mut self, system: &mut MnaSystem, time: f64) -> Result<()> {
        self.time = time;
        self.stamp_rhs(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Domain, NumericalMethod, SolverSettings};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn system(domain: Domain) -> MnaSystem {
        MnaSystem::new(
            1,
            SolverSettings {
                domain,
                method: NumericalMethod::Trapezoidal,
                time_step: 1e-4,
                omega: 2.0 * PI * 50.0,
            },
        )
    }

    #[test]
    fn test_voltage_divider_phasor() {
        // 10∠30° behind 1 Ohm into a 1 Ohm load: half the source voltage
        let mut sys = system(Domain::DynamicPhasor);
        let mut source = VoltageSourceRes::new("V1", [NodeId(1), NodeId::GROUND], 10.0, PI / 6.0, 1.0).unwrap();
        source.stamp_matrix(&mut sys).unwrap();
        sys.stamp_conductance(Some(0), None, Complex64::new(1.0, 0.0)).unwrap();
        source.step(&mut sys, 1e-4).unwrap();
        sys.solve().unwrap();
        source.post_step(&sys, 1e-4).unwrap();

        let v = sys.node_value(NodeId(1)).unwrap();
        assert_abs_diff_eq!(v.norm(), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v.arg(), PI / 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(source.current().norm(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_voltage_source_emt_follows_time() {
        let mut sys = system(Domain::Emt);
        let mut source = VoltageSourceRes::new("V1", [NodeId(1), NodeId::GROUND], 10.0, 0.0, 1.0).unwrap();
        source.stamp_matrix(&mut sys).unwrap();
        sys.stamp_conductance(Some(0), None, Complex64::new(1.0, 0.0)).unwrap();

        let t = 0.005; // quarter period at 50 Hz
        source.step(&mut sys, t).unwrap();
        sys.solve().unwrap();
        assert_abs_diff_eq!(sys.solution()[0], 0.0, epsilon = 1e-9);

        sys.clear_rhs();
        source.step(&mut sys, 0.01).unwrap();
        sys.solve().unwrap();
        assert_abs_diff_eq!(sys.solution()[0], -5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_current_source_direction() {
        let mut sys = system(Domain::Emt);
        let mut source = CurrentSource::new("I1", [NodeId::GROUND, NodeId(1)], 2.0, 0.0).unwrap();
        sys.stamp_conductance(Some(0), None, Complex64::new(0.5, 0.0)).unwrap();
        source.step(&mut sys, 0.0).unwrap();
        sys.solve().unwrap();
        // Drawn from node 1: negative voltage across the load
        assert_abs_diff_eq!(sys.solution()[0], -4.0, epsilon = 1e-9);
        assert!(source.conductive_paths().is_empty());
    }

    #[test]
    fn test_invalid_source_parameters() {
        assert!(VoltageSourceRes::new("V1", [NodeId(1), NodeId(0)], 1.0, 0.0, 0.0).is_err());
        assert!(VoltageSourceRes::new("V1", [NodeId(1), NodeId(0)], f64::NAN, 0.0, 1.0).is_err());
        assert!(CurrentSource::new("I1", [NodeId(1), NodeId(0)], 1.0, f64::INFINITY).is_err());
    }
}
