//! Linear passive components: Resistor, Inductor, Capacitor.
//!
//! Reactive elements use the trapezoidal companion model regardless of the
//! selected machine integration rule. In the phasor domain the envelope
//! equations carry an extra `jω` term:
//! ```text
//! inductor:   L di/dt = v - jωL i
//! capacitor:  C dv/dt = i - jωC v
//! ```
//! which reduces to the usual EMT companion for ω = 0.

use num_complex::Complex64;

use super::MnaComponent;
use crate::circuit::NodeId;
use crate::error::{require_positive, Result};
use crate::solver::MnaSystem;

/// A resistor component.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub name: String,
    pub nodes: [NodeId; 2],
    resistance: f64,
}

impl Resistor {
    /// Create a new resistor. Resistance must be positive.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], resistance: f64) -> Result<Self> {
        let name = name.into();
        require_positive(&name, "resistance", resistance)?;
        Ok(Self {
            name,
            nodes,
            resistance,
        })
    }

    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

impl MnaComponent for Resistor {
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
            Complex64::new(self.conductance(), 0.0),
        )
    }

    fn stamp_rhs(&self, _system: &mut MnaSystem) -> Result<()> {
        Ok(())
    }
}

/// Branch relation `i[k+1] = G v[k+1] + history` shared by the reactive
/// elements. Current flows from `nodes[0]` to `nodes[1]` through the element.
fn stamp_history(nodes: &[NodeId; 2], history: Complex64, system: &mut MnaSystem) -> Result<()> {
    system.stamp_current_injection(nodes[1].matrix_index(), nodes[0].matrix_index(), history)
}

fn branch_voltage(nodes: &[NodeId; 2], system: &MnaSystem) -> Result<Complex64> {
    Ok(system.node_value(nodes[0])? - system.node_value(nodes[1])?)
}

/// An inductor component.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub name: String,
    pub nodes: [NodeId; 2],
    inductance: f64,
    /// Branch current after the last solve
    current: Complex64,
    /// Branch voltage after the last solve
    voltage: Complex64,
    /// Companion current source for the step in progress
    history: Complex64,
}

impl Inductor {
    /// Create a new inductor with zero initial current.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], inductance: f64) -> Result<Self> {
        let name = name.into();
        require_positive(&name, "inductance", inductance)?;
        Ok(Self {
            name,
            nodes,
            inductance,
            current: Complex64::new(0.0, 0.0),
            voltage: Complex64::new(0.0, 0.0),
            history: Complex64::new(0.0, 0.0),
        })
    }

    pub fn inductance(&self) -> f64 {
        self.inductance
    }

    /// Branch current in the network domain.
    pub fn current(&self) -> Complex64 {
        self.current
    }

    /// Companion conductance `(dt/2L) / (1 + jω dt/2)`.
    fn companion(&self, system: &MnaSystem) -> (Complex64, Complex64) {
        let settings = system.settings();
        let half = 0.5 * settings.time_step;
        let shift = Complex64::new(0.0, settings.envelope_omega() * half);
        let denominator = Complex64::new(1.0, 0.0) + shift;
        let conductance = Complex64::new(half / self.inductance, 0.0) / denominator;
        let decay = (Complex64::new(1.0, 0.0) - shift) / denominator;
        (conductance, decay)
    }
}

impl MnaComponent for Inductor {
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
        let (conductance, _) = self.companion(system);
        system.stamp_conductance(
            self.nodes[0].matrix_index(),
            self.nodes[1].matrix_index(),
            conductance,
        )
    }

    fn stamp_rhs(&self, system: &mut MnaSystem) -> Result<()> {
        stamp_history(&self.nodes, self.history, system)
    }

    fn step(&mut self, system: &mut MnaSystem, _time: f64) -> Result<()> {
        let (conductance, decay) = self.companion(system);
        self.history = decay * self.current + conductance * self.voltage;
        self.stamp_rhs(system)
    }

    fn post_step(&mut self, system: &MnaSystem, _time: f64) -> Result<()> {
        let (conductance, _) = self.companion(system);
        self.voltage = branch_voltage(&self.nodes, system)?;
        self.current = conductance * self.voltage + self.history;
        Ok(())
    }
}

/// A capacitor component.
///
/// Companion model:
/// ```text
/// i[k+1] = (2C/dt + jωC) v[k+1] - (2C/dt - jωC) v[k] - i[k]
/// ```
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub name: String,
    pub nodes: [NodeId; 2],
    capacitance: f64,
    current: Complex64,
    voltage: Complex64,
    history: Complex64,
}

impl Capacitor {
    /// Create a new, uncharged capacitor.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], capacitance: f64) -> Result<Self> {
        let name = name.into();
        require_positive(&name, "capacitance", capacitance)?;
        Ok(Self {
            name,
            nodes,
            capacitance,
            current: Complex64::new(0.0, 0.0),
            voltage: Complex64::new(0.0, 0.0),
            history: Complex64::new(0.0, 0.0),
        })
    }

    pub fn capacitance(&self) -> f64 {
        self.capacitance
    }

    /// Voltage across the capacitor in the network domain.
    pub fn voltage(&self) -> Complex64 {
        self.voltage
    }

    pub fn current(&self) -> Complex64 {
        self.current
    }

    fn conductance(&self, system: &MnaSystem) -> Complex64 {
        let settings = system.settings();
        Complex64::new(
            2.0 * self.capacitance / settings.time_step,
            settings.envelope_omega() * self.capacitance,
        )
    }
}

impl MnaComponent for Capacitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    // The companion conductance 2C/dt is never zero
    fn conductive_paths(&self) -> Vec<(NodeId, NodeId)> {
        vec![(self.nodes[0], self.nodes[1])]
    }

    fn stamp_matrix(&self, system: &mut MnaSystem) -> Result<()> {
        system.stamp_conductance(
            self.nodes[0].matrix_index(),
            self.nodes[1].matrix_index(),
            self.conductance(system),
        )
    }

    fn stamp_rhs(&self, system: &mut MnaSystem) -> Result<()> {
        stamp_history(&self.nodes, self.history, system)
    }

    fn step(&mut self, system: &mut MnaSystem, _time: f64) -> Result<()> {
        // (2C/dt - jωC) is the conjugate of the companion conductance
        self.history = -(self.conductance(system).conj() * self.voltage + self.current);
        self.stamp_rhs(system)
    }

    fn post_step(&mut self, system: &MnaSystem, _time: f64) -> Result<()> {
        self.voltage = branch_voltage(&self.nodes, system)?;
        self.current = self.conductance(system) * self.voltage + self.history;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridsimError;
    use crate::solver::{Domain, NumericalMethod, SolverSettings};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    const OMEGA: f64 = 2.0 * PI * 60.0;

    fn system(domain: Domain, dt: f64) -> MnaSystem {
        MnaSystem::new(
            1,
            SolverSettings {
                domain,
                method: NumericalMethod::Trapezoidal,
                time_step: dt,
                omega: OMEGA,
            },
        )
    }

    /// Drive node 1 with a constant injected current across a 1 Ohm
    /// resistor in parallel with `element`.
    fn drive<C: MnaComponent>(element: &mut C, system: &mut MnaSystem, injected: Complex64, steps: usize) {
        system
            .stamp_conductance(Some(0), None, Complex64::new(1.0, 0.0))
            .unwrap();
        element.stamp_matrix(system).unwrap();
        let dt = system.settings().time_step;
        for k in 1..=steps {
            let t = k as f64 * dt;
            system.clear_rhs();
            system.add_to_rhs(0, injected).unwrap();
            element.step(system, t).unwrap();
            system.solve().unwrap();
            element.post_step(system, t).unwrap();
        }
    }

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new("R1", [NodeId(1), NodeId::GROUND], 1000.0).unwrap();
        assert_abs_diff_eq!(r.conductance(), 0.001, epsilon = 1e-15);
        assert_eq!(r.conductive_paths(), vec![(NodeId(1), NodeId::GROUND)]);
    }

    #[test]
    fn test_non_positive_values_rejected() {
        let err = Resistor::new("R1", [NodeId(1), NodeId(0)], 0.0).unwrap_err();
        assert!(matches!(err, GridsimError::InvalidParameter { .. }));
        assert!(Inductor::new("L1", [NodeId(1), NodeId(0)], -1e-3).is_err());
        assert!(Capacitor::new("C1", [NodeId(1), NodeId(0)], f64::INFINITY).is_err());
    }

    #[test]
    fn test_inductor_current_rise_emt() {
        // i_L(t) = 1 - exp(-t R/L), tau = 1 ms
        let mut sys = system(Domain::Emt, 1e-5);
        let mut l = Inductor::new("L1", [NodeId(1), NodeId::GROUND], 1e-3).unwrap();
        drive(&mut l, &mut sys, Complex64::new(1.0, 0.0), 500);
        assert_abs_diff_eq!(l.current().re, 1.0 - (-5.0f64).exp(), epsilon = 1e-3);
    }

    #[test]
    fn test_inductor_phasor_steady_state() {
        // ωL = R = 1: the current divides as (1 - j)/2 into the inductor
        let mut sys = system(Domain::DynamicPhasor, 1e-4);
        let mut l = Inductor::new("L1", [NodeId(1), NodeId::GROUND], 1.0 / OMEGA).unwrap();
        drive(&mut l, &mut sys, Complex64::new(1.0, 0.0), 1000);
        assert_abs_diff_eq!(l.current().re, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(l.current().im, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_capacitor_charging_emt() {
        // v(t) = R I (1 - exp(-t/RC)), tau = 1 ms
        let mut sys = system(Domain::Emt, 1e-5);
        let mut c = Capacitor::new("C1", [NodeId(1), NodeId::GROUND], 1e-3).unwrap();
        drive(&mut c, &mut sys, Complex64::new(1.0, 0.0), 300);
        assert_abs_diff_eq!(c.voltage().re, 1.0 - (-3.0f64).exp(), epsilon = 1e-3);
    }

    #[test]
    fn test_capacitor_phasor_steady_state() {
        // 1/(ωC) = R = 1: v = 1 / (1 + j)
        let mut sys = system(Domain::DynamicPhasor, 1e-4);
        let mut c = Capacitor::new("C1", [NodeId(1), NodeId::GROUND], 1.0 / OMEGA).unwrap();
        drive(&mut c, &mut sys, Complex64::new(1.0, 0.0), 1000);
        assert_abs_diff_eq!(c.voltage().re, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(c.voltage().im, -0.5, epsilon = 1e-6);
    }
}
