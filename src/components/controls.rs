//! Control components: Switch.

use num_complex::Complex64;
use tracing::debug;

use super::MnaComponent;
use crate::circuit::NodeId;
use crate::error::{require_positive, GridsimError, Result};
use crate::solver::MnaSystem;

/// A switch component.
///
/// Modeled as a resistance that takes one of two values. An optional
/// switching instant toggles the state once during the simulation; the step
/// on which that happens reports a changed admittance so the driver
/// reassembles the system matrix.
#[derive(Debug, Clone)]
pub struct Switch {
    pub name: String,
    pub nodes: [NodeId; 2],
    open_resistance: f64,
    closed_resistance: f64,
    closed: bool,
    switch_time: Option<f64>,
    changed: bool,
}

impl Switch {
    /// Resistance when closed, unless configured otherwise.
    pub const R_CLOSED: f64 = 0.01;
    /// Resistance when open, unless configured otherwise.
    pub const R_OPEN: f64 = 1e9;

    /// Create a new switch with the default resistances.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], closed: bool) -> Self {
        Self {
            name: name.into(),
            nodes,
            open_resistance: Self::R_OPEN,
            closed_resistance: Self::R_CLOSED,
            closed,
            switch_time: None,
            changed: false,
        }
    }

    /// Override the open and closed resistances.
    pub fn with_resistances(mut self, open: f64, closed: f64) -> Result<Self> {
        require_positive(&self.name, "open_resistance", open)?;
        require_positive(&self.name, "closed_resistance", closed)?;
        if closed >= open {
            return Err(GridsimError::invalid_parameter(
                &self.name,
                "closed_resistance",
                format!("must be below the open resistance {open}, got {closed}"),
            ));
        }
        self.open_resistance = open;
        self.closed_resistance = closed;
        Ok(self)
    }

    /// Toggle the switch once when simulation time reaches `time`.
    pub fn with_switch_time(mut self, time: f64) -> Result<Self> {
        if !(time.is_finite() && time >= 0.0) {
            return Err(GridsimError::invalid_parameter(
                &self.name,
                "switch_time",
                format!("must be a non-negative time, got {time}"),
            ));
        }
        self.switch_time = Some(time);
        Ok(self)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get the current resistance.
    pub fn resistance(&self) -> f64 {
        if self.closed {
            self.closed_resistance
        } else {
            self.open_resistance
        }
    }

    /// Get the current conductance.
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance()
    }

    /// Set the switch state, effective from the next step.
    pub fn set_state(&mut self, closed: bool) {
        if self.closed != closed {
            self.closed = closed;
            self.changed = true;
        }
    }
}

impl MnaComponent for Switch {
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

    fn step(&mut self, system: &mut MnaSystem, time: f64) -> Result<()> {
        // Half-step tolerance absorbs rounding in k * dt
        let half_step = 0.5 * system.settings().time_step;
        if let Some(at) = self.switch_time {
            if time + half_step >= at {
                self.switch_time = None;
                self.set_state(!self.closed);
                debug!(switch = %self.name, time, closed = self.closed, "switch operated");
            }
        }
        self.stamp_rhs(system)
    }

    fn post_step(&mut self, _system: &MnaSystem, _time: f64) -> Result<()> {
        self.changed = false;
        Ok(())
    }

    fn admittance_changed(&self) -> bool {
        self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Domain, NumericalMethod, SolverSettings};

    fn system() -> MnaSystem {
        MnaSystem::new(
            1,
            SolverSettings {
                domain: Domain::Emt,
                method: NumericalMethod::Trapezoidal,
                time_step: 1e-3,
                omega: 0.0,
            },
        )
    }

    #[test]
    fn test_switch_resistance() {
        let mut s = Switch::new("S1", [NodeId(1), NodeId(0)], true);
        assert_eq!(s.resistance(), Switch::R_CLOSED);
        s.set_state(false);
        assert_eq!(s.resistance(), Switch::R_OPEN);
        assert!(s.admittance_changed());
    }

    #[test]
    fn test_scheduled_toggle_fires_once() {
        let mut sys = system();
        let mut s = Switch::new("S1", [NodeId(1), NodeId(0)], false)
            .with_switch_time(0.003)
            .unwrap();
        let mut toggled_at = Vec::new();
        for k in 1..=6 {
            let t = k as f64 * 1e-3;
            s.step(&mut sys, t).unwrap();
            if s.admittance_changed() {
                toggled_at.push(k);
            }
            s.post_step(&sys, t).unwrap();
        }
        assert_eq!(toggled_at, vec![3]);
        assert!(s.is_closed());
    }

    #[test]
    fn test_invalid_configuration() {
        let s = Switch::new("S1", [NodeId(1), NodeId(0)], false);
        assert!(s.clone().with_resistances(1.0, 10.0).is_err());
        assert!(s.clone().with_switch_time(-1.0).is_err());
        let s = s.with_resistances(1e6, 1e-3).unwrap();
        assert_eq!(s.resistance(), 1e6);
    }
}
