//! Component models for network simulation.
//!
//! This module provides models for all supported network elements:
//! - Linear: Resistor, Inductor, Capacitor
//! - Sources: Voltage source with series resistance, Current source
//! - Controls: Switch
//! - Machines: Synchronous generator
//!
//! Every component reduces itself to a Norton equivalent and stamps it into
//! the [`MnaSystem`]. The driver calls the hooks in a fixed order per step:
//! `step` (update history, stamp right-hand side), solve, `post_step` (read
//! the solution back into component state).

mod controls;
pub mod generator;
mod linear;
mod sources;

pub use controls::Switch;
pub use generator::{GeneratorParams, MachineState, OperatingPoint, SynchronousGenerator};
pub use linear::{Capacitor, Inductor, Resistor};
pub use sources::{CurrentSource, VoltageSourceRes};

use crate::circuit::NodeId;
use crate::error::Result;
use crate::solver::MnaSystem;

/// Participation of a network element in the MNA system.
pub trait MnaComponent {
    /// Unique component name.
    fn name(&self) -> &str;

    /// Terminal nodes.
    fn nodes(&self) -> &[NodeId];

    /// Node pairs joined by a conductive element, for the ground
    /// reachability check. Pure injections return none.
    fn conductive_paths(&self) -> Vec<(NodeId, NodeId)> {
        Vec::new()
    }

    /// Add the element's admittances to the system matrix.
    fn stamp_matrix(&self, system: &mut MnaSystem) -> Result<()>;

    /// Add the element's current injections to the right-hand side.
    fn stamp_rhs(&self, system: &mut MnaSystem) -> Result<()>;

    /// Update internal history for the step starting at `time` and stamp
    /// the right-hand side. Sources are evaluated at `time`.
    fn step(&mut self, system: &mut MnaSystem, _time: f64) -> Result<()> {
        self.stamp_rhs(system)
    }

    /// Read the solution of the step starting at `time` back into the
    /// element state.
    fn post_step(&mut self, _system: &MnaSystem, _time: f64) -> Result<()> {
        Ok(())
    }

    /// Whether the matrix stamp differs from the last assembled one.
    fn admittance_changed(&self) -> bool {
        false
    }
}

/// A network component.
#[derive(Debug, Clone)]
pub enum Component {
    Resistor(Resistor),
    Inductor(Inductor),
    Capacitor(Capacitor),
    Switch(Switch),
    VoltageSourceRes(VoltageSourceRes),
    CurrentSource(CurrentSource),
    Generator(Box<SynchronousGenerator>),
}

impl Component {
    fn inner(&self) -> &dyn MnaComponent {
        match self {
            Component::Resistor(r) => r,
            Component::Inductor(l) => l,
            Component::Capacitor(c) => c,
            Component::Switch(s) => s,
            Component::VoltageSourceRes(v) => v,
            Component::CurrentSource(i) => i,
            Component::Generator(g) => g.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn MnaComponent {
        match self {
            Component::Resistor(r) => r,
            Component::Inductor(l) => l,
            Component::Capacitor(c) => c,
            Component::Switch(s) => s,
            Component::VoltageSourceRes(v) => v,
            Component::CurrentSource(i) => i,
            Component::Generator(g) => g.as_mut(),
        }
    }

    pub fn as_generator(&self) -> Option<&SynchronousGenerator> {
        match self {
            Component::Generator(g) => Some(g.as_ref()),
            _ => None,
        }
    }

    pub fn as_generator_mut(&mut self) -> Option<&mut SynchronousGenerator> {
        match self {
            Component::Generator(g) => Some(g.as_mut()),
            _ => None,
        }
    }

    pub fn as_switch_mut(&mut self) -> Option<&mut Switch> {
        match self {
            Component::Switch(s) => Some(s),
            _ => None,
        }
    }
}

impl MnaComponent for Component {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn nodes(&self) -> &[NodeId] {
        self.inner().nodes()
    }

    fn conductive_paths(&self) -> Vec<(NodeId, NodeId)> {
        self.inner().conductive_paths()
    }

    fn stamp_matrix(&self, system: &mut MnaSystem) -> Result<()> {
        self.inner().stamp_matrix(system)
    }

    fn stamp_rhs(&self, system: &mut MnaSystem) -> Result<()> {
        self.inner().stamp_rhs(system)
    }

    fn step(&mut self, system: &mut MnaSystem, time: f64) -> Result<()> {
        self.inner_mut().step(system, time)
    }

    fn post_step(&mut self, system: &MnaSystem, time: f64) -> Result<()> {
        self.inner_mut().post_step(system, time)
    }

    fn admittance_changed(&self) -> bool {
        self.inner().admittance_changed()
    }
}

impl From<Resistor> for Component {
    fn from(r: Resistor) -> Self {
        Component::Resistor(r)
    }
}

impl From<Inductor> for Component {
    fn from(l: Inductor) -> Self {
        Component::Inductor(l)
    }
}

impl From<Capacitor> for Component {
    fn from(c: Capacitor) -> Self {
        Component::Capacitor(c)
    }
}

impl From<Switch> for Component {
    fn from(s: Switch) -> Self {
        Component::Switch(s)
    }
}

impl From<VoltageSourceRes> for Component {
    fn from(v: VoltageSourceRes) -> Self {
        Component::VoltageSourceRes(v)
    }
}

impl From<CurrentSource> for Component {
    fn from(i: CurrentSource) -> Self {
        Component::CurrentSource(i)
    }
}

impl From<SynchronousGenerator> for Component {
    fn from(g: SynchronousGenerator) -> Self {
        Component::Generator(Box::new(g))
    }
}
