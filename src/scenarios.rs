//! Ready-made networks around the reference machine.

use std::f64::consts::PI;

use crate::circuit::{Circuit, NodeId};
use crate::components::{
    Component, GeneratorParams, OperatingPoint, Resistor, Switch, SynchronousGenerator,
};
use crate::error::Result;

/// Name of the generator in the scenario networks.
pub const GENERATOR: &str = "GEN";

/// Per-phase load resistance of the reference case [Ohm].
pub const REFERENCE_LOAD: f64 = 1037.8378;

/// Mechanical power of the reference case [W].
pub const REFERENCE_MECHANICAL_POWER: f64 = 555.58e3;

/// 555 MVA, 24 kV, 60 Hz two-pole turbo generator.
pub fn machine_555mva() -> GeneratorParams {
    GeneratorParams {
        nominal_power: 555e6,
        nominal_voltage: 24e3,
        nominal_frequency: 60.0,
        pole_number: 2,
        nominal_field_current: 1300.0,
        stator_resistance: 0.003,
        leakage_inductance: 0.15,
        mutual_inductance_d: 1.6599,
        mutual_inductance_q: 1.61,
        field_resistance: 0.0006,
        field_leakage_inductance: 0.1648,
        damper_resistance_d: 0.0284,
        damper_leakage_inductance_d: 0.1713,
        damper_resistance_q1: 0.0062,
        damper_leakage_inductance_q1: 0.7252,
        damper_resistance_q2: 0.0237,
        damper_leakage_inductance_q2: 0.125,
        inertia: 3.7,
    }
}

/// Three-phase fault to ground applied during a scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fault {
    /// Closing instant [s]
    pub time: f64,
    /// Fault resistance per phase [Ohm]
    pub resistance: f64,
}

/// Reference machine feeding a balanced wye resistive load.
///
/// Phases a, b, c are nodes 1, 2, 3. The machine is initialized at rated
/// voltage for the power the load draws at that voltage. The mechanical
/// power scales with the load from the reference case.
pub fn balanced_resistive_load(load: f64, fault: Option<Fault>) -> Result<Circuit> {
    let params = machine_555mva();
    let bases = params.bases();
    let phases = [NodeId(1), NodeId(2), NodeId(3)];

    let mut components: Vec<Component> = Vec::new();
    for (node, phase) in phases.iter().zip(["A", "B", "C"]) {
        components.push(Resistor::new(format!("LOAD_{phase}"), [*node, NodeId::GROUND], load)?.into());
    }

    let active_power = 1.5 * bases.voltage * bases.voltage / load;
    let reference_power = 1.5 * bases.voltage * bases.voltage / REFERENCE_LOAD;
    let mut generator = SynchronousGenerator::new(GENERATOR, phases, params)?;
    generator.initialize(&OperatingPoint {
        active_power,
        reactive_power: 0.0,
        terminal_voltage: bases.voltage,
        voltage_angle: -PI / 2.0,
        field_voltage: None,
        mechanical_power: REFERENCE_MECHANICAL_POWER * active_power / reference_power,
    })?;
    components.push(generator.into());

    if let Some(fault) = fault {
        for (node, phase) in phases.iter().zip(["A", "B", "C"]) {
            let switch = Switch::new(format!("FAULT_{phase}"), [*node, NodeId::GROUND], false)
                .with_resistances(Switch::R_OPEN, fault.resistance)?
                .with_switch_time(fault.time)?;
            components.push(switch.into());
        }
    }

    Circuit::new(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_load_draws_555_kw() {
        let circuit = balanced_resistive_load(REFERENCE_LOAD, None).unwrap();
        let (p, q) = circuit.generator(GENERATOR).unwrap().terminal_power().unwrap();
        assert_relative_eq!(p, 555e3, max_relative = 1e-6);
        assert!(q.abs() < 1e-6 * p);
        assert_eq!(circuit.num_nodes(), 3);
    }

    #[test]
    fn test_fault_adds_switches() {
        let fault = Fault {
            time: 0.05,
            resistance: 0.1,
        };
        let circuit = balanced_resistive_load(100.0, Some(fault)).unwrap();
        assert_eq!(circuit.components().len(), 7);
        assert!(circuit.component("FAULT_B").is_some());
    }

    #[test]
    fn test_invalid_load_rejected() {
        assert!(balanced_resistive_load(0.0, None).is_err());
    }
}
