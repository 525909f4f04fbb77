//! Reference machine feeding a balanced resistive load.

use std::f64::consts::PI;

use gridsim_core::output::RowBuffer;
use gridsim_core::scenarios::{balanced_resistive_load, Fault, GENERATOR, REFERENCE_LOAD};
use gridsim_core::{Domain, NodeId, NumericalMethod, SimulationConfig, Simulator};

/// Rated peak phase voltage of the reference machine.
const RATED_VOLTAGE: f64 = 19595.917942265426;

fn simulate(load: f64, fault: Option<Fault>, config: SimulationConfig) -> (Simulator, RowBuffer) {
    let circuit = balanced_resistive_load(load, fault).unwrap();
    let mut sim = Simulator::new(circuit, config).unwrap();
    let mut voltages = RowBuffer::new();
    let mut currents = RowBuffer::new();
    sim.run(&mut voltages, &mut currents).unwrap();
    (sim, voltages)
}

#[test]
fn test_phasor_trapezoidal_reference_case_stays_at_rated_voltage() {
    let config = SimulationConfig::new()
        .with_domain(Domain::DynamicPhasor)
        .with_method(NumericalMethod::Trapezoidal)
        .with_time_step(1e-6)
        .with_final_time(0.1)
        .with_downsampling(1000);
    let (sim, voltages) = simulate(REFERENCE_LOAD, None, config);

    assert_eq!(voltages.len(), 100);
    // Bounded: every logged phasor magnitude within 2% of rated
    for (_, row) in voltages.rows() {
        for phase in 0..3 {
            let magnitude = row[phase].hypot(row[phase + 3]);
            assert!(
                (magnitude - RATED_VOLTAGE).abs() < 0.02 * RATED_VOLTAGE,
                "phase {phase} magnitude {magnitude}"
            );
        }
    }

    // Phase a sits at -90 degrees, b and c follow as a positive sequence
    let va = sim.node_voltage(NodeId(1)).unwrap();
    let vb = sim.node_voltage(NodeId(2)).unwrap();
    assert!((va.arg() + PI / 2.0).abs() < 0.01, "angle {}", va.arg());
    let shift = (va / vb).arg();
    assert!((shift - 2.0 * PI / 3.0).abs() < 0.01, "phase shift {shift}");

    let state = sim.generator(GENERATOR).unwrap().state().unwrap();
    assert!((state.omega - 1.0).abs() < 1e-3);
}

#[test]
fn test_emt_trapezoidal_waveform_is_60_hz() {
    let config = SimulationConfig::new()
        .with_domain(Domain::Emt)
        .with_method(NumericalMethod::Trapezoidal)
        .with_time_step(1e-6)
        .with_final_time(0.05);
    let (_, voltages) = simulate(REFERENCE_LOAD, None, config);

    let samples: Vec<(f64, f64)> = voltages.column(0).collect();
    let rising: Vec<f64> = samples
        .windows(2)
        .filter(|w| w[0].1 < 0.0 && w[1].1 >= 0.0)
        .map(|w| {
            let ((t0, v0), (t1, v1)) = (w[0], w[1]);
            t0 - v0 * (t1 - t0) / (v1 - v0)
        })
        .collect();
    assert!(rising.len() >= 2, "found {} rising crossings", rising.len());
    for pair in rising.windows(2) {
        let period = pair[1] - pair[0];
        assert!((period - 1.0 / 60.0).abs() < 1e-4, "period {period}");
    }

    // Peak of the last full cycle matches the rated amplitude
    let last_cycle = samples.iter().filter(|(t, _)| *t > 0.05 - 1.0 / 60.0);
    let peak = last_cycle.map(|(_, v)| v.abs()).fold(0.0, f64::max);
    assert!((peak - RATED_VOLTAGE).abs() < 0.02 * RATED_VOLTAGE, "peak {peak}");
}

#[test]
fn test_euler_with_moderate_load_holds_operating_point() {
    let load = 100.0;
    let config = SimulationConfig::new()
        .with_domain(Domain::DynamicPhasor)
        .with_method(NumericalMethod::Euler)
        .with_time_step(1e-6)
        .with_final_time(0.02)
        .with_downsampling(100);
    let (sim, _) = simulate(load, None, config);

    // Euler keeps the matrix of the resistive network only
    assert_eq!(sim.system().factorization_count(), 1);

    let va = sim.node_voltage(NodeId(1)).unwrap();
    assert!((va.norm() - RATED_VOLTAGE).abs() < 0.02 * RATED_VOLTAGE, "|Va| {}", va.norm());

    let (p, _) = sim.generator(GENERATOR).unwrap().terminal_power().unwrap();
    let expected = 1.5 * RATED_VOLTAGE * RATED_VOLTAGE / load;
    assert!((p - expected).abs() < 0.05 * expected, "P {p} expected {expected}");
}

#[test]
fn test_three_phase_fault_collapses_terminal_voltage() {
    let fault = Fault {
        time: 0.005,
        resistance: 0.01,
    };
    let config = SimulationConfig::new()
        .with_domain(Domain::DynamicPhasor)
        .with_method(NumericalMethod::Trapezoidal)
        .with_time_step(1e-6)
        .with_final_time(0.01)
        .with_downsampling(100);
    let (sim, voltages) = simulate(REFERENCE_LOAD, Some(fault), config);

    let before: Vec<f64> = voltages
        .rows()
        .iter()
        .filter(|(t, _)| *t < 0.0049)
        .map(|(_, row)| row[0].hypot(row[3]))
        .collect();
    assert!(before.iter().all(|v| (v - RATED_VOLTAGE).abs() < 0.02 * RATED_VOLTAGE));

    let va = sim.node_voltage(NodeId(1)).unwrap();
    assert!(va.norm() < 0.2 * RATED_VOLTAGE, "|Va| after fault {}", va.norm());
    assert!(sim.solution().iter().all(|v| v.is_finite()));
}

#[test]
fn test_stepping_is_consistent_with_running() {
    let dt = 1e-6;
    let base = SimulationConfig::new().with_time_step(dt);

    let circuit = balanced_resistive_load(REFERENCE_LOAD, None).unwrap();
    let mut two_steps = Simulator::new(circuit, base.clone().with_final_time(2.0 * dt)).unwrap();
    two_steps.run(&mut RowBuffer::new(), &mut RowBuffer::new()).unwrap();

    let circuit = balanced_resistive_load(REFERENCE_LOAD, None).unwrap();
    let mut one_then_one = Simulator::new(circuit, base.with_final_time(dt)).unwrap();
    one_then_one.run(&mut RowBuffer::new(), &mut RowBuffer::new()).unwrap();
    assert!(one_then_one.is_finished());
    one_then_one.step().unwrap();

    assert_eq!(two_steps.step_count(), one_then_one.step_count());
    assert_eq!(two_steps.solution(), one_then_one.solution());
    assert_eq!(two_steps.rhs(), one_then_one.rhs());
    assert_eq!(two_steps.system_matrix(), one_then_one.system_matrix());
    assert_eq!(
        two_steps.generator(GENERATOR).unwrap().state(),
        one_then_one.generator(GENERATOR).unwrap().state()
    );
}

#[test]
fn test_field_voltage_step_between_steps_raises_field_current() {
    let config = SimulationConfig::new()
        .with_domain(Domain::DynamicPhasor)
        .with_method(NumericalMethod::Trapezoidal)
        .with_time_step(1e-6)
        .with_final_time(0.02);
    let new_sim = || Simulator::new(balanced_resistive_load(REFERENCE_LOAD, None).unwrap(), config.clone()).unwrap();
    let mut reference = new_sim();
    let mut stepped = new_sim();

    for _ in 0..100 {
        reference.step().unwrap();
        stepped.step().unwrap();
    }
    let generator = stepped.circuit_mut().generator_mut(GENERATOR).unwrap();
    let before = generator.field_voltage().unwrap();
    let ceiling = 100.0 * generator.state().unwrap().field_voltage;
    generator.set_field_voltage(ceiling).unwrap();
    assert!(generator.field_voltage().unwrap() > 99.0 * before);

    while !stepped.is_finished() {
        reference.step().unwrap();
        stepped.step().unwrap();
    }

    let unchanged = reference.generator(GENERATOR).unwrap().field_current().unwrap();
    let raised = stepped.generator(GENERATOR).unwrap().field_current().unwrap();
    assert!(raised > 1.05 * unchanged, "field current {raised} vs {unchanged}");

    // Stronger excitation lifts the terminal voltage as well
    let va_ref = reference.node_voltage(NodeId(1)).unwrap().norm();
    let va = stepped.node_voltage(NodeId(1)).unwrap().norm();
    assert!(va > va_ref, "|Va| {va} vs {va_ref}");
}
