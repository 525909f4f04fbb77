//! Three-phase synchronous generator in the rotor (dq0) reference frame.
//!
//! The machine carries seven flux linkages (q, d, 0 stator axes, two q-axis
//! dampers, field winding, d-axis damper), the rotor speed and the rotor
//! angle. All states are per unit on the machine base.
//!
//! Flux dynamics:
//! ```text
//! dψ/dt = ω_b (e + R X ψ - ω Ω ψ)      i = X ψ,  X = L⁻¹
//! ```
//! Mechanics:
//! ```text
//! dω/dt = (T_m - T_e) / 2H             T_e = ψ_d i_q - ψ_q i_d
//! dθ/dt = ω_b ω
//! ```
//!
//! ## Network interface
//!
//! Each step discretizes the flux equation as
//! `ψ[k+1] = history + K v_s[k+1]`. The history part, read back through
//! `X`, becomes a current injection at the terminals. With the trapezoidal
//! rule the stator part of `X K` is a genuine admittance and is stamped as
//! such, which keeps the coupled system stable for small loads; because it
//! depends on θ it has to be restamped every step. Forward Euler has
//! `K = 0` and leaves the generator a pure current source.

mod frame;
mod params;

pub use frame::{inverse_park_transform, park_transform, RotorFrame};
pub use params::{GeneratorParams, OperatingPoint, PerUnitBases};

use std::f64::consts::TAU;

use nalgebra::{DMatrix, Matrix3, SVector, Vector3};
use num_complex::Complex64;
use tracing::{debug, warn};

use self::params::Matrix7;
use super::MnaComponent;
use crate::circuit::NodeId;
use crate::error::{GridsimError, Result};
use crate::solver::{DiscreteStep, Domain, MnaSystem, Part, SolverSettings};

type Vector7 = SVector<f64, 7>;

// State vector layout
const Q: usize = 0;
const D: usize = 1;
const ZERO: usize = 2;
const FD: usize = 5;

/// Electrical and mechanical state of an initialized machine.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    /// Instant the state belongs to [s]
    pub time: f64,
    /// Flux linkages (q, d, 0, kq1, kq2, fd, kd) [pu]
    pub fluxes: SVector<f64, 7>,
    /// Winding currents, same order [pu]
    pub currents: SVector<f64, 7>,
    /// Stator voltage (q, d, 0) [pu]
    pub stator_voltage: Vector3<f64>,
    /// Field voltage [pu]
    pub field_voltage: f64,
    /// Rotor speed [pu]
    pub omega: f64,
    /// Rotor angle [rad], kept in [0, 2π)
    pub theta: f64,
    /// Electrical torque [pu]
    pub electrical_torque: f64,
    /// Mechanical torque [pu]
    pub mechanical_torque: f64,
}

/// Quantities computed in `step` and consumed by `post_step`.
#[derive(Debug, Clone)]
struct PendingStep {
    time: f64,
    theta: f64,
    omega: f64,
    flux_step: DiscreteStep<7>,
    injection: [Complex64; 3],
    admittance: Option<DMatrix<f64>>,
}

/// Synchronous generator connected to three phase nodes.
#[derive(Debug, Clone)]
pub struct SynchronousGenerator {
    pub name: String,
    /// Phase nodes a, b, c
    pub nodes: [NodeId; 3],
    params: GeneratorParams,
    bases: PerUnitBases,
    reactance: Matrix7,
    resistance: Matrix7,
    state: Option<MachineState>,
    pending: Option<PendingStep>,
}

impl SynchronousGenerator {
    pub fn new(name: impl Into<String>, nodes: [NodeId; 3], params: GeneratorParams) -> Result<Self> {
        let name = name.into();
        params.validate(&name)?;
        let reactance = params.inductance_matrix().try_inverse().ok_or_else(|| {
            GridsimError::invalid_parameter(&name, "inductances", "inductance matrix is singular")
        })?;
        Ok(Self {
            nodes,
            bases: params.bases(),
            resistance: params.resistance_matrix(),
            reactance,
            params,
            state: None,
            pending: None,
            name,
        })
    }

    pub fn params(&self) -> &GeneratorParams {
        &self.params
    }

    pub fn bases(&self) -> &PerUnitBases {
        &self.bases
    }

    /// Current state, `None` until [`initialize`](Self::initialize) succeeds.
    pub fn state(&self) -> Option<&MachineState> {
        self.state.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Place the machine in the steady state that delivers the given
    /// terminal powers at the given terminal voltage.
    ///
    /// The field voltage is the one that sustains that steady state; a
    /// differing `field_voltage` in the operating point is reported and
    /// otherwise ignored. Use [`set_field_voltage`](Self::set_field_voltage)
    /// to drive the field explicitly.
    pub fn initialize(&mut self, op: &OperatingPoint) -> Result<()> {
        for (param, value) in [
            ("active_power", op.active_power),
            ("reactive_power", op.reactive_power),
            ("voltage_angle", op.voltage_angle),
            ("mechanical_power", op.mechanical_power),
        ] {
            if !value.is_finite() {
                return Err(GridsimError::invalid_parameter(
                    &self.name,
                    param,
                    format!("must be finite, got {value}"),
                ));
            }
        }
        crate::error::require_positive(&self.name, "terminal_voltage", op.terminal_voltage)?;
        let supplied_field_voltage = match op.field_voltage {
            Some(v) if !v.is_finite() => {
                return Err(GridsimError::invalid_parameter(
                    &self.name,
                    "field_voltage",
                    format!("must be finite, got {v}"),
                ))
            }
            Some(v) => Some(v / self.bases.field_voltage),
            None => None,
        };

        let p = &self.params;
        let rs = p.stator_resistance;
        let xq = p.leakage_inductance + p.mutual_inductance_q;
        let lmd = p.mutual_inductance_d;

        let active = op.active_power / self.bases.power;
        let reactive = op.reactive_power / self.bases.power;
        let vt = op.terminal_voltage / self.bases.voltage;
        let it = active.hypot(reactive) / vt;
        let pf = reactive.atan2(active);

        // Load angle between the q axis and the terminal voltage
        let delta = (xq * it * pf.cos() - rs * it * pf.sin())
            .atan2(vt + rs * it * pf.cos() + xq * it * pf.sin());

        let vd = vt * delta.sin();
        let vq = vt * delta.cos();
        let id = it * (delta + pf).sin();
        let iq = it * (delta + pf).cos();
        let ifd = (vq + rs * iq + (lmd + p.leakage_inductance) * id) / lmd;
        let vfd = p.field_resistance * ifd;

        let mut currents = Vector7::zeros();
        currents[Q] = iq;
        currents[D] = id;
        currents[FD] = ifd;
        let fluxes = p.inductance_matrix() * currents;

        if let Some(supplied) = supplied_field_voltage {
            if (supplied - vfd).abs() > 1e-6 * vfd.abs() {
                warn!(
                    generator = %self.name,
                    supplied = supplied * self.bases.field_voltage,
                    steady_state = vfd * self.bases.field_voltage,
                    "supplied field voltage does not match the operating point, using steady-state value"
                );
            }
        }

        let state = MachineState {
            time: 0.0,
            fluxes,
            currents,
            stator_voltage: Vector3::new(vq, vd, 0.0),
            field_voltage: vfd,
            omega: 1.0,
            theta: (op.voltage_angle + delta).rem_euclid(TAU),
            electrical_torque: fluxes[D] * currents[Q] - fluxes[Q] * currents[D],
            mechanical_torque: op.mechanical_power / self.bases.power,
        };
        debug!(
            generator = %self.name,
            load_angle = delta,
            field_current = ifd,
            electrical_torque = state.electrical_torque,
            mechanical_torque = state.mechanical_torque,
            "initialized synchronous generator"
        );
        self.state = Some(state);
        self.pending = None;
        Ok(())
    }

    /// Override the field voltage [pu] applied from the next step on.
    pub fn set_field_voltage(&mut self, field_voltage: f64) -> Result<()> {
        if !field_voltage.is_finite() {
            return Err(GridsimError::invalid_parameter(
                &self.name,
                "field_voltage",
                format!("must be finite, got {field_voltage}"),
            ));
        }
        self.state_mut()?.field_voltage = field_voltage;
        Ok(())
    }

    /// Change the mechanical input power [W] from the next step on.
    pub fn set_mechanical_power(&mut self, power: f64) -> Result<()> {
        if !power.is_finite() {
            return Err(GridsimError::invalid_parameter(
                &self.name,
                "mechanical_power",
                format!("must be finite, got {power}"),
            ));
        }
        let base = self.bases.power;
        self.state_mut()?.mechanical_torque = power / base;
        Ok(())
    }

    /// Terminal active and reactive power [W, var].
    pub fn terminal_power(&self) -> Option<(f64, f64)> {
        self.state.as_ref().map(|s| {
            let (vq, vd) = (s.stator_voltage[Q], s.stator_voltage[D]);
            let (iq, id) = (s.currents[Q], s.currents[D]);
            let v0 = s.stator_voltage[ZERO];
            let i0 = s.currents[ZERO];
            (
                (vq * iq + vd * id + 2.0 * v0 * i0) * self.bases.power,
                (vq * id - vd * iq) * self.bases.power,
            )
        })
    }

    /// Field voltage [V].
    pub fn field_voltage(&self) -> Option<f64> {
        self.state
            .as_ref()
            .map(|s| s.field_voltage * self.bases.field_voltage)
    }

    /// Field current [A].
    pub fn field_current(&self) -> Option<f64> {
        self.state
            .as_ref()
            .map(|s| s.currents[FD] * self.bases.field_current)
    }

    /// Mechanical rotor speed [rad/s].
    pub fn mechanical_speed(&self) -> Option<f64> {
        self.state
            .as_ref()
            .map(|s| s.omega * self.bases.mechanical_omega)
    }

    /// Terminal currents leaving the machine, in the network domain [A].
    pub fn terminal_currents(&self, settings: &SolverSettings) -> Option<[Complex64; 3]> {
        self.state
            .as_ref()
            .map(|s| self.stator_to_network(&s.currents, s.theta, s.time, settings))
    }

    fn state_mut(&mut self) -> Result<&mut MachineState> {
        let name = &self.name;
        self.state
            .as_mut()
            .ok_or_else(|| GridsimError::GeneratorNotInitialized { name: name.clone() })
    }

    fn not_initialized(&self) -> GridsimError {
        GridsimError::GeneratorNotInitialized {
            name: self.name.clone(),
        }
    }

    /// `ω_b (R X - ω Ω)`
    fn state_matrix(&self, omega: f64) -> Matrix7 {
        let mut rotation = Matrix7::zeros();
        rotation[(Q, D)] = omega;
        rotation[(D, Q)] = -omega;
        (self.resistance * self.reactance - rotation) * self.bases.omega
    }

    /// `ω_b e` for the given stator and field voltages.
    fn input_vector(&self, stator: &Vector3<f64>, field_voltage: f64) -> Vector7 {
        let mut u = Vector7::zeros();
        u.fixed_rows_mut::<3>(0).copy_from(stator);
        u[FD] = field_voltage;
        u * self.bases.omega
    }

    /// Stator part of a per-unit winding vector as physical network currents.
    fn stator_to_network(
        &self,
        windings: &Vector7,
        theta: f64,
        time: f64,
        settings: &SolverSettings,
    ) -> [Complex64; 3] {
        let stator: Vector3<f64> = windings.fixed_rows::<3>(0).into_owned();
        RotorFrame::new(theta, time, settings)
            .inverse_park(&stator)
            .map(|i| i * self.bases.current)
    }

    /// Terminal admittance block of the pending step.
    ///
    /// Rows and columns run over (part, phase) with all phases of `Re` first.
    /// Each column is the current response to a unit terminal voltage.
    fn terminal_admittance(&self, frame: &RotorFrame, gain: &Matrix3<f64>, domain: Domain) -> DMatrix<f64> {
        let parts = parts_of(domain);
        let n = 3 * parts.len();
        let scale = self.bases.current / self.bases.voltage;
        let mut block = DMatrix::zeros(n, n);
        for (cp, col_part) in parts.iter().enumerate() {
            for col_phase in 0..3 {
                let mut probe = [Complex64::new(0.0, 0.0); 3];
                probe[col_phase] = match col_part {
                    Part::Re => Complex64::new(1.0, 0.0),
                    Part::Im => Complex64::new(0.0, 1.0),
                };
                let response = frame.inverse_park(&(gain * frame.park(&probe)));
                for (rp, row_part) in parts.iter().enumerate() {
                    for (row_phase, current) in response.iter().enumerate() {
                        let value = match row_part {
                            Part::Re => current.re,
                            Part::Im => current.im,
                        };
                        block[(3 * rp + row_phase, 3 * cp + col_phase)] = value * scale;
                    }
                }
            }
        }
        block
    }
}

fn parts_of(domain: Domain) -> &'static [Part] {
    match domain {
        Domain::Emt => &[Part::Re],
        Domain::DynamicPhasor => &[Part::Re, Part::Im],
    }
}

impl MnaComponent for SynchronousGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn stamp_matrix(&self, system: &mut MnaSystem) -> Result<()> {
        let Some(admittance) = self.pending.as_ref().and_then(|p| p.admittance.as_ref()) else {
            return Ok(());
        };
        let parts = parts_of(system.domain());
        for (r, (row, row_part)) in terminal_slots(&self.nodes, parts).enumerate() {
            let Some(row) = row else { continue };
            for (c, (col, col_part)) in terminal_slots(&self.nodes, parts).enumerate() {
                let Some(col) = col else { continue };
                // Current leaving the machine enters the network with a minus sign
                system.add_to_matrix_part(row, row_part, col, col_part, -admittance[(r, c)])?;
            }
        }
        Ok(())
    }

    fn stamp_rhs(&self, system: &mut MnaSystem) -> Result<()> {
        let injection = match (&self.pending, &self.state) {
            (Some(pending), _) => pending.injection,
            (None, Some(state)) => {
                self.stator_to_network(&state.currents, state.theta, state.time, system.settings())
            }
            (None, None) => return Err(self.not_initialized()),
        };
        for (node, current) in self.nodes.iter().zip(injection) {
            system.stamp_current_injection(node.matrix_index(), None, current)?;
        }
        Ok(())
    }

    fn step(&mut self, system: &mut MnaSystem, time: f64) -> Result<()> {
        let settings = *system.settings();
        let state = self.state.as_ref().ok_or_else(|| self.not_initialized())?;
        let dt = settings.time_step;
        let method = settings.method;
        let omega_base = self.bases.omega;
        // The machine advances over [time, time + dt]; the solve sees its end
        let target = time + dt;

        // Swing equation, explicit in the electrical torque
        let omega = state.omega
            + dt / (2.0 * self.params.inertia) * (state.mechanical_torque - state.electrical_torque);
        let theta = method
            .integrate_scalar(state.theta, omega_base * state.omega, omega_base * omega, dt)
            .rem_euclid(TAU);

        let flux_step = method.discretize(
            &state.fluxes,
            &self.state_matrix(state.omega),
            &self.state_matrix(omega),
            &self.input_vector(&state.stator_voltage, state.field_voltage),
            &self.input_vector(&Vector3::zeros(), state.field_voltage),
            dt,
        )?;

        let frame = RotorFrame::new(theta, target, &settings);
        let injection = self.stator_to_network(&(self.reactance * flux_step.history), theta, target, &settings);
        let gain: Matrix3<f64> =
            (self.reactance * flux_step.input_gain).fixed_view::<3, 3>(0, 0) * omega_base;
        let admittance = if gain.iter().all(|g| *g == 0.0) {
            None
        } else {
            Some(self.terminal_admittance(&frame, &gain, settings.domain))
        };

        self.pending = Some(PendingStep {
            time: target,
            theta,
            omega,
            flux_step,
            injection,
            admittance,
        });
        self.stamp_rhs(system)
    }

    fn post_step(&mut self, system: &MnaSystem, _time: f64) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| GridsimError::numerical(format!("{}: post-step without a pending step", self.name)))?;
        let settings = system.settings();
        let frame = RotorFrame::new(pending.theta, pending.time, settings);

        let mut terminal = [Complex64::new(0.0, 0.0); 3];
        for (value, node) in terminal.iter_mut().zip(self.nodes) {
            *value = system.node_value(node)? / self.bases.voltage;
        }
        let stator_voltage = frame.park(&terminal);

        let mut pending_input = Vector7::zeros();
        pending_input
            .fixed_rows_mut::<3>(0)
            .copy_from(&(stator_voltage * self.bases.omega));
        let fluxes = pending.flux_step.finish(&pending_input);
        let currents = self.reactance * fluxes;
        if fluxes.iter().chain(currents.iter()).any(|v| !v.is_finite()) {
            return Err(GridsimError::numerical(format!(
                "{}: machine state became non-finite at t = {}",
                self.name, pending.time
            )));
        }

        let state = self.state_mut()?;
        state.time = pending.time;
        state.fluxes = fluxes;
        state.currents = currents;
        state.stator_voltage = stator_voltage;
        state.omega = pending.omega;
        state.theta = pending.theta;
        state.electrical_torque = fluxes[D] * currents[Q] - fluxes[Q] * currents[D];
        Ok(())
    }

    fn admittance_changed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.admittance.is_some())
    }
}

/// (matrix index, part) of each row of the terminal block.
fn terminal_slots<'a>(
    nodes: &'a [NodeId; 3],
    parts: &'a [Part],
) -> impl Iterator<Item = (Option<usize>, Part)> + 'a {
    parts
        .iter()
        .flat_map(move |part| nodes.iter().map(move |node| (node.matrix_index(), *part)))
}
