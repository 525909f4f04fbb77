//! Machine parameters, per-unit bases and operating points.

use std::f64::consts::PI;

use nalgebra::SMatrix;

use crate::error::{require_positive, GridsimError, Result};

pub(crate) type Matrix7 = SMatrix<f64, 7, 7>;

/// Nameplate data and per-unit electrical parameters of a synchronous machine.
///
/// Resistances and inductances are in per unit on the machine base and are
/// referred to the stator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorParams {
    /// Rated apparent power Pn [VA]
    pub nominal_power: f64,
    /// Rated line-to-line RMS voltage Vn [V]
    pub nominal_voltage: f64,
    /// Rated frequency fn [Hz]
    pub nominal_frequency: f64,
    /// Number of poles
    pub pole_number: u32,
    /// No-load field current Ifn [A]
    pub nominal_field_current: f64,
    /// Stator resistance Rs
    pub stator_resistance: f64,
    /// Stator leakage inductance Ll
    pub leakage_inductance: f64,
    /// d-axis mutual inductance Lmd
    pub mutual_inductance_d: f64,
    /// q-axis mutual inductance Lmq
    pub mutual_inductance_q: f64,
    /// Field resistance Rfd
    pub field_resistance: f64,
    /// Field leakage inductance Llfd
    pub field_leakage_inductance: f64,
    /// d-axis damper resistance Rkd
    pub damper_resistance_d: f64,
    /// d-axis damper leakage inductance Llkd
    pub damper_leakage_inductance_d: f64,
    /// First q-axis damper resistance Rkq1
    pub damper_resistance_q1: f64,
    /// First q-axis damper leakage inductance Llkq1
    pub damper_leakage_inductance_q1: f64,
    /// Second q-axis damper resistance Rkq2
    pub damper_resistance_q2: f64,
    /// Second q-axis damper leakage inductance Llkq2
    pub damper_leakage_inductance_q2: f64,
    /// Inertia constant H [s]
    pub inertia: f64,
}

impl GeneratorParams {
    /// Check that every parameter is usable.
    pub fn validate(&self, component: &str) -> Result<()> {
        require_positive(component, "nominal_power", self.nominal_power)?;
        require_positive(component, "nominal_voltage", self.nominal_voltage)?;
        require_positive(component, "nominal_frequency", self.nominal_frequency)?;
        require_positive(component, "nominal_field_current", self.nominal_field_current)?;
        require_positive(component, "inertia", self.inertia)?;
        require_positive(component, "leakage_inductance", self.leakage_inductance)?;
        require_positive(component, "mutual_inductance_d", self.mutual_inductance_d)?;
        require_positive(component, "mutual_inductance_q", self.mutual_inductance_q)?;
        require_positive(component, "field_resistance", self.field_resistance)?;
        require_positive(component, "field_leakage_inductance", self.field_leakage_inductance)?;
        require_positive(component, "damper_resistance_d", self.damper_resistance_d)?;
        require_positive(
            component,
            "damper_leakage_inductance_d",
            self.damper_leakage_inductance_d,
        )?;
        require_positive(component, "damper_resistance_q1", self.damper_resistance_q1)?;
        require_positive(
            component,
            "damper_leakage_inductance_q1",
            self.damper_leakage_inductance_q1,
        )?;
        require_positive(component, "damper_resistance_q2", self.damper_resistance_q2)?;
        require_positive(
            component,
            "damper_leakage_inductance_q2",
            self.damper_leakage_inductance_q2,
        )?;

        if !(self.stator_resistance.is_finite() && self.stator_resistance >= 0.0) {
            return Err(GridsimError::invalid_parameter(
                component,
                "stator_resistance",
                format!("must be non-negative, got {}", self.stator_resistance),
            ));
        }
        if self.pole_number < 2 || self.pole_number % 2 != 0 {
            return Err(GridsimError::invalid_parameter(
                component,
                "pole_number",
                format!("must be an even number >= 2, got {}", self.pole_number),
            ));
        }
        Ok(())
    }

    /// Per-unit bases derived from the nameplate.
    pub fn bases(&self) -> PerUnitBases {
        let voltage = self.nominal_voltage * (2.0f64 / 3.0).sqrt();
        let current = self.nominal_power / (1.5 * voltage);
        let omega = 2.0 * PI * self.nominal_frequency;
        let field_current = self.mutual_inductance_d * self.nominal_field_current;
        PerUnitBases {
            power: self.nominal_power,
            voltage,
            current,
            omega,
            mechanical_omega: omega / (self.pole_number as f64 / 2.0),
            field_current,
            field_voltage: self.nominal_power / field_current,
        }
    }

    /// Inductance matrix L with ψ = L·i, rows/columns (q, d, 0, kq1, kq2, fd, kd).
    ///
    /// Stator currents are positive out of the machine.
    pub(crate) fn inductance_matrix(&self) -> Matrix7 {
        let ll = self.leakage_inductance;
        let lmd = self.mutual_inductance_d;
        let lmq = self.mutual_inductance_q;
        let lkq1 = self.damper_leakage_inductance_q1 + lmq;
        let lkq2 = self.damper_leakage_inductance_q2 + lmq;
        let lfd = self.field_leakage_inductance + lmd;
        let lkd = self.damper_leakage_inductance_d + lmd;

        #[rustfmt::skip]
        let l = Matrix7::from_row_slice(&[
            -(ll + lmq), 0.0,         0.0, lmq,  lmq,  0.0, 0.0,
            0.0,         -(ll + lmd), 0.0, 0.0,  0.0,  lmd, lmd,
            0.0,         0.0,         -ll, 0.0,  0.0,  0.0, 0.0,
            -lmq,        0.0,         0.0, lkq1, lmq,  0.0, 0.0,
            -lmq,        0.0,         0.0, lmq,  lkq2, 0.0, 0.0,
            0.0,         -lmd,        0.0, 0.0,  0.0,  lfd, lmd,
            0.0,         -lmd,        0.0, 0.0,  0.0,  lmd, lkd,
        ]);
        l
    }

    /// Resistance matrix R in dψ/dt = ω_b (e + R·i - ω Ω ψ).
    pub(crate) fn resistance_matrix(&self) -> Matrix7 {
        let rs = self.stator_resistance;
        Matrix7::from_diagonal(&nalgebra::SVector::<f64, 7>::from_column_slice(&[
            rs,
            rs,
            rs,
            -self.damper_resistance_q1,
            -self.damper_resistance_q2,
            -self.field_resistance,
            -self.damper_resistance_d,
        ]))
    }
}

/// Per-unit base quantities.
///
/// Amplitude-invariant convention: the voltage and current bases are peak
/// phase values and per-unit power is `v_q i_q + v_d i_d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerUnitBases {
    /// Base power [VA]
    pub power: f64,
    /// Base voltage, peak phase [V]
    pub voltage: f64,
    /// Base current, peak phase [A]
    pub current: f64,
    /// Base electrical angular speed [rad/s]
    pub omega: f64,
    /// Base mechanical angular speed [rad/s]
    pub mechanical_omega: f64,
    /// Base field current [A]
    pub field_current: f64,
    /// Base field voltage [V]
    pub field_voltage: f64,
}

/// Steady-state operating point used to initialize the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    /// Terminal active power [W]
    pub active_power: f64,
    /// Terminal reactive power [var]
    pub reactive_power: f64,
    /// Terminal voltage magnitude, peak phase [V]
    pub terminal_voltage: f64,
    /// Phase-a voltage angle at t = 0 [rad]
    pub voltage_angle: f64,
    /// Field voltage [V]; `None` uses the steady-state value
    pub field_voltage: Option<f64>,
    /// Mechanical input power [W]
    pub mechanical_power: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::machine_555mva;
    use approx::assert_relative_eq;

    #[test]
    fn test_bases_of_reference_machine() {
        let bases = machine_555mva().bases();
        assert_relative_eq!(bases.voltage, 24e3 * (2.0f64 / 3.0).sqrt(), max_relative = 1e-12);
        // 1.5 * V * I recovers the rated power
        assert_relative_eq!(1.5 * bases.voltage * bases.current, 555e6, max_relative = 1e-12);
        assert_relative_eq!(bases.omega, 2.0 * PI * 60.0, max_relative = 1e-12);
        assert_relative_eq!(bases.mechanical_omega, bases.omega, max_relative = 1e-12);
    }

    #[test]
    fn test_inductance_matrix_is_invertible() {
        let l = machine_555mva().inductance_matrix();
        let x = l.try_inverse().unwrap();
        let identity = l * x;
        for r in 0..7 {
            for c in 0..7 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((identity[(r, c)] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut params = machine_555mva();
        params.inertia = 0.0;
        assert!(params.validate("G1").is_err());

        let mut params = machine_555mva();
        params.pole_number = 3;
        assert!(params.validate("G1").is_err());

        let mut params = machine_555mva();
        params.stator_resistance = -0.1;
        assert!(params.validate("G1").is_err());

        assert!(machine_555mva().validate("G1").is_ok());
    }
}
