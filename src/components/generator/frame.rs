//! Park transformation between phase quantities and the rotor frame.
//!
//! Amplitude-invariant form with the q axis aligned to the rotor angle θ:
//! ```text
//! f_q = 2/3 Σ cos(θ - k_x) f_x
//! f_d = 2/3 Σ sin(θ - k_x) f_x
//! f_0 = 1/3 Σ f_x
//! ```
//! with phase offsets `k_a = 0`, `k_b = 2π/3`, `k_c = -2π/3`.

use std::f64::consts::PI;

use nalgebra::Vector3;
use num_complex::Complex64;

use crate::solver::{Domain, SolverSettings};

const PHASE_OFFSETS: [f64; 3] = [0.0, 2.0 * PI / 3.0, -2.0 * PI / 3.0];

/// Real Park transform of instantaneous phase values, result ordered (q, d, 0).
pub fn park_transform(theta: f64, abc: &Vector3<f64>) -> Vector3<f64> {
    let mut qd0 = Vector3::<f64>::zeros();
    for (offset, value) in PHASE_OFFSETS.iter().zip(abc.iter()) {
        let angle = theta - offset;
        qd0[0] += angle.cos() * value;
        qd0[1] += angle.sin() * value;
        qd0[2] += value;
    }
    Vector3::new(2.0 / 3.0 * qd0[0], 2.0 / 3.0 * qd0[1], qd0[2] / 3.0)
}

/// Inverse of [`park_transform`].
pub fn inverse_park_transform(theta: f64, qd0: &Vector3<f64>) -> Vector3<f64> {
    Vector3::from_fn(|phase, _| {
        let angle = theta - PHASE_OFFSETS[phase];
        angle.cos() * qd0[0] + angle.sin() * qd0[1] + qd0[2]
    })
}

/// Rotor position at a given instant, able to convert network quantities of
/// either domain to and from (q, d, 0).
#[derive(Debug, Clone, Copy)]
pub struct RotorFrame {
    theta: f64,
    time: f64,
    omega: f64,
    domain: Domain,
}

impl RotorFrame {
    pub fn new(theta: f64, time: f64, settings: &SolverSettings) -> Self {
        Self {
            theta,
            time,
            omega: settings.omega,
            domain: settings.domain,
        }
    }

    /// Network values of phases a, b, c to rotor-frame (q, d, 0).
    ///
    /// Phasors are first evaluated at the frame's instant.
    pub fn park(&self, abc: &[Complex64; 3]) -> Vector3<f64> {
        let instantaneous = Vector3::from_fn(|phase, _| match self.domain {
            Domain::Emt => abc[phase].re,
            Domain::DynamicPhasor => {
                (abc[phase] * Complex64::from_polar(1.0, self.omega * self.time)).re
            }
        });
        park_transform(self.theta, &instantaneous)
    }

    /// Rotor-frame (q, d, 0) to network values of phases a, b, c.
    ///
    /// For phasors the q/d pair becomes a balanced set
    /// `(f_q - j f_d) e^{j(θ - k_x - ωt)}` and the zero sequence
    /// `f_0 e^{-jωt}`.
    pub fn inverse_park(&self, qd0: &Vector3<f64>) -> [Complex64; 3] {
        match self.domain {
            Domain::Emt => {
                let abc = inverse_park_transform(self.theta, qd0);
                [abc[0], abc[1], abc[2]].map(|v| Complex64::new(v, 0.0))
            }
            Domain::DynamicPhasor => {
                let rotating = Complex64::new(qd0[0], -qd0[1]);
                let shift = self.theta - self.omega * self.time;
                let zero = Complex64::from_polar(qd0[2], -self.omega * self.time);
                PHASE_OFFSETS.map(|offset| rotating * Complex64::from_polar(1.0, shift - offset) + zero)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::NumericalMethod;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn settings(domain: Domain) -> SolverSettings {
        SolverSettings {
            domain,
            method: NumericalMethod::Trapezoidal,
            time_step: 1e-6,
            omega: 2.0 * PI * 60.0,
        }
    }

    #[test]
    fn test_balanced_set_maps_to_constant_q_axis() {
        // cos set aligned with θ lands entirely on the q axis
        let theta = 0.7;
        let abc = Vector3::from_fn(|k, _| 2.0 * (theta - PHASE_OFFSETS[k]).cos());
        let qd0 = park_transform(theta, &abc);
        assert_abs_diff_eq!(qd0[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(qd0[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(qd0[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_phasor_round_trip_of_balanced_set() {
        let frame = RotorFrame::new(1.3, 0.0042, &settings(Domain::DynamicPhasor));
        let alpha = -0.4;
        let abc = PHASE_OFFSETS.map(|k| Complex64::from_polar(5.0, alpha - k));
        let back = frame.inverse_park(&frame.park(&abc));
        for (a, b) in abc.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-9);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_domains_agree_on_instantaneous_values() {
        let theta = 2.1;
        let time = 0.013;
        let qd0 = Vector3::new(0.9, -0.3, 0.05);
        let dp = settings(Domain::DynamicPhasor);
        let phasors = RotorFrame::new(theta, time, &dp).inverse_park(&qd0);
        let emt = RotorFrame::new(theta, time, &settings(Domain::Emt)).inverse_park(&qd0);
        for (p, e) in phasors.iter().zip(emt.iter()) {
            assert_abs_diff_eq!(dp.instantaneous(*p, time), e.re, epsilon = 1e-12);
        }
    }

    proptest! {
        #[test]
        fn prop_park_round_trip(
            theta in 0.0f64..(2.0 * PI),
            a in -10.0f64..10.0,
            b in -10.0f64..10.0,
            c in -10.0f64..10.0,
        ) {
            let abc = Vector3::new(a, b, c);
            let back = inverse_park_transform(theta, &park_transform(theta, &abc));
            for k in 0..3 {
                prop_assert!((back[k] - abc[k]).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_phasor_inverse_then_forward(
            theta in 0.0f64..(2.0 * PI),
            time in 0.0f64..0.1,
            q in -2.0f64..2.0,
            d in -2.0f64..2.0,
            z in -0.5f64..0.5,
        ) {
            let frame = RotorFrame::new(theta, time, &settings(Domain::DynamicPhasor));
            let qd0 = Vector3::new(q, d, z);
            let back = frame.park(&frame.inverse_park(&qd0));
            for k in 0..3 {
                prop_assert!((back[k] - qd0[k]).abs() < 1e-9);
            }
        }
    }
}
