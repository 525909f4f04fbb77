//! Fixed-step integration rules for linear state-space models.
//!
//! State-carrying components describe themselves as
//! ```text
//! dx/dt = A(t) x + u(t)
//! ```
//! and ask the selected [`NumericalMethod`] for a [`DiscreteStep`]: the
//! part of `x[k+1]` known before the network solve plus the gain applied to
//! the input that only becomes known afterwards.

use nalgebra::{SMatrix, SVector};

use crate::error::{GridsimError, Result};

/// Numerical integration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericalMethod {
    /// Forward Euler: `x[k+1] = x[k] + dt·f(x[k])`.
    Euler,
    /// Trapezoidal rule: `x[k+1] = x[k] + dt/2·(f(x[k]) + f(x[k+1]))`.
    #[default]
    Trapezoidal,
}

/// One discretized step: `x[k+1] = history + input_gain · u_pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteStep<const N: usize> {
    pub history: SVector<f64, N>,
    pub input_gain: SMatrix<f64, N, N>,
}

impl<const N: usize> DiscreteStep<N> {
    /// Complete the step once the pending input is known.
    pub fn finish(&self, u_pending: &SVector<f64, N>) -> SVector<f64, N> {
        self.history + self.input_gain * u_pending
    }
}

impl NumericalMethod {
    /// Discretize `dx/dt = A x + u` over one step.
    ///
    /// * `a_now`, `a_next` - state matrix at the start and end of the step
    /// * `u_now` - input at the start of the step
    /// * `u_next_known` - part of the end-of-step input known in advance
    ///
    /// The remaining end-of-step input enters through
    /// [`DiscreteStep::input_gain`], which is zero for forward Euler.
    pub fn discretize<const N: usize>(
        self,
        x: &SVector<f64, N>,
        a_now: &SMatrix<f64, N, N>,
        a_next: &SMatrix<f64, N, N>,
        u_now: &SVector<f64, N>,
        u_next_known: &SVector<f64, N>,
        dt: f64,
    ) -> Result<DiscreteStep<N>> {
        match self {
            NumericalMethod::Euler => Ok(DiscreteStep {
                history: x + (a_now * x + u_now) * dt,
                input_gain: SMatrix::zeros(),
            }),
            NumericalMethod::Trapezoidal => {
                let half = 0.5 * dt;
                let identity = SMatrix::<f64, N, N>::identity();
                let implicit = (identity - a_next * half).try_inverse().ok_or_else(|| {
                    GridsimError::numerical("trapezoidal step matrix is not invertible")
                })?;
                let explicit = (identity + a_now * half) * x + (u_now + u_next_known) * half;
                Ok(DiscreteStep {
                    history: implicit * explicit,
                    input_gain: implicit * half,
                })
            }
        }
    }

    /// Integrate a scalar whose derivative is known at both ends of the step.
    pub fn integrate_scalar(self, x: f64, f_now: f64, f_next: f64, dt: f64) -> f64 {
        match self {
            NumericalMethod::Euler => x + dt * f_now,
            NumericalMethod::Trapezoidal => x + 0.5 * dt * (f_now + f_next),
        }
    }
}
