//! MNA system assembly and solving.

use nalgebra::{DMatrix, DVector, Dyn, LU};
use num_complex::Complex64;
use tracing::debug;

use super::{Domain, SolverSettings};
use crate::circuit::NodeId;
use crate::error::{GridsimError, Result};

/// Real or imaginary half of a node unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Re,
    Im,
}

/// MNA system G v = J.
///
/// Stamping is additive: components sharing a node accumulate into the
/// same entries. Any matrix write invalidates the cached factorization.
#[derive(Debug)]
pub struct MnaSystem {
    settings: SolverSettings,
    /// Number of non-ground nodes
    num_nodes: usize,
    /// System matrix G
    matrix: DMatrix<f64>,
    /// Right-hand side J
    rhs: DVector<f64>,
    /// Solution v from the most recent solve
    solution: DVector<f64>,
    /// LU decomposition of G, dropped whenever G changes
    lu: Option<LU<f64, Dyn, Dyn>>,
    factorizations: usize,
}

impl MnaSystem {
    /// Create a zeroed system for `num_nodes` non-ground nodes.
    pub fn new(num_nodes: usize, settings: SolverSettings) -> Self {
        let size = num_nodes * settings.domain.width();
        Self {
            settings,
            num_nodes,
            matrix: DMatrix::zeros(size, size),
            rhs: DVector::zeros(size),
            solution: DVector::zeros(size),
            lu: None,
            factorizations: 0,
        }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn domain(&self) -> Domain {
        self.settings.domain
    }

    /// Number of non-ground nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of real unknowns.
    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    /// System matrix G.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Right-hand side vector J.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Solution vector v.
    pub fn solution(&self) -> &DVector<f64> {
        &self.solution
    }

    /// How many times G has been factorized.
    pub fn factorization_count(&self) -> usize {
        self.factorizations
    }

    /// Whether a factorization of the current G is cached.
    pub fn is_factored(&self) -> bool {
        self.lu.is_some()
    }

    /// Clear the matrix to zero.
    pub fn clear_matrix(&mut self) {
        self.matrix.fill(0.0);
        self.lu = None;
    }

    /// Clear the right-hand side to zero.
    pub fn clear_rhs(&mut self) {
        self.rhs.fill(0.0);
    }

    /// Map a node index and part to a row/column of the real system.
    fn slot(&self, index: usize, part: Part) -> Result<usize> {
        if index >= self.num_nodes {
            return Err(GridsimError::IndexOutOfRange {
                index,
                size: self.num_nodes,
            });
        }
        match (self.settings.domain, part) {
            (_, Part::Re) => Ok(index),
            (Domain::DynamicPhasor, Part::Im) => Ok(index + self.num_nodes),
            (Domain::Emt, Part::Im) => Err(GridsimError::UnsupportedPart {
                domain: Domain::Emt.name(),
            }),
        }
    }

    /// Add a real coefficient coupling one part of `row` to one part of `col`.
    pub fn add_to_matrix_part(
        &mut self,
        row: usize,
        row_part: Part,
        col: usize,
        col_part: Part,
        value: f64,
    ) -> Result<()> {
        let r = self.slot(row, row_part)?;
        let c = self.slot(col, col_part)?;
        self.matrix[(r, c)] += value;
        self.lu = None;
        Ok(())
    }

    /// Add an admittance to matrix element (row, col).
    ///
    /// In the phasor domain `y` fills the 2x2 block `[Re y, -Im y; Im y, Re y]`;
    /// in EMT only the real part is used.
    pub fn add_to_matrix(&mut self, row: usize, col: usize, value: Complex64) -> Result<()> {
        match self.settings.domain {
            Domain::Emt => self.add_to_matrix_part(row, Part::Re, col, Part::Re, value.re),
            Domain::DynamicPhasor => {
                self.add_to_matrix_part(row, Part::Re, col, Part::Re, value.re)?;
                self.add_to_matrix_part(row, Part::Re, col, Part::Im, -value.im)?;
                self.add_to_matrix_part(row, Part::Im, col, Part::Re, value.im)?;
                self.add_to_matrix_part(row, Part::Im, col, Part::Im, value.re)
            }
        }
    }

    /// Add to right-hand side element.
    pub fn add_to_rhs(&mut self, row: usize, value: Complex64) -> Result<()> {
        let r = self.slot(row, Part::Re)?;
        self.rhs[r] += value.re;
        if self.settings.domain == Domain::DynamicPhasor {
            let i = self.slot(row, Part::Im)?;
            self.rhs[i] += value.im;
        }
        Ok(())
    }

    /// Stamp an admittance between two nodes.
    /// For an admittance y between nodes n1 and n2:
    ///   G[n1,n1] += y
    ///   G[n2,n2] += y
    ///   G[n1,n2] -= y
    ///   G[n2,n1] -= y
    /// Ground terminals (None) are skipped.
    pub fn stamp_conductance(
        &mut self,
        n1: Option<usize>,
        n2: Option<usize>,
        y: Complex64,
    ) -> Result<()> {
        if let Some(i) = n1 {
            self.add_to_matrix(i, i, y)?;
        }
        if let Some(j) = n2 {
            self.add_to_matrix(j, j, y)?;
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add_to_matrix(i, j, -y)?;
            self.add_to_matrix(j, i, -y)?;
        }
        Ok(())
    }

    /// Stamp a current injected into `into` and drawn from `from`.
    pub fn stamp_current_injection(
        &mut self,
        into: Option<usize>,
        from: Option<usize>,
        current: Complex64,
    ) -> Result<()> {
        if let Some(i) = into {
            self.add_to_rhs(i, current)?;
        }
        if let Some(j) = from {
            self.add_to_rhs(j, -current)?;
        }
        Ok(())
    }

    /// Get the solved value of a node unknown.
    pub fn value(&self, index: usize) -> Result<Complex64> {
        let r = self.slot(index, Part::Re)?;
        let re = self.solution[r];
        let im = match self.settings.domain {
            Domain::Emt => 0.0,
            Domain::DynamicPhasor => self.solution[self.slot(index, Part::Im)?],
        };
        Ok(Complex64::new(re, im))
    }

    /// Get the solved voltage at a node (handling ground).
    pub fn node_value(&self, node: NodeId) -> Result<Complex64> {
        match node.matrix_index() {
            Some(i) => self.value(i),
            None => Ok(Complex64::new(0.0, 0.0)),
        }
    }

    /// Perform LU decomposition with partial pivoting.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size();
        if n == 0 {
            return Err(GridsimError::EmptyCircuit);
        }
        if self.matrix.iter().any(|v| !v.is_finite()) {
            return Err(GridsimError::numerical("system matrix contains non-finite entries"));
        }

        let scale = self.matrix.amax();
        let lu = self.matrix.clone().lu();
        let min_pivot = lu.u().diagonal().amin();
        if scale <= 0.0 || min_pivot <= scale * f64::EPSILON * n as f64 {
            return Err(GridsimError::SingularMatrix);
        }

        self.lu = Some(lu);
        self.factorizations += 1;
        debug!(size = n, count = self.factorizations, "factorized system matrix");
        Ok(())
    }

    /// Solve G v = J, refactorizing first if G changed since the last solve.
    ///
    /// On failure the previous solution is left untouched.
    pub fn solve(&mut self) -> Result<()> {
        if self.lu.is_none() {
            self.factor()?;
        }
        let lu = self.lu.as_ref().ok_or(GridsimError::SingularMatrix)?;
        let x = lu.solve(&self.rhs).ok_or(GridsimError::SingularMatrix)?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(GridsimError::numerical("solution vector contains non-finite values"));
        }
        self.solution = x;
        Ok(())
    }
}
