//! Error types for the Gridsim network simulator.
//!
//! This module provides a unified error type [`GridsimError`] that covers
//! all error conditions that can occur during component construction,
//! topology validation, and simulation.

use thiserror::Error;

use crate::circuit::NodeId;

/// Result type alias using [`GridsimError`].
pub type Result<T> = std::result::Result<T, GridsimError>;

/// Coarse classification of a [`GridsimError`].
///
/// Callers use this to decide on recovery (e.g. restarting with a different
/// integration method after a numerical failure) without matching on every
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inconsistent or missing component/simulation parameters.
    Configuration,
    /// Network not connected to ground.
    Topology,
    /// Linear solve or state integration failed.
    Numerical,
    /// Index or access outside the allocated system.
    Contract,
    /// Writing numeric output failed.
    Output,
}

/// Unified error type for all Gridsim operations.
#[derive(Error, Debug)]
pub enum GridsimError {
    // ============ Configuration Errors ============
    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for component '{component}': {message}")]
    InvalidParameter {
        component: String,
        param: String,
        message: String,
    },

    /// Duplicate component name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    /// Generator stepped before its operating point was set
    #[error("Synchronous generator '{name}' has not been initialized")]
    GeneratorNotInitialized { name: String },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ Topology Errors ============
    /// Floating node (not connected to ground path)
    #[error("Floating node {node} detected - no conductive path to ground")]
    FloatingNode { node: NodeId },

    /// Circuit without components or non-ground nodes
    #[error("Circuit has no components or no non-ground nodes")]
    EmptyCircuit,

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular system matrix - network may be floating or inconsistent")]
    SingularMatrix,

    /// Numerical failure other than a singular system matrix
    #[error("Numerical failure: {message}")]
    NumericalFailure { message: String },

    // ============ Contract Errors ============
    /// Matrix or vector index beyond the allocated system
    #[error("Index {index} out of range for system of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// Imaginary part requested in a real-valued domain
    #[error("Imaginary part is not available in the {domain} domain")]
    UnsupportedPart { domain: &'static str },

    // ============ I/O Errors ============
    /// Error writing numeric output rows
    #[error("Failed to write output row: {source}")]
    Output {
        #[from]
        source: std::io::Error,
    },
}

impl GridsimError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        component: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            component: component.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a numerical failure error
    pub fn numerical(message: impl Into<String>) -> Self {
        Self::NumericalFailure {
            message: message.into(),
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_simulation(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. }
            | Self::DuplicateComponent { .. }
            | Self::GeneratorNotInitialized { .. }
            | Self::InvalidSimulationParam { .. } => ErrorKind::Configuration,
            Self::FloatingNode { .. } | Self::EmptyCircuit => ErrorKind::Topology,
            Self::SingularMatrix | Self::NumericalFailure { .. } => ErrorKind::Numerical,
            Self::IndexOutOfRange { .. } | Self::UnsupportedPart { .. } => ErrorKind::Contract,
            Self::Output { .. } => ErrorKind::Output,
        }
    }
}

/// Require a strictly positive, finite parameter value.
pub(crate) fn require_positive(component: &str, param: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GridsimError::invalid_parameter(
            component,
            param,
            format!("must be positive and finite, got {value}"),
        ))
    }
}
