//! Network graph representation and validation.
//!
//! The [`Circuit`] struct holds all components and the node count in a form
//! suitable for simulation. Nodes are numbered from 1; node 0 is ground.

mod graph;
mod types;
mod validate;

pub use graph::Circuit;
pub use types::*;
pub use validate::validate_circuit;
