//! Network validation.

use std::collections::VecDeque;

use crate::components::MnaComponent;
use crate::error::{GridsimError, Result};

use super::{Circuit, NodeId};

/// Validate a circuit for simulation.
///
/// Checks:
/// - The circuit has at least one component and one non-ground node
/// - Every node has a conductive path to ground
///
/// Paths are those of the discretized network, so inductors and capacitors
/// count through their companion conductances. Pure current injections
/// (current sources, generators) do not.
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.components().is_empty() || circuit.num_nodes() == 0 {
        return Err(GridsimError::EmptyCircuit);
    }

    let n = circuit.num_nodes() + 1;
    let mut adjacency = vec![Vec::new(); n];
    for component in circuit.components() {
        for (a, b) in component.conductive_paths() {
            adjacency[a.0].push(b.0);
            adjacency[b.0].push(a.0);
        }
    }

    let mut reached = vec![false; n];
    let mut queue = VecDeque::from([NodeId::GROUND.0]);
    reached[NodeId::GROUND.0] = true;
    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            if !reached[next] {
                reached[next] = true;
                queue.push_back(next);
            }
        }
    }

    match reached.iter().position(|r| !r) {
        Some(index) => Err(GridsimError::FloatingNode {
            node: NodeId(index),
        }),
        None => Ok(()),
    }
}
