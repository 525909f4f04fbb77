//! Network graph structure.

use std::collections::HashSet;

use super::types::NodeId;
use crate::components::{Component, MnaComponent, Switch, SynchronousGenerator};
use crate::error::{GridsimError, Result};

/// A complete network ready for simulation.
#[derive(Debug, Clone)]
pub struct Circuit {
    /// All components, in stamping order
    components: Vec<Component>,

    /// Number of non-ground nodes (highest node index in use)
    num_nodes: usize,
}

impl Circuit {
    /// Build a circuit from its components.
    ///
    /// Component names must be unique. The node count is the highest node
    /// index referenced; unused indices below it are reported as floating by
    /// [`validate_circuit`](super::validate_circuit).
    pub fn new(components: Vec<Component>) -> Result<Self> {
        {
            let mut names = HashSet::with_capacity(components.len());
            for component in &components {
                if !names.insert(component.name()) {
                    return Err(GridsimError::DuplicateComponent {
                        name: component.name().to_string(),
                    });
                }
            }
        }

        let num_nodes = components
            .iter()
            .flat_map(|c| c.nodes().iter())
            .map(|node| node.0)
            .max()
            .unwrap_or(0);

        Ok(Self {
            components,
            num_nodes,
        })
    }

    /// Number of non-ground nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Iterate over the non-ground nodes.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (1..=self.num_nodes).map(NodeId)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [Component] {
        &mut self.components
    }

    /// Find a component by name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name() == name)
    }

    /// Find a synchronous generator by name.
    pub fn generator(&self, name: &str) -> Option<&SynchronousGenerator> {
        self.component(name).and_then(Component::as_generator)
    }

    pub fn generator_mut(&mut self, name: &str) -> Option<&mut SynchronousGenerator> {
        self.component_mut(name).and_then(Component::as_generator_mut)
    }

    pub fn switch_mut(&mut self, name: &str) -> Option<&mut Switch> {
        self.component_mut(name).and_then(Component::as_switch_mut)
    }
}
