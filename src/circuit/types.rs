//! Core types for network representation.

use std::fmt;

/// A network node, addressed by its integer index.
/// Node 0 is always ground and has no row/column in the system matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The ground node (always index 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }

    /// Get the matrix index for this node's unknown.
    /// Returns None for ground.
    pub fn matrix_index(&self) -> Option<usize> {
        if self.is_ground() {
            None
        } else {
            Some(self.0 - 1)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "N{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_has_no_matrix_index() {
        assert!(NodeId::GROUND.is_ground());
        assert_eq!(NodeId::GROUND.matrix_index(), None);
        assert_eq!(NodeId(1).matrix_index(), Some(0));
        assert_eq!(NodeId(3).matrix_index(), Some(2));
        assert_eq!(NodeId(2).to_string(), "N2");
    }
}
