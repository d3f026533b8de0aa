//! Side tables which attach information to AST nodes. The upstream phases
//! fill in definitions and types; the frame pass adds frames and accesses.

use std::collections::BTreeMap;

use crate::{frontend::ast::NodeId, middle::ty::Type};

/// A description of some subset of AST nodes, keyed by node id
#[derive(Debug, Clone)]
pub struct NodeMap<T> {
    entries: BTreeMap<NodeId, T>,
}

impl<T> NodeMap<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Attaches `value` to `node`, replacing any previous value
    pub fn store(&mut self, node: NodeId, value: T) {
        self.entries.insert(node, value);
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.entries.get(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }
}

impl<T> Default for NodeMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The two lookup tables produced by name resolution and type checking
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    /// Use site (`Name`, `Call`, `TypeName`) to the id of the definition it
    /// resolved to
    pub definitions: NodeMap<NodeId>,
    /// Every node (definitions included) to its resolved type
    pub types: NodeMap<Type>,
}
