use enum_map::EnumMap;

use super::ArcId;
use crate::containers::StorageKey;
use crate::mdd::state::State;
use crate::mdd::state::StateKind;

/// A handle to a node of the diagram; it stays valid until the creation of the node is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(u32);

impl StorageKey for NodeId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(super) layer: usize,
    /// Index of the node in its layer.
    pub(super) position: usize,
    pub(super) active: bool,
    pub(super) states: EnumMap<StateKind, State>,
    /// Arcs to layer `layer + 1`.
    pub(super) outgoing: Vec<ArcId>,
    /// Arcs from layer `layer - 1`.
    pub(super) incoming: Vec<ArcId>,
}

impl Node {
    pub(crate) fn layer(&self) -> usize {
        self.layer
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn state(&self, kind: StateKind) -> &State {
        &self.states[kind]
    }

    pub(crate) fn outgoing(&self) -> &[ArcId] {
        &self.outgoing
    }

    pub(crate) fn incoming(&self) -> &[ArcId] {
        &self.incoming
    }
}
