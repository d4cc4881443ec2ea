use super::NodeId;
use crate::containers::StorageKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ArcId(u32);

impl StorageKey for ArcId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        ArcId(index as u32)
    }
}

/// A labelled edge from a node in layer `i` to a node in layer `i + 1`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Arc {
    pub(super) value: i32,
    pub(super) parent: NodeId,
    pub(super) child: NodeId,
    /// Index of the arc in the outgoing arcs of the parent.
    pub(super) outgoing_index: usize,
    /// Index of the arc in the incoming arcs of the child.
    pub(super) incoming_index: usize,
    pub(super) active: bool,
}

impl Arc {
    pub(crate) fn value(&self) -> i32 {
        self.value
    }

    pub(crate) fn parent(&self) -> NodeId {
        self.parent
    }

    pub(crate) fn child(&self) -> NodeId {
        self.child
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }
}
