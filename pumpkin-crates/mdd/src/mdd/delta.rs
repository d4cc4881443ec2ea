use enum_map::Enum;
use enum_map::EnumMap;

use crate::containers::HashMap;
use crate::mdd::graph::NodeId;
use crate::mdd::state::ChangeSet;
use crate::mdd::state::StateKind;

/// The direction in which states are recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub(crate) enum Direction {
    /// Recomputing down states, from the root to the sink.
    Down,
    /// Recomputing up states, from the sink to the root.
    Up,
}

impl Direction {
    /// The kind of state which is recomputed in this direction.
    pub(crate) fn state_kind(self) -> StateKind {
        match self {
            Direction::Down => StateKind::Down,
            Direction::Up => StateKind::Up,
        }
    }
}

/// What has to be recomputed for a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pending {
    /// The set of neighbours changed, so every property is recomputed.
    Full,
    /// Only the listed properties are affected by changes of the neighbours.
    Properties(ChangeSet),
}

impl Pending {
    fn merge(&mut self, other: Pending) {
        match other {
            Pending::Full => *self = Pending::Full,
            Pending::Properties(theirs) => {
                if let Pending::Properties(mine) = self {
                    mine.union_with(&theirs);
                }
            }
        }
    }
}

/// Records, per node and direction, which properties have to be recomputed because a neighbour
/// changed since the last refresh of the node, together with the order in which the nodes are
/// processed: layer by layer, in the direction of the pass.
///
/// The tracker is scratch space of a single propagation; it is cleared at the start of every
/// propagation and after backtracking.
#[derive(Debug, Default)]
pub(crate) struct DeltaTracker {
    pending: EnumMap<Direction, HashMap<NodeId, Pending>>,
    layers: EnumMap<Direction, Vec<Vec<NodeId>>>,
}

impl DeltaTracker {
    pub(crate) fn new(num_layers: usize) -> DeltaTracker {
        DeltaTracker {
            pending: EnumMap::default(),
            layers: EnumMap::from_fn(|_| vec![Vec::new(); num_layers]),
        }
    }

    /// Records that `node` in `layer` has to be refreshed in `direction`.
    pub(crate) fn record(
        &mut self,
        direction: Direction,
        node: NodeId,
        layer: usize,
        pending: Pending,
    ) {
        if let Pending::Properties(properties) = &pending {
            if properties.is_empty() {
                return;
            }
        }
        match self.pending[direction].get_mut(&node) {
            Some(existing) => existing.merge(pending),
            None => {
                let _ = self.pending[direction].insert(node, pending);
                self.layers[direction][layer].push(node);
            }
        }
    }

    /// Takes the nodes of `layer` which are pending in `direction`, together with what has to be
    /// recomputed for them.
    pub(crate) fn take_layer(
        &mut self,
        direction: Direction,
        layer: usize,
    ) -> Vec<(NodeId, Pending)> {
        let nodes = std::mem::take(&mut self.layers[direction][layer]);
        nodes
            .into_iter()
            .filter_map(|node| {
                self.pending[direction]
                    .remove(&node)
                    .map(|pending| (node, pending))
            })
            .collect()
    }

    pub(crate) fn has_pending_in_layer(&self, direction: Direction, layer: usize) -> bool {
        !self.layers[direction][layer].is_empty()
    }

    /// The deepest layer with pending nodes in `direction`.
    pub(crate) fn deepest_pending(&self, direction: Direction) -> Option<usize> {
        self.layers[direction]
            .iter()
            .rposition(|nodes| !nodes.is_empty())
    }

    /// The shallowest layer with pending nodes in `direction`.
    pub(crate) fn shallowest_pending(&self, direction: Direction) -> Option<usize> {
        self.layers[direction]
            .iter()
            .position(|nodes| !nodes.is_empty())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.values().all(|pending| pending.is_empty())
    }

    pub(crate) fn clear(&mut self) {
        for pending in self.pending.values_mut() {
            pending.clear();
        }
        for layers in self.layers.values_mut() {
            layers.iter_mut().for_each(|nodes| nodes.clear());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::StorageKey;

    #[test]
    fn full_recomputation_absorbs_property_changes() {
        let mut tracker = DeltaTracker::new(3);
        let node = NodeId::create_from_index(0);
        let changes: ChangeSet = [2].into_iter().collect();

        tracker.record(Direction::Down, node, 1, Pending::Properties(changes.clone()));
        tracker.record(Direction::Down, node, 1, Pending::Full);
        tracker.record(Direction::Down, node, 1, Pending::Properties(changes));

        assert_eq!(vec![(node, Pending::Full)], tracker.take_layer(Direction::Down, 1));
        assert!(tracker.is_empty());
    }

    #[test]
    fn property_changes_are_merged() {
        let mut tracker = DeltaTracker::new(3);
        let node = NodeId::create_from_index(4);

        tracker.record(Direction::Up, node, 0, Pending::Properties([1].into_iter().collect()));
        tracker.record(Direction::Up, node, 0, Pending::Properties([3].into_iter().collect()));
        tracker.record(Direction::Up, node, 0, Pending::Properties(ChangeSet::default()));

        assert_eq!(Some(0), tracker.deepest_pending(Direction::Up));
        assert_eq!(Some(0), tracker.shallowest_pending(Direction::Up));
        assert_eq!(None, tracker.shallowest_pending(Direction::Down));
        let taken = tracker.take_layer(Direction::Up, 0);
        assert_eq!(
            vec![(node, Pending::Properties([1, 3].into_iter().collect()))],
            taken
        );
    }

    #[test]
    fn clearing_drops_everything() {
        let mut tracker = DeltaTracker::new(2);
        tracker.record(Direction::Down, NodeId::create_from_index(1), 1, Pending::Full);
        tracker.clear();

        assert!(tracker.is_empty());
        assert!(!tracker.has_pending_in_layer(Direction::Down, 1));
    }
}
