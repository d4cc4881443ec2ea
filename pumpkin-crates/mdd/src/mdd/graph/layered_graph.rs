use enum_map::EnumMap;

use super::Arc;
use super::ArcId;
use super::Node;
use super::NodeId;
use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::mdd::state::State;
use crate::mdd::state::StateKind;
use crate::pumpkin_assert_eq_simple;
use crate::pumpkin_assert_moderate;
use crate::pumpkin_assert_simple;

/// A structural change of the graph, recorded so that it can be undone when backtracking.
#[derive(Debug, Clone)]
enum GraphChange {
    NodeCreated(NodeId),
    NodeRemoved(NodeId),
    ArcCreated(ArcId),
    ArcRemoved(ArcId),
    StateAssigned {
        node: NodeId,
        kind: StateKind,
        old: State,
    },
}

/// The layered node and arc structure of a decision diagram.
///
/// Nodes and arcs live in arenas and refer to each other by index. Every mutation is recorded on
/// a trail whose checkpoints follow the decision levels of the solver, so backtracking restores
/// the exact prior shape of the graph, including the order of the nodes in a layer and of the arcs
/// of a node.
///
/// A slot is only handed out again after the creation of its previous occupant has been undone;
/// a removed node keeps its slot, since backtracking may bring it back.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    nodes: KeyedVec<NodeId, Node>,
    arcs: KeyedVec<ArcId, Arc>,
    layers: Vec<Vec<NodeId>>,
    free_nodes: Vec<NodeId>,
    free_arcs: Vec<ArcId>,
    trail: Trail<GraphChange>,
}

impl Graph {
    /// Creates a graph with `num_layers` empty layers.
    pub(crate) fn new(num_layers: usize) -> Graph {
        Graph {
            layers: vec![Vec::new(); num_layers],
            ..Default::default()
        }
    }

    pub(crate) fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub(crate) fn layer(&self, layer: usize) -> &[NodeId] {
        &self.layers[layer]
    }

    pub(crate) fn width(&self, layer: usize) -> usize {
        self.layers[layer].len()
    }

    pub(crate) fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node]
    }

    pub(crate) fn arc(&self, arc: ArcId) -> &Arc {
        &self.arcs[arc]
    }

    pub(crate) fn state(&self, node: NodeId, kind: StateKind) -> &State {
        &self.nodes[node].states[kind]
    }

    pub(crate) fn num_nodes(&self) -> usize {
        self.layers.iter().map(|layer| layer.len()).sum()
    }

    pub(crate) fn num_arcs(&self) -> usize {
        self.layers
            .iter()
            .flatten()
            .map(|node| self.nodes[node].outgoing.len())
            .sum()
    }

    /// The number of arena slots ever allocated for nodes.
    pub(crate) fn allocated_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Opens checkpoints until the trail is at `checkpoint`.
    pub(crate) fn align(&mut self, checkpoint: usize) {
        while self.trail.get_checkpoint() < checkpoint {
            self.trail.new_checkpoint();
        }
    }

    /// Undoes every change made after `checkpoint`.
    pub(crate) fn synchronise(&mut self, checkpoint: usize) {
        if self.trail.get_checkpoint() <= checkpoint {
            return;
        }
        let changes = self.trail.synchronise(checkpoint).collect::<Vec<_>>();
        for change in changes {
            self.undo(change);
        }
    }

    pub(crate) fn create_node(
        &mut self,
        layer: usize,
        states: EnumMap<StateKind, State>,
    ) -> NodeId {
        let node = Node {
            layer,
            position: self.layers[layer].len(),
            active: true,
            states,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        };
        let id = match self.free_nodes.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => self.nodes.push(node),
        };
        self.layers[layer].push(id);
        self.trail.push(GraphChange::NodeCreated(id));
        id
    }

    pub(crate) fn add_arc(&mut self, parent: NodeId, child: NodeId, value: i32) -> ArcId {
        pumpkin_assert_simple!(self.nodes[parent].layer + 1 == self.nodes[child].layer);
        let arc = Arc {
            value,
            parent,
            child,
            outgoing_index: self.nodes[parent].outgoing.len(),
            incoming_index: self.nodes[child].incoming.len(),
            active: true,
        };
        let id = match self.free_arcs.pop() {
            Some(id) => {
                self.arcs[id] = arc;
                id
            }
            None => self.arcs.push(arc),
        };
        self.nodes[parent].outgoing.push(id);
        self.nodes[child].incoming.push(id);
        self.trail.push(GraphChange::ArcCreated(id));
        id
    }

    /// Unhooks `arc` from both of its endpoints.
    pub(crate) fn remove_arc(&mut self, id: ArcId) {
        let arc = self.arcs[id];
        pumpkin_assert_simple!(arc.active);

        let outgoing = &mut self.nodes[arc.parent].outgoing;
        let _ = outgoing.swap_remove(arc.outgoing_index);
        if let Some(&moved) = outgoing.get(arc.outgoing_index) {
            self.arcs[moved].outgoing_index = arc.outgoing_index;
        }

        let incoming = &mut self.nodes[arc.child].incoming;
        let _ = incoming.swap_remove(arc.incoming_index);
        if let Some(&moved) = incoming.get(arc.incoming_index) {
            self.arcs[moved].incoming_index = arc.incoming_index;
        }

        self.arcs[id].active = false;
        self.trail.push(GraphChange::ArcRemoved(id));
    }

    /// Removes `node` from its layer. Its arcs stay hooked; the caller unhooks them afterwards,
    /// which is when the neighbours notice the deletion.
    pub(crate) fn remove_node(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        pumpkin_assert_simple!(node.active);
        let (layer, position) = (node.layer, node.position);

        let nodes = &mut self.layers[layer];
        let _ = nodes.swap_remove(position);
        if let Some(&moved) = nodes.get(position) {
            self.nodes[moved].position = position;
        }

        self.nodes[id].active = false;
        self.trail.push(GraphChange::NodeRemoved(id));
    }

    pub(crate) fn set_state(&mut self, id: NodeId, kind: StateKind, state: State) {
        let old = std::mem::replace(&mut self.nodes[id].states[kind], state);
        self.trail.push(GraphChange::StateAssigned {
            node: id,
            kind,
            old,
        });
    }

    fn undo(&mut self, change: GraphChange) {
        match change {
            GraphChange::NodeCreated(id) => {
                let layer = self.nodes[id].layer;
                let popped = self.layers[layer].pop();
                pumpkin_assert_eq_simple!(Some(id), popped);
                pumpkin_assert_moderate!(
                    self.nodes[id].outgoing.is_empty() && self.nodes[id].incoming.is_empty()
                );
                self.nodes[id].active = false;
                self.free_nodes.push(id);
            }
            GraphChange::NodeRemoved(id) => {
                let (layer, position) = (self.nodes[id].layer, self.nodes[id].position);
                if let Some(displaced) = reinsert(&mut self.layers[layer], position, id) {
                    self.nodes[displaced].position = self.layers[layer].len() - 1;
                }
                self.nodes[id].active = true;
            }
            GraphChange::ArcCreated(id) => {
                let arc = self.arcs[id];
                let popped = self.nodes[arc.parent].outgoing.pop();
                pumpkin_assert_eq_simple!(Some(id), popped);
                let popped = self.nodes[arc.child].incoming.pop();
                pumpkin_assert_eq_simple!(Some(id), popped);
                self.arcs[id].active = false;
                self.free_arcs.push(id);
            }
            GraphChange::ArcRemoved(id) => {
                let arc = self.arcs[id];

                let outgoing = &mut self.nodes[arc.parent].outgoing;
                if let Some(displaced) = reinsert(outgoing, arc.outgoing_index, id) {
                    self.arcs[displaced].outgoing_index = outgoing.len() - 1;
                }

                let incoming = &mut self.nodes[arc.child].incoming;
                if let Some(displaced) = reinsert(incoming, arc.incoming_index, id) {
                    self.arcs[displaced].incoming_index = incoming.len() - 1;
                }

                self.arcs[id].active = true;
            }
            GraphChange::StateAssigned { node, kind, old } => {
                self.nodes[node].states[kind] = old;
            }
        }
    }
}

/// The inverse of [`Vec::swap_remove`]: puts `item` back at `index` and moves the element which
/// took its place to the end, returning that element.
fn reinsert<T: Copy>(list: &mut Vec<T>, index: usize, item: T) -> Option<T> {
    if index == list.len() {
        list.push(item);
        None
    } else {
        let displaced = std::mem::replace(&mut list[index], item);
        list.push(displaced);
        Some(displaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states() -> EnumMap<StateKind, State> {
        EnumMap::from_fn(|_| State::zeroed(1))
    }

    /// Builds root -> {a, b, c} -> sink with one arc per value.
    fn diamond() -> (Graph, [NodeId; 5]) {
        let mut graph = Graph::new(3);
        let root = graph.create_node(0, states());
        let a = graph.create_node(1, states());
        let b = graph.create_node(1, states());
        let c = graph.create_node(1, states());
        let sink = graph.create_node(2, states());
        for (value, node) in [a, b, c].into_iter().enumerate() {
            let _ = graph.add_arc(root, node, value as i32);
            let _ = graph.add_arc(node, sink, value as i32);
        }
        (graph, [root, a, b, c, sink])
    }

    fn shape(graph: &Graph) -> Vec<Vec<(NodeId, Vec<ArcId>, Vec<ArcId>)>> {
        (0..graph.num_layers())
            .map(|layer| {
                graph
                    .layer(layer)
                    .iter()
                    .map(|&node| {
                        let node_data = graph.node(node);
                        (
                            node,
                            node_data.outgoing().to_vec(),
                            node_data.incoming().to_vec(),
                        )
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn removing_keeps_positions_consistent() {
        let (mut graph, [root, a, _, c, _]) = diamond();
        let first_arc = graph.node(root).outgoing()[0];

        graph.remove_arc(first_arc);
        let removed = graph.node(a).outgoing()[0];
        graph.remove_arc(removed);
        graph.remove_node(a);

        assert_eq!(2, graph.width(1));
        assert_eq!(c, graph.layer(1)[0]);
        assert_eq!(0, graph.node(c).position());
        for (index, &arc) in graph.node(root).outgoing().iter().enumerate() {
            assert_eq!(index, graph.arc(arc).outgoing_index);
        }
        assert_eq!(4, graph.num_arcs());
    }

    #[test]
    fn synchronise_restores_the_exact_shape() {
        let (mut graph, [root, a, b, _, sink]) = diamond();
        let before = shape(&graph);

        graph.align(1);
        let first_arc = graph.node(root).outgoing()[0];
        graph.remove_arc(first_arc);
        let removed = graph.node(a).outgoing()[0];
        graph.remove_arc(removed);
        graph.remove_node(a);
        let new_node = graph.create_node(1, states());
        let _ = graph.add_arc(b, sink, 7);
        let _ = graph.add_arc(root, new_node, 9);
        let _ = graph.add_arc(new_node, sink, 9);

        graph.synchronise(0);

        assert_eq!(before, shape(&graph));
        assert!(graph.node(a).is_active());
        assert!(!graph.node(new_node).is_active());
    }

    #[test]
    fn slots_are_recycled_only_after_their_creation_is_undone() {
        let (mut graph, [root, a, ..]) = diamond();

        graph.align(1);
        let arc = graph.node(root).outgoing()[0];
        graph.remove_arc(arc);
        let arc = graph.node(a).outgoing()[0];
        graph.remove_arc(arc);
        graph.remove_node(a);
        let fresh = graph.create_node(1, states());
        assert_ne!(a, fresh);

        graph.synchronise(0);
        graph.align(1);
        let reused = graph.create_node(1, states());
        assert_eq!(fresh, reused);
        assert_eq!(3, graph.node(reused).position());
    }

    #[test]
    fn state_assignments_are_undone() {
        let (mut graph, [root, ..]) = diamond();
        graph.align(1);
        let mut state = State::zeroed(1);
        state.set_relaxed(true);
        graph.set_state(root, StateKind::Down, state);
        assert!(graph.state(root, StateKind::Down).is_relaxed());

        graph.synchronise(0);
        assert!(!graph.state(root, StateKind::Down).is_relaxed());
    }
}
