use std::cmp::Reverse;

use log::debug;

use super::DecisionDiagram;
use crate::basic_types::PropagationStatusCP;
use crate::containers::HashMap;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::ReadDomains;
use crate::mdd::delta::Direction;
use crate::mdd::graph::NodeId;
use crate::mdd::state::State;
use crate::mdd::state::StateKind;
use crate::mdd::state::ValueSet;

/// A node of the layer under construction which has not been added to the graph yet.
#[derive(Debug)]
struct PendingNode {
    down: State,
    arcs: Vec<(NodeId, i32)>,
}

impl DecisionDiagram {
    /// Builds the diagram top-down from the current domains.
    ///
    /// Children reached with the same down state share a node. When `width` is given and a layer
    /// has more distinct states, the nodes with the fewest incoming arcs are merged into the most
    /// similar remaining node. Afterwards every value without an arc is removed from its domain.
    pub(super) fn construct(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        width: Option<usize>,
    ) -> PropagationStatusCP {
        self.built_at = Some(context.get_checkpoint());
        self.statistics.num_constructions += 1;

        let root_state = self.spec.initial_state(StateKind::Down).clone();
        let _ = self.create_node(0, root_state);

        for layer in 0..self.spec.num_variables() {
            self.build_layer(context, layer, width)?;
        }

        if self.up_ready && self.spec.has_node_checks() {
            self.check_all_nodes(context)?;
        }

        debug!(
            "built a diagram of {} nodes and {} arcs over {} variables (maximum width {:?})",
            self.graph.num_nodes(),
            self.graph.num_arcs(),
            self.spec.num_variables(),
            width
        );
        self.trim_domains(context)
    }

    fn build_layer(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        layer: usize,
        width: Option<usize>,
    ) -> PropagationStatusCP {
        let variable = self.spec.variable(layer);
        let values: Vec<i32> = context.iterate_domain(variable).collect();
        let is_last = layer + 1 == self.spec.num_variables();

        let mut pending: Vec<PendingNode> = Vec::new();
        let mut index: HashMap<State, usize> = HashMap::default();
        for parent in self.graph.layer(layer).to_vec() {
            for &value in values.iter() {
                let sink_up = is_last.then(|| self.spec.initial_state(StateKind::Up));
                let valid = self.spec.arc_exists(
                    layer,
                    value,
                    self.graph.state(parent, StateKind::Down),
                    self.combined_of(parent),
                    sink_up,
                    None,
                );
                if !valid {
                    continue;
                }

                let values = ValueSet::singleton(value);
                let child = self.transition_from(Direction::Down, layer, parent, &values);
                match index.get(&child) {
                    Some(&position) => pending[position].arcs.push((parent, value)),
                    None => {
                        let _ = index.insert(child.clone(), pending.len());
                        pending.push(PendingNode {
                            down: child,
                            arcs: vec![(parent, value)],
                        });
                    }
                }
            }
        }

        if pending.is_empty() {
            debug!("no arc leaves layer {layer} of the diagram");
            return Err(self.conflict(context));
        }

        if is_last {
            self.merge_pending(&mut pending, 1);
        } else if let Some(width) = width {
            self.merge_pending(&mut pending, width);
        }

        for pending_node in pending {
            let node = self.create_node(layer + 1, pending_node.down);
            for (parent, value) in pending_node.arcs {
                let _ = self.add_arc(context, parent, node, value);
            }
        }

        for parent in self.graph.layer(layer).to_vec() {
            let parent_data = self.graph.node(parent);
            if parent_data.is_active() && parent_data.outgoing().is_empty() {
                self.delete_node(context, parent)?;
            }
        }
        Ok(())
    }

    /// Reduces `pending` to at most `width` nodes. The nodes with the most incoming arcs are kept;
    /// every other node is relaxed into the kept node at the smallest distance.
    fn merge_pending(&mut self, pending: &mut Vec<PendingNode>, width: usize) {
        if pending.len() <= width {
            return;
        }
        pending.sort_by_key(|pending_node| Reverse(pending_node.arcs.len()));
        let surplus = pending.split_off(width);

        for merged in surplus {
            let nearest = pending
                .iter()
                .enumerate()
                .map(|(position, kept)| {
                    (
                        position,
                        self.spec.distance(StateKind::Down, &kept.down, &merged.down),
                    )
                })
                .min_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(position, _)| position);
            let Some(nearest) = nearest else {
                continue;
            };

            let target = &mut pending[nearest];
            self.spec.relax_into(
                StateKind::Down,
                &mut target.down,
                &merged.down,
                self.spec.all_properties(StateKind::Down),
            );
            target.down.set_relaxed(true);
            target.arcs.extend(merged.arcs);
            self.statistics.num_nodes_merged += 1;
        }

        for pending_node in pending.iter_mut() {
            pending_node.down.rehash();
        }
    }

    /// Deletes the nodes whose node-existence predicates fail.
    pub(super) fn check_all_nodes(
        &mut self,
        context: &mut PropagationContextMut<'_>,
    ) -> PropagationStatusCP {
        for layer in 0..self.graph.num_layers() {
            for node in self.graph.layer(layer).to_vec() {
                if self.graph.node(node).is_active() && !self.node_valid(node) {
                    self.delete_node(context, node)?;
                }
            }
        }
        Ok(())
    }
}
