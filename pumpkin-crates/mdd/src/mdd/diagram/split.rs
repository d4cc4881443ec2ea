use std::cmp::Reverse;

use enum_map::EnumMap;
use log::trace;

use super::DecisionDiagram;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatusCP;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::engine::propagation::PropagationContextMut;
use crate::mdd::delta::Direction;
use crate::mdd::delta::Pending;
use crate::mdd::graph::ArcId;
use crate::mdd::graph::NodeId;
use crate::mdd::state::State;
use crate::mdd::state::StateKind;
use crate::mdd::state::ValueSet;
use crate::propagators::mdd::CandidateOrdering;
use crate::propagators::mdd::NodeSelection;
use crate::propagators::mdd::SplitStrategy;

/// A group of incoming arcs of a relaxed node which reach the same down state.
#[derive(Debug)]
struct Candidate {
    down: State,
    arcs: Vec<ArcId>,
}

impl DecisionDiagram {
    /// Splits relaxed nodes of `layer` while the layer has spare width.
    ///
    /// A node is split by computing the exact down state over each of its incoming arcs and
    /// grouping the arcs by that state. A group which cannot reach the sink through any outgoing
    /// arc of the node is pruned right away; since this removes arcs from the previous layer,
    /// the refinement then has to move back, and the layer to continue from is returned.
    pub(super) fn split_layer(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        layer: usize,
    ) -> Result<Option<usize>, Inconsistency> {
        let Some(max_width) = self.options.max_width else {
            return Ok(None);
        };

        let mut exhausted: HashSet<NodeId> = HashSet::default();
        while self.graph.width(layer) < max_width && self.split_budget > 0 {
            let Some(node) = self.select_split_node(layer, &exhausted) else {
                break;
            };
            let _ = exhausted.insert(node);

            let mut candidates = self.split_candidates(node, layer);
            if candidates.len() <= 1 {
                // All incoming arcs reach the same exact state, which replaces the relaxed one.
                if let Some(candidate) = candidates.pop() {
                    if !candidate.down.is_relaxed() {
                        self.apply_state(context, node, StateKind::Down, candidate.down)?;
                    }
                }
                continue;
            }

            let mut pruned = false;
            for candidate in candidates.iter() {
                if !self.is_viable(node, layer, &candidate.down) {
                    self.prune(context, &candidate.arcs)?;
                    pruned = true;
                }
            }
            if pruned {
                self.statistics.num_reboots += 1;
                let distance = self
                    .options
                    .reboot_distance
                    .unwrap_or_else(|| self.spec.reboot_distance(layer));
                let reboot = layer.saturating_sub(distance).max(1);
                trace!("pruned split candidates in layer {layer}, continuing at layer {reboot}");
                return Ok(Some(reboot));
            }

            if !self.graph.node(node).is_active() {
                continue;
            }
            self.order_candidates(&mut candidates, layer);
            let spare = max_width - self.graph.width(layer);
            let num_new = spare.min(candidates.len() - 1).min(self.split_budget);
            for candidate in candidates.into_iter().take(num_new) {
                self.materialise(context, node, layer, candidate)?;
            }
        }
        Ok(None)
    }

    fn select_split_node(&self, layer: usize, exhausted: &HashSet<NodeId>) -> Option<NodeId> {
        let mut eligible = self.graph.layer(layer).iter().copied().filter(|node| {
            let node_data = self.graph.node(*node);
            node_data.state(StateKind::Down).is_relaxed()
                && node_data.incoming().len() > 1
                && !exhausted.contains(node)
        });
        let num_incoming = |node: NodeId| self.graph.node(node).incoming().len();

        match self.options.node_selection {
            NodeSelection::FirstRelaxed => eligible.next(),
            NodeSelection::MostIncomingArcs => {
                eligible.min_by_key(|&node| Reverse(num_incoming(node)))
            }
            NodeSelection::Priority => eligible.min_by_key(|&node| {
                let node_data = self.graph.node(node);
                let input = self.spec.node_input(
                    layer,
                    [
                        node_data.state(StateKind::Down),
                        node_data.state(StateKind::Up),
                        node_data.state(StateKind::Combined),
                    ],
                    node_data.incoming().len(),
                    node_data.outgoing().len(),
                );
                Reverse((self.spec.split_priority(&input), num_incoming(node)))
            }),
        }
    }

    /// Groups the incoming arcs of `node` by the down state they lead to.
    fn split_candidates(&mut self, node: NodeId, layer: usize) -> Vec<Candidate> {
        let by_class = self.options.split_strategy == SplitStrategy::EquivalenceClass
            && self.spec.has_equivalence_keys();

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut by_state: HashMap<State, usize> = HashMap::default();
        let mut by_key: HashMap<Vec<i64>, usize> = HashMap::default();

        for arc in self.graph.node(node).incoming().to_vec() {
            let (parent, value) = {
                let arc = self.graph.arc(arc);
                (arc.parent(), arc.value())
            };
            let values = ValueSet::singleton(value);
            let down = self.transition_from(Direction::Down, layer - 1, parent, &values);

            let existing = if by_class {
                let key = self.spec.equivalence_key(&down);
                match by_key.get(&key) {
                    Some(&position) => Some(position),
                    None => {
                        let _ = by_key.insert(key, candidates.len());
                        None
                    }
                }
            } else {
                match by_state.get(&down) {
                    Some(&position) => Some(position),
                    None => {
                        let _ = by_state.insert(down.clone(), candidates.len());
                        None
                    }
                }
            };

            match existing {
                Some(position) => {
                    let candidate = &mut candidates[position];
                    if candidate.down != down {
                        self.spec.relax_into(
                            StateKind::Down,
                            &mut candidate.down,
                            &down,
                            self.spec.all_properties(StateKind::Down),
                        );
                        candidate.down.set_relaxed(true);
                        candidate.down.rehash();
                    }
                    candidate.arcs.push(arc);
                }
                None => candidates.push(Candidate {
                    down,
                    arcs: vec![arc],
                }),
            }
        }
        candidates
    }

    /// Whether a node of `layer` with the given down state, and otherwise the states of `node`,
    /// would pass the node checks and keep at least one outgoing arc of `node`.
    fn is_viable(&self, node: NodeId, layer: usize, down: &State) -> bool {
        let node_data = self.graph.node(node);
        let up = node_data.state(StateKind::Up);
        let combined = (self.up_ready && self.spec.uses_combined())
            .then(|| self.spec.combined_state(down, up));

        if self.up_ready && self.spec.has_node_checks() {
            let input = self.spec.node_input(
                layer,
                [
                    down,
                    up,
                    combined
                        .as_ref()
                        .unwrap_or(self.spec.initial_state(StateKind::Combined)),
                ],
                node_data.incoming().len(),
                node_data.outgoing().len(),
            );
            if !self.spec.node_exists(&input) {
                return false;
            }
        }

        node_data.outgoing().iter().any(|&arc| {
            let arc = self.graph.arc(arc);
            self.spec.arc_exists(
                layer,
                arc.value(),
                down,
                combined.as_ref(),
                self.up_of(arc.child()),
                self.combined_of(arc.child()),
            )
        })
    }

    fn prune(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        arcs: &[ArcId],
    ) -> PropagationStatusCP {
        self.statistics.num_candidates_pruned += 1;
        for &arc in arcs {
            if self.graph.arc(arc).is_active() {
                self.remove_arc(context, arc)?;
            }
        }
        Ok(())
    }

    fn order_candidates(&self, candidates: &mut [Candidate], layer: usize) {
        match self.options.candidate_ordering {
            CandidateOrdering::Discovery => {}
            CandidateOrdering::MostArcs => {
                candidates.sort_by_key(|candidate| Reverse(candidate.arcs.len()));
            }
            CandidateOrdering::Priority => {
                candidates.sort_by_cached_key(|candidate| {
                    let num_arcs = candidate.arcs.len();
                    Reverse((
                        self.spec.candidate_priority(&candidate.down, num_arcs, layer),
                        num_arcs,
                    ))
                });
            }
        }
    }

    /// Turns `candidate` into a new node next to `node`: the new node receives the arcs of the
    /// candidate and a copy of every outgoing arc of `node` which is valid for it.
    fn materialise(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        node: NodeId,
        layer: usize,
        candidate: Candidate,
    ) -> PropagationStatusCP {
        let up = self.graph.state(node, StateKind::Up).clone();
        let combined = if self.up_ready && self.spec.uses_combined() {
            self.spec.combined_state(&candidate.down, &up)
        } else {
            self.spec.initial_state(StateKind::Combined).clone()
        };
        let new = self
            .graph
            .create_node(layer, EnumMap::from_array([candidate.down, up, combined]));
        self.statistics.num_nodes_created += 1;
        self.statistics.num_nodes_split += 1;
        self.split_budget = self.split_budget.saturating_sub(1);
        trace!("split {new:?} off {node:?} in layer {layer}");

        for arc in self.graph.node(node).outgoing().to_vec() {
            let (value, child) = {
                let arc = self.graph.arc(arc);
                (arc.value(), arc.child())
            };
            if self.arc_valid(value, new, child) {
                let _ = self.add_arc(context, new, child, value);
                self.enqueue(Direction::Down, child, Pending::Full);
            }
        }

        for arc in candidate.arcs {
            if !self.graph.arc(arc).is_active() {
                continue;
            }
            let (value, parent) = {
                let arc = self.graph.arc(arc);
                (arc.value(), arc.parent())
            };
            let _ = self.add_arc(context, parent, new, value);
            self.enqueue(Direction::Up, parent, Pending::Full);
            self.remove_arc(context, arc)?;
        }
        self.enqueue(Direction::Up, new, Pending::Full);

        let new_data = self.graph.node(new);
        if new_data.is_active()
            && (new_data.outgoing().is_empty()
                || new_data.incoming().is_empty()
                || !self.node_valid(new))
        {
            self.delete_node(context, new)?;
        }
        Ok(())
    }
}
