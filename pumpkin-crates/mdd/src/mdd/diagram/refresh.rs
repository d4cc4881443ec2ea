use super::DecisionDiagram;
use crate::basic_types::PropagationStatusCP;
use crate::containers::HashMap;
use crate::engine::propagation::PropagationContextMut;
use crate::mdd::delta::Direction;
use crate::mdd::delta::Pending;
use crate::mdd::graph::NodeId;
use crate::mdd::state::ChangeSet;
use crate::mdd::state::State;
use crate::mdd::state::StateKind;
use crate::mdd::state::ValueSet;

impl DecisionDiagram {
    /// Recomputes the state of `node` in `direction` from its parents (down) or children (up).
    pub(super) fn refresh(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        direction: Direction,
        node: NodeId,
        pending: Pending,
    ) -> PropagationStatusCP {
        if !self.graph.node(node).is_active() {
            return Ok(());
        }
        let layer = self.graph.node(node).layer();
        let arc_layer = match direction {
            Direction::Down => layer - 1,
            Direction::Up => layer,
        };
        let kind = direction.state_kind();
        let groups = self.neighbour_groups(node, direction);
        let old = self.graph.state(node, kind).clone();

        let new = match &pending {
            Pending::Full => {
                self.statistics.num_full_recomputations += 1;
                self.relaxed_transition(direction, arc_layer, &groups, &old, None)
            }
            Pending::Properties(properties) => {
                self.statistics.num_incremental_recomputations += 1;
                self.relaxed_transition(direction, arc_layer, &groups, &old, Some(properties))
            }
        };
        self.apply_state(context, node, kind, new)
    }

    /// The neighbours of `node` in `direction` together with the values of the arcs to them.
    ///
    /// Unless arc values are grouped, every arc forms its own group.
    pub(super) fn neighbour_groups(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> Vec<(NodeId, ValueSet)> {
        let node_data = self.graph.node(node);
        let arcs = match direction {
            Direction::Down => node_data.incoming(),
            Direction::Up => node_data.outgoing(),
        };
        let neighbour = |arc| {
            let arc = self.graph.arc(arc);
            let neighbour = match direction {
                Direction::Down => arc.parent(),
                Direction::Up => arc.child(),
            };
            (neighbour, arc.value())
        };

        if !self.options.group_arc_values {
            return arcs
                .iter()
                .map(|&arc| {
                    let (neighbour, value) = neighbour(arc);
                    (neighbour, ValueSet::singleton(value))
                })
                .collect();
        }

        let mut groups: Vec<(NodeId, Vec<i32>)> = Vec::new();
        let mut positions: HashMap<NodeId, usize> = HashMap::default();
        for &arc in arcs {
            let (neighbour, value) = neighbour(arc);
            match positions.get(&neighbour) {
                Some(&position) => groups[position].1.push(value),
                None => {
                    let _ = positions.insert(neighbour, groups.len());
                    groups.push((neighbour, vec![value]));
                }
            }
        }
        groups
            .into_iter()
            .map(|(neighbour, values)| (neighbour, ValueSet::from_values(values)))
            .collect()
    }

    /// Computes the state reached over every group and merges the results with the relaxation of
    /// each property.
    ///
    /// With `properties`, only those properties are recomputed and the others are taken from
    /// `old`. The result is relaxed when a source is relaxed, a group has several values, or
    /// distinct states were merged; an incremental recomputation cannot tell whether the sources
    /// still agree on the untouched properties, so a relaxed node with several sources stays
    /// relaxed.
    pub(super) fn relaxed_transition(
        &mut self,
        direction: Direction,
        arc_layer: usize,
        groups: &[(NodeId, ValueSet)],
        old: &State,
        properties: Option<&ChangeSet>,
    ) -> State {
        let kind = direction.state_kind();
        let mut merged: Option<State> = None;
        let mut relaxed = false;
        let mut distinct = false;

        for (neighbour, values) in groups {
            let state = match properties {
                None => self.transition_from(direction, arc_layer, *neighbour, values),
                Some(properties) => {
                    let source = self.graph.state(*neighbour, kind);
                    let combined = self.combined_of(*neighbour);
                    let mut state = old.clone();
                    self.spec.transition_into(
                        kind, arc_layer, &mut state, source, combined, values, properties,
                    );
                    state.set_relaxed(source.is_relaxed() || values.len() > 1);
                    state.rehash();
                    state
                }
            };
            relaxed |= state.is_relaxed();

            match merged.as_mut() {
                None => merged = Some(state),
                Some(merged) => {
                    if *merged != state {
                        distinct = true;
                        self.spec.relax_into(
                            kind,
                            merged,
                            &state,
                            properties.unwrap_or(self.spec.all_properties(kind)),
                        );
                    }
                }
            }
        }

        let Some(mut state) = merged else {
            return old.clone();
        };
        let several = groups.len() > 1;
        let relaxed =
            relaxed || (several && (distinct || (properties.is_some() && old.is_relaxed())));
        state.set_relaxed(relaxed);
        state.rehash();
        state
    }

    /// Stores `new` as the state of `kind` of `node` and handles the consequences: the combined
    /// state is updated, the node and its arcs are checked again and the neighbours whose
    /// transitions read a changed property are scheduled.
    pub(super) fn apply_state(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        node: NodeId,
        kind: StateKind,
        new: State,
    ) -> PropagationStatusCP {
        let old = self.graph.state(node, kind);
        if *old == new {
            return Ok(());
        }
        let changed = ChangeSet::diff(self.spec.layout(kind), old, &new);
        let only_flag = changed.is_empty();
        self.graph.set_state(node, kind, new);

        let unchanged = ChangeSet::default();
        let (changed_down, changed_up) = match kind {
            StateKind::Down => (&changed, &unchanged),
            StateKind::Up | StateKind::Combined => (&unchanged, &changed),
        };
        let changed_combined = self.update_combined(node, changed_down, changed_up);

        if !self.node_valid(node) {
            return self.delete_node(context, node);
        }
        if !changed_down.is_empty() || !changed_combined.is_empty() {
            self.filter_outgoing(context, node)?;
        }
        if self.up_ready && (!changed_up.is_empty() || !changed_combined.is_empty()) {
            self.filter_incoming(context, node)?;
        }
        if !self.graph.node(node).is_active() {
            return Ok(());
        }

        let layer = self.graph.node(node).layer();
        if layer < self.last_layer() && (kind == StateKind::Down || !changed_combined.is_empty()) {
            let pending = if only_flag && kind == StateKind::Down {
                Pending::Full
            } else {
                Pending::Properties(self.spec.affected(
                    StateKind::Down,
                    layer,
                    changed_down,
                    &changed_combined,
                ))
            };
            for child in self.children(node) {
                self.enqueue(Direction::Down, child, pending.clone());
            }
        }
        if layer > 0 && (kind == StateKind::Up || !changed_combined.is_empty()) {
            let pending = if only_flag && kind == StateKind::Up {
                Pending::Full
            } else {
                Pending::Properties(self.spec.affected(
                    StateKind::Up,
                    layer - 1,
                    changed_up,
                    &changed_combined,
                ))
            };
            for parent in self.parents(node) {
                self.enqueue(Direction::Up, parent, pending.clone());
            }
        }
        Ok(())
    }

    /// Recomputes the combined properties of `node` which read a changed down or up property and
    /// returns the combined properties whose value changed.
    fn update_combined(
        &mut self,
        node: NodeId,
        changed_down: &ChangeSet,
        changed_up: &ChangeSet,
    ) -> ChangeSet {
        if !self.up_ready || !self.spec.uses_combined() {
            return ChangeSet::default();
        }
        let affected = self.spec.affected_combined(changed_down, changed_up);
        if affected.is_empty() {
            return affected;
        }

        let old = self.graph.state(node, StateKind::Combined);
        let mut combined = old.clone();
        self.spec.combine_into(
            &mut combined,
            self.graph.state(node, StateKind::Down),
            self.graph.state(node, StateKind::Up),
            &affected,
        );
        combined.rehash();

        let changed = ChangeSet::diff(self.spec.layout(StateKind::Combined), old, &combined);
        if !changed.is_empty() {
            self.graph.set_state(node, StateKind::Combined, combined);
        }
        changed
    }

    /// Removes the outgoing arcs of `node` which the arc-existence predicates reject.
    pub(super) fn filter_outgoing(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        node: NodeId,
    ) -> PropagationStatusCP {
        for arc in self.graph.node(node).outgoing().to_vec() {
            if !self.graph.node(node).is_active() {
                break;
            }
            let arc_data = self.graph.arc(arc);
            if arc_data.is_active() && !self.arc_valid(arc_data.value(), node, arc_data.child()) {
                self.remove_arc(context, arc)?;
            }
        }
        Ok(())
    }

    /// Removes the incoming arcs of `node` which the arc-existence predicates reject.
    pub(super) fn filter_incoming(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        node: NodeId,
    ) -> PropagationStatusCP {
        for arc in self.graph.node(node).incoming().to_vec() {
            if !self.graph.node(node).is_active() {
                break;
            }
            let arc_data = self.graph.arc(arc);
            if arc_data.is_active() && !self.arc_valid(arc_data.value(), arc_data.parent(), node) {
                self.remove_arc(context, arc)?;
            }
        }
        Ok(())
    }
}
