//! The decision diagram of a group of constraints and the engines which build and filter it.
//!
//! A diagram has one node layer per variable plus the sink layer; the arcs leaving layer `i` are
//! labelled with values of the `i`-th variable. For every layer and value the diagram keeps a
//! reversible support counter; when the last arc labelled with a value disappears, the value is
//! removed from the domain of the variable.
//!
//! Without a maximum width the diagram is exact ([`DecisionDiagram::propagate_exact`]): it is
//! built once and afterwards only loses arcs. With a maximum width the diagram is a relaxation
//! which is refined by splitting nodes and kept consistent by alternating up and down passes
//! ([`DecisionDiagram::propagate_relaxed`]).
mod construction;
mod dot;
mod exact;
mod refresh;
mod relaxed;
mod split;
mod transition_cache;

use enum_map::EnumMap;
use log::debug;
use log::trace;

use self::transition_cache::TransitionCache;
use super::delta::DeltaTracker;
use super::delta::Direction;
use super::delta::Pending;
use super::graph::ArcId;
use super::graph::Graph;
use super::graph::NodeId;
use super::spec::CompiledSpec;
use super::state::State;
use super::state::StateKind;
use super::state::ValueSet;
use super::MddStatistics;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatusCP;
use crate::basic_types::PropagatorConflict;
use crate::engine::propagation::ManipulateTrailedValues;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::PropagatorConstructorContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::TrailedInteger;
use crate::containers::HashMap;
use crate::propagators::mdd::DecisionDiagramOptions;
use crate::pumpkin_assert_advanced;
use crate::pumpkin_assert_moderate;

#[derive(Debug)]
pub(crate) struct DecisionDiagram {
    spec: CompiledSpec,
    options: DecisionDiagramOptions,
    graph: Graph,
    /// Per layer, the number of arcs labelled with each value of the initial domain of the
    /// variable, indexed from [`DecisionDiagram::offsets`].
    supports: Vec<Box<[TrailedInteger]>>,
    offsets: Vec<i32>,
    /// The checkpoint at which the diagram was built, if it is built.
    built_at: Option<usize>,
    /// Whether the up and combined states of the nodes are known; before the first up pass only
    /// the up state of the sink is.
    up_ready: bool,
    delta: DeltaTracker,
    /// The layers whose variable changed since the last propagation.
    pending_trims: Vec<usize>,
    cache: TransitionCache,
    /// The number of nodes which may still be created by splitting in this propagation.
    split_budget: usize,
    /// The metrics of the most recent propagation.
    statistics: MddStatistics,
}

impl DecisionDiagram {
    pub(crate) fn new(
        spec: CompiledSpec,
        options: DecisionDiagramOptions,
        context: &mut PropagatorConstructorContext<'_>,
    ) -> DecisionDiagram {
        let bounds: Vec<(i32, i32)> = {
            let readonly = context.as_readonly();
            spec.variables()
                .iter()
                .map(|&variable| {
                    (
                        readonly.assignments.get_initial_lower_bound(variable),
                        readonly.assignments.get_initial_upper_bound(variable),
                    )
                })
                .collect()
        };

        let mut supports = Vec::with_capacity(bounds.len());
        for &(lower_bound, upper_bound) in bounds.iter() {
            let mut counters = Vec::with_capacity((upper_bound - lower_bound + 1) as usize);
            for _ in lower_bound..=upper_bound {
                counters.push(context.new_trailed_integer(0));
            }
            supports.push(counters.into_boxed_slice());
        }

        let num_layers = spec.num_variables() + 1;
        DecisionDiagram {
            up_ready: !spec.uses_up(),
            graph: Graph::new(num_layers),
            supports,
            offsets: bounds.iter().map(|&(lower_bound, _)| lower_bound).collect(),
            built_at: None,
            delta: DeltaTracker::new(num_layers),
            pending_trims: Vec::new(),
            cache: TransitionCache::new(options.use_transition_cache),
            split_budget: options.split_budget,
            statistics: MddStatistics::default(),
            spec,
            options,
        }
    }

    /// The metrics of the most recent call to [`DecisionDiagram::propagate`].
    pub(crate) fn statistics(&self) -> MddStatistics {
        self.statistics
    }

    pub(crate) fn is_built(&self) -> bool {
        self.built_at.is_some()
    }

    /// Builds the diagram if necessary, removes the arcs whose value left the domain of their
    /// variable and restores consistency of the diagram, narrowing the domains of the variables.
    pub(crate) fn propagate(
        &mut self,
        context: &mut PropagationContextMut<'_>,
    ) -> PropagationStatusCP {
        self.statistics = MddStatistics {
            num_propagations: 1,
            ..Default::default()
        };
        self.delta.clear();
        self.cache.clear();
        self.split_budget = self.options.split_budget;
        self.graph.align(context.get_checkpoint());

        let result = match self.options.max_width {
            None => self.propagate_exact(context),
            Some(_) => self.propagate_relaxed(context),
        };
        match result {
            Ok(()) => pumpkin_assert_advanced!(self.invariants_hold(context)),
            Err(_) => debug!(
                "decision diagram over {} variables failed at checkpoint {}",
                self.spec.num_variables(),
                context.get_checkpoint()
            ),
        }
        result
    }

    /// Checks that every node outside the root and sink layers has arcs on both sides, that the
    /// support counters match the arcs and that every value in a domain is supported.
    fn invariants_hold(&self, context: &PropagationContextMut<'_>) -> bool {
        let last = self.last_layer();
        let mut counts: Vec<HashMap<i32, i64>> = vec![HashMap::default(); last];

        for layer in 0..=last {
            for (position, &node) in self.graph.layer(layer).iter().enumerate() {
                let node_data = self.graph.node(node);
                if !node_data.is_active() || node_data.position() != position {
                    return false;
                }
                if (layer > 0 && node_data.incoming().is_empty())
                    || (layer < last && node_data.outgoing().is_empty())
                {
                    return false;
                }
                if layer < last {
                    for &arc in node_data.outgoing() {
                        *counts[layer].entry(self.graph.arc(arc).value()).or_default() += 1;
                    }
                }
            }
        }

        (0..last).all(|layer| {
            let variable = self.spec.variable(layer);
            let counters_match = (0..self.supports[layer].len()).all(|index| {
                let value = self.offsets[layer] + index as i32;
                let count = counts[layer].get(&value).copied().unwrap_or(0);
                self.support(context, layer, value) == count
            });
            let domain_supported = context
                .iterate_domain(variable)
                .all(|value| counts[layer].contains_key(&value));
            counters_match && domain_supported
        })
    }

    /// Records that the domain of the variable of `layer` changed.
    pub(crate) fn notify(&mut self, layer: usize) {
        if self.built_at.is_some() {
            self.pending_trims.push(layer);
        }
    }

    /// Restores the diagram to the shape it had at `checkpoint`.
    pub(crate) fn synchronise(&mut self, checkpoint: usize) {
        self.graph.synchronise(checkpoint);
        if self.built_at.is_some_and(|built_at| built_at > checkpoint) {
            self.built_at = None;
            self.up_ready = !self.spec.uses_up();
        }
        self.delta.clear();
        self.pending_trims.clear();
        self.cache.clear();
    }

    fn last_layer(&self) -> usize {
        self.spec.num_variables()
    }

    fn conflict(&self, context: &PropagationContextMut<'_>) -> Inconsistency {
        Inconsistency::Conflict(PropagatorConflict {
            propagator: context.propagator_id,
        })
    }

    fn support_counter(&self, layer: usize, value: i32) -> Option<TrailedInteger> {
        usize::try_from(value - self.offsets[layer])
            .ok()
            .and_then(|index| self.supports[layer].get(index))
            .copied()
    }

    fn support(&self, context: &PropagationContextMut<'_>, layer: usize, value: i32) -> i64 {
        self.support_counter(layer, value)
            .map(|counter| context.value(counter))
            .unwrap_or(0)
    }

    fn decrement_support(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        layer: usize,
        value: i32,
    ) -> PropagationStatusCP {
        let Some(counter) = self.support_counter(layer, value) else {
            return Ok(());
        };
        context.add_assign(counter, -1);
        pumpkin_assert_moderate!(context.value(counter) >= 0);

        let variable = self.spec.variable(layer);
        if context.value(counter) == 0 && context.contains(variable, value) {
            trace!("{variable} loses {value}, its last arc was removed");
            context.remove(variable, value)?;
            self.statistics.num_values_removed += 1;
        }
        Ok(())
    }

    /// Creates a node with the given down state; its up state starts out as the one of the sink.
    fn create_node(&mut self, layer: usize, down: State) -> NodeId {
        let up = self.spec.initial_state(StateKind::Up).clone();
        let combined = if self.up_ready && self.spec.uses_combined() {
            self.spec.combined_state(&down, &up)
        } else {
            self.spec.initial_state(StateKind::Combined).clone()
        };
        self.statistics.num_nodes_created += 1;
        self.graph
            .create_node(layer, EnumMap::from_array([down, up, combined]))
    }

    fn add_arc(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        parent: NodeId,
        child: NodeId,
        value: i32,
    ) -> ArcId {
        let layer = self.graph.node(parent).layer();
        if let Some(counter) = self.support_counter(layer, value) {
            context.add_assign(counter, 1);
        }
        self.graph.add_arc(parent, child, value)
    }

    /// Unhooks `arc`; endpoints which are left without arcs on that side are deleted, the others
    /// are scheduled for recomputation.
    fn remove_arc(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        arc: ArcId,
    ) -> PropagationStatusCP {
        let (value, parent, child) = {
            let arc = self.graph.arc(arc);
            (arc.value(), arc.parent(), arc.child())
        };
        let layer = self.graph.node(parent).layer();

        self.graph.remove_arc(arc);
        self.statistics.num_arcs_removed += 1;
        self.decrement_support(context, layer, value)?;

        if self.graph.node(parent).is_active() {
            if self.graph.node(parent).outgoing().is_empty() {
                self.delete_node(context, parent)?;
            } else {
                self.enqueue(Direction::Up, parent, Pending::Full);
            }
        }
        if self.graph.node(child).is_active() {
            if self.graph.node(child).incoming().is_empty() {
                self.delete_node(context, child)?;
            } else {
                self.enqueue(Direction::Down, child, Pending::Full);
            }
        }
        Ok(())
    }

    /// Removes `node` from its layer and unhooks all of its arcs, which may cascade into further
    /// deletions. Deleting the root or the sink means the diagram has no path left.
    fn delete_node(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        node: NodeId,
    ) -> PropagationStatusCP {
        if !self.graph.node(node).is_active() {
            return Ok(());
        }
        let layer = self.graph.node(node).layer();
        if layer == 0 || layer == self.last_layer() {
            debug!(
                "the {} of the diagram has no arcs left",
                if layer == 0 { "root" } else { "sink" }
            );
            return Err(self.conflict(context));
        }

        trace!("deleting {node:?} in layer {layer}");
        self.graph.remove_node(node);
        self.statistics.num_nodes_deleted += 1;

        while let Some(&arc) = self.graph.node(node).incoming().last() {
            self.remove_arc(context, arc)?;
        }
        while let Some(&arc) = self.graph.node(node).outgoing().last() {
            self.remove_arc(context, arc)?;
        }
        Ok(())
    }

    /// Schedules `node` for recomputation in `direction`; exact diagrams never recompute states.
    fn enqueue(&mut self, direction: Direction, node: NodeId, pending: Pending) {
        if self.options.max_width.is_none() {
            return;
        }
        if direction == Direction::Up && !self.spec.uses_up() {
            return;
        }
        let node_data = self.graph.node(node);
        if !node_data.is_active() {
            return;
        }
        let layer = node_data.layer();
        let has_source = match direction {
            Direction::Down => layer > 0,
            Direction::Up => layer < self.last_layer(),
        };
        if has_source {
            self.delta.record(direction, node, layer, pending);
        }
    }

    /// The combined state of `node`, if combined states are in use and known.
    fn combined_of(&self, node: NodeId) -> Option<&State> {
        (self.up_ready && self.spec.uses_combined())
            .then(|| self.graph.state(node, StateKind::Combined))
    }

    /// The up state of `node`, if it is known.
    fn up_of(&self, node: NodeId) -> Option<&State> {
        (self.up_ready || self.graph.node(node).layer() == self.last_layer())
            .then(|| self.graph.state(node, StateKind::Up))
    }

    fn arc_valid(&self, value: i32, parent: NodeId, child: NodeId) -> bool {
        self.spec.arc_exists(
            self.graph.node(parent).layer(),
            value,
            self.graph.state(parent, StateKind::Down),
            self.combined_of(parent),
            self.up_of(child),
            self.combined_of(child),
        )
    }

    fn node_valid(&self, node: NodeId) -> bool {
        if !self.up_ready || !self.spec.has_node_checks() {
            return true;
        }
        let node_data = self.graph.node(node);
        let input = self.spec.node_input(
            node_data.layer(),
            [
                node_data.state(StateKind::Down),
                node_data.state(StateKind::Up),
                node_data.state(StateKind::Combined),
            ],
            node_data.incoming().len(),
            node_data.outgoing().len(),
        );
        self.spec.node_exists(&input)
    }

    /// The state reached from `neighbour` over arcs labelled with `values` at arc layer `layer`;
    /// down transitions over a single value are memoised.
    fn transition_from(
        &mut self,
        direction: Direction,
        layer: usize,
        neighbour: NodeId,
        values: &ValueSet,
    ) -> State {
        let kind = direction.state_kind();
        let source = self.graph.state(neighbour, kind);
        let combined = (self.up_ready && self.spec.uses_combined())
            .then(|| self.graph.state(neighbour, StateKind::Combined));
        let single = if values.is_singleton() {
            values.min()
        } else {
            None
        };

        match (direction, single) {
            (Direction::Down, Some(value)) => self.cache.transition(
                layer,
                value,
                source,
                combined,
                &mut self.statistics,
                || self.spec.transition(kind, layer, source, combined, values),
            ),
            _ => self.spec.transition(kind, layer, source, combined, values),
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.graph
            .node(node)
            .outgoing()
            .iter()
            .map(|&arc| self.graph.arc(arc).child())
            .collect()
    }

    fn parents(&self, node: NodeId) -> Vec<NodeId> {
        self.graph
            .node(node)
            .incoming()
            .iter()
            .map(|&arc| self.graph.arc(arc).parent())
            .collect()
    }

    /// Removes the arcs of layer `layer` whose value is no longer in the domain of its variable.
    fn trim_layer(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        layer: usize,
    ) -> PropagationStatusCP {
        let variable = self.spec.variable(layer);
        for node in self.graph.layer(layer).to_vec() {
            for arc in self.graph.node(node).outgoing().to_vec() {
                if !self.graph.arc(arc).is_active() {
                    continue;
                }
                if !context.contains(variable, self.graph.arc(arc).value()) {
                    self.remove_arc(context, arc)?;
                }
            }
        }
        Ok(())
    }

    fn apply_trims(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatusCP {
        let mut layers = std::mem::take(&mut self.pending_trims);
        layers.sort_unstable();
        layers.dedup();
        for layer in layers {
            self.trim_layer(context, layer)?;
        }
        Ok(())
    }

    /// Removes every value without a supporting arc from the domain of its variable.
    fn trim_domains(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatusCP {
        for layer in 0..self.spec.num_variables() {
            let variable = self.spec.variable(layer);
            let unsupported: Vec<i32> = {
                let context: &PropagationContextMut<'_> = context;
                context
                    .iterate_domain(variable)
                    .filter(|&value| self.support(context, layer, value) == 0)
                    .collect()
            };
            for value in unsupported {
                context.remove(variable, value)?;
                self.statistics.num_values_removed += 1;
            }
        }
        Ok(())
    }
}
