use std::fmt::Debug;
use std::fmt::Formatter;

use enum_map::EnumMap;

use super::ArcCheckFn;
use super::ArcInput;
use super::CandidateInput;
use super::CandidatePriorityFn;
use super::ConstraintId;
use super::EquivalenceKeyFn;
use super::InitialValue;
use super::MddSpec;
use super::NodeCheckFn;
use super::NodeInput;
use super::PropertyDefinition;
use super::PropertyRule;
use super::Relaxation;
use super::SplitPriorityFn;
use super::TransitionInput;
use crate::containers::HashMap;
use crate::engine::variables::DomainId;
use crate::mdd::state::BoolProperty;
use crate::mdd::state::ChangeSet;
use crate::mdd::state::IntProperty;
use crate::mdd::state::PropertyId;
use crate::mdd::state::PropertyLayout;
use crate::mdd::state::SetProperty;
use crate::mdd::state::State;
use crate::mdd::state::StateKind;
use crate::mdd::state::ValueSet;
use crate::mdd::state::WindowProperty;

/// The rules which apply at one layer.
#[derive(Debug, Default)]
struct LayerRules {
    /// Per direction, the properties whose transition runs at this layer; all other properties of
    /// that direction are copied from the node the transition starts from.
    transitions: EnumMap<StateKind, ChangeSet>,
    /// The arc-existence predicates whose constraint contains the variable of this layer.
    arc_checks: Vec<usize>,
}

/// An [`MddSpec`] after compilation: fixed layouts, initial states and per-layer lookup tables.
pub(crate) struct CompiledSpec {
    variables: Vec<DomainId>,
    layouts: EnumMap<StateKind, PropertyLayout>,
    initial: EnumMap<StateKind, State>,
    properties: EnumMap<StateKind, Vec<PropertyDefinition>>,
    /// For every property, the properties of each kind whose rule reads it.
    outputs: EnumMap<StateKind, Vec<EnumMap<StateKind, ChangeSet>>>,
    all_properties: EnumMap<StateKind, ChangeSet>,
    layers: Vec<LayerRules>,
    arc_checks: Vec<ArcCheckFn>,
    node_checks: Vec<NodeCheckFn>,
    split_priorities: Vec<SplitPriorityFn>,
    candidate_priorities: Vec<CandidatePriorityFn>,
    equivalence_keys: Vec<EquivalenceKeyFn>,
    reboot_distances: Vec<usize>,
    uses_up: bool,
}

impl Debug for CompiledSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSpec")
            .field("variables", &self.variables)
            .field("layouts", &self.layouts)
            .field("reboot_distances", &self.reboot_distances)
            .field("uses_up", &self.uses_up)
            .finish()
    }
}

impl CompiledSpec {
    pub(super) fn new(spec: MddSpec) -> CompiledSpec {
        let MddSpec {
            variables,
            constraints,
            properties,
            arc_checks,
            node_checks,
            split_priorities,
            candidate_priorities,
            equivalence_keys,
            ..
        } = spec;

        let layer_of: HashMap<DomainId, usize> = variables
            .iter()
            .enumerate()
            .map(|(layer, variable)| (*variable, layer))
            .collect();
        let num_layers = variables.len();

        let layouts = EnumMap::from_fn(|kind: StateKind| {
            PropertyLayout::layout(properties[kind].iter().map(|definition| definition.kind))
        });

        let initial = EnumMap::from_fn(|kind: StateKind| {
            let layout = &layouts[kind];
            let mut state = layout.zeroed_state();
            {
                let mut view = state.view_mut(layout);
                for (index, definition) in properties[kind].iter().enumerate() {
                    let id = PropertyId {
                        kind,
                        index: index as u32,
                    };
                    match definition.initial {
                        InitialValue::Bool(value) => view.set_bool(BoolProperty(id), value),
                        InitialValue::Int(value) => view.set_int(IntProperty(id), value),
                        InitialValue::EmptySet => view.set_mut(SetProperty(id)).clear(),
                        InitialValue::Window(value) => {
                            for element in 0..view.window(WindowProperty(id)).len() {
                                view.set_window(WindowProperty(id), element, value);
                            }
                        }
                    }
                }
            }
            state.rehash();
            state
        });

        let mut outputs: EnumMap<StateKind, Vec<EnumMap<StateKind, ChangeSet>>> =
            EnumMap::from_fn(|kind: StateKind| {
                (0..properties[kind].len())
                    .map(|_| EnumMap::default())
                    .collect()
            });
        for (kind, definitions) in properties.iter() {
            for (index, definition) in definitions.iter().enumerate() {
                let reads = match &definition.rule {
                    PropertyRule::Frame => continue,
                    PropertyRule::Transition { reads, .. } => {
                        let _ = outputs[kind][index][kind].insert(index);
                        reads
                    }
                    PropertyRule::Combine { reads, .. } => reads,
                };
                for antecedent in reads {
                    let _ = outputs[antecedent.kind][antecedent.index()][kind].insert(index);
                }
            }
        }

        let all_properties =
            EnumMap::from_fn(|kind: StateKind| ChangeSet::full(properties[kind].len()));

        let mut layers: Vec<LayerRules> = (0..num_layers).map(|_| LayerRules::default()).collect();
        let scope_layers = |constraint: ConstraintId| -> Vec<usize> {
            constraints[constraint]
                .scope
                .iter()
                .map(|variable| layer_of[variable])
                .collect()
        };
        for kind in [StateKind::Down, StateKind::Up] {
            for (index, definition) in properties[kind].iter().enumerate() {
                if !matches!(definition.rule, PropertyRule::Transition { .. }) {
                    continue;
                }
                for layer in scope_layers(definition.constraint) {
                    let _ = layers[layer].transitions[kind].insert(index);
                }
            }
        }
        let mut checks = Vec::with_capacity(arc_checks.len());
        for (index, (constraint, check)) in arc_checks.into_iter().enumerate() {
            for layer in scope_layers(constraint) {
                layers[layer].arc_checks.push(index);
            }
            checks.push(check);
        }

        // A constraint covering a small part of the diagram is allowed to push the refinement
        // back to the first layer of its scope.
        let mut reboot_distances = vec![0; num_layers];
        for descriptor in constraints.iter() {
            if descriptor.scope.len() >= num_layers / 2 {
                continue;
            }
            let scope: Vec<usize> = descriptor
                .scope
                .iter()
                .map(|variable| layer_of[variable])
                .collect();
            let Some(first) = scope.iter().min().copied() else {
                continue;
            };
            for layer in scope {
                reboot_distances[layer] = reboot_distances[layer].max(layer - first);
            }
        }

        let uses_up = properties[StateKind::Up]
            .iter()
            .any(|definition| matches!(definition.rule, PropertyRule::Transition { .. }));

        CompiledSpec {
            variables,
            layouts,
            initial,
            properties,
            outputs,
            all_properties,
            layers,
            arc_checks: checks,
            node_checks: node_checks.into_iter().map(|(_, check)| check).collect(),
            split_priorities,
            candidate_priorities,
            equivalence_keys,
            reboot_distances,
            uses_up,
        }
    }

    /// The number of variables; the diagram has one more node layer than this.
    pub(crate) fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub(crate) fn variable(&self, layer: usize) -> DomainId {
        self.variables[layer]
    }

    pub(crate) fn variables(&self) -> &[DomainId] {
        &self.variables
    }

    pub(crate) fn layout(&self, kind: StateKind) -> &PropertyLayout {
        &self.layouts[kind]
    }

    /// The state of the root (down), the sink (up) or a node without known neighbours
    /// (combined).
    pub(crate) fn initial_state(&self, kind: StateKind) -> &State {
        &self.initial[kind]
    }

    pub(crate) fn all_properties(&self, kind: StateKind) -> &ChangeSet {
        &self.all_properties[kind]
    }

    /// Whether any registered property is computed bottom-up.
    pub(crate) fn uses_up(&self) -> bool {
        self.uses_up
    }

    pub(crate) fn uses_combined(&self) -> bool {
        !self.properties[StateKind::Combined].is_empty()
    }

    pub(crate) fn has_node_checks(&self) -> bool {
        !self.node_checks.is_empty()
    }

    pub(crate) fn has_equivalence_keys(&self) -> bool {
        !self.equivalence_keys.is_empty()
    }

    pub(crate) fn reboot_distance(&self, layer: usize) -> usize {
        self.reboot_distances.get(layer).copied().unwrap_or(0)
    }

    /// Computes the properties in `properties` of the state reached by following arcs labelled
    /// with `values` at `layer` from `source`, writing them into `target`.
    ///
    /// For down transitions `source` is the down state of the parent, for up transitions it is the
    /// up state of the child. Properties without a transition at this layer are copied.
    #[allow(clippy::too_many_arguments, reason = "every argument is a distinct input")]
    pub(crate) fn transition_into(
        &self,
        direction: StateKind,
        layer: usize,
        target: &mut State,
        source: &State,
        combined: Option<&State>,
        values: &ValueSet,
        properties: &ChangeSet,
    ) {
        let layout = &self.layouts[direction];
        let input = TransitionInput {
            state: source.view(layout),
            combined: combined.map(|combined| combined.view(&self.layouts[StateKind::Combined])),
            layer,
            variable: self.variables[layer],
        };
        let active = &self.layers[layer].transitions[direction];

        for index in properties.iter() {
            if !active.contains(index) {
                layout.copy_property(index, target, source);
                continue;
            }
            if let PropertyRule::Transition { function, .. } =
                &self.properties[direction][index].rule
            {
                function(&mut target.view_mut(layout), &input, values);
            }
        }
    }

    /// The complete state reached from `source` over arcs labelled with `values`.
    pub(crate) fn transition(
        &self,
        direction: StateKind,
        layer: usize,
        source: &State,
        combined: Option<&State>,
        values: &ValueSet,
    ) -> State {
        let mut target = source.clone();
        let active = &self.layers[layer].transitions[direction];
        self.transition_into(direction, layer, &mut target, source, combined, values, active);
        target.set_relaxed(source.is_relaxed() || values.len() > 1);
        target.rehash();
        target
    }

    /// Merges the properties in `properties` of `other` into `target` with their relaxation.
    /// The caller is responsible for the relaxed flag and the hash.
    pub(crate) fn relax_into(
        &self,
        kind: StateKind,
        target: &mut State,
        other: &State,
        properties: &ChangeSet,
    ) {
        let layout = &self.layouts[kind];
        for index in properties.iter() {
            match &self.properties[kind][index].relaxation {
                Relaxation::Min => layout.merge_elements(index, target, other, false),
                Relaxation::Max => layout.merge_elements(index, target, other, true),
                Relaxation::Union => layout.merge_sets(index, target, other, true),
                Relaxation::Intersection => layout.merge_sets(index, target, other, false),
                Relaxation::Custom(relax) => {
                    relax(&mut target.view_mut(layout), other.view(layout))
                }
            }
        }
    }

    /// Recomputes the combined properties in `properties` of a node from its down and up state.
    pub(crate) fn combine_into(
        &self,
        target: &mut State,
        down: &State,
        up: &State,
        properties: &ChangeSet,
    ) {
        let layout = &self.layouts[StateKind::Combined];
        let down = down.view(&self.layouts[StateKind::Down]);
        let up = up.view(&self.layouts[StateKind::Up]);
        for index in properties.iter() {
            if let PropertyRule::Combine { function, .. } =
                &self.properties[StateKind::Combined][index].rule
            {
                function(&mut target.view_mut(layout), down, up);
            }
        }
    }

    pub(crate) fn combined_state(&self, down: &State, up: &State) -> State {
        let mut combined = self.initial[StateKind::Combined].clone();
        self.combine_into(
            &mut combined,
            down,
            up,
            &self.all_properties[StateKind::Combined],
        );
        combined.rehash();
        combined
    }

    /// The properties of `direction` which have to be recomputed at `layer` when the properties
    /// `changed` of the source state and `changed_combined` of its combined state changed.
    pub(crate) fn affected(
        &self,
        direction: StateKind,
        layer: usize,
        changed: &ChangeSet,
        changed_combined: &ChangeSet,
    ) -> ChangeSet {
        let active = &self.layers[layer].transitions[direction];
        let mut affected = ChangeSet::default();
        for index in changed.iter() {
            if !active.contains(index) {
                let _ = affected.insert(index);
            }
            for output in self.outputs[direction][index][direction].iter() {
                if active.contains(output) {
                    let _ = affected.insert(output);
                }
            }
        }
        for index in changed_combined.iter() {
            for output in self.outputs[StateKind::Combined][index][direction].iter() {
                if active.contains(output) {
                    let _ = affected.insert(output);
                }
            }
        }
        affected
    }

    /// The combined properties to recompute when the given down and up properties changed.
    pub(crate) fn affected_combined(
        &self,
        changed_down: &ChangeSet,
        changed_up: &ChangeSet,
    ) -> ChangeSet {
        let mut affected = ChangeSet::default();
        for index in changed_down.iter() {
            affected.union_with(&self.outputs[StateKind::Down][index][StateKind::Combined]);
        }
        for index in changed_up.iter() {
            affected.union_with(&self.outputs[StateKind::Up][index][StateKind::Combined]);
        }
        affected
    }

    /// Evaluates the arc-existence predicates of the constraints whose scope contains the variable
    /// of `layer`. Combined and up states are passed when they are known.
    pub(crate) fn arc_exists(
        &self,
        layer: usize,
        value: i32,
        parent_down: &State,
        parent_combined: Option<&State>,
        child_up: Option<&State>,
        child_combined: Option<&State>,
    ) -> bool {
        let checks = &self.layers[layer].arc_checks;
        if checks.is_empty() {
            return true;
        }
        let combined_layout = &self.layouts[StateKind::Combined];
        let input = ArcInput {
            parent_down: parent_down.view(&self.layouts[StateKind::Down]),
            parent_combined: parent_combined.map(|combined| combined.view(combined_layout)),
            child_up: child_up.map(|up| up.view(&self.layouts[StateKind::Up])),
            child_combined: child_combined.map(|combined| combined.view(combined_layout)),
            layer,
            value,
        };
        checks.iter().all(|&check| (self.arc_checks[check])(&input))
    }

    /// Builds the view of a node handed to node predicates and split priorities.
    pub(crate) fn node_input<'a>(
        &'a self,
        layer: usize,
        states: [&'a State; 3],
        num_parents: usize,
        num_children: usize,
    ) -> NodeInput<'a> {
        let [down, up, combined] = states;
        NodeInput {
            down: down.view(&self.layouts[StateKind::Down]),
            up: up.view(&self.layouts[StateKind::Up]),
            combined: combined.view(&self.layouts[StateKind::Combined]),
            layer,
            num_parents,
            num_children,
        }
    }

    pub(crate) fn node_exists(&self, node: &NodeInput<'_>) -> bool {
        self.node_checks.iter().all(|check| check(node))
    }

    pub(crate) fn split_priority(&self, node: &NodeInput<'_>) -> i64 {
        self.split_priorities
            .iter()
            .map(|priority| priority(node))
            .sum()
    }

    pub(crate) fn candidate_priority(&self, down: &State, num_arcs: usize, layer: usize) -> i64 {
        let input = CandidateInput {
            down: down.view(&self.layouts[StateKind::Down]),
            num_arcs,
            layer,
        };
        self.candidate_priorities
            .iter()
            .map(|priority| priority(&input))
            .sum()
    }

    /// The coarse key of a down state used to group split candidates.
    pub(crate) fn equivalence_key(&self, down: &State) -> Vec<i64> {
        let view = down.view(&self.layouts[StateKind::Down]);
        self.equivalence_keys.iter().map(|key| key(view)).collect()
    }

    /// The distance between two states of the same kind; smaller means cheaper to merge.
    pub(crate) fn distance(&self, kind: StateKind, a: &State, b: &State) -> f64 {
        let layout = &self.layouts[kind];
        self.properties[kind]
            .iter()
            .enumerate()
            .map(|(index, definition)| match &definition.similarity {
                Some(similarity) => similarity(a.view(layout), b.view(layout)),
                None => layout.distance(index, a, b),
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdd::spec::MddSpec;
    use crate::mdd::state::ChangeSet;

    fn counting_spec() -> (CompiledSpec, IntProperty, IntProperty) {
        let variables: Vec<DomainId> = (0..6).map(DomainId::new).collect();
        let mut spec = MddSpec::new();
        let everything = spec.constraint("count", &variables);
        let count = spec.int_property(everything, StateKind::Down, 0, 0..=6, Relaxation::Min);
        spec.transition(count, &[], move |out, input, values| {
            let previous = input.state.int(count);
            out.set_int(count, previous + values.count_where(|v| v == 1).min(1) as i32);
        });

        let tail = spec.constraint("tail", &variables[4..]);
        let seen = spec.int_property(tail, StateKind::Down, 0, 0..=2, Relaxation::Max);
        spec.transition(seen, &[count.id()], move |out, input, _| {
            out.set_int(seen, input.state.int(seen) + 1);
        });

        (spec.compile().expect("valid"), count, seen)
    }

    #[test]
    fn properties_outside_of_their_scope_are_copied() {
        let (compiled, count, seen) = counting_spec();
        let layout = compiled.layout(StateKind::Down);
        let root = compiled.initial_state(StateKind::Down).clone();

        let child = compiled.transition(StateKind::Down, 0, &root, None, &ValueSet::singleton(1));
        assert_eq!(1, child.view(layout).int(count));
        assert_eq!(0, child.view(layout).int(seen));

        let child = compiled.transition(StateKind::Down, 4, &child, None, &ValueSet::singleton(0));
        assert_eq!(1, child.view(layout).int(count));
        assert_eq!(1, child.view(layout).int(seen));
    }

    #[test]
    fn changes_are_mapped_to_the_transitions_reading_them() {
        let (compiled, count, seen) = counting_spec();
        let changed: ChangeSet = [count.id().index()].into_iter().collect();

        let inside = compiled.affected(StateKind::Down, 4, &changed, &ChangeSet::default());
        assert!(inside.contains(count.id().index()));
        assert!(inside.contains(seen.id().index()));

        let outside = compiled.affected(StateKind::Down, 1, &changed, &ChangeSet::default());
        assert!(outside.contains(count.id().index()));
        assert!(!outside.contains(seen.id().index()));
    }

    #[test]
    fn short_constraints_define_the_reboot_distance() {
        let (compiled, _, _) = counting_spec();

        assert_eq!(0, compiled.reboot_distance(3));
        assert_eq!(0, compiled.reboot_distance(4));
        assert_eq!(1, compiled.reboot_distance(5));
    }

    #[test]
    fn relaxation_keeps_the_weakest_value() {
        let (compiled, count, _) = counting_spec();
        let layout = compiled.layout(StateKind::Down);
        let root = compiled.initial_state(StateKind::Down).clone();
        let one = compiled.transition(StateKind::Down, 0, &root, None, &ValueSet::singleton(1));

        let mut merged = one.clone();
        compiled.relax_into(
            StateKind::Down,
            &mut merged,
            &root,
            compiled.all_properties(StateKind::Down),
        );
        assert_eq!(0, merged.view(layout).int(count));
    }
}
