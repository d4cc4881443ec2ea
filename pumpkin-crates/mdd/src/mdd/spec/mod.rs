//! The declarative description of the constraints sharing one decision diagram.
//!
//! Constraints register their properties, the transitions computing them, the relaxation used to
//! merge them and the predicates deciding whether arcs and nodes may exist. Calling
//! [`MddSpec::compile`] fixes the property layouts and builds the per-layer lookup tables used by
//! the engines.
mod compiled;
mod inputs;
mod relaxation;

use std::fmt::Debug;
use std::fmt::Formatter;
use std::ops::RangeInclusive;

pub(crate) use compiled::CompiledSpec;
use enum_map::EnumMap;
pub use inputs::*;
pub use relaxation::Relaxation;
use thiserror::Error;

use crate::containers::HashSet;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::engine::variables::DomainId;
use crate::mdd::state::BoolProperty;
use crate::mdd::state::IntProperty;
use crate::mdd::state::PropertyId;
use crate::mdd::state::PropertyKind;
use crate::mdd::state::SetProperty;
use crate::mdd::state::StateKind;
use crate::mdd::state::StateMut;
use crate::mdd::state::StateRef;
use crate::mdd::state::ValueSet;
use crate::mdd::state::WindowProperty;

pub(crate) type TransitionFn = Box<dyn Fn(&mut StateMut<'_>, &TransitionInput<'_>, &ValueSet)>;
pub(crate) type CombineFn = Box<dyn Fn(&mut StateMut<'_>, StateRef<'_>, StateRef<'_>)>;
pub(crate) type ArcCheckFn = Box<dyn Fn(&ArcInput<'_>) -> bool>;
pub(crate) type NodeCheckFn = Box<dyn Fn(&NodeInput<'_>) -> bool>;
pub(crate) type SimilarityFn = Box<dyn Fn(StateRef<'_>, StateRef<'_>) -> f64>;
pub(crate) type SplitPriorityFn = Box<dyn Fn(&NodeInput<'_>) -> i64>;
pub(crate) type CandidatePriorityFn = Box<dyn Fn(&CandidateInput<'_>) -> i64>;
pub(crate) type EquivalenceKeyFn = Box<dyn Fn(StateRef<'_>) -> i64>;

/// Errors detected when compiling an [`MddSpec`].
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MddSpecError {
    #[error("The specification does not contain any variables")]
    NoVariables,
    #[error("Constraint '{0}' has an empty scope")]
    EmptyScope(&'static str),
    #[error("Constraint '{0}' contains the same variable more than once")]
    DuplicateVariable(&'static str),
    #[error("A property of constraint '{0}' has an empty or too wide range")]
    InvalidRange(&'static str),
    #[error("A property of constraint '{0}' uses a relaxation which does not fit its kind")]
    IncompatibleRelaxation(&'static str),
    #[error("A rule of constraint '{0}' refers to a property which it cannot read")]
    InvalidAntecedent(&'static str),
    #[error("A property handle does not belong to this specification")]
    UnknownProperty,
}

/// Identifies a constraint registered in an [`MddSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(u32);

impl StorageKey for ConstraintId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        ConstraintId(index as u32)
    }
}

/// The scope of one constraint together with the properties it owns.
#[derive(Debug, Clone)]
pub(crate) struct ConstraintDescriptor {
    pub(crate) name: &'static str,
    pub(crate) scope: Vec<DomainId>,
    pub(crate) properties: Vec<PropertyId>,
}

#[derive(Debug, Clone)]
pub(crate) enum InitialValue {
    Bool(bool),
    Int(i32),
    EmptySet,
    Window(i32),
}

pub(crate) enum PropertyRule {
    /// The property keeps its value along arcs; constants and properties without a transition.
    Frame,
    Transition {
        reads: Vec<PropertyId>,
        function: TransitionFn,
    },
    Combine {
        reads: Vec<PropertyId>,
        function: CombineFn,
    },
}

pub(crate) struct PropertyDefinition {
    pub(crate) constraint: ConstraintId,
    pub(crate) kind: PropertyKind,
    pub(crate) initial: InitialValue,
    pub(crate) relaxation: Relaxation,
    pub(crate) rule: PropertyRule,
    pub(crate) similarity: Option<SimilarityFn>,
}

/// The registry of properties, transitions, predicates and heuristics for the constraints of one
/// decision diagram.
///
/// The variables of the diagram are the union of the constraint scopes, ordered by first
/// appearance; layer `i` of the diagram branches on the `i`-th variable.
#[derive(Default)]
pub struct MddSpec {
    pub(crate) variables: Vec<DomainId>,
    pub(crate) constraints: KeyedVec<ConstraintId, ConstraintDescriptor>,
    pub(crate) properties: EnumMap<StateKind, Vec<PropertyDefinition>>,
    pub(crate) arc_checks: Vec<(ConstraintId, ArcCheckFn)>,
    pub(crate) node_checks: Vec<(ConstraintId, NodeCheckFn)>,
    pub(crate) split_priorities: Vec<SplitPriorityFn>,
    pub(crate) candidate_priorities: Vec<CandidatePriorityFn>,
    pub(crate) equivalence_keys: Vec<EquivalenceKeyFn>,
    invalid_handles: bool,
}

impl Debug for MddSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MddSpec")
            .field("variables", &self.variables)
            .field("constraints", &self.constraints.iter().collect::<Vec<_>>())
            .field("num_down", &self.properties[StateKind::Down].len())
            .field("num_up", &self.properties[StateKind::Up].len())
            .field("num_combined", &self.properties[StateKind::Combined].len())
            .field("num_arc_checks", &self.arc_checks.len())
            .field("num_node_checks", &self.node_checks.len())
            .finish()
    }
}

impl MddSpec {
    pub fn new() -> MddSpec {
        MddSpec::default()
    }

    /// The variables of the diagram in layer order.
    pub fn variables(&self) -> &[DomainId] {
        &self.variables
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Registers a constraint over `scope`; variables which were not seen before are appended to
    /// the layer order.
    pub fn constraint(&mut self, name: &'static str, scope: &[DomainId]) -> ConstraintId {
        for variable in scope {
            if !self.variables.contains(variable) {
                self.variables.push(*variable);
            }
        }
        self.constraints.push(ConstraintDescriptor {
            name,
            scope: scope.to_vec(),
            properties: Vec::new(),
        })
    }

    fn add_property(
        &mut self,
        constraint: ConstraintId,
        state: StateKind,
        kind: PropertyKind,
        initial: InitialValue,
        relaxation: Relaxation,
    ) -> PropertyId {
        let id = PropertyId {
            kind: state,
            index: self.properties[state].len() as u32,
        };
        self.properties[state].push(PropertyDefinition {
            constraint,
            kind,
            initial,
            relaxation,
            rule: PropertyRule::Frame,
            similarity: None,
        });
        self.constraints[constraint].properties.push(id);
        id
    }

    pub fn bool_property(
        &mut self,
        constraint: ConstraintId,
        state: StateKind,
        initial: bool,
        relaxation: Relaxation,
    ) -> BoolProperty {
        BoolProperty(self.add_property(
            constraint,
            state,
            PropertyKind::Bool,
            InitialValue::Bool(initial),
            relaxation,
        ))
    }

    pub fn int_property(
        &mut self,
        constraint: ConstraintId,
        state: StateKind,
        initial: i32,
        range: RangeInclusive<i32>,
        relaxation: Relaxation,
    ) -> IntProperty {
        IntProperty(self.add_property(
            constraint,
            state,
            PropertyKind::Int {
                lower: *range.start(),
                upper: *range.end(),
            },
            InitialValue::Int(initial),
            relaxation,
        ))
    }

    /// Registers a set over `0..universe`, initially empty.
    pub fn set_property(
        &mut self,
        constraint: ConstraintId,
        state: StateKind,
        universe: u32,
        relaxation: Relaxation,
    ) -> SetProperty {
        SetProperty(self.add_property(
            constraint,
            state,
            PropertyKind::Set { universe },
            InitialValue::EmptySet,
            relaxation,
        ))
    }

    /// Registers a window of `length` integers which all start at `initial`.
    pub fn window_property(
        &mut self,
        constraint: ConstraintId,
        state: StateKind,
        length: u32,
        initial: i32,
        range: RangeInclusive<i32>,
        relaxation: Relaxation,
    ) -> WindowProperty {
        WindowProperty(self.add_property(
            constraint,
            state,
            PropertyKind::Window {
                length,
                lower: *range.start(),
                upper: *range.end(),
            },
            InitialValue::Window(initial),
            relaxation,
        ))
    }

    fn definition_mut(&mut self, property: PropertyId) -> Option<&mut PropertyDefinition> {
        self.properties[property.kind].get_mut(property.index())
    }

    /// Sets the transition of a down or up property.
    ///
    /// `reads` lists the properties the transition reads besides the property itself: properties
    /// of the same direction of the node the transition starts from, or combined properties of
    /// that node. Only these are used to decide when the transition is re-run incrementally.
    pub fn transition(
        &mut self,
        property: impl Into<PropertyId>,
        reads: &[PropertyId],
        function: impl Fn(&mut StateMut<'_>, &TransitionInput<'_>, &ValueSet) + 'static,
    ) {
        let property = property.into();
        let rule = PropertyRule::Transition {
            reads: reads.to_vec(),
            function: Box::new(function),
        };
        match self.definition_mut(property) {
            Some(definition) => definition.rule = rule,
            None => self.invalid_handles = true,
        }
    }

    /// Sets how a combined property is computed from the down and up state of a node. The
    /// function receives the down state and then the up state.
    pub fn combine(
        &mut self,
        property: impl Into<PropertyId>,
        reads: &[PropertyId],
        function: impl Fn(&mut StateMut<'_>, StateRef<'_>, StateRef<'_>) + 'static,
    ) {
        let property = property.into();
        let rule = PropertyRule::Combine {
            reads: reads.to_vec(),
            function: Box::new(function),
        };
        match self.definition_mut(property) {
            Some(definition) => definition.rule = rule,
            None => self.invalid_handles = true,
        }
    }

    /// Overrides the distance used when deciding which states are cheap to merge.
    pub fn similarity(
        &mut self,
        property: impl Into<PropertyId>,
        function: impl Fn(StateRef<'_>, StateRef<'_>) -> f64 + 'static,
    ) {
        match self.definition_mut(property.into()) {
            Some(definition) => definition.similarity = Some(Box::new(function)),
            None => self.invalid_handles = true,
        }
    }

    /// Replaces the relaxation of a property; a [`Relaxation::Custom`] closure usually needs the
    /// handle of the property it merges, which only exists once the property is registered.
    pub fn relaxation(&mut self, property: impl Into<PropertyId>, relaxation: Relaxation) {
        match self.definition_mut(property.into()) {
            Some(definition) => definition.relaxation = relaxation,
            None => self.invalid_handles = true,
        }
    }

    /// Registers an arc-existence predicate; it is only evaluated at layers whose variable is in
    /// the scope of `constraint`.
    pub fn arc_check(
        &mut self,
        constraint: ConstraintId,
        function: impl Fn(&ArcInput<'_>) -> bool + 'static,
    ) {
        self.arc_checks.push((constraint, Box::new(function)));
    }

    /// Registers a node-existence predicate, evaluated on every node whose down and up states
    /// are known.
    pub fn node_check(
        &mut self,
        constraint: ConstraintId,
        function: impl Fn(&NodeInput<'_>) -> bool + 'static,
    ) {
        self.node_checks.push((constraint, Box::new(function)));
    }

    /// Contributes to the priority with which relaxed nodes are selected for splitting.
    pub fn split_priority(&mut self, function: impl Fn(&NodeInput<'_>) -> i64 + 'static) {
        self.split_priorities.push(Box::new(function));
    }

    /// Contributes to the order in which split candidates are materialised.
    pub fn candidate_priority(&mut self, function: impl Fn(&CandidateInput<'_>) -> i64 + 'static) {
        self.candidate_priorities.push(Box::new(function));
    }

    /// Contributes to the coarse key by which incoming arcs are grouped when splitting by
    /// equivalence class.
    pub fn equivalence_key(&mut self, function: impl Fn(StateRef<'_>) -> i64 + 'static) {
        self.equivalence_keys.push(Box::new(function));
    }

    /// Validates the registrations, fixes the property layouts and builds the lookup tables.
    pub(crate) fn compile(self) -> Result<CompiledSpec, MddSpecError> {
        self.validate()?;
        Ok(CompiledSpec::new(self))
    }

    fn validate(&self) -> Result<(), MddSpecError> {
        if self.invalid_handles {
            return Err(MddSpecError::UnknownProperty);
        }
        if self.variables.is_empty() {
            return Err(MddSpecError::NoVariables);
        }

        for descriptor in self.constraints.iter() {
            if descriptor.scope.is_empty() {
                return Err(MddSpecError::EmptyScope(descriptor.name));
            }
            let unique = descriptor.scope.iter().collect::<HashSet<_>>();
            if unique.len() != descriptor.scope.len() {
                return Err(MddSpecError::DuplicateVariable(descriptor.name));
            }
        }

        for (state, definitions) in self.properties.iter() {
            for definition in definitions {
                let name = self.constraints[definition.constraint].name;

                let valid_range = match definition.kind {
                    PropertyKind::Int { lower, upper } => {
                        lower <= upper && (upper as i64 - lower as i64) < u32::MAX as i64
                    }
                    PropertyKind::Window {
                        length,
                        lower,
                        upper,
                    } => {
                        length > 0
                            && lower <= upper
                            && (upper as i64 - lower as i64) < u32::MAX as i64
                    }
                    PropertyKind::Bool | PropertyKind::Set { .. } => true,
                };
                if !valid_range {
                    return Err(MddSpecError::InvalidRange(name));
                }

                if !definition.relaxation.supports(definition.kind) {
                    return Err(MddSpecError::IncompatibleRelaxation(name));
                }

                let readable = |antecedent: &PropertyId| {
                    let allowed = match definition.rule {
                        PropertyRule::Frame => true,
                        PropertyRule::Transition { .. } => {
                            antecedent.kind == state || antecedent.kind == StateKind::Combined
                        }
                        PropertyRule::Combine { .. } => antecedent.kind != StateKind::Combined,
                    };
                    allowed && antecedent.index() < self.properties[antecedent.kind].len()
                };
                let reads = match &definition.rule {
                    PropertyRule::Frame => &[][..],
                    PropertyRule::Transition { reads, .. }
                    | PropertyRule::Combine { reads, .. } => reads,
                };
                if !reads.iter().all(readable) {
                    return Err(MddSpecError::InvalidAntecedent(name));
                }
                let misplaced_rule = match definition.rule {
                    PropertyRule::Frame => false,
                    PropertyRule::Transition { .. } => state == StateKind::Combined,
                    PropertyRule::Combine { .. } => state != StateKind::Combined,
                };
                if misplaced_rule {
                    return Err(MddSpecError::InvalidAntecedent(name));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_are_ordered_by_first_appearance() {
        let mut spec = MddSpec::new();
        let _ = spec.constraint("a", &[DomainId::new(3), DomainId::new(1)]);
        let _ = spec.constraint("b", &[DomainId::new(1), DomainId::new(0)]);

        assert_eq!(
            &[DomainId::new(3), DomainId::new(1), DomainId::new(0)],
            spec.variables()
        );
    }

    #[test]
    fn empty_specification_is_rejected() {
        let spec = MddSpec::new();
        assert_eq!(Some(MddSpecError::NoVariables), spec.compile().err());
    }

    #[test]
    fn duplicate_scope_is_rejected() {
        let mut spec = MddSpec::new();
        let _ = spec.constraint("dup", &[DomainId::new(0), DomainId::new(0)]);

        assert_eq!(
            Some(MddSpecError::DuplicateVariable("dup")),
            spec.compile().err()
        );
    }

    #[test]
    fn set_relaxation_on_integer_is_rejected() {
        let mut spec = MddSpec::new();
        let c = spec.constraint("c", &[DomainId::new(0)]);
        let _ = spec.int_property(c, StateKind::Down, 0, 0..=3, Relaxation::Union);

        assert_eq!(
            Some(MddSpecError::IncompatibleRelaxation("c")),
            spec.compile().err()
        );
    }

    #[test]
    fn down_transition_may_not_read_up_properties() {
        let mut spec = MddSpec::new();
        let c = spec.constraint("c", &[DomainId::new(0)]);
        let down = spec.int_property(c, StateKind::Down, 0, 0..=3, Relaxation::Min);
        let up = spec.int_property(c, StateKind::Up, 0, 0..=3, Relaxation::Min);
        spec.transition(down, &[up.id()], |_, _, _| {});

        assert_eq!(
            Some(MddSpecError::InvalidAntecedent("c")),
            spec.compile().err()
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut spec = MddSpec::new();
        let c = spec.constraint("c", &[DomainId::new(0)]);
        let _ = spec.int_property(c, StateKind::Down, 0, 3..=1, Relaxation::Min);

        assert_eq!(Some(MddSpecError::InvalidRange("c")), spec.compile().err());
    }
}
