use super::LocalId;
use super::PropagationContext;
use super::Propagator;
use super::PropagatorId;
use crate::engine::variables::DomainId;
use crate::engine::Assignments;
use crate::engine::DomainEvents;
use crate::engine::TrailedInteger;
use crate::engine::TrailedValues;
use crate::engine::WatchList;

/// A propagator constructor creates a fully initialized instance of a [`Propagator`].
///
/// The constructor is responsible for indicating on which events the propagator should be
/// enqueued. Additionally, the propagator can be initialized with values that come from the state
/// of the solver.
pub(crate) trait PropagatorConstructor {
    /// The propagator that is produced by this constructor.
    type PropagatorImpl: Propagator;

    /// Create the propagator instance from `Self`.
    fn create(self, context: PropagatorConstructorContext) -> Self::PropagatorImpl;
}

/// [`PropagatorConstructorContext`] is used when [`Propagator`]s are initialised after creation.
///
/// It represents a communication point between the solver and the [`Propagator`].
/// Propagators use the [`PropagatorConstructorContext`] to register to domain changes
/// of variables, to allocate reversible integers and to retrieve the current domains.
#[derive(Debug)]
pub(crate) struct PropagatorConstructorContext<'a> {
    watch_list: &'a mut WatchList,
    trailed_values: &'a mut TrailedValues,
    propagator_id: PropagatorId,
    assignments: &'a Assignments,
}

impl PropagatorConstructorContext<'_> {
    pub(crate) fn new<'a>(
        watch_list: &'a mut WatchList,
        trailed_values: &'a mut TrailedValues,
        propagator_id: PropagatorId,
        assignments: &'a Assignments,
    ) -> PropagatorConstructorContext<'a> {
        PropagatorConstructorContext {
            watch_list,
            trailed_values,
            propagator_id,
            assignments,
        }
    }

    pub(crate) fn as_readonly(&self) -> PropagationContext<'_> {
        PropagationContext::new(self.assignments)
    }

    pub(crate) fn propagator_id(&self) -> PropagatorId {
        self.propagator_id
    }

    /// Subscribes the propagator to the given [`DomainEvents`].
    ///
    /// The domain events determine when [`Propagator::notify()`] will be called on the propagator.
    /// The [`LocalId`] is internal information related to the propagator,
    /// which is used when calling [`Propagator::notify()`] to identify the variable.
    ///
    /// Each variable *must* have a unique [`LocalId`]. Most often this would be its index of the
    /// variable in the internal array of variables.
    pub(crate) fn register(
        &mut self,
        var: DomainId,
        domain_events: DomainEvents,
        local_id: LocalId,
    ) {
        self.watch_list.watch(
            var,
            self.propagator_id,
            local_id,
            domain_events.get_int_events(),
        );
    }

    /// Allocates a reversible integer which is restored when the solver backtracks.
    pub(crate) fn new_trailed_integer(&mut self, initial_value: i64) -> TrailedInteger {
        self.trailed_values.grow(initial_value)
    }
}
