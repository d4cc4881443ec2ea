use downcast_rs::impl_downcast;
use downcast_rs::Downcast;

use super::LocalId;
use super::PropagationContext;
use super::PropagationContextMut;
#[cfg(doc)]
use super::ReadDomains;
#[cfg(doc)]
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatusCP;
#[cfg(doc)]
use crate::create_statistics_struct;
use crate::engine::IntDomainEvent;
use crate::statistics::StatisticLogger;

// We need to use this to cast from `Box<dyn Propagator>` to the concrete propagator (e.g. to
// inspect the diagram of an `MddPropagator`); rust inherently does not allow downcasting from the
// trait definition to its concrete type.
impl_downcast!(Propagator);

/// All propagators implement the [`Propagator`] trait, which defines the main propagator logic with
/// regards to propagation and detecting conflicts.
///
/// The only required functions are [`Propagator::name`] and [`Propagator::propagate`]; all other
/// functions have default implementations.
pub(crate) trait Propagator: Downcast {
    /// Return the name of the propagator, this is a convenience method that is used for printing.
    fn name(&self) -> &str;

    /// Propagate method that will be called whenever the propagator is enqueued.
    ///
    /// This method extends the current partial assignments with inferred domain changes found by
    /// the [`Propagator`]. In case no conflict has been detected it should return
    /// [`Result::Ok`], otherwise it should return a [`Result::Err`] with an [`Inconsistency`];
    /// either because a propagation caused an empty domain ([`Inconsistency::EmptyDomain`]) or
    /// because the logic of the propagator found the current state to be inconsistent
    /// ([`Inconsistency::Conflict`]).
    ///
    /// Propagators are not required to propagate until a fixed point. It will be called
    /// again by the solver until no further propagations happen.
    fn propagate(&mut self, context: PropagationContextMut) -> PropagationStatusCP;

    /// Called when an event happens to one of the variables the propagator is subscribed to. It
    /// indicates whether the provided event should cause the propagator to be enqueued.
    ///
    /// This can be used to incrementally maintain data structures or perform propagations, and
    /// should only be used for computationally cheap logic. Expensive computation should be
    /// performed in the [`Propagator::propagate()`] method.
    ///
    /// By default the propagator is always enqueued for every event.
    fn notify(
        &mut self,
        _context: PropagationContext,
        _local_id: LocalId,
        _event: IntDomainEvent,
    ) -> EnqueueDecision {
        EnqueueDecision::Enqueue
    }

    /// Called each time the solver backtracks, the propagator can then update its internal data
    /// structures given the new variable domains. The checkpoint the solver backtracked to is
    /// available through [`ReadDomains::get_checkpoint`].
    ///
    /// By default this function does nothing.
    fn synchronise(&mut self, _context: PropagationContext) {}

    /// Returns the priority of the propagator; the solver propagates propagators with a higher
    /// priority first.
    fn priority(&self) -> Priority {
        Priority::Low
    }

    /// Logs statistics of the propagator using the provided [`StatisticLogger`].
    ///
    /// It is recommended to create a struct through the [`create_statistics_struct!`] macro!
    fn log_statistics(&self, _statistic_logger: StatisticLogger) {}
}

/// Indicator of what to do when a propagator is notified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EnqueueDecision {
    /// The propagator should be enqueued.
    Enqueue,
    /// The propagator should not be enqueued.
    Skip,
}

/// The priority of a propagator, used to determine the order in which propagators will be
/// propagated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Priority {
    High = 0,
    Medium = 1,
    Low = 2,
    VeryLow = 3,
}

impl Priority {
    pub(crate) const NUM_PRIORITIES: usize = 4;
}
