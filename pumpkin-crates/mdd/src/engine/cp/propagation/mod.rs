//! Contains the interface between propagators and the host solver.
//!
//! A propagator is created from a [`PropagatorConstructor`], which registers the variables and
//! [`DomainEvents`] the propagator is interested in through the
//! [`PropagatorConstructorContext`]. Afterwards, the solver calls [`Propagator::notify`] for
//! every registered event and [`Propagator::propagate`] whenever the propagator is enqueued. When
//! the solver backtracks, [`Propagator::synchronise`] is called so that the propagator can restore
//! its internal state.
//!
//! [`DomainEvents`]: crate::engine::DomainEvents
mod constructor;
mod contexts;
mod local_id;
mod propagator;
mod propagator_id;
pub(crate) mod store;

pub(crate) use constructor::PropagatorConstructor;
pub(crate) use constructor::PropagatorConstructorContext;
pub(crate) use contexts::ManipulateTrailedValues;
pub(crate) use contexts::PropagationContext;
pub(crate) use contexts::PropagationContextMut;
pub(crate) use contexts::ReadDomains;
pub(crate) use local_id::LocalId;
pub(crate) use propagator::EnqueueDecision;
pub(crate) use propagator::Priority;
pub(crate) use propagator::Propagator;
pub use propagator_id::PropagatorId;
