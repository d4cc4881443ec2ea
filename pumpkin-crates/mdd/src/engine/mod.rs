//! The host substrate the decision diagrams are propagated in: integer domains, reversible
//! values, the propagator interface and event registration.
pub(crate) mod cp;
pub mod variables;

pub(crate) use cp::propagation;
pub(crate) use cp::Assignments;
pub use cp::DomainEvents;
pub use cp::EmptyDomain;
pub use cp::IntDomainEvent;
pub(crate) use cp::PropagatorQueue;
#[cfg(test)]
pub(crate) use cp::test_solver;
pub(crate) use cp::TrailedInteger;
pub(crate) use cp::TrailedValues;
pub(crate) use cp::WatchList;
