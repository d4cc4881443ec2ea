mod assignments;
mod domain_events;
pub(crate) mod propagation;
mod propagator_queue;
#[cfg(test)]
pub(crate) mod test_solver;
mod trailed;
mod watch_list;

pub(crate) use assignments::Assignments;
pub use assignments::EmptyDomain;
pub use domain_events::DomainEvents;
pub use domain_events::IntDomainEvent;
pub(crate) use propagator_queue::PropagatorQueue;
pub(crate) use trailed::TrailedInteger;
pub(crate) use trailed::TrailedValues;
pub(crate) use watch_list::WatchList;
