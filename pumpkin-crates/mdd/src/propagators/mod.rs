//! Contains the propagator implementations of this crate.
//!
//! See the [`crate::engine::propagation`] for info on propagators.
pub(crate) mod mdd;

pub use mdd::CandidateOrdering;
pub use mdd::DecisionDiagramIntersection;
pub use mdd::DecisionDiagramOptions;
pub use mdd::InitialConstruction;
pub use mdd::NodeSelection;
pub use mdd::SplitStrategy;
