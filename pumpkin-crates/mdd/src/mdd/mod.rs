//! Multi-valued decision diagrams over groups of integer variables.
//!
//! A diagram is described by an [`MddSpec`], in which constraints register the properties of
//! the node states, how these are computed along arcs and merged, and which arcs and nodes may
//! exist. The engines in `diagram` build the diagram from the domains of the variables, keep it
//! consistent with them and remove every value which no longer labels an arc.
pub(crate) mod delta;
pub(crate) mod diagram;
pub(crate) mod graph;
pub(crate) mod spec;
pub mod state;
mod statistics;

pub use spec::ArcInput;
pub use spec::CandidateInput;
pub use spec::ConstraintId;
pub use spec::MddSpec;
pub use spec::MddSpecError;
pub use spec::NodeInput;
pub use spec::Relaxation;
pub use spec::TransitionInput;
pub use statistics::DiagramShape;
pub use statistics::MddStatistics;
