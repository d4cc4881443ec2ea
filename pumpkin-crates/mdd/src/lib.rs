//! # Pumpkin MDD
//! Propagation of constraints through relaxed multi-valued decision diagrams (MDDs).
//!
//! A decision diagram is a layered graph with one layer per variable, in which every path from
//! the root to the sink corresponds to an assignment of the variables. Constraints describe the
//! diagram through an [`mdd::MddSpec`]: they register properties of the node states, transitions
//! which compute the properties along arcs, relaxations which merge the states of different nodes
//! and predicates which decide whether arcs and nodes may exist. The diagram then removes every
//! value from the domain of a variable which does not label an arc in the corresponding layer.
//!
//! The width of a diagram, the number of nodes per layer, is bounded by
//! [`DecisionDiagramOptions::max_width`]. Without a bound the exact diagram is built; with a
//! bound, nodes are merged into relaxed nodes while building, and relaxed nodes are split again
//! whenever the width allows, so that the diagram becomes stronger as the domains shrink.
//!
//! # Example
//! ```rust
//! # use pumpkin_mdd::constraints;
//! # use pumpkin_mdd::DecisionDiagramOptions;
//! # use pumpkin_mdd::Solver;
//! let mut solver = Solver::default();
//! let x = (0..4)
//!     .map(|_| solver.new_bounded_integer(1, 4))
//!     .collect::<Vec<_>>();
//!
//! // At most two of the variables take the value 4.
//! let constraints = [
//!     constraints::among(x.clone(), [4], 0, 2),
//!     constraints::among(x.clone(), [1], 1, 4),
//! ];
//! let diagrams = constraints::post_decision_diagrams(
//!     &mut solver,
//!     constraints,
//!     DecisionDiagramOptions::relaxed(8),
//! )
//! .expect("the root is feasible");
//! assert_eq!(1, diagrams.len());
//!
//! solver.new_checkpoint();
//! solver.assign(x[0], 4).expect("4 is in the domain");
//! solver.assign(x[1], 4).expect("4 is in the domain");
//! assert!(solver.propagate().is_ok());
//!
//! // The two remaining variables cannot be 4 anymore, and one of them has to be 1.
//! assert!(!solver.contains(x[2], 4));
//! assert!(!solver.contains(x[3], 4));
//! ```
//!
//! # Writing constraints
//! The constraints in [`constraints`] are written against the same interface as user-defined
//! ones: implement [`constraints::MddConstraint`] and register the properties and rules of the
//! constraint in [`constraints::MddConstraint::install`].
pub(crate) mod basic_types;
pub mod constraints;
pub mod containers;
pub(crate) mod engine;
pub mod mdd;
pub(crate) mod propagators;
#[doc(hidden)]
pub mod pumpkin_asserts;
pub mod statistics;

pub use convert_case;

// We declare a private module with public use, so that all exports from API are exports directly
// from the crate.
//
// Example:
// `use pumpkin_mdd::Solver;`
// vs.
// `use pumpkin_mdd::api::Solver;`
mod api;

pub use api::*;

pub use crate::engine::propagation::PropagatorId;
pub use crate::engine::EmptyDomain;
pub use crate::propagators::CandidateOrdering;
pub use crate::propagators::DecisionDiagramIntersection;
pub use crate::propagators::InitialConstruction;
pub use crate::propagators::NodeSelection;
pub use crate::propagators::SplitStrategy;
