pub(crate) mod solver;

pub use solver::DiagramHandle;
pub use solver::Solver;
pub use solver::SolverStatistics;

pub use crate::basic_types::ConstraintOperationError;
pub use crate::basic_types::Inconsistency;
pub use crate::basic_types::PropagationStatusCP;
pub use crate::engine::variables::DomainId;
pub use crate::propagators::DecisionDiagramOptions;
