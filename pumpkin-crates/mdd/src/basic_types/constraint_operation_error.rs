use thiserror::Error;

use crate::mdd::MddSpecError;

/// Errors related to adding constraints to the [`Solver`].
///
/// [`Solver`]: crate::Solver
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintOperationError {
    #[error("Adding the constraint failed because the root level is infeasible")]
    InfeasibleState,
    #[error("Adding the constraint failed because the decision diagram is infeasible")]
    InfeasibleDiagram,
    #[error("The decision diagram options are invalid: {0}")]
    InvalidOptions(&'static str),
    #[error("The constraint could not be compiled: {0}")]
    Specification(#[from] MddSpecError),
}
