mod constraint_operation_error;
mod propagation_status_cp;
mod trail;

pub use constraint_operation_error::ConstraintOperationError;
pub use propagation_status_cp::*;
pub(crate) use trail::Trail;
