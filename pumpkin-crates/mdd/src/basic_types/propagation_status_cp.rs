use crate::engine::EmptyDomain;
use crate::engine::propagation::PropagatorId;

/// The result of invoking a constraint programming propagator. The propagation can either succeed
/// or identify a conflict.
pub type PropagationStatusCP = Result<(), Inconsistency>;

/// The single failure signal of the diagram propagation; it always ends the current search branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inconsistency {
    /// A domain became empty, e.g. because the last arc labelled with a value disappeared.
    EmptyDomain,
    /// The propagator detected an infeasibility which did not manifest as an empty domain, e.g.
    /// the root or sink of a diagram had to be deleted.
    Conflict(PropagatorConflict),
}

impl From<EmptyDomain> for Inconsistency {
    fn from(_: EmptyDomain) -> Self {
        Inconsistency::EmptyDomain
    }
}

impl From<PropagatorConflict> for Inconsistency {
    fn from(conflict: PropagatorConflict) -> Self {
        Inconsistency::Conflict(conflict)
    }
}

/// A conflict stated by a propagator. A propagator that identifies a conflict that is _not_ an
/// empty domain, describes that conflict with this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropagatorConflict {
    /// The propagator which identified the conflict.
    pub propagator: PropagatorId,
}
