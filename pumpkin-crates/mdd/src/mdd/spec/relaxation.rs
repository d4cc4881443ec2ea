use std::fmt::Debug;
use std::fmt::Formatter;

use crate::mdd::state::PropertyKind;
use crate::mdd::state::StateMut;
use crate::mdd::state::StateRef;

pub(crate) type RelaxFn = Box<dyn Fn(&mut StateMut<'_>, StateRef<'_>)>;

/// How the values of one property are merged when two states are relaxed into one.
///
/// A relaxation has to over-approximate: the merged value may not exclude an assignment that
/// either input allows.
pub enum Relaxation {
    /// Keep the smaller value; element-wise for windows and `and` for booleans.
    Min,
    /// Keep the larger value; element-wise for windows and `or` for booleans.
    Max,
    Union,
    Intersection,
    /// Merges the second state into the first; the closure is responsible for exactly one
    /// property.
    Custom(RelaxFn),
}

impl Relaxation {
    pub fn custom(relax: impl Fn(&mut StateMut<'_>, StateRef<'_>) + 'static) -> Relaxation {
        Relaxation::Custom(Box::new(relax))
    }

    pub(crate) fn supports(&self, kind: PropertyKind) -> bool {
        match self {
            Relaxation::Min | Relaxation::Max => !matches!(kind, PropertyKind::Set { .. }),
            Relaxation::Union | Relaxation::Intersection => {
                matches!(kind, PropertyKind::Set { .. })
            }
            Relaxation::Custom(_) => true,
        }
    }
}

impl Debug for Relaxation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Relaxation::Min => write!(f, "Min"),
            Relaxation::Max => write!(f, "Max"),
            Relaxation::Union => write!(f, "Union"),
            Relaxation::Intersection => write!(f, "Intersection"),
            Relaxation::Custom(_) => write!(f, "Custom(<closure>)"),
        }
    }
}
