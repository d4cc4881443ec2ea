use std::rc::Rc;

use super::MddConstraint;
use super::ScopePositions;
use crate::engine::variables::DomainId;
use crate::mdd::state::StateKind;
use crate::mdd::ConstraintId;
use crate::mdd::MddSpec;
use crate::mdd::Relaxation;
use crate::Solver;

/// Creates the constraint that between `lower_bound` and `upper_bound` of the `variables` take a
/// value in `values`.
pub fn among(
    variables: impl Into<Box<[DomainId]>>,
    values: impl IntoIterator<Item = i32>,
    lower_bound: i32,
    upper_bound: i32,
) -> Among {
    let mut values = values.into_iter().collect::<Vec<_>>();
    values.sort_unstable();
    values.dedup();

    Among {
        variables: variables.into(),
        values: values.into(),
        lower_bound,
        upper_bound,
    }
}

/// Counts the variables taking one of a set of values; see [`among`].
#[derive(Debug, Clone)]
pub struct Among {
    variables: Box<[DomainId]>,
    /// Sorted and free of duplicates.
    values: Box<[i32]>,
    lower_bound: i32,
    upper_bound: i32,
}

impl MddConstraint for Among {
    fn install(&self, spec: &mut MddSpec, _: &Solver) {
        let constraint = spec.constraint("among", &self.variables);
        install_count(
            spec,
            constraint,
            &self.variables,
            Rc::from(self.values.clone()),
            self.lower_bound,
            self.upper_bound,
        );
    }
}

/// Creates the constraint that the number of `variables` taking `values[i]` lies in
/// `[lower_bounds[i], upper_bounds[i]]`, for every `i`.
pub fn global_cardinality(
    variables: impl Into<Box<[DomainId]>>,
    values: impl Into<Box<[i32]>>,
    lower_bounds: impl Into<Box<[i32]>>,
    upper_bounds: impl Into<Box<[i32]>>,
) -> GlobalCardinality {
    let values = values.into();
    let lower_bounds = lower_bounds.into();
    let upper_bounds = upper_bounds.into();
    assert!(
        values.len() == lower_bounds.len() && values.len() == upper_bounds.len(),
        "every counted value needs a lower and an upper bound"
    );

    GlobalCardinality {
        variables: variables.into(),
        values,
        lower_bounds,
        upper_bounds,
    }
}

/// Bounds the number of occurrences of several values at once; see [`global_cardinality`].
#[derive(Debug, Clone)]
pub struct GlobalCardinality {
    variables: Box<[DomainId]>,
    values: Box<[i32]>,
    lower_bounds: Box<[i32]>,
    upper_bounds: Box<[i32]>,
}

impl MddConstraint for GlobalCardinality {
    fn install(&self, spec: &mut MddSpec, _: &Solver) {
        let constraint = spec.constraint("global_cardinality", &self.variables);
        for (index, &value) in self.values.iter().enumerate() {
            install_count(
                spec,
                constraint,
                &self.variables,
                Rc::from([value]),
                self.lower_bounds[index],
                self.upper_bounds[index],
            );
        }
    }
}

/// Registers the bounds on the number of variables in `scope` taking a value of `members`.
///
/// The down state keeps the smallest and largest count over the paths from the root, the up state
/// the same over the paths to the sink. An arc exists if some count through it can land in
/// `[lower_bound, upper_bound]`.
fn install_count(
    spec: &mut MddSpec,
    constraint: ConstraintId,
    scope: &[DomainId],
    members: Rc<[i32]>,
    lower_bound: i32,
    upper_bound: i32,
) {
    let positions = ScopePositions::new(spec, scope);
    let scope_len = scope.len() as i32;

    let down_min = spec.int_property(
        constraint,
        StateKind::Down,
        0,
        0..=scope_len,
        Relaxation::Min,
    );
    let down_max = spec.int_property(
        constraint,
        StateKind::Down,
        0,
        0..=scope_len,
        Relaxation::Max,
    );
    let up_min = spec.int_property(constraint, StateKind::Up, 0, 0..=scope_len, Relaxation::Min);
    let up_max = spec.int_property(constraint, StateKind::Up, 0, 0..=scope_len, Relaxation::Max);

    for (min, max) in [(down_min, down_max), (up_min, up_max)] {
        let is_member = Rc::clone(&members);
        spec.transition(min, &[], move |state, input, values| {
            let all = values
                .iter()
                .all(|value| is_member.binary_search(&value).is_ok());
            state.set_int(min, input.state.int(min) + i32::from(all));
        });

        let is_member = Rc::clone(&members);
        spec.transition(max, &[], move |state, input, values| {
            let any = values
                .iter()
                .any(|value| is_member.binary_search(&value).is_ok());
            state.set_int(max, input.state.int(max) + i32::from(any));
        });
    }

    let is_member = Rc::clone(&members);
    spec.arc_check(constraint, move |arc| {
        let count = i32::from(is_member.binary_search(&arc.value).is_ok());
        let (below_min, below_max) = match arc.child_up {
            Some(up) => (up.int(up_min), up.int(up_max)),
            None => (0, positions.remaining_after(arc.layer) as i32),
        };

        arc.parent_down.int(down_min) + count + below_min <= upper_bound
            && arc.parent_down.int(down_max) + count + below_max >= lower_bound
    });

    spec.split_priority(move |node| {
        i64::from(node.down.int(down_max) - node.down.int(down_min))
    });
    spec.candidate_priority(move |candidate| {
        -i64::from(candidate.down.int(down_max) - candidate.down.int(down_min))
    });
    spec.equivalence_key(move |down| i64::from(down.int(down_max)));
}
