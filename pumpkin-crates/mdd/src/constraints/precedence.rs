use super::MddConstraint;
use super::ScopePositions;
use crate::engine::variables::DomainId;
use crate::mdd::state::StateKind;
use crate::mdd::MddSpec;
use crate::mdd::Relaxation;
use crate::Solver;

/// Creates the constraint that a variable may only take `after` once an earlier one among
/// `variables` took `before`.
pub fn value_precedence(
    variables: impl Into<Box<[DomainId]>>,
    before: i32,
    after: i32,
) -> Precedence {
    Precedence {
        variables: variables.into(),
        before,
        after,
        mandatory: false,
    }
}

/// Creates the constraint of [`value_precedence`], where in addition every variable taking
/// `before` has to be followed by a later one taking `after`.
pub fn mandatory_precedence(
    variables: impl Into<Box<[DomainId]>>,
    before: i32,
    after: i32,
) -> Precedence {
    Precedence {
        variables: variables.into(),
        before,
        after,
        mandatory: true,
    }
}

/// See [`value_precedence`] and [`mandatory_precedence`].
#[derive(Debug, Clone)]
pub struct Precedence {
    variables: Box<[DomainId]>,
    before: i32,
    after: i32,
    mandatory: bool,
}

impl MddConstraint for Precedence {
    fn install(&self, spec: &mut MddSpec, _: &Solver) {
        let (before, after) = (self.before, self.after);
        let name = if self.mandatory {
            "mandatory_precedence"
        } else {
            "value_precedence"
        };
        let constraint = spec.constraint(name, &self.variables);

        let seen_before = spec.bool_property(constraint, StateKind::Down, false, Relaxation::Max);
        spec.transition(seen_before, &[], move |state, input, values| {
            state.set_bool(
                seen_before,
                input.state.boolean(seen_before) || values.contains(before),
            );
        });

        if !self.mandatory {
            spec.arc_check(constraint, move |arc| {
                arc.value != after || arc.parent_down.boolean(seen_before)
            });
            return;
        }

        let positions = ScopePositions::new(spec, &self.variables);

        // Whether the last `before` on the paths from the root still waits for an `after`.
        let pending = spec.bool_property(constraint, StateKind::Down, false, Relaxation::Min);
        let after_below = spec.bool_property(constraint, StateKind::Up, false, Relaxation::Max);

        spec.transition(pending, &[], move |state, input, values| {
            let only_before = values.iter().all(|value| value == before);
            state.set_bool(
                pending,
                !values.contains(after) && (only_before || input.state.boolean(pending)),
            );
        });
        spec.transition(after_below, &[], move |state, input, values| {
            state.set_bool(
                after_below,
                input.state.boolean(after_below) || values.contains(after),
            );
        });

        spec.arc_check(constraint, move |arc| {
            if arc.value == after {
                return arc.parent_down.boolean(seen_before);
            }

            let still_pending =
                arc.value == before || (arc.parent_down.boolean(pending) && arc.value != after);
            if still_pending && positions.remaining_after(arc.layer) == 0 {
                return false;
            }

            match arc.child_up {
                Some(up) if arc.value == before => up.boolean(after_below),
                _ => true,
            }
        });

        spec.candidate_priority(move |candidate| {
            i64::from(candidate.down.boolean(seen_before)) * 25
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::check_propagation;
    use crate::constraints::post_decision_diagrams;
    use crate::DecisionDiagramOptions;

    fn precedes(solution: &[i32], before: i32, after: i32) -> bool {
        solution.iter().enumerate().all(|(index, &value)| {
            value != after || solution[..index].contains(&before)
        })
    }

    fn is_followed(solution: &[i32], before: i32, after: i32) -> bool {
        solution.iter().enumerate().all(|(index, &value)| {
            value != before || solution[index + 1..].contains(&after)
        })
    }

    #[test]
    fn the_first_variable_cannot_take_the_later_value() {
        let mut solver = Solver::default();
        let x = (0..3)
            .map(|_| solver.new_bounded_integer(1, 3))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [value_precedence(x.clone(), 1, 2)],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        assert_eq!(vec![1, 3], solver.domain(x[0]));

        solver.new_checkpoint();
        solver.assign(x[0], 3).expect("non-empty domain");
        check_propagation(&mut solver, &x, true, |solution| precedes(solution, 1, 2));
        assert_eq!(vec![1, 3], solver.domain(x[1]));
    }

    #[test]
    fn mandatory_precedence_is_exact() {
        let mut solver = Solver::default();
        let x = (0..5)
            .map(|_| solver.new_bounded_integer(1, 3))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [mandatory_precedence(x.clone(), 1, 2)],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        // The last variable has no successor to take 2 after it.
        assert!(!solver.contains(x[4], 1));

        solver.new_checkpoint();
        solver.assign(x[1], 1).expect("non-empty domain");
        solver.remove(x[2], 2).expect("non-empty domain");
        solver.remove(x[4], 2).expect("non-empty domain");
        check_propagation(&mut solver, &x, true, |solution| {
            precedes(solution, 1, 2) && is_followed(solution, 1, 2)
        });
        assert_eq!(vec![2], solver.domain(x[3]));
    }

    #[test]
    fn relaxed_diagrams_keep_every_supported_value() {
        let mut solver = Solver::default();
        let x = (0..6)
            .map(|_| solver.new_bounded_integer(1, 4))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [mandatory_precedence(x.clone(), 2, 4)],
            DecisionDiagramOptions::relaxed(2),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.remove(x[3], 4).expect("non-empty domain");
        solver.assign(x[2], 2).expect("non-empty domain");
        check_propagation(&mut solver, &x, false, |solution| {
            precedes(solution, 2, 4) && is_followed(solution, 2, 4)
        });
    }
}
