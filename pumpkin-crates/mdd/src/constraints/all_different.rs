use super::MddConstraint;
use crate::engine::variables::DomainId;
use crate::mdd::state::BitSetRef;
use crate::mdd::state::StateKind;
use crate::mdd::MddSpec;
use crate::mdd::Relaxation;
use crate::Solver;

/// Creates the constraint that the `variables` take pairwise different values.
pub fn all_different(variables: impl Into<Box<[DomainId]>>) -> AllDifferent {
    AllDifferent {
        variables: variables.into(),
    }
}

/// See [`all_different`].
#[derive(Debug, Clone)]
pub struct AllDifferent {
    variables: Box<[DomainId]>,
}

impl MddConstraint for AllDifferent {
    /// The states track the values taken on every path (`all`) and on some path (`some`) above
    /// and below a node; these are over the values of the root domains, shifted to start at zero.
    fn install(&self, spec: &mut MddSpec, solver: &Solver) {
        let constraint = spec.constraint("all_different", &self.variables);
        let scope_len = self.variables.len();

        let offset = self
            .variables
            .iter()
            .map(|&variable| solver.lower_bound(variable))
            .min()
            .unwrap_or(0);
        let largest = self
            .variables
            .iter()
            .map(|&variable| solver.upper_bound(variable))
            .max()
            .unwrap_or(0);
        let universe = (largest as i64 - offset as i64 + 1).max(1) as u32;

        let all_down = spec.set_property(
            constraint,
            StateKind::Down,
            universe,
            Relaxation::Intersection,
        );
        let some_down = spec.set_property(constraint, StateKind::Down, universe, Relaxation::Union);
        let num_assigned = spec.int_property(
            constraint,
            StateKind::Down,
            0,
            0..=scope_len as i32,
            Relaxation::Min,
        );
        let all_up = spec.set_property(
            constraint,
            StateKind::Up,
            universe,
            Relaxation::Intersection,
        );
        let some_up = spec.set_property(constraint, StateKind::Up, universe, Relaxation::Union);

        for all in [all_down, all_up] {
            spec.transition(all, &[], move |state, input, values| {
                let mut set = state.set_mut(all);
                set.copy_from(input.state.set(all));
                if let (true, Some(value)) = (values.is_singleton(), values.min()) {
                    let _ = set.insert((value - offset) as u32);
                }
            });
        }
        for some in [some_down, some_up] {
            spec.transition(some, &[], move |state, input, values| {
                let mut set = state.set_mut(some);
                set.copy_from(input.state.set(some));
                for value in values.iter() {
                    let _ = set.insert((value - offset) as u32);
                }
            });
        }
        spec.transition(num_assigned, &[], move |state, input, _| {
            state.set_int(num_assigned, input.state.int(num_assigned) + 1);
        });

        spec.arc_check(constraint, move |arc| {
            let element = (arc.value - offset) as u32;
            let above = arc.parent_down.set(some_down);
            let num_above = arc.parent_down.int(num_assigned) as usize;

            // The variables above need as many distinct values other than this one.
            if arc.parent_down.set(all_down).contains(element)
                || len_without(above, element) < num_above
            {
                return false;
            }

            let Some(up) = arc.child_up else {
                return true;
            };
            let below = up.set(some_up);
            let num_below = scope_len.saturating_sub(num_above + 1);
            if up.set(all_up).contains(element) || len_without(below, element) < num_below {
                return false;
            }

            let num_values = above.union_len(below)
                + usize::from(!above.contains(element) && !below.contains(element));
            num_values >= scope_len
        });

        spec.split_priority(move |node| {
            (node.down.set(some_down).len() - node.down.set(all_down).len()) as i64
        });
        spec.equivalence_key(move |down| {
            let spread = down.set(some_down).len() - down.set(all_down).len();
            i64::from(spread < down.int(num_assigned) as usize / 2)
        });
    }
}

/// The number of elements of `set` other than `element`.
fn len_without(set: BitSetRef<'_>, element: u32) -> usize {
    set.len() - usize::from(set.contains(element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::check_propagation;
    use crate::constraints::post_decision_diagrams;
    use crate::ConstraintOperationError;
    use crate::DecisionDiagramOptions;

    fn is_all_different(solution: &[i32]) -> bool {
        solution
            .iter()
            .enumerate()
            .all(|(index, value)| !solution[index + 1..].contains(value))
    }

    #[test]
    fn permutations_are_not_filtered() {
        let mut solver = Solver::default();
        let x = (0..3)
            .map(|_| solver.new_bounded_integer(1, 3))
            .collect::<Vec<_>>();

        let diagrams = post_decision_diagrams(
            &mut solver,
            [all_different(x.clone())],
            DecisionDiagramOptions::relaxed(3),
        )
        .expect("feasible at the root");

        let shape = solver
            .diagram_shape(diagrams[0])
            .expect("a decision diagram");
        assert_eq!(6, shape.num_paths);
        for &variable in &x {
            assert_eq!(vec![1, 2, 3], solver.domain(variable));
        }
    }

    #[test]
    fn pigeonhole_is_detected_at_width_one() {
        let mut solver = Solver::default();
        let x = (0..4)
            .map(|_| solver.new_bounded_integer(1, 3))
            .collect::<Vec<_>>();

        let result = post_decision_diagrams(
            &mut solver,
            [all_different(x)],
            DecisionDiagramOptions::relaxed(1),
        );

        assert!(matches!(
            result,
            Err(ConstraintOperationError::InfeasibleDiagram)
        ));
    }

    #[test]
    fn hall_sets_are_removed_by_exact_diagrams() {
        let mut solver = Solver::default();
        let x = vec![
            solver.new_bounded_integer(1, 2),
            solver.new_bounded_integer(1, 2),
            solver.new_bounded_integer(1, 4),
            solver.new_bounded_integer(2, 3),
        ];

        let _ = post_decision_diagrams(
            &mut solver,
            [all_different(x.clone())],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        assert_eq!(vec![4], solver.domain(x[2]));
        assert_eq!(vec![3], solver.domain(x[3]));
    }

    #[test]
    fn exact_diagrams_match_the_supported_values() {
        let mut solver = Solver::default();
        let x = (0..5)
            .map(|_| solver.new_bounded_integer(1, 5))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [all_different(x.clone())],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.set_upper_bound(x[0], 2).expect("non-empty domain");
        solver.set_upper_bound(x[1], 2).expect("non-empty domain");
        solver.remove(x[2], 3).expect("non-empty domain");
        solver.assign(x[4], 5).expect("non-empty domain");
        check_propagation(&mut solver, &x, true, is_all_different);
    }

    #[test]
    fn relaxed_diagrams_keep_every_supported_value() {
        let mut solver = Solver::default();
        let x = (0..5)
            .map(|_| solver.new_bounded_integer(1, 5))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [all_different(x.clone())],
            DecisionDiagramOptions::relaxed(2),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.assign(x[0], 1).expect("non-empty domain");
        solver.set_upper_bound(x[3], 3).expect("non-empty domain");
        check_propagation(&mut solver, &x, false, is_all_different);

        // An assigned value is never available to the other variables.
        for &variable in &x[1..] {
            assert!(!solver.contains(variable, 1));
        }
    }
}
