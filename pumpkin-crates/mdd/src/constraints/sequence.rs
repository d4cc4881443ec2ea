use std::rc::Rc;

use super::MddConstraint;
use super::ScopePositions;
use crate::engine::variables::DomainId;
use crate::mdd::state::StateKind;
use crate::mdd::MddSpec;
use crate::mdd::Relaxation;
use crate::Solver;

/// Creates the constraint that every `length` consecutive `variables` contain between
/// `lower_bound` and `upper_bound` variables taking a value in `values`.
///
/// The windows follow the layer order of the diagram, which is the order of `variables` unless
/// a constraint registered earlier in the same diagram already placed some of them.
pub fn sequence(
    variables: impl Into<Box<[DomainId]>>,
    length: usize,
    values: impl IntoIterator<Item = i32>,
    lower_bound: i32,
    upper_bound: i32,
) -> Sequence {
    assert!(length >= 1, "the window of a sequence covers at least one variable");

    let mut values = values.into_iter().collect::<Vec<_>>();
    values.sort_unstable();
    values.dedup();

    Sequence {
        variables: variables.into(),
        length,
        values: values.into(),
        lower_bound,
        upper_bound,
    }
}

/// See [`sequence`].
#[derive(Debug, Clone)]
pub struct Sequence {
    variables: Box<[DomainId]>,
    length: usize,
    values: Box<[i32]>,
    lower_bound: i32,
    upper_bound: i32,
}

impl MddConstraint for Sequence {
    /// Every node keeps, for itself and its `length - 1` closest ancestors in the scope, the
    /// smallest and largest number of counted variables from the root. The count of a window is
    /// the difference between both of its ends.
    fn install(&self, spec: &mut MddSpec, _: &Solver) {
        let constraint = spec.constraint("sequence", &self.variables);
        let positions = ScopePositions::new(spec, &self.variables);
        let scope_len = self.variables.len();
        let length = self.length;
        let (lower_bound, upper_bound) = (self.lower_bound, self.upper_bound);
        let members: Rc<[i32]> = Rc::from(self.values.clone());

        let min_window = spec.window_property(
            constraint,
            StateKind::Down,
            length as u32,
            0,
            0..=scope_len as i32,
            Relaxation::Min,
        );
        let max_window = spec.window_property(
            constraint,
            StateKind::Down,
            length as u32,
            0,
            0..=scope_len as i32,
            Relaxation::Max,
        );

        let is_member = Rc::clone(&members);
        spec.transition(min_window, &[], move |state, input, values| {
            let previous = input.state.window(min_window);
            let all = values
                .iter()
                .all(|value| is_member.binary_search(&value).is_ok());
            for element in (1..length).rev() {
                state.set_window(min_window, element, previous.get(element - 1));
            }
            state.set_window(min_window, 0, previous.get(0) + i32::from(all));
        });
        let is_member = Rc::clone(&members);
        spec.transition(max_window, &[], move |state, input, values| {
            let previous = input.state.window(max_window);
            let any = values
                .iter()
                .any(|value| is_member.binary_search(&value).is_ok());
            for element in (1..length).rev() {
                state.set_window(max_window, element, previous.get(element - 1));
            }
            state.set_window(max_window, 0, previous.get(0) + i32::from(any));
        });

        let is_member = Rc::clone(&members);
        spec.arc_check(constraint, move |arc| {
            if scope_len < length {
                return true;
            }
            let count = i32::from(is_member.binary_search(&arc.value).is_ok());
            let smallest = arc.parent_down.window(min_window);
            let largest = arc.parent_down.window(max_window);
            let position = positions.position(arc.layer);

            if position + 1 >= length {
                // The window ending at this variable is complete.
                let min_count = smallest.get(0) + count - largest.get(length - 1);
                let max_count = largest.get(0) + count - smallest.get(length - 1);
                min_count <= upper_bound && max_count >= lower_bound
            } else {
                let num_missing = (length - position - 1) as i32;
                smallest.get(0) + count <= upper_bound
                    && largest.get(0) + count + num_missing >= lower_bound
            }
        });

        spec.split_priority(move |node| {
            i64::from(node.down.window(max_window).get(0) - node.down.window(min_window).get(0))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::check_propagation;
    use crate::constraints::post_decision_diagrams;
    use crate::propagators::InitialConstruction;
    use crate::DecisionDiagramOptions;

    fn windows_hold(
        solution: &[i32],
        length: usize,
        lower_bound: usize,
        upper_bound: usize,
    ) -> bool {
        solution.windows(length).all(|window| {
            let count = window.iter().filter(|&&value| value == 1).count();
            (lower_bound..=upper_bound).contains(&count)
        })
    }

    #[test]
    fn a_partial_assignment_fixes_the_sequence() {
        let mut solver = Solver::default();
        let x = (0..10)
            .map(|_| solver.new_bounded_integer(0, 1))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [sequence(x.clone(), 5, [1], 2, 2)],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.assign(x[0], 1).expect("non-empty domain");
        solver.assign(x[1], 1).expect("non-empty domain");
        check_propagation(&mut solver, &x, true, |solution| {
            windows_hold(solution, 5, 2, 2)
        });

        let expected = [1, 1, 0, 0, 0, 1, 1, 0, 0, 0];
        for (&variable, value) in x.iter().zip(expected) {
            assert_eq!(vec![value], solver.domain(variable));
        }
    }

    #[test]
    fn exact_diagrams_match_the_supported_values() {
        let mut solver = Solver::default();
        let x = (0..8)
            .map(|_| solver.new_bounded_integer(0, 2))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [sequence(x.clone(), 3, [1], 1, 2)],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.remove(x[2], 1).expect("non-empty domain");
        solver.remove(x[3], 1).expect("non-empty domain");
        solver.assign(x[6], 0).expect("non-empty domain");
        check_propagation(&mut solver, &x, true, |solution| {
            windows_hold(solution, 3, 1, 2)
        });
    }

    #[test]
    fn relaxed_diagrams_keep_every_supported_value() {
        let mut solver = Solver::default();
        let x = (0..9)
            .map(|_| solver.new_bounded_integer(0, 1))
            .collect::<Vec<_>>();
        let _ = post_decision_diagrams(
            &mut solver,
            [sequence(x.clone(), 4, [1], 1, 2)],
            DecisionDiagramOptions::relaxed(3),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.assign(x[0], 0).expect("non-empty domain");
        solver.assign(x[1], 0).expect("non-empty domain");
        solver.assign(x[4], 1).expect("non-empty domain");
        check_propagation(&mut solver, &x, false, |solution| {
            windows_hold(solution, 4, 1, 2)
        });
    }

    #[test]
    fn short_scopes_are_unconstrained() {
        let mut solver = Solver::default();
        let x = (0..2)
            .map(|_| solver.new_bounded_integer(0, 1))
            .collect::<Vec<_>>();
        let diagrams = post_decision_diagrams(
            &mut solver,
            [sequence(x.clone(), 3, [1], 3, 3)],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        let shape = solver
            .diagram_shape(diagrams[0])
            .expect("a decision diagram");
        assert_eq!(4, shape.num_paths);
    }

    #[test]
    fn refinement_from_width_one_ends_without_relaxed_nodes() {
        let shapes = [InitialConstruction::WidthOne, InitialConstruction::TopDownMerge].map(
            |initial_construction| {
                let mut solver = Solver::default();
                let x = vec![
                    solver.new_sparse_integer([1, 2]),
                    solver.new_sparse_integer([0, 3]),
                    solver.new_sparse_integer([1, 2, 3]),
                    solver.new_sparse_integer([0, 1, 3]),
                    solver.new_sparse_integer([1, 2]),
                ];
                let diagrams = post_decision_diagrams(
                    &mut solver,
                    [sequence(x.clone(), 2, [2], 1, 1)],
                    DecisionDiagramOptions {
                        initial_construction,
                        ..DecisionDiagramOptions::relaxed(1000)
                    },
                )
                .expect("feasible at the root");
                solver
                    .diagram_shape(diagrams[0])
                    .expect("a decision diagram")
            },
        );

        for shape in &shapes {
            assert_eq!(0, shape.num_relaxed_nodes);
        }
        assert_eq!(shapes[0].num_paths, shapes[1].num_paths);
    }
}
