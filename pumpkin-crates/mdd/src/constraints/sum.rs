use std::rc::Rc;

use super::MddConstraint;
use crate::engine::variables::DomainId;
use crate::mdd::state::StateKind;
use crate::mdd::state::ValueSet;
use crate::mdd::MddSpec;
use crate::mdd::Relaxation;
use crate::Solver;

/// Creates the constraint `lower_bound <= sum(weights[i] * variables[i]) <= upper_bound`.
pub fn sum(
    variables: impl Into<Box<[DomainId]>>,
    weights: impl Into<Box<[i32]>>,
    lower_bound: i32,
    upper_bound: i32,
) -> Sum {
    let variables = variables.into();
    let weights = weights.into();
    assert_eq!(
        variables.len(),
        weights.len(),
        "every variable of a sum needs a weight"
    );

    Sum {
        variables,
        weights,
        lower_bound: lower_bound as i64,
        upper_bound: upper_bound as i64,
    }
}

/// Creates the constraint `sum(weights[i] * variables[i]) == rhs`.
pub fn sum_equals(
    variables: impl Into<Box<[DomainId]>>,
    weights: impl Into<Box<[i32]>>,
    rhs: i32,
) -> Sum {
    sum(variables, weights, rhs, rhs)
}

/// A weighted sum within bounds; see [`sum`].
#[derive(Debug, Clone)]
pub struct Sum {
    variables: Box<[DomainId]>,
    weights: Box<[i32]>,
    lower_bound: i64,
    upper_bound: i64,
}

/// The weight of the variable of a layer, and the smallest and largest value of its term over
/// the domain at the root.
#[derive(Debug, Clone, Copy, Default)]
struct Term {
    weight: i64,
    min: i64,
    max: i64,
}

impl Term {
    fn new(weight: i32, lower: i32, upper: i32) -> Term {
        let weight = weight as i64;
        let (first, second) = (weight * lower as i64, weight * upper as i64);
        Term {
            weight,
            min: first.min(second),
            max: first.max(second),
        }
    }

    /// The bounds of the term over the labels of a group of arcs.
    fn bounds(&self, values: &ValueSet) -> (i64, i64) {
        match (values.min(), values.max()) {
            (Some(lower), Some(upper)) => {
                let (first, second) = (self.weight * lower as i64, self.weight * upper as i64);
                (first.min(second), first.max(second))
            }
            _ => (0, 0),
        }
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl MddConstraint for Sum {
    /// The down and up states bound the partial sums from the root and to the sink.
    fn install(&self, spec: &mut MddSpec, solver: &Solver) {
        let constraint = spec.constraint("sum", &self.variables);
        let (lower_bound, upper_bound) = (self.lower_bound, self.upper_bound);

        let terms: Rc<[Term]> = spec
            .variables()
            .iter()
            .map(|variable| {
                match self.variables.iter().position(|scoped| scoped == variable) {
                    Some(index) => Term::new(
                        self.weights[index],
                        solver.lower_bound(*variable),
                        solver.upper_bound(*variable),
                    ),
                    None => Term::default(),
                }
            })
            .collect();

        // The bounds of the terms on the layers below each layer.
        let mut below = vec![(0, 0); terms.len()];
        let mut suffix = (0, 0);
        for (layer, term) in terms.iter().enumerate().rev() {
            below[layer] = suffix;
            suffix = (suffix.0 + term.min, suffix.1 + term.max);
        }

        let range_min = saturate(terms.iter().map(|term| term.min.min(0)).sum());
        let range_max = saturate(terms.iter().map(|term| term.max.max(0)).sum());

        let down_min = spec.int_property(
            constraint,
            StateKind::Down,
            0,
            range_min..=range_max,
            Relaxation::Min,
        );
        let down_max = spec.int_property(
            constraint,
            StateKind::Down,
            0,
            range_min..=range_max,
            Relaxation::Max,
        );
        let up_min = spec.int_property(
            constraint,
            StateKind::Up,
            0,
            range_min..=range_max,
            Relaxation::Min,
        );
        let up_max = spec.int_property(
            constraint,
            StateKind::Up,
            0,
            range_min..=range_max,
            Relaxation::Max,
        );

        for (min, max) in [(down_min, down_max), (up_min, up_max)] {
            let layer_terms = Rc::clone(&terms);
            spec.transition(min, &[], move |state, input, values| {
                let (term_min, _) = layer_terms[input.layer].bounds(values);
                state.set_int(min, saturate(input.state.int(min) as i64 + term_min));
            });

            let layer_terms = Rc::clone(&terms);
            spec.transition(max, &[], move |state, input, values| {
                let (_, term_max) = layer_terms[input.layer].bounds(values);
                state.set_int(max, saturate(input.state.int(max) as i64 + term_max));
            });
        }

        spec.arc_check(constraint, move |arc| {
            let term = terms[arc.layer].weight * arc.value as i64;
            let (below_min, below_max) = match arc.child_up {
                Some(up) => (up.int(up_min) as i64, up.int(up_max) as i64),
                None => below[arc.layer],
            };

            arc.parent_down.int(down_min) as i64 + term + below_min <= upper_bound
                && arc.parent_down.int(down_max) as i64 + term + below_max >= lower_bound
        });

        spec.split_priority(move |node| {
            node.down.int(down_max) as i64 - node.down.int(down_min) as i64
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::check_propagation;
    use crate::constraints::post_decision_diagrams;
    use crate::ConstraintOperationError;
    use crate::DecisionDiagramOptions;

    fn weighted_sum(solution: &[i32], weights: &[i32]) -> i32 {
        solution
            .iter()
            .zip(weights)
            .map(|(value, weight)| value * weight)
            .sum()
    }

    #[test]
    fn exact_diagrams_match_the_supported_values() {
        let mut solver = Solver::default();
        let x = (0..4)
            .map(|_| solver.new_bounded_integer(0, 3))
            .collect::<Vec<_>>();
        let weights = [1, 2, -1, 1];
        let _ = post_decision_diagrams(
            &mut solver,
            [sum(x.clone(), weights, 3, 4)],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.assign(x[1], 2).expect("non-empty domain");
        solver.remove(x[3], 0).expect("non-empty domain");
        check_propagation(&mut solver, &x, true, |solution| {
            (3..=4).contains(&weighted_sum(solution, &weights))
        });
    }

    #[test]
    fn relaxed_diagrams_bound_the_remaining_variables() {
        let mut solver = Solver::default();
        let x = (0..6)
            .map(|_| solver.new_bounded_integer(0, 4))
            .collect::<Vec<_>>();
        let weights = [1; 6];
        let _ = post_decision_diagrams(
            &mut solver,
            [sum_equals(x.clone(), weights, 10)],
            DecisionDiagramOptions::relaxed(3),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.assign(x[0], 4).expect("non-empty domain");
        solver.assign(x[1], 4).expect("non-empty domain");
        check_propagation(&mut solver, &x, false, |solution| {
            weighted_sum(solution, &weights) == 10
        });

        for &variable in &x[2..] {
            assert!(solver.upper_bound(variable) <= 2);
        }
    }

    #[test]
    fn negative_domains_and_weights() {
        let mut solver = Solver::default();
        let x = vec![
            solver.new_bounded_integer(-3, 3),
            solver.new_sparse_integer([-2, 0, 5]),
            solver.new_bounded_integer(-1, 2),
        ];
        let weights = [-2, 1, 3];
        let _ = post_decision_diagrams(
            &mut solver,
            [sum(x.clone(), weights, -4, -2)],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        solver.new_checkpoint();
        solver.set_lower_bound(x[0], 0).expect("non-empty domain");
        check_propagation(&mut solver, &x, true, |solution| {
            (-4..=-2).contains(&weighted_sum(solution, &weights))
        });
    }

    #[test]
    fn an_unreachable_sum_is_infeasible() {
        let mut solver = Solver::default();
        let x = (0..3)
            .map(|_| solver.new_bounded_integer(0, 1))
            .collect::<Vec<_>>();

        let result = post_decision_diagrams(
            &mut solver,
            [sum_equals(x, [1, 1, 1], 4)],
            DecisionDiagramOptions::relaxed(2),
        );

        assert!(matches!(
            result,
            Err(ConstraintOperationError::InfeasibleDiagram)
        ));
    }
}
