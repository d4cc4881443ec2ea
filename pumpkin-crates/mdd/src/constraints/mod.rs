//! Defines the constraints which can be propagated through a decision diagram.
//!
//! A constraint is a [`MddConstraint`]: it registers its properties and rules in an [`MddSpec`].
//! The constraints are posted with [`post_decision_diagrams`], which either builds one diagram per
//! constraint or a single diagram for all of them, depending on
//! [`DecisionDiagramOptions::intersection`].
//!
//! ```rust
//! # use pumpkin_mdd::constraints;
//! # use pumpkin_mdd::constraints::MddConstraint;
//! # use pumpkin_mdd::DecisionDiagramOptions;
//! # use pumpkin_mdd::Solver;
//! let mut solver = Solver::default();
//! let x = (0..5)
//!     .map(|_| solver.new_bounded_integer(0, 2))
//!     .collect::<Vec<_>>();
//!
//! let constraints: Vec<Box<dyn MddConstraint>> = vec![
//!     Box::new(constraints::sum(x.clone(), [1; 5], 4, 4)),
//!     Box::new(constraints::sequence(x.clone(), 2, [0], 1, 1)),
//! ];
//! let _ = constraints::post_decision_diagrams(
//!     &mut solver,
//!     constraints,
//!     DecisionDiagramOptions::exact(),
//! )
//! .expect("the root is feasible");
//! ```
mod all_different;
mod among;
mod precedence;
mod sequence;
mod sum;

pub use all_different::*;
pub use among::*;
pub use precedence::*;
pub use sequence::*;
pub use sum::*;

use crate::api::DiagramHandle;
use crate::basic_types::ConstraintOperationError;
use crate::engine::variables::DomainId;
use crate::mdd::MddSpec;
use crate::propagators::DecisionDiagramIntersection;
use crate::propagators::DecisionDiagramOptions;
use crate::Solver;

/// A constraint which can be propagated through a decision diagram.
pub trait MddConstraint {
    /// Registers the constraint in `spec`. The domains of the variables at the root can be read
    /// from `solver`.
    fn install(&self, spec: &mut MddSpec, solver: &Solver);
}

impl<Constraint: MddConstraint + ?Sized> MddConstraint for Box<Constraint> {
    fn install(&self, spec: &mut MddSpec, solver: &Solver) {
        self.as_ref().install(spec, solver)
    }
}

/// Posts `constraints` to `solver` in decision diagrams built with `options`; returns the handles
/// of the created diagrams.
pub fn post_decision_diagrams<Constraint: MddConstraint>(
    solver: &mut Solver,
    constraints: impl IntoIterator<Item = Constraint>,
    options: DecisionDiagramOptions,
) -> Result<Vec<DiagramHandle>, ConstraintOperationError> {
    match options.intersection {
        DecisionDiagramIntersection::All => {
            let mut spec = MddSpec::new();
            for constraint in constraints {
                constraint.install(&mut spec, solver);
            }
            Ok(vec![solver.post_decision_diagram(spec, options)?])
        }
        DecisionDiagramIntersection::None => constraints
            .into_iter()
            .map(|constraint| {
                let mut spec = MddSpec::new();
                constraint.install(&mut spec, solver);
                solver.post_decision_diagram(spec, options)
            })
            .collect(),
    }
}

/// The positions of the variables of a scope among the layers of a diagram.
///
/// The layers of a constraint are fixed once it is registered, since variables are only ever
/// appended to the layer order.
#[derive(Debug, Clone)]
struct ScopePositions {
    /// For every layer up to the last one of the scope, the number of scope variables on the
    /// layers above it.
    positions: Vec<usize>,
    scope_len: usize,
}

impl ScopePositions {
    fn new(spec: &MddSpec, scope: &[DomainId]) -> ScopePositions {
        let mut num_seen = 0;
        let positions = spec
            .variables()
            .iter()
            .map(|variable| {
                let position = num_seen;
                if scope.contains(variable) {
                    num_seen += 1;
                }
                position
            })
            .collect();
        ScopePositions {
            positions,
            scope_len: scope.len(),
        }
    }

    /// The rank of the variable of `layer` among the variables of the scope, in layer order; only
    /// meaningful for layers whose variable is in the scope.
    fn position(&self, layer: usize) -> usize {
        self.positions.get(layer).copied().unwrap_or(0)
    }

    /// The number of variables of the scope below `layer`.
    fn remaining_after(&self, layer: usize) -> usize {
        self.scope_len.saturating_sub(self.position(layer) + 1)
    }
}

/// Propagates `solver` and compares the domains of `variables` with the values supported by the
/// assignments over the domains before propagation which `accept` holds for. An exact diagram
/// removes every unsupported value; a relaxed one may keep some of them.
#[cfg(test)]
fn check_propagation(
    solver: &mut Solver,
    variables: &[DomainId],
    exact: bool,
    accept: impl Fn(&[i32]) -> bool,
) {
    use crate::engine::test_solver::enumerate_solutions;
    use crate::engine::test_solver::supported_values;

    let domains = variables
        .iter()
        .map(|&variable| solver.domain(variable))
        .collect::<Vec<_>>();
    let solutions = enumerate_solutions(&domains, accept);
    let result = solver.propagate();

    if solutions.is_empty() {
        if exact {
            assert!(result.is_err(), "an exact diagram detects infeasibility");
        }
        return;
    }
    assert!(result.is_ok(), "a feasible instance was reported as a conflict");

    let supported = supported_values(variables.len(), &solutions);
    for (&variable, supported) in variables.iter().zip(supported) {
        let domain = solver.domain(variable);
        if exact {
            assert_eq!(supported, domain, "the domain of {variable} is not exact");
        } else {
            assert!(
                supported.iter().all(|value| domain.contains(value)),
                "a supported value of {variable} was removed: {supported:?} vs {domain:?}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagators::CandidateOrdering;
    use crate::propagators::InitialConstruction;
    use crate::propagators::NodeSelection;
    use crate::propagators::SplitStrategy;

    #[test]
    fn positions_follow_the_layer_order() {
        let mut solver = Solver::default();
        let x = (0..4)
            .map(|_| solver.new_bounded_integer(0, 1))
            .collect::<Vec<_>>();

        let mut spec = MddSpec::new();
        let _ = spec.constraint("first", &[x[0], x[1], x[2]]);
        let _ = spec.constraint("second", &[x[3], x[1]]);
        let positions = ScopePositions::new(&spec, &[x[3], x[1]]);

        assert_eq!(0, positions.position(1));
        assert_eq!(1, positions.position(3));
        assert_eq!(1, positions.remaining_after(1));
        assert_eq!(0, positions.remaining_after(3));
    }

    #[test]
    fn separate_diagrams_are_posted_without_intersection() {
        let mut solver = Solver::default();
        let x = (0..3)
            .map(|_| solver.new_bounded_integer(1, 3))
            .collect::<Vec<_>>();

        let diagrams = post_decision_diagrams(
            &mut solver,
            [
                among(x.clone(), [1], 1, 1),
                among(x.clone(), [2], 1, 1),
            ],
            DecisionDiagramOptions {
                intersection: DecisionDiagramIntersection::None,
                ..DecisionDiagramOptions::exact()
            },
        )
        .expect("feasible at the root");

        assert_eq!(2, diagrams.len());
    }

    #[test]
    fn intersection_shares_one_diagram() {
        let mut solver = Solver::default();
        let x = (0..3)
            .map(|_| solver.new_bounded_integer(1, 3))
            .collect::<Vec<_>>();

        let diagrams = post_decision_diagrams(
            &mut solver,
            [
                among(x.clone(), [1], 1, 1),
                among(x.clone(), [2], 1, 1),
            ],
            DecisionDiagramOptions::exact(),
        )
        .expect("feasible at the root");

        assert_eq!(1, diagrams.len());
        let shape = solver.diagram_shape(diagrams[0]).expect("a decision diagram");
        // One 1, one 2 and one 3 in any order.
        assert_eq!(6, shape.num_paths);
    }

    #[test]
    fn every_configuration_keeps_the_supported_values() {
        let configurations = [
            DecisionDiagramOptions::relaxed(2),
            DecisionDiagramOptions {
                split_strategy: SplitStrategy::EquivalenceClass,
                ..DecisionDiagramOptions::relaxed(3)
            },
            DecisionDiagramOptions {
                initial_construction: InitialConstruction::WidthOne,
                node_selection: NodeSelection::FirstRelaxed,
                ..DecisionDiagramOptions::relaxed(3)
            },
            DecisionDiagramOptions {
                group_arc_values: true,
                candidate_ordering: CandidateOrdering::Discovery,
                use_transition_cache: false,
                ..DecisionDiagramOptions::relaxed(2)
            },
            DecisionDiagramOptions {
                node_selection: NodeSelection::MostIncomingArcs,
                candidate_ordering: CandidateOrdering::MostArcs,
                reboot_distance: Some(1),
                split_budget: 3,
                ..DecisionDiagramOptions::relaxed(4)
            },
        ];

        for options in configurations {
            let mut solver = Solver::default();
            let x = (0..5)
                .map(|_| solver.new_bounded_integer(0, 3))
                .collect::<Vec<_>>();
            let constraints: Vec<Box<dyn MddConstraint>> = vec![
                Box::new(all_different(x[..4].to_vec())),
                Box::new(among(x.clone(), [0], 1, 2)),
                Box::new(sum(x.clone(), [1; 5], 6, 8)),
            ];
            let _ = post_decision_diagrams(&mut solver, constraints, options)
                .expect("feasible at the root");

            solver.new_checkpoint();
            solver.assign(x[0], 3).expect("non-empty domain");
            solver.remove(x[4], 3).expect("non-empty domain");
            check_propagation(&mut solver, &x, false, |solution| {
                let distinct = (0..4).all(|i| !solution[i + 1..4].contains(&solution[i]));
                let zeros = solution.iter().filter(|&&value| value == 0).count();
                let total = solution.iter().sum::<i32>();
                distinct && (1..=2).contains(&zeros) && (6..=8).contains(&total)
            });
        }
    }

    #[test]
    fn an_empty_intersection_is_rejected() {
        let mut solver = Solver::default();

        let result = post_decision_diagrams(
            &mut solver,
            Vec::<Among>::new(),
            DecisionDiagramOptions::exact(),
        );

        assert!(matches!(
            result,
            Err(ConstraintOperationError::Specification(_))
        ));
    }
}
