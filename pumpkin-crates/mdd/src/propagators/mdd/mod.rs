mod options;

use log::warn;
pub use options::*;

use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorConstructor;
use crate::engine::propagation::PropagatorConstructorContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::DomainEvents;
use crate::engine::IntDomainEvent;
use crate::mdd::diagram::DecisionDiagram;
use crate::mdd::spec::CompiledSpec;
use crate::mdd::DiagramShape;
use crate::mdd::MddStatistics;
use crate::statistics::StatisticLogger;

/// The [`PropagatorConstructor`] for the [`MddPropagator`].
#[derive(Debug)]
pub(crate) struct MddPropagatorArgs {
    pub(crate) spec: CompiledSpec,
    pub(crate) options: DecisionDiagramOptions,
}

impl PropagatorConstructor for MddPropagatorArgs {
    type PropagatorImpl = MddPropagator;

    fn create(self, mut context: PropagatorConstructorContext) -> Self::PropagatorImpl {
        let MddPropagatorArgs { spec, options } = self;

        if options.split_strategy == SplitStrategy::EquivalenceClass && options.max_width.is_some()
        {
            warn!("splitting by equivalence class may create fewer nodes than an exact split");
        }

        for (layer, &variable) in spec.variables().iter().enumerate() {
            context.register(variable, DomainEvents::ANY_INT, LocalId::from(layer as u32));
        }

        MddPropagator {
            diagram: DecisionDiagram::new(spec, options, &mut context),
            statistics: MddStatistics::default(),
        }
    }
}

/// Propagates a group of constraints through a (possibly relaxed) decision diagram over the
/// union of their scopes.
///
/// The diagram is built on the first propagation. It follows the search: nodes and arcs removed
/// at a decision level come back when the solver backtracks above that level.
#[derive(Debug)]
pub(crate) struct MddPropagator {
    diagram: DecisionDiagram,
    /// The metrics accumulated over all propagations.
    statistics: MddStatistics,
}

impl MddPropagator {
    pub(crate) fn shape(&self) -> DiagramShape {
        self.diagram.shape()
    }

    pub(crate) fn to_dot(&self) -> String {
        self.diagram.to_dot()
    }

    pub(crate) fn statistics(&self) -> MddStatistics {
        self.statistics
    }

    /// The metrics of the most recent propagation.
    pub(crate) fn last_statistics(&self) -> MddStatistics {
        self.diagram.statistics()
    }

    #[cfg(test)]
    pub(crate) fn states(&self) -> Vec<Vec<[crate::mdd::state::State; 3]>> {
        self.diagram.states()
    }
}

impl Propagator for MddPropagator {
    fn name(&self) -> &str {
        "DecisionDiagram"
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        let result = self.diagram.propagate(&mut context);
        self.statistics.accumulate(&self.diagram.statistics());
        result
    }

    fn notify(
        &mut self,
        _context: PropagationContext,
        local_id: LocalId,
        _event: IntDomainEvent,
    ) -> EnqueueDecision {
        self.diagram.notify(local_id.unpack() as usize);
        EnqueueDecision::Enqueue
    }

    fn synchronise(&mut self, context: PropagationContext) {
        self.diagram.synchronise(context.get_checkpoint());
    }

    fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::Rng;
    use rand::SeedableRng;

    use super::*;
    use crate::engine::propagation::PropagatorId;
    use crate::engine::test_solver::enumerate_solutions;
    use crate::engine::test_solver::supported_values;
    use crate::engine::test_solver::TestSolver;
    use crate::engine::variables::DomainId;
    use crate::mdd::state::State;
    use crate::mdd::state::StateKind;
    use crate::mdd::MddSpec;
    use crate::mdd::Relaxation;

    /// At most `limit` of the `variables` take `value`.
    fn at_most(variables: &[DomainId], value: i32, limit: i32) -> CompiledSpec {
        let mut spec = MddSpec::new();
        let constraint = spec.constraint("at_most", variables);
        let count = spec.int_property(
            constraint,
            StateKind::Down,
            0,
            0..=variables.len() as i32,
            Relaxation::Min,
        );
        spec.transition(count, &[], move |state, input, values| {
            let all = values.iter().all(|label| label == value);
            state.set_int(count, input.state.int(count) + i32::from(all));
        });
        spec.arc_check(constraint, move |arc| {
            arc.parent_down.int(count) + i32::from(arc.value == value) <= limit
        });
        spec.compile().expect("a valid specification")
    }

    fn count_of(solution: &[i32], value: i32) -> i32 {
        solution.iter().filter(|&&label| label == value).count() as i32
    }

    type Snapshot = (String, Vec<Vec<[State; 3]>>, Vec<Vec<i32>>);

    fn snapshot(solver: &TestSolver, propagator: PropagatorId, variables: &[DomainId]) -> Snapshot {
        let diagram = solver.propagator::<MddPropagator>(propagator);
        (
            diagram.to_dot(),
            diagram.states(),
            variables
                .iter()
                .map(|&variable| solver.domain(variable))
                .collect(),
        )
    }

    #[test]
    fn the_limit_removes_the_counted_value() {
        let mut solver = TestSolver::default();
        let x = (0..3)
            .map(|_| solver.new_variable(0, 1))
            .collect::<Vec<_>>();
        let propagator = solver
            .new_propagator(MddPropagatorArgs {
                spec: at_most(&x, 1, 1),
                options: DecisionDiagramOptions::exact(),
            })
            .expect("no empty domains");

        solver.increase_decision_level();
        solver.assign(x[0], 1).expect("non-empty domain");
        solver
            .propagate_until_fixed_point(propagator)
            .expect("no empty domains");

        solver.assert_bounds(x[1], 0, 0);
        solver.assert_bounds(x[2], 0, 0);
    }

    #[test]
    fn exceeding_the_limit_is_a_conflict() {
        let mut solver = TestSolver::default();
        let x = (0..4)
            .map(|_| solver.new_variable(0, 2))
            .collect::<Vec<_>>();
        let propagator = solver
            .new_propagator(MddPropagatorArgs {
                spec: at_most(&x, 2, 1),
                options: DecisionDiagramOptions::relaxed(2),
            })
            .expect("no empty domains");

        solver.increase_decision_level();
        solver.assign(x[1], 2).expect("non-empty domain");
        solver.assign(x[3], 2).expect("non-empty domain");

        assert!(solver.propagate_until_fixed_point(propagator).is_err());
    }

    #[test]
    fn holes_and_bounds_are_respected() {
        let mut solver = TestSolver::default();
        let x = vec![
            solver.new_sparse_variable(vec![0, 2, 5]),
            solver.new_variable(0, 5),
            solver.new_variable(0, 5),
        ];
        let propagator = solver
            .new_propagator(MddPropagatorArgs {
                spec: at_most(&x, 2, 0),
                options: DecisionDiagramOptions::exact(),
            })
            .expect("no empty domains");

        for &variable in &x {
            assert!(!solver.contains(variable, 2));
        }
        assert_eq!(vec![0, 5], solver.domain(x[0]));

        solver.increase_decision_level();
        assert_eq!(1, solver.get_decision_level());
        solver.set_lower_bound(x[1], 3).expect("non-empty domain");
        solver.set_upper_bound(x[2], 1).expect("non-empty domain");
        solver
            .propagate_until_fixed_point(propagator)
            .expect("no empty domains");

        solver.assert_bounds(x[0], 0, 5);
        solver.assert_bounds(x[1], 3, 5);
        solver.assert_bounds(x[2], 0, 1);
    }

    #[test]
    fn every_domain_event_enqueues_the_propagator() {
        let mut solver = TestSolver::default();
        let x = (0..2)
            .map(|_| solver.new_variable(0, 1))
            .collect::<Vec<_>>();
        let propagator = solver
            .new_propagator(MddPropagatorArgs {
                spec: at_most(&x, 1, 1),
                options: DecisionDiagramOptions::exact(),
            })
            .expect("no empty domains");

        let decision = solver.notify(propagator, IntDomainEvent::Removal, LocalId::from(1));

        assert_eq!(EnqueueDecision::Enqueue, decision);
    }

    #[test]
    fn a_second_propagation_changes_nothing() {
        for options in [
            DecisionDiagramOptions::exact(),
            DecisionDiagramOptions::relaxed(2),
        ] {
            let mut solver = TestSolver::default();
            let x = (0..5)
                .map(|_| solver.new_variable(0, 3))
                .collect::<Vec<_>>();
            let propagator = solver
                .new_propagator(MddPropagatorArgs {
                    spec: at_most(&x, 3, 2),
                    options,
                })
                .expect("no empty domains");

            solver.increase_decision_level();
            solver.assign(x[0], 3).expect("non-empty domain");
            solver.remove(x[2], 0).expect("non-empty domain");
            solver
                .propagate_until_fixed_point(propagator)
                .expect("no empty domains");
            let before = snapshot(&solver, propagator, &x);

            solver.propagate(propagator).expect("no empty domains");

            assert_eq!(before, snapshot(&solver, propagator, &x));
        }
    }

    /// Descends a few levels with random decisions, then backtracks one level at a time and
    /// compares the diagram with the one recorded at that level.
    fn check_rollback(options: DecisionDiagramOptions, seed: u64) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut solver = TestSolver::default();
        let x = (0..6)
            .map(|_| solver.new_variable(0, 3))
            .collect::<Vec<_>>();
        let propagator = solver
            .new_propagator(MddPropagatorArgs {
                spec: at_most(&x, 3, 2),
                options,
            })
            .expect("no empty domains");

        let mut snapshots = vec![snapshot(&solver, propagator, &x)];
        for _ in 0..5 {
            solver.increase_decision_level();

            let variable = x[rng.gen_range(0..x.len())];
            let domain = solver.domain(variable);
            let value = domain[rng.gen_range(0..domain.len())];
            if domain.len() > 1 && rng.gen_bool(0.5) {
                solver.remove(variable, value).expect("non-empty domain");
            } else {
                solver.assign(variable, value).expect("non-empty domain");
            }

            if solver.propagate_until_fixed_point(propagator).is_err() {
                solver.synchronise(snapshots.len() - 1);
                break;
            }
            snapshots.push(snapshot(&solver, propagator, &x));
        }

        while let Some(expected) = snapshots.pop() {
            // A conflict already backtracked to the level of the last snapshot.
            if solver.get_decision_level() > snapshots.len() {
                solver.synchronise(snapshots.len());
            }
            assert_eq!(
                expected,
                snapshot(&solver, propagator, &x),
                "the diagram differs after backtracking to level {}",
                snapshots.len()
            );
        }
    }

    #[test]
    fn backtracking_restores_exact_diagrams() {
        let _ = env_logger::builder().is_test(true).try_init();
        for seed in 0..50 {
            check_rollback(DecisionDiagramOptions::exact(), seed);
        }
    }

    #[test]
    fn backtracking_restores_relaxed_diagrams() {
        let _ = env_logger::builder().is_test(true).try_init();
        for seed in 0..50 {
            check_rollback(DecisionDiagramOptions::relaxed(2), seed);
            check_rollback(DecisionDiagramOptions::relaxed(3), seed);
        }
    }

    /// Sets up four variables over `0..=3` at the root, applies `removals` one level deeper and
    /// returns the domains before propagation together with the result of propagating.
    fn propagate_after_removals(
        solver: &mut TestSolver,
        options: DecisionDiagramOptions,
        limit: i32,
        removals: &[(usize, i32)],
    ) -> (Vec<DomainId>, Vec<Vec<i32>>, bool) {
        let x = (0..4)
            .map(|_| solver.new_variable(0, 3))
            .collect::<Vec<_>>();
        let propagator = solver
            .new_propagator(MddPropagatorArgs {
                spec: at_most(&x, 2, limit),
                options,
            })
            .expect("no empty domains");

        solver.increase_decision_level();
        for &(index, value) in removals {
            if solver.domain(x[index]).len() > 1 {
                let _ = solver.remove(x[index], value);
            }
        }
        let domains = x
            .iter()
            .map(|&variable| solver.domain(variable))
            .collect::<Vec<_>>();
        let feasible = solver.propagate_until_fixed_point(propagator).is_ok();
        (x, domains, feasible)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn exact_diagrams_keep_exactly_the_supported_values(
            removals in proptest::collection::vec((0..4_usize, 0..4_i32), 0..10),
            limit in 0..3_i32,
        ) {
            let mut solver = TestSolver::default();
            let (x, domains, feasible) = propagate_after_removals(
                &mut solver,
                DecisionDiagramOptions::exact(),
                limit,
                &removals,
            );
            let solutions = enumerate_solutions(&domains, |solution| {
                count_of(solution, 2) <= limit
            });

            prop_assert_eq!(!solutions.is_empty(), feasible);
            if feasible {
                let domains = x.iter().map(|&variable| solver.domain(variable)).collect::<Vec<_>>();
                prop_assert_eq!(supported_values(x.len(), &solutions), domains);
            }
        }

        #[test]
        fn relaxed_diagrams_keep_every_supported_value(
            removals in proptest::collection::vec((0..4_usize, 0..4_i32), 0..10),
            limit in 0..3_i32,
            width in 1..4_usize,
        ) {
            let mut solver = TestSolver::default();
            let (x, domains, feasible) = propagate_after_removals(
                &mut solver,
                DecisionDiagramOptions::relaxed(width),
                limit,
                &removals,
            );
            let solutions = enumerate_solutions(&domains, |solution| {
                count_of(solution, 2) <= limit
            });

            if !solutions.is_empty() {
                prop_assert!(feasible);
                for (index, supported) in supported_values(x.len(), &solutions).iter().enumerate() {
                    let domain = solver.domain(x[index]);
                    prop_assert!(supported.iter().all(|value| domain.contains(value)));
                }
            }
        }
    }
}
