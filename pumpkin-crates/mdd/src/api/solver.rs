use log::debug;

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatusCP;
use crate::create_statistics_struct;
use crate::engine::propagation::store::PropagatorStore;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorConstructor;
use crate::engine::propagation::PropagatorConstructorContext;
use crate::engine::propagation::PropagatorId;
use crate::engine::variables::DomainId;
use crate::engine::Assignments;
use crate::engine::EmptyDomain;
use crate::engine::PropagatorQueue;
use crate::engine::TrailedValues;
use crate::engine::WatchList;
use crate::mdd::DiagramShape;
use crate::mdd::MddSpec;
use crate::mdd::MddStatistics;
use crate::propagators::mdd::MddPropagator;
use crate::propagators::mdd::MddPropagatorArgs;
use crate::propagators::DecisionDiagramOptions;
use crate::pumpkin_assert_simple;
use crate::statistics::log_statistic_postfix;
use crate::statistics::should_log_statistics;
use crate::statistics::StatisticLogger;

create_statistics_struct!(
    /// The counters of the [`Solver`].
    SolverStatistics {
        /// The number of times a propagator was called.
        num_propagator_calls: u64,
        num_conflicts: u64,
        num_backtracks: u64,
        /// The number of checkpoints which were created.
        num_checkpoints: u64,
    }
);

/// Refers to a decision diagram which was posted to a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagramHandle(PropagatorId);

impl DiagramHandle {
    pub fn propagator_id(&self) -> PropagatorId {
        self.0
    }
}

/// A small host in which decision diagrams are propagated: it owns the integer variables, the
/// propagators and the reversible state, and propagates to a fixed point with a priority queue of
/// propagators.
///
/// The search is driven by the user of the solver: a checkpoint is created with
/// [`Solver::new_checkpoint`], after which domains are changed and [`Solver::propagate`] is
/// called. A failed propagation is undone with [`Solver::backtrack`].
///
/// ```rust
/// # use pumpkin_mdd::constraints;
/// # use pumpkin_mdd::DecisionDiagramOptions;
/// # use pumpkin_mdd::Solver;
/// let mut solver = Solver::default();
/// let x = (0..3)
///     .map(|_| solver.new_bounded_integer(1, 3))
///     .collect::<Vec<_>>();
///
/// let _ = constraints::post_decision_diagrams(
///     &mut solver,
///     [constraints::all_different(x.clone())],
///     DecisionDiagramOptions::relaxed(4),
/// )
/// .expect("the root is feasible");
///
/// solver.new_checkpoint();
/// solver.assign(x[0], 1).expect("1 is in the domain");
/// assert!(solver.propagate().is_ok());
/// assert!(!solver.contains(x[1], 1));
/// assert!(!solver.contains(x[2], 1));
///
/// solver.backtrack(0);
/// assert!(solver.contains(x[1], 1));
/// ```
#[derive(Debug, Default)]
pub struct Solver {
    assignments: Assignments,
    trailed_values: TrailedValues,
    watch_list: WatchList,
    propagators: PropagatorStore,
    propagator_queue: PropagatorQueue,
    /// The conflict which was found at the root; once it is set, nothing can be propagated.
    root_conflict: Option<Inconsistency>,
    counters: SolverStatistics,
}

impl Solver {
    /// Creates a solver and warns when expensive assertions are enabled.
    pub fn new() -> Solver {
        crate::print_pumpkin_assert_warning_message!();
        Solver::default()
    }

    /// Creates a variable with the domain `[lower_bound, upper_bound]`.
    pub fn new_bounded_integer(&mut self, lower_bound: i32, upper_bound: i32) -> DomainId {
        pumpkin_assert_simple!(
            self.get_checkpoint() == 0,
            "variables can only be created at the root"
        );
        self.watch_list.grow();
        self.assignments.grow(lower_bound, upper_bound)
    }

    /// Creates a variable whose domain consists of the given values.
    pub fn new_sparse_integer(&mut self, values: impl Into<Vec<i32>>) -> DomainId {
        pumpkin_assert_simple!(
            self.get_checkpoint() == 0,
            "variables can only be created at the root"
        );
        self.watch_list.grow();
        self.assignments
            .create_new_integer_variable_sparse(values.into())
    }

    pub fn num_variables(&self) -> usize {
        self.assignments.num_domains()
    }

    pub fn lower_bound(&self, variable: DomainId) -> i32 {
        self.assignments.get_lower_bound(variable)
    }

    pub fn upper_bound(&self, variable: DomainId) -> i32 {
        self.assignments.get_upper_bound(variable)
    }

    pub fn contains(&self, variable: DomainId, value: i32) -> bool {
        self.assignments.is_value_in_domain(variable, value)
    }

    pub fn domain_size(&self, variable: DomainId) -> usize {
        self.assignments.get_domain_size(variable)
    }

    pub fn is_fixed(&self, variable: DomainId) -> bool {
        self.assignments.is_domain_assigned(variable)
    }

    /// The values in the domain of `variable` in increasing order.
    pub fn domain(&self, variable: DomainId) -> Vec<i32> {
        self.assignments.get_domain_iterator(variable).collect()
    }

    /// Removes `value` from the domain of `variable`; the change is propagated by the next call
    /// to [`Solver::propagate`].
    pub fn remove(&mut self, variable: DomainId, value: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.remove_value_from_domain(variable, value)?;
        Ok(())
    }

    pub fn set_lower_bound(&mut self, variable: DomainId, bound: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.tighten_lower_bound(variable, bound)?;
        Ok(())
    }

    pub fn set_upper_bound(&mut self, variable: DomainId, bound: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.tighten_upper_bound(variable, bound)?;
        Ok(())
    }

    pub fn assign(&mut self, variable: DomainId, value: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.make_assignment(variable, value)?;
        Ok(())
    }

    /// Posts a decision diagram for the constraints registered in `spec`.
    ///
    /// The diagram is built and propagated immediately; if this shows that the constraints
    /// cannot be satisfied, [`ConstraintOperationError::InfeasibleDiagram`] is returned and the
    /// solver is infeasible from then on.
    pub fn post_decision_diagram(
        &mut self,
        spec: MddSpec,
        options: DecisionDiagramOptions,
    ) -> Result<DiagramHandle, ConstraintOperationError> {
        options.validate()?;
        let spec = spec.compile()?;
        debug!(
            "posting a decision diagram over {} variables with maximum width {:?}",
            spec.num_variables(),
            options.max_width
        );

        self.add_propagator(MddPropagatorArgs { spec, options })
            .map(DiagramHandle)
    }

    /// Adds a propagator at the root and propagates until a fixed point is reached.
    pub(crate) fn add_propagator<Constructor>(
        &mut self,
        constructor: Constructor,
    ) -> Result<PropagatorId, ConstraintOperationError>
    where
        Constructor: PropagatorConstructor,
        Constructor::PropagatorImpl: 'static,
    {
        pumpkin_assert_simple!(
            self.get_checkpoint() == 0,
            "propagators can only be added at the root"
        );
        if self.root_conflict.is_some() {
            return Err(ConstraintOperationError::InfeasibleState);
        }

        let propagator_id = self.propagators.next_id();
        let constructor_context = PropagatorConstructorContext::new(
            &mut self.watch_list,
            &mut self.trailed_values,
            propagator_id,
            &self.assignments,
        );
        let propagator = constructor.create(constructor_context);
        let priority = propagator.priority();

        let new_propagator_id = self.propagators.push(Box::new(propagator));
        pumpkin_assert_simple!(new_propagator_id == propagator_id);

        self.propagator_queue
            .enqueue_propagator(propagator_id, priority);
        self.propagate()
            .map(|_| propagator_id)
            .map_err(|_| ConstraintOperationError::InfeasibleDiagram)
    }

    /// Propagates the enqueued propagators until none of them changes a domain.
    ///
    /// On a conflict the queue is emptied; the caller is expected to [`Solver::backtrack`] to an
    /// earlier checkpoint. A conflict at the root makes the solver infeasible.
    pub fn propagate(&mut self) -> PropagationStatusCP {
        if let Some(conflict) = self.root_conflict {
            return Err(conflict);
        }

        self.notify_propagators();
        let result = self.propagate_enqueued();

        if let Err(conflict) = result {
            self.counters.num_conflicts += 1;
            self.propagator_queue.clear();
            if self.get_checkpoint() == 0 {
                debug!("the root is infeasible");
                self.root_conflict = Some(conflict);
            }
        }
        result
    }

    fn propagate_enqueued(&mut self) -> PropagationStatusCP {
        while let Some(propagator_id) = self.propagator_queue.pop() {
            self.counters.num_propagator_calls += 1;

            let context = PropagationContextMut::new(
                &mut self.trailed_values,
                &mut self.assignments,
                propagator_id,
            );
            self.propagators[propagator_id].propagate(context)?;

            self.notify_propagators();
        }
        Ok(())
    }

    /// Hands the domain events since the last call to the propagators watching them.
    fn notify_propagators(&mut self) {
        for (domain, event) in self.assignments.drain_domain_events() {
            for watcher in self.watch_list.get_affected_propagators(event, domain) {
                let context = PropagationContext::new(&self.assignments);
                let propagator = &mut self.propagators[watcher.propagator];

                if propagator.notify(context, watcher.local_id, event) == EnqueueDecision::Enqueue {
                    let priority = propagator.priority();
                    self.propagator_queue
                        .enqueue_propagator(watcher.propagator, priority);
                }
            }
        }
    }

    /// Creates a checkpoint to which the solver can [`Solver::backtrack`].
    pub fn new_checkpoint(&mut self) {
        self.counters.num_checkpoints += 1;
        self.assignments.increase_decision_level();
        self.trailed_values.new_checkpoint();
    }

    /// The number of checkpoints which are currently open; the root is checkpoint 0.
    pub fn get_checkpoint(&self) -> usize {
        self.assignments.get_decision_level()
    }

    /// Undoes every change made after `checkpoint` was created, including the changes to the
    /// decision diagrams.
    pub fn backtrack(&mut self, checkpoint: usize) {
        pumpkin_assert_simple!(checkpoint < self.get_checkpoint());
        self.counters.num_backtracks += 1;

        self.assignments.synchronise(checkpoint);
        self.trailed_values.synchronise(checkpoint);
        self.propagator_queue.clear();

        for propagator in self.propagators.iter_propagators_mut() {
            propagator.synchronise(PropagationContext::new(&self.assignments));
        }
    }

    pub fn statistics(&self) -> SolverStatistics {
        self.counters
    }

    fn diagram(&self, diagram: DiagramHandle) -> Option<&MddPropagator> {
        self.propagators.get::<MddPropagator>(diagram.0)
    }

    /// The shape of the live part of a posted diagram.
    pub fn diagram_shape(&self, diagram: DiagramHandle) -> Option<DiagramShape> {
        self.diagram(diagram).map(MddPropagator::shape)
    }

    /// Renders the live part of a posted diagram in the DOT format of Graphviz.
    pub fn diagram_dot(&self, diagram: DiagramHandle) -> Option<String> {
        self.diagram(diagram).map(MddPropagator::to_dot)
    }

    /// The metrics of a posted diagram, accumulated over all of its propagations.
    pub fn diagram_statistics(&self, diagram: DiagramHandle) -> Option<MddStatistics> {
        self.diagram(diagram).map(MddPropagator::statistics)
    }

    /// The metrics of the most recent propagation of a posted diagram.
    pub fn last_diagram_statistics(&self, diagram: DiagramHandle) -> Option<MddStatistics> {
        self.diagram(diagram).map(MddPropagator::last_statistics)
    }

    /// Logs the statistics of the solver and of every propagator.
    pub fn log_statistics(&self) {
        if should_log_statistics() {
            self.counters.log(StatisticLogger::new(["solver"]));
            for (index, propagator) in self.propagators.iter_propagators().enumerate() {
                propagator.log_statistics(StatisticLogger::new([
                    propagator.name(),
                    "number",
                    index.to_string().as_str(),
                ]));
            }
            log_statistic_postfix();
        }
    }
}
