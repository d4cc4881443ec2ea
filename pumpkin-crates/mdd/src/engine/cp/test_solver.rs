#![cfg(test)]
//! This module exposes helpers that aid testing of propagators. The [`TestSolver`] allows setting
//! up specific scenarios under which to test the various operations of a propagator.
use super::propagation::store::PropagatorStore;
use super::propagation::EnqueueDecision;
use super::propagation::LocalId;
use super::propagation::PropagationContext;
use super::propagation::PropagationContextMut;
use super::propagation::Propagator;
use super::propagation::PropagatorConstructor;
use super::propagation::PropagatorConstructorContext;
use super::propagation::PropagatorId;
use super::Assignments;
use super::EmptyDomain;
use super::IntDomainEvent;
use super::TrailedValues;
use super::WatchList;
use crate::basic_types::Inconsistency;
use crate::engine::variables::DomainId;

/// A container for CP variables, which can be used to test propagators.
#[derive(Default, Debug)]
pub(crate) struct TestSolver {
    pub(crate) assignments: Assignments,
    pub(crate) trailed_values: TrailedValues,
    pub(crate) propagator_store: PropagatorStore,
    watch_list: WatchList,
}

impl TestSolver {
    pub(crate) fn new_variable(&mut self, lb: i32, ub: i32) -> DomainId {
        self.watch_list.grow();
        self.assignments.grow(lb, ub)
    }

    pub(crate) fn new_sparse_variable(&mut self, values: Vec<i32>) -> DomainId {
        self.watch_list.grow();
        self.assignments.create_new_integer_variable_sparse(values)
    }

    /// Creates the propagator and propagates it once.
    pub(crate) fn new_propagator<Constructor>(
        &mut self,
        constructor: Constructor,
    ) -> Result<PropagatorId, Inconsistency>
    where
        Constructor: PropagatorConstructor,
        Constructor::PropagatorImpl: 'static,
    {
        let propagator_id = self.propagator_store.next_id();
        let propagator = constructor.create(PropagatorConstructorContext::new(
            &mut self.watch_list,
            &mut self.trailed_values,
            propagator_id,
            &self.assignments,
        ));
        let _ = self.propagator_store.push(Box::new(propagator));

        self.propagate(propagator_id)?;
        Ok(propagator_id)
    }

    /// Downcasts the propagator with the given id to its concrete type.
    pub(crate) fn propagator<P: Propagator>(&self, propagator_id: PropagatorId) -> &P {
        self.propagator_store
            .get::<P>(propagator_id)
            .expect("the propagator has a different type")
    }

    pub(crate) fn contains(&self, var: DomainId, value: i32) -> bool {
        self.assignments.is_value_in_domain(var, value)
    }

    pub(crate) fn lower_bound(&self, var: DomainId) -> i32 {
        self.assignments.get_lower_bound(var)
    }

    pub(crate) fn upper_bound(&self, var: DomainId) -> i32 {
        self.assignments.get_upper_bound(var)
    }

    pub(crate) fn domain(&self, var: DomainId) -> Vec<i32> {
        self.assignments.get_domain_iterator(var).collect()
    }

    pub(crate) fn remove(&mut self, var: DomainId, value: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.remove_value_from_domain(var, value)?;
        Ok(())
    }

    pub(crate) fn set_lower_bound(&mut self, var: DomainId, bound: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.tighten_lower_bound(var, bound)?;
        Ok(())
    }

    pub(crate) fn set_upper_bound(&mut self, var: DomainId, bound: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.tighten_upper_bound(var, bound)?;
        Ok(())
    }

    pub(crate) fn assign(&mut self, var: DomainId, value: i32) -> Result<(), EmptyDomain> {
        let _ = self.assignments.make_assignment(var, value)?;
        Ok(())
    }

    /// Notifies the propagator of the pending events and propagates it once.
    pub(crate) fn propagate(&mut self, propagator_id: PropagatorId) -> Result<(), Inconsistency> {
        self.notify_propagator(propagator_id);
        let context = PropagationContextMut::new(
            &mut self.trailed_values,
            &mut self.assignments,
            propagator_id,
        );
        self.propagator_store[propagator_id].propagate(context)
    }

    pub(crate) fn propagate_until_fixed_point(
        &mut self,
        propagator_id: PropagatorId,
    ) -> Result<(), Inconsistency> {
        let mut num_trail_entries = self.assignments.num_trail_entries();
        loop {
            self.propagate(propagator_id)?;
            if self.assignments.num_trail_entries() == num_trail_entries {
                break;
            }
            num_trail_entries = self.assignments.num_trail_entries();
        }
        Ok(())
    }

    fn notify_propagator(&mut self, propagator_id: PropagatorId) {
        for (domain, event) in self.assignments.drain_domain_events() {
            for watcher in self.watch_list.get_affected_propagators(event, domain) {
                if watcher.propagator == propagator_id {
                    let _ = self.propagator_store[propagator_id].notify(
                        PropagationContext::new(&self.assignments),
                        watcher.local_id,
                        event,
                    );
                }
            }
        }
    }

    pub(crate) fn notify(
        &mut self,
        propagator_id: PropagatorId,
        event: IntDomainEvent,
        local_id: LocalId,
    ) -> EnqueueDecision {
        self.propagator_store[propagator_id].notify(
            PropagationContext::new(&self.assignments),
            local_id,
            event,
        )
    }

    pub(crate) fn assert_bounds(&self, var: DomainId, lb: i32, ub: i32) {
        let actual_lb = self.lower_bound(var);
        let actual_ub = self.upper_bound(var);

        assert_eq!(
            (lb, ub), (actual_lb, actual_ub),
            "The expected bounds [{lb}..{ub}] did not match the actual bounds [{actual_lb}..{actual_ub}]"
        );
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.assignments.increase_decision_level();
        self.trailed_values.new_checkpoint();
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.assignments.get_decision_level()
    }

    /// Backtracks to `level` and synchronises every propagator.
    pub(crate) fn synchronise(&mut self, level: usize) {
        self.assignments.synchronise(level);
        self.trailed_values.synchronise(level);
        for propagator in self.propagator_store.iter_propagators_mut() {
            propagator.synchronise(PropagationContext::new(&self.assignments));
        }
    }
}

/// Enumerates every assignment over `domains` for which `accept` holds; the reference against
/// which the diagrams are checked on small instances.
pub(crate) fn enumerate_solutions(
    domains: &[Vec<i32>],
    accept: impl Fn(&[i32]) -> bool,
) -> Vec<Vec<i32>> {
    let mut solutions = Vec::new();
    let mut current = Vec::with_capacity(domains.len());
    enumerate(domains, &mut current, &accept, &mut solutions);
    solutions
}

fn enumerate(
    domains: &[Vec<i32>],
    current: &mut Vec<i32>,
    accept: &impl Fn(&[i32]) -> bool,
    solutions: &mut Vec<Vec<i32>>,
) {
    if current.len() == domains.len() {
        if accept(current) {
            solutions.push(current.clone());
        }
        return;
    }
    for &value in domains[current.len()].iter() {
        current.push(value);
        enumerate(domains, current, accept, solutions);
        let _ = current.pop();
    }
}

/// For every variable, the values which occur in at least one of the `solutions`.
pub(crate) fn supported_values(num_variables: usize, solutions: &[Vec<i32>]) -> Vec<Vec<i32>> {
    (0..num_variables)
        .map(|index| {
            let mut values = solutions
                .iter()
                .map(|solution| solution[index])
                .collect::<Vec<_>>();
            values.sort_unstable();
            values.dedup();
            values
        })
        .collect()
}
