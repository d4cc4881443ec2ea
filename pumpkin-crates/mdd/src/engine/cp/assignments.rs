use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::engine::variables::DomainId;
use crate::engine::IntDomainEvent;
use crate::pumpkin_assert_moderate;
use crate::pumpkin_assert_simple;

/// Signals that a domain operation would remove the last value of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyDomain;

/// The finite integer domains of the host solver.
///
/// Every domain is stored as a bitmap over its initial range together with its current bounds.
/// All changes are recorded on a trail and are undone by [`Assignments::synchronise`]; every
/// change also produces [`IntDomainEvent`]s which are collected until the solver drains them.
#[derive(Default, Debug, Clone)]
pub(crate) struct Assignments {
    domains: KeyedVec<DomainId, IntegerDomain>,
    trail: Trail<DomainChange>,
    events: Vec<(DomainId, IntDomainEvent)>,
}

#[derive(Debug, Clone)]
struct IntegerDomain {
    offset: i32,
    lower_bound: i32,
    upper_bound: i32,
    present: Vec<bool>,
    size: usize,
}

impl IntegerDomain {
    fn contains(&self, value: i32) -> bool {
        value >= self.lower_bound
            && value <= self.upper_bound
            && self.present[(value - self.offset) as usize]
    }
}

#[derive(Debug, Clone, Copy)]
enum DomainChange {
    Removal {
        domain: DomainId,
        value: i32,
    },
    Bounds {
        domain: DomainId,
        lower_bound: i32,
        upper_bound: i32,
    },
}

impl Assignments {
    pub(crate) fn grow(&mut self, lower_bound: i32, upper_bound: i32) -> DomainId {
        pumpkin_assert_simple!(lower_bound <= upper_bound, "an empty domain cannot be created");

        let width = (upper_bound - lower_bound + 1) as usize;
        self.domains.push(IntegerDomain {
            offset: lower_bound,
            lower_bound,
            upper_bound,
            present: vec![true; width],
            size: width,
        })
    }

    pub(crate) fn create_new_integer_variable_sparse(&mut self, mut values: Vec<i32>) -> DomainId {
        pumpkin_assert_simple!(!values.is_empty(), "an empty domain cannot be created");
        values.sort_unstable();
        values.dedup();

        let lower_bound = values[0];
        let upper_bound = values[values.len() - 1];
        let mut present = vec![false; (upper_bound - lower_bound + 1) as usize];
        for &value in values.iter() {
            present[(value - lower_bound) as usize] = true;
        }

        self.domains.push(IntegerDomain {
            offset: lower_bound,
            lower_bound,
            upper_bound,
            present,
            size: values.len(),
        })
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub(crate) fn num_domains(&self) -> usize {
        self.domains.len()
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.trail.get_checkpoint()
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.new_checkpoint()
    }

    pub(crate) fn get_lower_bound(&self, domain: DomainId) -> i32 {
        self.domains[domain].lower_bound
    }

    pub(crate) fn get_upper_bound(&self, domain: DomainId) -> i32 {
        self.domains[domain].upper_bound
    }

    /// The smallest value the domain ever held; the diagram indexes its support counters relative
    /// to this value.
    pub(crate) fn get_initial_lower_bound(&self, domain: DomainId) -> i32 {
        self.domains[domain].offset
    }

    pub(crate) fn get_initial_upper_bound(&self, domain: DomainId) -> i32 {
        let integer_domain = &self.domains[domain];
        integer_domain.offset + integer_domain.present.len() as i32 - 1
    }

    pub(crate) fn get_domain_size(&self, domain: DomainId) -> usize {
        self.domains[domain].size
    }

    pub(crate) fn is_value_in_domain(&self, domain: DomainId, value: i32) -> bool {
        self.domains[domain].contains(value)
    }

    pub(crate) fn is_domain_assigned(&self, domain: DomainId) -> bool {
        self.domains[domain].size == 1
    }

    pub(crate) fn get_domain_iterator(&self, domain: DomainId) -> impl Iterator<Item = i32> + '_ {
        let integer_domain = &self.domains[domain];
        (integer_domain.lower_bound..=integer_domain.upper_bound)
            .filter(move |&value| integer_domain.contains(value))
    }

    /// Removes `value` from the domain; returns whether the domain changed.
    pub(crate) fn remove_value_from_domain(
        &mut self,
        domain: DomainId,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.domains[domain].contains(value) {
            return Ok(false);
        }
        if self.domains[domain].size == 1 {
            return Err(EmptyDomain);
        }

        self.remove_unchecked(domain, value);
        self.update_bounds(domain);
        Ok(true)
    }

    pub(crate) fn tighten_lower_bound(
        &mut self,
        domain: DomainId,
        new_lower_bound: i32,
    ) -> Result<bool, EmptyDomain> {
        let integer_domain = &self.domains[domain];
        if new_lower_bound <= integer_domain.lower_bound {
            return Ok(false);
        }
        if new_lower_bound > integer_domain.upper_bound
            || (new_lower_bound..=integer_domain.upper_bound)
                .all(|value| !integer_domain.contains(value))
        {
            return Err(EmptyDomain);
        }

        let removed = (integer_domain.lower_bound..new_lower_bound)
            .filter(|&value| integer_domain.contains(value))
            .collect::<Vec<_>>();
        for value in removed {
            self.remove_unchecked(domain, value);
        }
        self.update_bounds(domain);
        Ok(true)
    }

    pub(crate) fn tighten_upper_bound(
        &mut self,
        domain: DomainId,
        new_upper_bound: i32,
    ) -> Result<bool, EmptyDomain> {
        let integer_domain = &self.domains[domain];
        if new_upper_bound >= integer_domain.upper_bound {
            return Ok(false);
        }
        if new_upper_bound < integer_domain.lower_bound
            || (integer_domain.lower_bound..=new_upper_bound)
                .all(|value| !integer_domain.contains(value))
        {
            return Err(EmptyDomain);
        }

        let removed = (new_upper_bound + 1..=integer_domain.upper_bound)
            .filter(|&value| integer_domain.contains(value))
            .collect::<Vec<_>>();
        for value in removed {
            self.remove_unchecked(domain, value);
        }
        self.update_bounds(domain);
        Ok(true)
    }

    pub(crate) fn make_assignment(
        &mut self,
        domain: DomainId,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.domains[domain].contains(value) {
            return Err(EmptyDomain);
        }
        if self.domains[domain].size == 1 {
            return Ok(false);
        }

        let removed = self
            .get_domain_iterator(domain)
            .filter(|&other| other != value)
            .collect::<Vec<_>>();
        for other in removed {
            self.remove_unchecked(domain, other);
        }
        self.update_bounds(domain);
        Ok(true)
    }

    /// Takes the events which happened since the last call.
    pub(crate) fn drain_domain_events(&mut self) -> Vec<(DomainId, IntDomainEvent)> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn synchronise(&mut self, new_decision_level: usize) {
        pumpkin_assert_simple!(new_decision_level < self.trail.get_checkpoint());

        for change in self.trail.synchronise(new_decision_level) {
            match change {
                DomainChange::Removal { domain, value } => {
                    let integer_domain = &mut self.domains[domain];
                    integer_domain.present[(value - integer_domain.offset) as usize] = true;
                    integer_domain.size += 1;
                }
                DomainChange::Bounds {
                    domain,
                    lower_bound,
                    upper_bound,
                } => {
                    let integer_domain = &mut self.domains[domain];
                    integer_domain.lower_bound = lower_bound;
                    integer_domain.upper_bound = upper_bound;
                }
            }
        }

        // Events of undone changes are meaningless after backtracking.
        self.events.clear();
    }

    fn remove_unchecked(&mut self, domain: DomainId, value: i32) {
        let integer_domain = &mut self.domains[domain];
        pumpkin_assert_moderate!(integer_domain.contains(value));

        integer_domain.present[(value - integer_domain.offset) as usize] = false;
        integer_domain.size -= 1;
        self.trail.push(DomainChange::Removal { domain, value });
        self.events.push((domain, IntDomainEvent::Removal));
    }

    fn update_bounds(&mut self, domain: DomainId) {
        let integer_domain = &self.domains[domain];
        let old_lower_bound = integer_domain.lower_bound;
        let old_upper_bound = integer_domain.upper_bound;

        let is_present =
            |value: &i32| integer_domain.present[(*value - integer_domain.offset) as usize];
        let new_lower_bound = (old_lower_bound..=old_upper_bound)
            .find(is_present)
            .unwrap_or(old_lower_bound);
        let new_upper_bound = (old_lower_bound..=old_upper_bound)
            .rev()
            .find(is_present)
            .unwrap_or(old_upper_bound);

        if new_lower_bound == old_lower_bound && new_upper_bound == old_upper_bound {
            if integer_domain.size == 1 {
                self.events.push((domain, IntDomainEvent::Assign));
            }
            return;
        }

        self.trail.push(DomainChange::Bounds {
            domain,
            lower_bound: old_lower_bound,
            upper_bound: old_upper_bound,
        });

        let integer_domain = &mut self.domains[domain];
        integer_domain.lower_bound = new_lower_bound;
        integer_domain.upper_bound = new_upper_bound;

        if new_lower_bound != old_lower_bound {
            self.events.push((domain, IntDomainEvent::LowerBound));
        }
        if new_upper_bound != old_upper_bound {
            self.events.push((domain, IntDomainEvent::UpperBound));
        }
        if integer_domain.size == 1 {
            self.events.push((domain, IntDomainEvent::Assign));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_a_bound_moves_the_bound() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(1, 5);

        assert_eq!(Ok(true), assignments.remove_value_from_domain(x, 1));
        assert_eq!(2, assignments.get_lower_bound(x));

        assert_eq!(Ok(true), assignments.remove_value_from_domain(x, 3));
        assert_eq!(Ok(true), assignments.tighten_upper_bound(x, 3));
        assert_eq!(2, assignments.get_upper_bound(x));
        assert!(assignments.is_domain_assigned(x));
    }

    #[test]
    fn removing_the_last_value_is_an_empty_domain() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(1, 2);

        assert_eq!(Ok(true), assignments.make_assignment(x, 2));
        assert_eq!(Err(EmptyDomain), assignments.remove_value_from_domain(x, 2));
        assert!(assignments.is_value_in_domain(x, 2));
    }

    #[test]
    fn synchronise_restores_holes_and_bounds() {
        let mut assignments = Assignments::default();
        let x = assignments.create_new_integer_variable_sparse(vec![1, 3, 5, 7]);

        assignments.increase_decision_level();
        let _ = assignments.remove_value_from_domain(x, 3).unwrap();
        let _ = assignments.tighten_lower_bound(x, 4).unwrap();
        assert_eq!(vec![5, 7], assignments.get_domain_iterator(x).collect::<Vec<_>>());

        assignments.synchronise(0);
        assert_eq!(
            vec![1, 3, 5, 7],
            assignments.get_domain_iterator(x).collect::<Vec<_>>()
        );
        assert_eq!(4, assignments.get_domain_size(x));
        assert!(assignments.drain_domain_events().is_empty());
    }

    #[test]
    fn events_are_reported() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(0, 2);

        let _ = assignments.tighten_lower_bound(x, 2).unwrap();
        let events = assignments
            .drain_domain_events()
            .into_iter()
            .map(|(_, event)| event)
            .collect::<Vec<_>>();

        assert!(events.contains(&IntDomainEvent::Removal));
        assert!(events.contains(&IntDomainEvent::LowerBound));
        assert!(events.contains(&IntDomainEvent::Assign));
        assert!(!events.contains(&IntDomainEvent::UpperBound));
    }
}
