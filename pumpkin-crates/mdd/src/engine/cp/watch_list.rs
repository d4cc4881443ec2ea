use enumset::EnumSet;

use super::propagation::LocalId;
use super::propagation::PropagatorId;
use crate::containers::KeyedVec;
use crate::engine::variables::DomainId;
use crate::engine::IntDomainEvent;

/// Stores, for every domain, which propagators want to be notified of which events.
#[derive(Default, Debug)]
pub(crate) struct WatchList {
    watchers: KeyedVec<DomainId, Vec<Watcher>>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Watcher {
    pub(crate) propagator: PropagatorId,
    pub(crate) local_id: LocalId,
    events: EnumSet<IntDomainEvent>,
}

impl WatchList {
    pub(crate) fn grow(&mut self) {
        let _ = self.watchers.push(Vec::default());
    }

    pub(crate) fn watch(
        &mut self,
        domain: DomainId,
        propagator: PropagatorId,
        local_id: LocalId,
        events: EnumSet<IntDomainEvent>,
    ) {
        self.watchers[domain].push(Watcher {
            propagator,
            local_id,
            events,
        });
    }

    pub(crate) fn get_affected_propagators(
        &self,
        event: IntDomainEvent,
        domain: DomainId,
    ) -> impl Iterator<Item = Watcher> + '_ {
        self.watchers[domain]
            .iter()
            .filter(move |watcher| watcher.events.contains(event))
            .copied()
    }
}
