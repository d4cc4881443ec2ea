use crate::containers::HashMap;
use crate::mdd::state::State;
use crate::mdd::MddStatistics;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TransitionKey {
    layer: usize,
    value: i32,
    down: State,
    combined: Option<State>,
}

/// Memoises down transitions over a single value within one propagation.
///
/// Transitions only depend on the layer, the value and the down and combined state of the
/// parent, so nodes of a layer which share their state share the transition result.
#[derive(Debug, Default)]
pub(super) struct TransitionCache {
    entries: HashMap<TransitionKey, State>,
    enabled: bool,
}

impl TransitionCache {
    pub(super) fn new(enabled: bool) -> TransitionCache {
        TransitionCache {
            entries: HashMap::default(),
            enabled,
        }
    }

    pub(super) fn transition(
        &mut self,
        layer: usize,
        value: i32,
        down: &State,
        combined: Option<&State>,
        statistics: &mut MddStatistics,
        compute: impl FnOnce() -> State,
    ) -> State {
        if !self.enabled {
            return compute();
        }

        let key = TransitionKey {
            layer,
            value,
            down: down.clone(),
            combined: combined.cloned(),
        };
        if let Some(state) = self.entries.get(&key) {
            statistics.num_transition_cache_hits += 1;
            return state.clone();
        }

        statistics.num_transition_cache_misses += 1;
        let state = compute();
        let _ = self.entries.insert(key, state.clone());
        state
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }
}
