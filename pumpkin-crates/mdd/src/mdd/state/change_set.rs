use super::PropertyLayout;
use super::State;

/// A set of property indices of one state kind, used to record which properties changed and
/// which need to be recomputed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ChangeSet {
    words: Vec<u64>,
}

impl ChangeSet {
    /// A change set containing every index in `0..num_properties`.
    pub(crate) fn full(num_properties: usize) -> ChangeSet {
        let mut set = ChangeSet::default();
        for index in 0..num_properties {
            let _ = set.insert(index);
        }
        set
    }

    pub(crate) fn insert(&mut self, index: usize) -> bool {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1 << (index % 64);
        let was_absent = self.words[word] & mask == 0;
        self.words[word] |= mask;
        was_absent
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    pub(crate) fn union_with(&mut self, other: &ChangeSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        self.words
            .iter_mut()
            .zip(&other.words)
            .for_each(|(a, b)| *a |= b);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub(crate) fn clear(&mut self) {
        self.words.clear();
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, word)| {
            let mut remaining = *word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(index * 64 + bit)
            })
        })
    }

    /// The properties whose values differ between `old` and `new`.
    pub(crate) fn diff(layout: &PropertyLayout, old: &State, new: &State) -> ChangeSet {
        let mut changes = ChangeSet::default();
        if old.cached_hash() == new.cached_hash() && old.words() == new.words() {
            return changes;
        }
        for index in 0..layout.num_properties() {
            if !layout.property_equal(index, old, new) {
                let _ = changes.insert(index);
            }
        }
        changes
    }
}

impl FromIterator<usize> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut set = ChangeSet::default();
        for index in iter {
            let _ = set.insert(index);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdd::state::IntProperty;
    use crate::mdd::state::PropertyId;
    use crate::mdd::state::PropertyKind;
    use crate::mdd::state::StateKind;

    #[test]
    fn diff_reports_exactly_the_modified_properties() {
        let kind = PropertyKind::Int {
            lower: 0,
            upper: 10,
        };
        let layout = PropertyLayout::layout([kind, kind, kind]);
        let old = layout.zeroed_state();
        let mut new = old.clone();
        new.view_mut(&layout).set_int(
            IntProperty(PropertyId {
                kind: StateKind::Down,
                index: 1,
            }),
            4,
        );
        new.rehash();

        let changes = ChangeSet::diff(&layout, &old, &new);
        assert_eq!(vec![1], changes.iter().collect::<Vec<_>>());
        assert!(ChangeSet::diff(&layout, &old, &old).is_empty());
    }

    #[test]
    fn union_grows_to_fit() {
        let mut left: ChangeSet = [1, 3].into_iter().collect();
        let right: ChangeSet = [70].into_iter().collect();
        left.union_with(&right);

        assert!(left.contains(70));
        assert!(left.contains(3));
        assert!(!left.contains(2));
        assert_eq!(3, left.iter().count());
    }
}
