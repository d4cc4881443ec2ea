/// The labels of the arcs a transition is applied to; a singleton for exact transitions.
///
/// The values are kept sorted and free of duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ValueSet {
    values: Vec<i32>,
}

impl ValueSet {
    pub fn singleton(value: i32) -> ValueSet {
        ValueSet {
            values: vec![value],
        }
    }

    pub(crate) fn from_values(mut values: Vec<i32>) -> ValueSet {
        values.sort_unstable();
        values.dedup();
        ValueSet { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.values.len() == 1
    }

    pub fn contains(&self, value: i32) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.values.iter().copied()
    }

    pub fn min(&self) -> Option<i32> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<i32> {
        self.values.last().copied()
    }

    /// The number of values for which `predicate` holds.
    pub fn count_where(&self, predicate: impl Fn(i32) -> bool) -> usize {
        self.values.iter().filter(|value| predicate(**value)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_sorted_and_deduplicated() {
        let set = ValueSet::from_values(vec![5, 1, 5, 3]);

        assert_eq!(vec![1, 3, 5], set.iter().collect::<Vec<_>>());
        assert_eq!(Some(1), set.min());
        assert_eq!(Some(5), set.max());
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert_eq!(2, set.count_where(|value| value > 2));
    }
}
