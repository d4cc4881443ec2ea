/// A read-only view of a set property stored as a bitmask over `0..universe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitSetRef<'a> {
    words: &'a [u64],
    universe: u32,
}

impl<'a> BitSetRef<'a> {
    pub(crate) fn new(words: &'a [u64], universe: u32) -> Self {
        BitSetRef { words, universe }
    }

    pub fn universe(&self) -> u32 {
        self.universe
    }

    pub fn contains(&self, element: u32) -> bool {
        element < self.universe && self.words[(element / 64) as usize] & (1 << (element % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// The number of elements in the union of `self` and `other`.
    pub fn union_len(&self, other: BitSetRef<'_>) -> usize {
        self.words
            .iter()
            .zip(other.words)
            .map(|(a, b)| (a | b).count_ones() as usize)
            .sum()
    }

    pub fn is_subset_of(&self, other: BitSetRef<'_>) -> bool {
        self.words.iter().zip(other.words).all(|(a, b)| a & !b == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        let words = self.words;
        words.iter().enumerate().flat_map(|(index, word)| {
            let mut remaining = *word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros();
                remaining &= remaining - 1;
                Some(index as u32 * 64 + bit)
            })
        })
    }

    pub(crate) fn words(&self) -> &'a [u64] {
        self.words
    }
}

/// A writable view of a set property.
#[derive(Debug)]
pub struct BitSetMut<'a> {
    words: &'a mut [u64],
    universe: u32,
}

impl<'a> BitSetMut<'a> {
    pub(crate) fn new(words: &'a mut [u64], universe: u32) -> Self {
        BitSetMut { words, universe }
    }

    /// Inserts `element`, returning whether it was absent before. Elements outside of the
    /// universe are ignored.
    pub fn insert(&mut self, element: u32) -> bool {
        if element >= self.universe {
            return false;
        }
        let word = &mut self.words[(element / 64) as usize];
        let mask = 1 << (element % 64);
        let was_absent = *word & mask == 0;
        *word |= mask;
        was_absent
    }

    pub fn remove(&mut self, element: u32) -> bool {
        if element >= self.universe {
            return false;
        }
        let word = &mut self.words[(element / 64) as usize];
        let mask = 1 << (element % 64);
        let was_present = *word & mask != 0;
        *word &= !mask;
        was_present
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }

    pub fn union_with(&mut self, other: BitSetRef<'_>) {
        self.words
            .iter_mut()
            .zip(other.words)
            .for_each(|(a, b)| *a |= b);
    }

    pub fn intersect_with(&mut self, other: BitSetRef<'_>) {
        self.words
            .iter_mut()
            .zip(other.words)
            .for_each(|(a, b)| *a &= b);
    }

    pub fn copy_from(&mut self, other: BitSetRef<'_>) {
        self.words.copy_from_slice(other.words);
    }

    pub fn as_ref(&self) -> BitSetRef<'_> {
        BitSetRef::new(self.words, self.universe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elements_spanning_multiple_words_are_iterated_in_order() {
        let mut words = vec![0_u64; 2];
        let mut set = BitSetMut::new(&mut words, 100);
        assert!(set.insert(99));
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(64));
        assert!(!set.insert(100));

        let view = set.as_ref();
        assert_eq!(vec![3, 64, 99], view.iter().collect::<Vec<_>>());
        assert_eq!(3, view.len());
    }

    #[test]
    fn union_and_intersection() {
        let mut left = vec![0b0110_u64];
        let right = vec![0b1100_u64];
        let right = BitSetRef::new(&right, 4);

        let mut set = BitSetMut::new(&mut left, 4);
        assert_eq!(3, set.as_ref().union_len(right));
        set.intersect_with(right);
        assert_eq!(vec![2], set.as_ref().iter().collect::<Vec<_>>());
        set.union_with(right);
        assert!(right.is_subset_of(set.as_ref()));
    }
}
