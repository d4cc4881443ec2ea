use super::PropertyKind;
use super::State;

/// Where a property lives in a state buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PropertySlot {
    pub(crate) kind: PropertyKind,
    /// The bit offset of the first element.
    pub(crate) offset: u32,
    /// The number of bits per element.
    pub(crate) width: u32,
}

impl PropertySlot {
    pub(crate) fn lower(&self) -> i32 {
        match self.kind {
            PropertyKind::Int { lower, .. } | PropertyKind::Window { lower, .. } => lower,
            PropertyKind::Bool | PropertyKind::Set { .. } => 0,
        }
    }

    pub(crate) fn upper(&self) -> i32 {
        match self.kind {
            PropertyKind::Int { upper, .. } | PropertyKind::Window { upper, .. } => upper,
            PropertyKind::Bool => 1,
            PropertyKind::Set { .. } => 0,
        }
    }

    /// The number of words a set property spans.
    pub(crate) fn num_set_words(&self) -> usize {
        self.width.div_ceil(64) as usize
    }

    /// The bit offset of the `element`-th element of a window property.
    pub(crate) fn window_offset(&self, element: u32) -> u32 {
        let per_word = 64 / self.width;
        self.offset + (element / per_word) * 64 + (element % per_word) * self.width
    }
}

/// Describes how the properties of one state kind are packed into the words of a state buffer.
///
/// Scalars (booleans and bounded integers) are packed at bit granularity without crossing a word
/// boundary; sets and windows start at a word boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyLayout {
    slots: Vec<PropertySlot>,
    num_words: usize,
}

impl PropertyLayout {
    /// Assigns every property an offset, in the order in which they were registered.
    pub(crate) fn layout(kinds: impl IntoIterator<Item = PropertyKind>) -> PropertyLayout {
        let mut offset = 0_u32;
        let mut slots = Vec::new();

        for kind in kinds {
            let width = kind.element_width();
            let slot_offset = match kind {
                PropertyKind::Bool | PropertyKind::Int { .. } => {
                    if offset % 64 + width > 64 {
                        offset = offset.next_multiple_of(64);
                    }
                    let slot_offset = offset;
                    offset += width;
                    slot_offset
                }
                PropertyKind::Set { universe } => {
                    offset = offset.next_multiple_of(64);
                    let slot_offset = offset;
                    offset += universe.next_multiple_of(64);
                    slot_offset
                }
                PropertyKind::Window { length, .. } => {
                    offset = offset.next_multiple_of(64);
                    let slot_offset = offset;
                    let per_word = 64 / width;
                    offset += length.div_ceil(per_word) * 64;
                    slot_offset
                }
            };

            slots.push(PropertySlot {
                kind,
                offset: slot_offset,
                width,
            });
        }

        PropertyLayout {
            slots,
            num_words: offset.div_ceil(64) as usize,
        }
    }

    pub fn num_properties(&self) -> usize {
        self.slots.len()
    }

    pub fn num_words(&self) -> usize {
        self.num_words
    }

    /// The size of a state buffer of this layout in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.num_words * 8
    }

    pub(crate) fn slot(&self, index: usize) -> &PropertySlot {
        &self.slots[index]
    }

    /// A state in which every bit is zero; callers overwrite it with the initial values.
    pub(crate) fn zeroed_state(&self) -> State {
        State::zeroed(self.num_words)
    }

    /// Whether property `index` holds the same value in both states.
    pub(crate) fn property_equal(&self, index: usize, a: &State, b: &State) -> bool {
        let slot = &self.slots[index];
        match slot.kind {
            PropertyKind::Bool | PropertyKind::Int { .. } => {
                read_bits(a.words(), slot.offset, slot.width)
                    == read_bits(b.words(), slot.offset, slot.width)
            }
            PropertyKind::Set { .. } => {
                let start = (slot.offset / 64) as usize;
                let end = start + slot.num_set_words();
                a.words()[start..end] == b.words()[start..end]
            }
            PropertyKind::Window { length, .. } => (0..length).all(|element| {
                let offset = slot.window_offset(element);
                read_bits(a.words(), offset, slot.width) == read_bits(b.words(), offset, slot.width)
            }),
        }
    }

    /// Copies property `index` from `source` into `target`.
    pub(crate) fn copy_property(&self, index: usize, target: &mut State, source: &State) {
        let slot = &self.slots[index];
        match slot.kind {
            PropertyKind::Bool | PropertyKind::Int { .. } => {
                let bits = read_bits(source.words(), slot.offset, slot.width);
                write_bits(target.words_mut(), slot.offset, slot.width, bits);
            }
            PropertyKind::Set { .. } => {
                let start = (slot.offset / 64) as usize;
                let end = start + slot.num_set_words();
                target.words_mut()[start..end].copy_from_slice(&source.words()[start..end]);
            }
            PropertyKind::Window { length, .. } => {
                for element in 0..length {
                    let offset = slot.window_offset(element);
                    let bits = read_bits(source.words(), offset, slot.width);
                    write_bits(target.words_mut(), offset, slot.width, bits);
                }
            }
        }
    }

    /// Merges the elements of a scalar or window property of `other` into `target`, keeping the
    /// larger (or smaller) value per element. Values are stored as offsets from the lower bound,
    /// so comparing the encoded bits preserves the order of the values.
    pub(crate) fn merge_elements(
        &self,
        index: usize,
        target: &mut State,
        other: &State,
        keep_larger: bool,
    ) {
        let slot = &self.slots[index];
        let length = match slot.kind {
            PropertyKind::Bool | PropertyKind::Int { .. } => 1,
            PropertyKind::Window { length, .. } => length,
            PropertyKind::Set { .. } => return,
        };
        for element in 0..length {
            let offset = slot.window_offset(element);
            let mine = read_bits(target.words(), offset, slot.width);
            let theirs = read_bits(other.words(), offset, slot.width);
            let merged = if keep_larger {
                mine.max(theirs)
            } else {
                mine.min(theirs)
            };
            write_bits(target.words_mut(), offset, slot.width, merged);
        }
    }

    /// Merges a set property of `other` into `target` by union or intersection.
    pub(crate) fn merge_sets(&self, index: usize, target: &mut State, other: &State, union: bool) {
        let slot = &self.slots[index];
        if !matches!(slot.kind, PropertyKind::Set { .. }) {
            return;
        }
        let start = (slot.offset / 64) as usize;
        let end = start + slot.num_set_words();
        for word in start..end {
            let theirs = other.words()[word];
            let mine = &mut target.words_mut()[word];
            if union {
                *mine |= theirs;
            } else {
                *mine &= theirs;
            }
        }
    }

    /// The default distance between the values of property `index` in two states: the absolute
    /// difference for scalars, summed over the elements of windows, and the size of the symmetric
    /// difference for sets.
    pub(crate) fn distance(&self, index: usize, a: &State, b: &State) -> f64 {
        let slot = &self.slots[index];
        let difference = |offset: u32| {
            let left = read_bits(a.words(), offset, slot.width);
            let right = read_bits(b.words(), offset, slot.width);
            left.abs_diff(right) as f64
        };
        match slot.kind {
            PropertyKind::Bool | PropertyKind::Int { .. } => difference(slot.offset),
            PropertyKind::Window { length, .. } => (0..length)
                .map(|element| difference(slot.window_offset(element)))
                .sum(),
            PropertyKind::Set { .. } => {
                let start = (slot.offset / 64) as usize;
                let end = start + slot.num_set_words();
                (start..end)
                    .map(|word| (a.words()[word] ^ b.words()[word]).count_ones() as f64)
                    .sum()
            }
        }
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1_u64 << width) - 1
    }
}

pub(crate) fn read_bits(words: &[u64], offset: u32, width: u32) -> u64 {
    let word = (offset / 64) as usize;
    let bit = offset % 64;
    (words[word] >> bit) & mask(width)
}

pub(crate) fn write_bits(words: &mut [u64], offset: u32, width: u32, value: u64) {
    let word = (offset / 64) as usize;
    let bit = offset % 64;
    let mask = mask(width);
    words[word] = (words[word] & !(mask << bit)) | ((value & mask) << bit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_do_not_cross_word_boundaries() {
        let layout = PropertyLayout::layout([
            PropertyKind::Int {
                lower: 0,
                upper: (1 << 30) - 1,
            },
            PropertyKind::Int {
                lower: 0,
                upper: (1 << 30) - 1,
            },
            PropertyKind::Int {
                lower: 0,
                upper: (1 << 30) - 1,
            },
        ]);

        assert_eq!(0, layout.slot(0).offset);
        assert_eq!(30, layout.slot(1).offset);
        assert_eq!(64, layout.slot(2).offset);
        assert_eq!(2, layout.num_words());
    }

    #[test]
    fn sets_and_windows_are_word_aligned() {
        let layout = PropertyLayout::layout([
            PropertyKind::Bool,
            PropertyKind::Set { universe: 70 },
            PropertyKind::Window {
                length: 5,
                lower: 0,
                upper: 100,
            },
            PropertyKind::Bool,
        ]);

        assert_eq!(0, layout.slot(0).offset);
        assert_eq!(64, layout.slot(1).offset);
        assert_eq!(2, layout.slot(1).num_set_words());
        assert_eq!(192, layout.slot(2).offset);
        assert_eq!(256, layout.slot(3).offset);
        assert_eq!(5, layout.num_words());
        assert_eq!(40, layout.size_in_bytes());
    }

    #[test]
    fn window_elements_wrap_to_the_next_word() {
        let layout = PropertyLayout::layout([PropertyKind::Window {
            length: 3,
            lower: 0,
            upper: (1 << 24) - 1,
        }]);
        let slot = layout.slot(0);

        assert_eq!(0, slot.window_offset(0));
        assert_eq!(24, slot.window_offset(1));
        assert_eq!(64, slot.window_offset(2));
    }

    #[test]
    fn bits_round_trip_next_to_each_other() {
        let mut words = vec![0_u64; 1];
        write_bits(&mut words, 3, 5, 0b10110);
        write_bits(&mut words, 8, 2, 0b11);
        write_bits(&mut words, 3, 5, 0b00001);

        assert_eq!(0b00001, read_bits(&words, 3, 5));
        assert_eq!(0b11, read_bits(&words, 8, 2));
    }
}
