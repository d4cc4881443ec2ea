use std::hash::Hash;
use std::hash::Hasher;

use fnv::FnvHasher;

use super::layout::read_bits;
use super::layout::write_bits;
use super::BitSetMut;
use super::BitSetRef;
use super::BoolProperty;
use super::IntProperty;
use super::PropertyKind;
use super::PropertyLayout;
use super::SetProperty;
use super::WindowProperty;
use crate::pumpkin_assert_moderate;
use crate::pumpkin_assert_simple;

/// An opaque buffer of packed property values together with a cached hash and a flag recording
/// whether the state is the result of merging.
///
/// Two states are equal when their buffers are equal and both (or neither) are relaxed.
#[derive(Clone, Debug)]
pub struct State {
    words: Box<[u64]>,
    hash: u64,
    relaxed: bool,
}

impl State {
    pub(crate) fn zeroed(num_words: usize) -> State {
        let mut state = State {
            words: vec![0; num_words].into_boxed_slice(),
            hash: 0,
            relaxed: false,
        };
        state.rehash();
        state
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    pub fn is_relaxed(&self) -> bool {
        self.relaxed
    }

    pub(crate) fn set_relaxed(&mut self, relaxed: bool) {
        self.relaxed = relaxed;
    }

    /// Recomputes the cached hash; must be called after the buffer has been modified and before
    /// the state is compared or stored.
    pub(crate) fn rehash(&mut self) {
        let mut hasher = FnvHasher::default();
        self.words.hash(&mut hasher);
        self.hash = hasher.finish();
    }

    pub(crate) fn cached_hash(&self) -> u64 {
        self.hash
    }

    pub fn view<'a>(&'a self, layout: &'a PropertyLayout) -> StateRef<'a> {
        StateRef {
            layout,
            state: self,
        }
    }

    pub(crate) fn view_mut<'a>(&'a mut self, layout: &'a PropertyLayout) -> StateMut<'a> {
        StateMut {
            layout,
            state: self,
        }
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.relaxed == other.relaxed && self.words == other.words
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
        self.relaxed.hash(state);
    }
}

/// A read-only view of a [`State`] through the layout of its kind.
#[derive(Clone, Copy, Debug)]
pub struct StateRef<'a> {
    layout: &'a PropertyLayout,
    state: &'a State,
}

impl<'a> StateRef<'a> {
    pub fn is_relaxed(&self) -> bool {
        self.state.relaxed
    }

    pub fn int(&self, property: IntProperty) -> i32 {
        read_int(self.layout, self.state.words(), property)
    }

    pub fn boolean(&self, property: BoolProperty) -> bool {
        read_bool(self.layout, self.state.words(), property)
    }

    pub fn set(&self, property: SetProperty) -> BitSetRef<'a> {
        let (start, end, universe) = set_range(self.layout, property);
        BitSetRef::new(&self.state.words()[start..end], universe)
    }

    pub fn window(&self, property: WindowProperty) -> WindowRef<'a> {
        let index = property.0.index();
        let slot = self.layout.slot(index);
        pumpkin_assert_simple!(matches!(slot.kind, PropertyKind::Window { .. }));
        WindowRef {
            words: self.state.words(),
            layout: self.layout,
            index,
        }
    }

    pub(crate) fn state(&self) -> &'a State {
        self.state
    }
}

/// A writable view of a [`State`] through the layout of its kind.
///
/// Writes go straight to the underlying buffer; the owner of the state refreshes the cached hash
/// once all writes are done.
#[derive(Debug)]
pub struct StateMut<'a> {
    layout: &'a PropertyLayout,
    state: &'a mut State,
}

impl StateMut<'_> {
    pub fn as_ref(&self) -> StateRef<'_> {
        StateRef {
            layout: self.layout,
            state: &*self.state,
        }
    }

    pub fn int(&self, property: IntProperty) -> i32 {
        read_int(self.layout, self.state.words(), property)
    }

    pub fn boolean(&self, property: BoolProperty) -> bool {
        read_bool(self.layout, self.state.words(), property)
    }

    pub fn set(&self, property: SetProperty) -> BitSetRef<'_> {
        let (start, end, universe) = set_range(self.layout, property);
        BitSetRef::new(&self.state.words()[start..end], universe)
    }

    pub fn window(&self, property: WindowProperty) -> WindowRef<'_> {
        WindowRef {
            words: self.state.words(),
            layout: self.layout,
            index: property.0.index(),
        }
    }

    /// Writes an integer; values outside of the declared range are clamped into it.
    pub fn set_int(&mut self, property: IntProperty, value: i32) {
        let slot = self.layout.slot(property.0.index());
        pumpkin_assert_simple!(matches!(slot.kind, PropertyKind::Int { .. }));
        let value = value.clamp(slot.lower(), slot.upper());
        let encoded = (value as i64 - slot.lower() as i64) as u64;
        write_bits(self.state.words_mut(), slot.offset, slot.width, encoded);
    }

    pub fn set_bool(&mut self, property: BoolProperty, value: bool) {
        let slot = self.layout.slot(property.0.index());
        pumpkin_assert_simple!(matches!(slot.kind, PropertyKind::Bool));
        write_bits(self.state.words_mut(), slot.offset, 1, value as u64);
    }

    pub fn set_mut(&mut self, property: SetProperty) -> BitSetMut<'_> {
        let (start, end, universe) = set_range(self.layout, property);
        BitSetMut::new(&mut self.state.words_mut()[start..end], universe)
    }

    /// Writes element `element` of a window; values outside of the declared range are clamped.
    pub fn set_window(&mut self, property: WindowProperty, element: usize, value: i32) {
        let slot = self.layout.slot(property.0.index());
        let PropertyKind::Window { length, .. } = slot.kind else {
            panic!("property {property:?} is not a window");
        };
        pumpkin_assert_moderate!((element as u32) < length);

        let value = value.clamp(slot.lower(), slot.upper());
        let encoded = (value as i64 - slot.lower() as i64) as u64;
        write_bits(
            self.state.words_mut(),
            slot.window_offset(element as u32),
            slot.width,
            encoded,
        );
    }
}

/// A read-only view of a window property.
#[derive(Clone, Copy, Debug)]
pub struct WindowRef<'a> {
    words: &'a [u64],
    layout: &'a PropertyLayout,
    index: usize,
}

impl WindowRef<'_> {
    pub fn len(&self) -> usize {
        match self.layout.slot(self.index).kind {
            PropertyKind::Window { length, .. } => length as usize,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, element: usize) -> i32 {
        let slot = self.layout.slot(self.index);
        let bits = read_bits(self.words, slot.window_offset(element as u32), slot.width);
        (slot.lower() as i64 + bits as i64) as i32
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        (0..self.len()).map(|element| self.get(element))
    }
}

fn read_int(layout: &PropertyLayout, words: &[u64], property: IntProperty) -> i32 {
    let slot = layout.slot(property.0.index());
    pumpkin_assert_simple!(matches!(slot.kind, PropertyKind::Int { .. }));
    let bits = read_bits(words, slot.offset, slot.width);
    (slot.lower() as i64 + bits as i64) as i32
}

fn read_bool(layout: &PropertyLayout, words: &[u64], property: BoolProperty) -> bool {
    let slot = layout.slot(property.0.index());
    pumpkin_assert_simple!(matches!(slot.kind, PropertyKind::Bool));
    read_bits(words, slot.offset, 1) == 1
}

fn set_range(layout: &PropertyLayout, property: SetProperty) -> (usize, usize, u32) {
    let slot = layout.slot(property.0.index());
    let PropertyKind::Set { universe } = slot.kind else {
        panic!("property {property:?} is not a set");
    };
    let start = (slot.offset / 64) as usize;
    (start, start + slot.num_set_words(), universe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdd::state::PropertyId;
    use crate::mdd::state::StateKind;

    fn id(index: u32) -> PropertyId {
        PropertyId {
            kind: StateKind::Down,
            index,
        }
    }

    #[test]
    fn values_are_read_back_with_their_offsets() {
        let layout = PropertyLayout::layout([
            PropertyKind::Int {
                lower: -5,
                upper: 5,
            },
            PropertyKind::Bool,
            PropertyKind::Set { universe: 10 },
            PropertyKind::Window {
                length: 3,
                lower: 0,
                upper: 9,
            },
        ]);
        let mut state = layout.zeroed_state();
        {
            let mut view = state.view_mut(&layout);
            view.set_int(IntProperty(id(0)), -3);
            view.set_bool(BoolProperty(id(1)), true);
            let _ = view.set_mut(SetProperty(id(2))).insert(7);
            view.set_window(WindowProperty(id(3)), 2, 8);
        }
        state.rehash();

        let view = state.view(&layout);
        assert_eq!(-3, view.int(IntProperty(id(0))));
        assert!(view.boolean(BoolProperty(id(1))));
        assert!(view.set(SetProperty(id(2))).contains(7));
        assert_eq!(1, view.set(SetProperty(id(2))).len());
        assert_eq!(
            vec![0, 0, 8],
            view.window(WindowProperty(id(3))).iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn integers_are_clamped_into_their_range() {
        let layout = PropertyLayout::layout([PropertyKind::Int {
            lower: 0,
            upper: 3,
        }]);
        let mut state = layout.zeroed_state();
        state.view_mut(&layout).set_int(IntProperty(id(0)), 10);

        assert_eq!(3, state.view(&layout).int(IntProperty(id(0))));
    }

    #[test]
    fn relaxed_flag_participates_in_equality() {
        let layout = PropertyLayout::layout([PropertyKind::Bool]);
        let exact = layout.zeroed_state();
        let mut relaxed = layout.zeroed_state();
        relaxed.set_relaxed(true);

        assert_ne!(exact, relaxed);
        relaxed.set_relaxed(false);
        assert_eq!(exact, relaxed);
    }
}
