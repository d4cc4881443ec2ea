use enum_map::Enum;

/// The three state kinds every node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Enum)]
pub enum StateKind {
    /// Summary of the partial assignments from the root to a node.
    Down,
    /// Summary of the partial assignments from a node to the sink.
    Up,
    /// Summary derived from the down and up state of the same node.
    Combined,
}

/// The shape of a property, which determines how many bits it occupies in a state buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Bool,
    /// An integer in `[lower, upper]`.
    Int { lower: i32, upper: i32 },
    /// A set over the elements `0..universe`.
    Set { universe: u32 },
    /// A fixed-length window of integers in `[lower, upper]`.
    Window { length: u32, lower: i32, upper: i32 },
}

impl PropertyKind {
    /// The number of bits a single element of this property occupies.
    pub(crate) fn element_width(&self) -> u32 {
        match self {
            PropertyKind::Bool => 1,
            PropertyKind::Int { lower, upper } | PropertyKind::Window { lower, upper, .. } => {
                bits_for_range(*lower, *upper)
            }
            PropertyKind::Set { universe } => *universe,
        }
    }
}

/// The number of bits required to store every value of `[lower, upper]` as an offset from
/// `lower`.
pub(crate) fn bits_for_range(lower: i32, upper: i32) -> u32 {
    let span = (upper as i64 - lower as i64) as u64;
    (u64::BITS - span.leading_zeros()).max(1)
}

/// Identifies a registered property: the state kind it lives in and its index within the layout
/// of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId {
    pub(crate) kind: StateKind,
    pub(crate) index: u32,
}

impl PropertyId {
    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

macro_rules! property_handle {
    ($(#[$documentation:meta])* $name:ident) => {
        $(#[$documentation])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) PropertyId);

        impl $name {
            pub fn id(&self) -> PropertyId {
                self.0
            }
        }

        impl From<$name> for PropertyId {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

property_handle!(
    /// A handle to a [`PropertyKind::Bool`] property.
    BoolProperty
);
property_handle!(
    /// A handle to a [`PropertyKind::Int`] property.
    IntProperty
);
property_handle!(
    /// A handle to a [`PropertyKind::Set`] property.
    SetProperty
);
property_handle!(
    /// A handle to a [`PropertyKind::Window`] property.
    WindowProperty
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_cover_the_range() {
        assert_eq!(1, bits_for_range(0, 1));
        assert_eq!(1, bits_for_range(3, 3));
        assert_eq!(2, bits_for_range(0, 3));
        assert_eq!(3, bits_for_range(-2, 3));
        assert_eq!(8, bits_for_range(0, 255));
        assert_eq!(32, bits_for_range(i32::MIN, i32::MAX));
    }

    #[test]
    fn properties_are_ordered_by_kind_then_index() {
        let mut properties = vec![
            PropertyId { kind: StateKind::Combined, index: 0 },
            PropertyId { kind: StateKind::Up, index: 1 },
            PropertyId { kind: StateKind::Down, index: 2 },
            PropertyId { kind: StateKind::Up, index: 0 },
        ];
        properties.sort();

        let order = properties
            .iter()
            .map(|property| (property.kind(), property.index()))
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                (StateKind::Down, 2),
                (StateKind::Up, 0),
                (StateKind::Up, 1),
                (StateKind::Combined, 0),
            ],
            order
        );
    }
}
