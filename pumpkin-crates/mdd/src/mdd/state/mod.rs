//! Packed node states and the property layouts through which they are read and written.
mod bit_set;
mod buffer;
mod change_set;
mod layout;
mod property;
mod value_set;

pub use bit_set::*;
pub use buffer::*;
pub(crate) use change_set::ChangeSet;
pub use layout::PropertyLayout;
pub use property::*;
pub use value_set::ValueSet;
