//! Variables of the host solver; the diagram only works with plain [`DomainId`]s.
mod domain_id;

pub use domain_id::DomainId;
