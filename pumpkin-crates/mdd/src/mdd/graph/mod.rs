//! The reversible layered graph underlying a decision diagram.
mod arc;
mod layered_graph;
mod node;

pub(crate) use arc::*;
pub(crate) use layered_graph::Graph;
pub(crate) use node::*;
