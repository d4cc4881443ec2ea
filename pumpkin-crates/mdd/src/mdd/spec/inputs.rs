use crate::engine::variables::DomainId;
use crate::mdd::state::StateRef;

/// What a down or up transition sees: the state of the node it starts from, the combined state of
/// that node and the layer of the arc being traversed.
///
/// Combined states are only available once the up states of the diagram are known.
#[derive(Clone, Copy, Debug)]
pub struct TransitionInput<'a> {
    /// The down state of the parent (for down transitions) or the up state of the child (for up
    /// transitions).
    pub state: StateRef<'a>,
    pub combined: Option<StateRef<'a>>,
    /// The index of the variable labelling the arc.
    pub layer: usize,
    pub variable: DomainId,
}

/// What an arc-existence predicate sees.
///
/// The up and combined states are only known once the up pass has reached the nodes; during
/// top-down construction they are absent, except for the up state of the sink.
#[derive(Clone, Copy, Debug)]
pub struct ArcInput<'a> {
    pub parent_down: StateRef<'a>,
    pub parent_combined: Option<StateRef<'a>>,
    pub child_up: Option<StateRef<'a>>,
    pub child_combined: Option<StateRef<'a>>,
    pub layer: usize,
    pub value: i32,
}

/// The three states of a node, given to node-existence predicates and split priorities.
#[derive(Clone, Copy, Debug)]
pub struct NodeInput<'a> {
    pub down: StateRef<'a>,
    pub up: StateRef<'a>,
    pub combined: StateRef<'a>,
    /// The layer of the node; the root is at layer 0.
    pub layer: usize,
    pub num_parents: usize,
    pub num_children: usize,
}

/// A group of incoming arcs of a relaxed node which would become a new node when split off.
#[derive(Clone, Copy, Debug)]
pub struct CandidateInput<'a> {
    /// The down state the new node would have.
    pub down: StateRef<'a>,
    pub num_arcs: usize,
    pub layer: usize,
}
