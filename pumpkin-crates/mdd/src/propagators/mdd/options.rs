use std::fmt::Display;

use crate::basic_types::ConstraintOperationError;

/// The options which determine how a decision diagram is built and refined.
#[derive(Debug, Clone, Copy)]
pub struct DecisionDiagramOptions {
    /// The maximum number of nodes per layer; `None` builds the exact diagram, which is only
    /// filtered afterwards.
    pub max_width: Option<usize>,
    /// Whether the constraints posted together share a single diagram or each get their own.
    pub intersection: DecisionDiagramIntersection,
    /// How the incoming arcs of a relaxed node are grouped into split candidates.
    pub split_strategy: SplitStrategy,
    /// Which relaxed node of a layer is split first.
    pub node_selection: NodeSelection,
    /// Which split candidates are turned into nodes when the width does not allow all of them.
    pub candidate_ordering: CandidateOrdering,
    pub initial_construction: InitialConstruction,
    /// Computes one transition per parent and set of arc values rather than one per arc.
    pub group_arc_values: bool,
    /// The number of down passes per propagation in which nodes are split.
    pub max_split_passes: usize,
    /// The number of nodes which may be created by splitting per propagation.
    pub split_budget: usize,
    /// Overrides the number of layers the refinement moves back after it pruned an infeasible
    /// split candidate; by default this is derived from the scopes of the constraints.
    pub reboot_distance: Option<usize>,
    /// Memoises transitions within a propagation.
    pub use_transition_cache: bool,
}

impl Default for DecisionDiagramOptions {
    fn default() -> Self {
        Self {
            max_width: Some(32),
            intersection: DecisionDiagramIntersection::default(),
            split_strategy: SplitStrategy::default(),
            node_selection: NodeSelection::default(),
            candidate_ordering: CandidateOrdering::default(),
            initial_construction: InitialConstruction::default(),
            group_arc_values: false,
            max_split_passes: 8,
            split_budget: 10_000,
            reboot_distance: None,
            use_transition_cache: true,
        }
    }
}

impl DecisionDiagramOptions {
    /// Options for the exact diagram.
    pub fn exact() -> Self {
        Self {
            max_width: None,
            ..Default::default()
        }
    }

    /// Options for a relaxed diagram of at most `max_width` nodes per layer.
    pub fn relaxed(max_width: usize) -> Self {
        Self {
            max_width: Some(max_width),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConstraintOperationError> {
        if self.max_width == Some(0) {
            return Err(ConstraintOperationError::InvalidOptions(
                "the maximum width of a diagram has to be positive",
            ));
        }
        Ok(())
    }

    /// The width used while building the initial diagram.
    pub(crate) fn construction_width(&self) -> Option<usize> {
        match self.initial_construction {
            InitialConstruction::TopDownMerge => self.max_width,
            InitialConstruction::WidthOne => self.max_width.map(|_| 1),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum DecisionDiagramIntersection {
    /// Every constraint is propagated by its own diagram.
    None,
    /// All constraints are propagated by one diagram over the union of their scopes.
    #[default]
    All,
}

impl Display for DecisionDiagramIntersection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionDiagramIntersection::None => write!(f, "none"),
            DecisionDiagramIntersection::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SplitStrategy {
    /// Arcs are grouped by the exact down state they lead to.
    #[default]
    ExactState,
    /// Arcs are grouped by the equivalence key of the down state they lead to; candidates with
    /// the same key are merged, so fewer but relaxed nodes are created.
    EquivalenceClass,
}

impl Display for SplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitStrategy::ExactState => write!(f, "exact-state"),
            SplitStrategy::EquivalenceClass => write!(f, "equivalence-class"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum NodeSelection {
    /// The registered split priorities decide, ties are broken by the number of incoming arcs.
    #[default]
    Priority,
    MostIncomingArcs,
    /// The first relaxed node in the layer.
    FirstRelaxed,
}

impl Display for NodeSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeSelection::Priority => write!(f, "priority"),
            NodeSelection::MostIncomingArcs => write!(f, "most-incoming-arcs"),
            NodeSelection::FirstRelaxed => write!(f, "first-relaxed"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CandidateOrdering {
    /// The registered candidate priorities decide, ties are broken by the number of arcs.
    #[default]
    Priority,
    MostArcs,
    /// The order in which the candidates were found.
    Discovery,
}

impl Display for CandidateOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateOrdering::Priority => write!(f, "priority"),
            CandidateOrdering::MostArcs => write!(f, "most-arcs"),
            CandidateOrdering::Discovery => write!(f, "discovery"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum InitialConstruction {
    /// Layers are built top-down and pending nodes are merged by similarity whenever a layer
    /// exceeds the maximum width.
    #[default]
    TopDownMerge,
    /// A diagram of width one is built, which is then refined by splitting.
    WidthOne,
}

impl Display for InitialConstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitialConstruction::TopDownMerge => write!(f, "top-down-merge"),
            InitialConstruction::WidthOne => write!(f, "width-one"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_is_rejected() {
        let options = DecisionDiagramOptions::relaxed(0);
        assert_eq!(
            Err(ConstraintOperationError::InvalidOptions(
                "the maximum width of a diagram has to be positive"
            )),
            options.validate()
        );
    }

    #[test]
    fn width_one_construction_starts_narrow() {
        let options = DecisionDiagramOptions {
            initial_construction: InitialConstruction::WidthOne,
            ..DecisionDiagramOptions::relaxed(8)
        };
        assert_eq!(Some(1), options.construction_width());
        assert_eq!(None, DecisionDiagramOptions::exact().construction_width());
    }
}
