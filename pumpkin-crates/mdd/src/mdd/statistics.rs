use crate::create_statistics_struct;

create_statistics_struct!(
    /// The metrics of the propagation of a decision diagram; every propagation returns the metrics
    /// of that call, which the propagator accumulates.
    MddStatistics {
        /// The number of times the diagram was propagated.
        num_propagations: usize,
        /// The number of times the diagram was built from scratch.
        num_constructions: usize,
        num_nodes_created: usize,
        num_nodes_deleted: usize,
        /// The number of nodes which were merged into another node during construction.
        num_nodes_merged: usize,
        num_arcs_removed: usize,
        num_values_removed: usize,
        /// The number of nodes created by splitting relaxed nodes.
        num_nodes_split: usize,
        /// The number of split candidates which turned out to have no valid outgoing arc.
        num_candidates_pruned: usize,
        /// The number of times the refinement moved back to an earlier layer.
        num_reboots: usize,
        num_up_passes: usize,
        num_down_passes: usize,
        num_full_recomputations: usize,
        num_incremental_recomputations: usize,
        num_transition_cache_hits: usize,
        num_transition_cache_misses: usize,
    }
);

/// A summary of the shape of a diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramShape {
    /// The number of nodes per layer, the root layer first.
    pub widths: Vec<usize>,
    pub num_nodes: usize,
    pub num_arcs: usize,
    /// The number of root-to-sink paths, each of which is an assignment the diagram accepts.
    pub num_paths: u128,
    /// The number of nodes which are the result of merging.
    pub num_relaxed_nodes: usize,
    pub min_in_degree: usize,
    pub max_in_degree: usize,
    pub min_out_degree: usize,
    pub max_out_degree: usize,
}

impl DiagramShape {
    pub fn max_width(&self) -> usize {
        self.widths.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_accumulate_field_wise() {
        let mut total = MddStatistics::default();
        let call = MddStatistics {
            num_propagations: 1,
            num_nodes_split: 3,
            ..Default::default()
        };
        total.accumulate(&call);
        total.accumulate(&call);

        assert_eq!(2, total.num_propagations);
        assert_eq!(6, total.num_nodes_split);
        assert_eq!(0, total.num_reboots);
    }
}
