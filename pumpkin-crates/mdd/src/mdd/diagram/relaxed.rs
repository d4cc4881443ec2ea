use log::debug;

use super::DecisionDiagram;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::PropagationContextMut;
use crate::mdd::delta::Direction;
use crate::mdd::state::StateKind;

impl DecisionDiagram {
    /// Propagates a diagram of bounded width.
    ///
    /// The first call builds the relaxation. Every call which sees a change removes the arcs of
    /// the removed values and then alternates up passes and down passes until no node is pending
    /// any more. The first passes of a call also split relaxed nodes while the layers have spare
    /// width.
    pub(crate) fn propagate_relaxed(
        &mut self,
        context: &mut PropagationContextMut<'_>,
    ) -> PropagationStatusCP {
        let mut refine = false;
        if !self.is_built() {
            self.construct(context, self.options.construction_width())?;
            if self.spec.uses_up() {
                self.initialise_up(context)?;
            }
            refine = true;
        }

        self.apply_trims(context)?;
        if !refine && self.delta.is_empty() {
            return self.trim_domains(context);
        }

        let mut num_passes = 0;
        loop {
            if self.spec.uses_up() {
                self.up_pass(context)?;
            }
            let split = num_passes < self.options.max_split_passes;
            num_passes += 1;
            self.down_pass(context, split)?;

            if self.delta.is_empty() {
                break;
            }
        }

        debug!(
            "relaxed diagram at fixpoint after {num_passes} passes: {} nodes, {} arcs, {} splits",
            self.graph.num_nodes(),
            self.graph.num_arcs(),
            self.statistics.num_nodes_split
        );
        self.trim_domains(context)
    }

    /// Computes the up and combined states of all nodes from the sink upwards and removes the
    /// nodes and arcs which the now complete states reject.
    fn initialise_up(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatusCP {
        self.up_ready = true;
        let last = self.last_layer();

        for layer in (0..=last).rev() {
            for node in self.graph.layer(layer).to_vec() {
                if !self.graph.node(node).is_active() {
                    continue;
                }
                if layer < last {
                    let groups = self.neighbour_groups(node, Direction::Up);
                    let old = self.graph.state(node, StateKind::Up).clone();
                    let up = self.relaxed_transition(Direction::Up, layer, &groups, &old, None);
                    self.graph.set_state(node, StateKind::Up, up);
                }
                if self.spec.uses_combined() {
                    let combined = self.spec.combined_state(
                        self.graph.state(node, StateKind::Down),
                        self.graph.state(node, StateKind::Up),
                    );
                    self.graph.set_state(node, StateKind::Combined, combined);
                }

                if !self.node_valid(node) {
                    self.delete_node(context, node)?;
                } else if layer < last {
                    self.filter_outgoing(context, node)?;
                }
            }
        }
        Ok(())
    }

    /// Refreshes the up states of the pending nodes, deepest layer first.
    fn up_pass(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatusCP {
        if self.delta.deepest_pending(Direction::Up).is_none() {
            return Ok(());
        }
        self.statistics.num_up_passes += 1;

        while let Some(layer) = self.delta.deepest_pending(Direction::Up) {
            for (node, pending) in self.delta.take_layer(Direction::Up, layer) {
                self.refresh(context, Direction::Up, node, pending)?;
            }
        }
        Ok(())
    }

    /// Refreshes the down states of the pending nodes layer by layer from the root; with `split`,
    /// every layer is refined once its pending nodes are refreshed.
    ///
    /// Deletions may leave nodes pending in a layer which was already processed, in which case
    /// the pass moves back to that layer.
    fn down_pass(
        &mut self,
        context: &mut PropagationContextMut<'_>,
        split: bool,
    ) -> PropagationStatusCP {
        self.statistics.num_down_passes += 1;
        let last = self.last_layer();

        let mut layer = 1;
        while layer <= last {
            if let Some(shallowest) = self.delta.shallowest_pending(Direction::Down) {
                layer = layer.min(shallowest);
            }

            for (node, pending) in self.delta.take_layer(Direction::Down, layer) {
                self.refresh(context, Direction::Down, node, pending)?;
            }
            if self.delta.has_pending_in_layer(Direction::Down, layer) {
                continue;
            }

            if split && layer < last && self.split_budget > 0 {
                if let Some(reboot) = self.split_layer(context, layer)? {
                    layer = reboot;
                    continue;
                }
                if self.delta.has_pending_in_layer(Direction::Down, layer) {
                    continue;
                }
            }
            layer += 1;
        }
        Ok(())
    }
}
