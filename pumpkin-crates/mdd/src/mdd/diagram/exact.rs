use super::DecisionDiagram;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::PropagationContextMut;

impl DecisionDiagram {
    /// Propagates a diagram without width limit.
    ///
    /// The diagram is built once; afterwards a propagation only removes the arcs of values which
    /// left their domain, which cascades through the nodes losing all arcs on one side.
    pub(crate) fn propagate_exact(
        &mut self,
        context: &mut PropagationContextMut<'_>,
    ) -> PropagationStatusCP {
        if !self.is_built() {
            return self.construct(context, None);
        }
        self.apply_trims(context)?;
        self.trim_domains(context)
    }
}
