use std::fmt::Write;

use super::DecisionDiagram;
use crate::containers::StorageKey;
#[cfg(test)]
use crate::mdd::state::State;
use crate::mdd::state::StateKind;
use crate::mdd::DiagramShape;

impl DecisionDiagram {
    /// Renders the active part of the diagram in the DOT language; relaxed nodes are dashed.
    pub(crate) fn to_dot(&self) -> String {
        let mut dot = String::from("digraph mdd {\n");

        for layer in 0..self.graph.num_layers() {
            let _ = writeln!(dot, "  {{ rank=same;");
            for &node in self.graph.layer(layer) {
                let node_data = self.graph.node(node);
                let style = if node_data.state(StateKind::Down).is_relaxed() {
                    ", style=dashed"
                } else {
                    ""
                };
                let _ = writeln!(
                    dot,
                    "    n{} [label=\"{}:{}\"{style}];",
                    node.index(),
                    layer,
                    node_data.position()
                );
            }
            let _ = writeln!(dot, "  }}");
        }

        for layer in 0..self.graph.num_layers() {
            for &node in self.graph.layer(layer) {
                for &arc in self.graph.node(node).outgoing() {
                    let arc = self.graph.arc(arc);
                    let _ = writeln!(
                        dot,
                        "  n{} -> n{} [label=\"{}\"];",
                        node.index(),
                        arc.child().index(),
                        arc.value()
                    );
                }
            }
        }

        dot.push_str("}\n");
        dot
    }

    /// The down, up and combined state of every active node, layer by layer.
    #[cfg(test)]
    pub(crate) fn states(&self) -> Vec<Vec<[State; 3]>> {
        (0..self.graph.num_layers())
            .map(|layer| {
                self.graph
                    .layer(layer)
                    .iter()
                    .map(|&node| {
                        [StateKind::Down, StateKind::Up, StateKind::Combined]
                            .map(|kind| self.graph.state(node, kind).clone())
                    })
                    .collect()
            })
            .collect()
    }

    pub(crate) fn shape(&self) -> DiagramShape {
        let mut shape = DiagramShape {
            widths: (0..self.graph.num_layers())
                .map(|layer| self.graph.width(layer))
                .collect(),
            num_nodes: self.graph.num_nodes(),
            num_arcs: self.graph.num_arcs(),
            min_in_degree: usize::MAX,
            min_out_degree: usize::MAX,
            ..Default::default()
        };

        let last = self.graph.num_layers() - 1;
        for layer in 0..self.graph.num_layers() {
            for &node in self.graph.layer(layer) {
                let node_data = self.graph.node(node);
                if node_data.state(StateKind::Down).is_relaxed() {
                    shape.num_relaxed_nodes += 1;
                }
                if layer > 0 {
                    let in_degree = node_data.incoming().len();
                    shape.min_in_degree = shape.min_in_degree.min(in_degree);
                    shape.max_in_degree = shape.max_in_degree.max(in_degree);
                }
                if layer < last {
                    let out_degree = node_data.outgoing().len();
                    shape.min_out_degree = shape.min_out_degree.min(out_degree);
                    shape.max_out_degree = shape.max_out_degree.max(out_degree);
                }
            }
        }

        shape.num_paths = self.count_paths();
        if shape.min_in_degree == usize::MAX {
            shape.min_in_degree = 0;
        }
        if shape.min_out_degree == usize::MAX {
            shape.min_out_degree = 0;
        }
        shape
    }

    /// The number of paths from the root to the sink, saturating at [`u128::MAX`].
    fn count_paths(&self) -> u128 {
        let mut paths = vec![0_u128; self.graph.allocated_nodes()];
        for &root in self.graph.layer(0) {
            paths[root.index()] = 1;
        }

        let last = self.graph.num_layers() - 1;
        for layer in 0..last {
            for &node in self.graph.layer(layer) {
                let count = paths[node.index()];
                for &arc in self.graph.node(node).outgoing() {
                    let child = self.graph.arc(arc).child().index();
                    paths[child] = paths[child].saturating_add(count);
                }
            }
        }

        self.graph
            .layer(last)
            .iter()
            .map(|sink| paths[sink.index()])
            .fold(0, u128::saturating_add)
    }
}
