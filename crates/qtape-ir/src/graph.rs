//! Wire-dependency graph of a tape.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::Dfs;
use rustc_hash::FxHashMap;

use crate::tape::Tape;
use crate::wire::Wire;

/// Node index type for the dependency graph.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphNode {
    /// Entry `i` of the tape's operation list.
    Operation(usize),
    /// Measurement `i` of the tape.
    Observable(usize),
}

/// Directed graph linking each operation or observable to the previous node
/// on each of its wires.
///
/// A parameter can only influence an observable if a path runs from its
/// operation to that observable.
#[derive(Debug, Clone)]
pub struct CircuitGraph {
    graph: DiGraph<GraphNode, Wire, u32>,
    op_nodes: Vec<NodeIndex>,
    obs_nodes: Vec<NodeIndex>,
}

impl CircuitGraph {
    /// Build the graph of a tape.
    pub fn build(tape: &Tape) -> Self {
        let mut graph = DiGraph::default();
        let mut wire_front: FxHashMap<Wire, NodeIndex> = FxHashMap::default();

        let mut link = |graph: &mut DiGraph<GraphNode, Wire, u32>, node: NodeIndex, wires: Vec<Wire>| {
            for wire in wires {
                if let Some(&prev) = wire_front.get(&wire) {
                    graph.add_edge(prev, node, wire.clone());
                }
                wire_front.insert(wire, node);
            }
        };

        let mut op_nodes = Vec::with_capacity(tape.operations().len());
        for (i, instr) in tape.operations().iter().enumerate() {
            let node = graph.add_node(GraphNode::Operation(i));
            link(&mut graph, node, instr.wires());
            op_nodes.push(node);
        }

        let mut obs_nodes = Vec::with_capacity(tape.measurements().len());
        for (i, m) in tape.measurements().iter().enumerate() {
            let node = graph.add_node(GraphNode::Observable(i));
            link(&mut graph, node, m.wires().to_vec());
            obs_nodes.push(node);
        }

        Self {
            graph,
            op_nodes,
            obs_nodes,
        }
    }

    /// Check if operation `op` can affect measurement `obs`.
    pub fn has_path(&self, op: usize, obs: usize) -> bool {
        match (self.op_nodes.get(op), self.obs_nodes.get(obs)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Check if operation `op` can affect any measurement.
    pub fn reaches_any_observable(&self, op: usize) -> bool {
        let Some(&start) = self.op_nodes.get(op) else {
            return false;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if matches!(self.graph[node], GraphNode::Observable(_)) {
                return true;
            }
        }
        false
    }

    /// Operations on which measurement `obs` depends, in operation order.
    pub fn ancestors_of_observable(&self, obs: usize) -> Vec<usize> {
        (0..self.op_nodes.len())
            .filter(|&op| self.has_path(op, obs))
            .collect()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// The underlying petgraph graph.
    pub fn graph(&self) -> &DiGraph<GraphNode, Wire, u32> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;
    use crate::operation::Operation;

    #[test]
    fn test_independent_wire_has_no_path() {
        let tape = Tape::build(|rec| {
            rec.apply(Operation::rx(0.1, 0))
                .apply(Operation::ry(0.2, 1))
                .apply(Operation::rz(0.3, 2))
                .expval(Observable::PauliZ(0.into()))
                .expval(Observable::PauliZ(1.into()));
            Ok(())
        })
        .unwrap();
        let graph = tape.graph();
        assert_eq!(graph.num_nodes(), 5);
        assert!(graph.has_path(0, 0));
        assert!(!graph.has_path(0, 1));
        assert!(graph.reaches_any_observable(1));
        assert!(!graph.reaches_any_observable(2));
    }

    #[test]
    fn test_entangling_gate_links_wires() {
        let tape = Tape::build(|rec| {
            rec.apply(Operation::rx(0.1, 0))
                .apply(Operation::cnot(0, 1))
                .expval(Observable::PauliZ(1.into()));
            Ok(())
        })
        .unwrap();
        let graph = tape.graph();
        assert_eq!(graph.num_edges(), 2);
        assert!(graph.has_path(0, 0));
        assert_eq!(graph.ancestors_of_observable(0), vec![0, 1]);
    }
}
