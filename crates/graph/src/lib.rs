//! # flowcore-graph — Execution Graph (spec §4.1, component C3)
//!
//! Builds a dependency graph from a workflow's nodes and connections and
//! hands out ready nodes to the scheduler. Storage is arena-style
//! (`petgraph`'s index-based graph, not a pointer graph) per spec §9, so
//! cloning the immutable execution-time view is cheap and iteration order
//! is deterministic.

use std::collections::{HashMap, HashSet};

use flowcore_core::Key;
use flowcore_error::DefinitionError;
use flowcore_workflow::WorkflowDefinition;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

/// An edge's output-port label, carried so [`ExecutionGraph::successors`]
/// can filter by branch.
#[derive(Debug, Clone)]
struct EdgeLabel {
    output_name: String,
}

/// The dependency graph built from a [`WorkflowDefinition`]. Immutable
/// once built; the scheduler queries it repeatedly as nodes complete.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    graph: DiGraph<Key, EdgeLabel>,
    index_of: HashMap<Key, NodeIndex>,
    depth: HashMap<Key, usize>,
}

impl ExecutionGraph {
    /// Build a graph from `def`, rejecting cycles, unknown node
    /// references, and duplicate node ids (spec §4.1: `build`).
    pub fn build(def: &WorkflowDefinition) -> Result<Self, DefinitionError> {
        let mut graph = DiGraph::new();
        let mut index_of: HashMap<Key, NodeIndex> = HashMap::new();

        for node in &def.nodes {
            if index_of.contains_key(&node.id) {
                return Err(DefinitionError::DuplicateNodeId(node.id.to_string()));
            }
            let idx = graph.add_node(node.id.clone());
            index_of.insert(node.id.clone(), idx);
        }

        for conn in &def.connections {
            let from = *index_of
                .get(&conn.source_node_id)
                .ok_or_else(|| DefinitionError::UnknownNodeReference(conn.source_node_id.to_string()))?;
            let to = *index_of
                .get(&conn.target_node_id)
                .ok_or_else(|| DefinitionError::UnknownNodeReference(conn.target_node_id.to_string()))?;
            graph.add_edge(
                from,
                to,
                EdgeLabel {
                    output_name: conn.source_output.clone(),
                },
            );
        }

        let order = toposort(&graph, None).map_err(|_| DefinitionError::Cycle)?;

        let mut depth: HashMap<Key, usize> = HashMap::new();
        for idx in order {
            let key = graph[idx].clone();
            let d = graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|pred| depth.get(&graph[pred]).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            depth.insert(key, d);
        }

        Ok(Self {
            graph,
            index_of,
            depth,
        })
    }

    /// Nodes with no inbound connections — trigger nodes (spec §4.1: `roots`).
    #[must_use]
    pub fn roots(&self) -> Vec<Key> {
        let mut roots: Vec<Key> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].clone())
            .collect();
        self.sort_by_tie_break(&mut roots);
        roots
    }

    /// Nodes all of whose dependencies are already in `completed`, and
    /// which are not themselves in `completed` (spec §4.1: `ready`).
    /// Ordered by the deterministic `(depth, node_id)` tie-break.
    #[must_use]
    pub fn ready(&self, completed: &HashSet<Key>) -> Vec<Key> {
        let mut ready: Vec<Key> = self
            .graph
            .node_indices()
            .filter(|&idx| !completed.contains(&self.graph[idx]))
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .all(|pred| completed.contains(&self.graph[pred]))
            })
            .map(|idx| self.graph[idx].clone())
            .collect();
        self.sort_by_tie_break(&mut ready);
        ready
    }

    /// Downstream node ids reachable along `output_name` (all outputs if
    /// `None`) from `id` (spec §4.1: `successors`).
    #[must_use]
    pub fn successors(&self, id: &Key, output_name: Option<&str>) -> Vec<Key> {
        let Some(&idx) = self.index_of.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<Key> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| output_name.map_or(true, |name| e.weight().output_name == name))
            .map(|e| self.graph[e.target()].clone())
            .collect();
        self.sort_by_tie_break(&mut out);
        out
    }

    /// Inbound node ids for `id`, used by Merge to know what it waits on.
    #[must_use]
    pub fn predecessors(&self, id: &Key) -> Vec<Key> {
        let Some(&idx) = self.index_of.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|pred| self.graph[pred].clone())
            .collect()
    }

    /// Depth of `id` in the graph (root = 0), used only for the
    /// deterministic tie-break; not otherwise meaningful.
    #[must_use]
    pub fn depth_of(&self, id: &Key) -> Option<usize> {
        self.depth.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &Key) -> bool {
        self.index_of.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn sort_by_tie_break(&self, ids: &mut [Key]) {
        ids.sort_by(|a, b| {
            let da = self.depth.get(a).copied().unwrap_or(0);
            let db = self.depth.get(b).copied().unwrap_or(0);
            da.cmp(&db).then_with(|| a.as_str().cmp(b.as_str()))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore_workflow::{Connection, Node};

    fn node(id: &str) -> Node {
        Node::new(id, "noop", id).unwrap()
    }

    fn key(id: &str) -> Key {
        Key::new(id).unwrap()
    }

    fn conn(from: &str, to: &str) -> Connection {
        Connection::main(key(from), key(to))
    }

    #[test]
    fn linear_graph_roots_and_ready() {
        let def = WorkflowDefinition::new(
            vec![node("a"), node("b"), node("c")],
            vec![conn("a", "b"), conn("b", "c")],
        );
        let graph = ExecutionGraph::build(&def).unwrap();
        assert_eq!(graph.roots(), vec![key("a")]);

        let mut completed = HashSet::new();
        assert_eq!(graph.ready(&completed), vec![key("a")]);

        completed.insert(key("a"));
        assert_eq!(graph.ready(&completed), vec![key("b")]);

        completed.insert(key("b"));
        assert_eq!(graph.ready(&completed), vec![key("c")]);
    }

    #[test]
    fn diamond_graph_ready_at_same_depth_sorted_by_id() {
        let def = WorkflowDefinition::new(
            vec![node("start"), node("a"), node("b"), node("merge")],
            vec![
                conn("start", "a"),
                conn("start", "b"),
                conn("a", "merge"),
                conn("b", "merge"),
            ],
        );
        let graph = ExecutionGraph::build(&def).unwrap();
        let mut completed = HashSet::new();
        completed.insert(key("start"));
        // both a and b are ready at depth 1; sorted by id ascending
        assert_eq!(graph.ready(&completed), vec![key("a"), key("b")]);

        completed.insert(key("a"));
        // merge needs both a and b
        assert_eq!(graph.ready(&completed), vec![key("b")]);

        completed.insert(key("b"));
        assert_eq!(graph.ready(&completed), vec![key("merge")]);
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let def = WorkflowDefinition::new(vec![node("a"), node("a")], vec![]);
        assert_eq!(
            ExecutionGraph::build(&def),
            Err(DefinitionError::DuplicateNodeId("a".into()))
        );
    }

    #[test]
    fn unknown_node_reference_is_rejected() {
        let def = WorkflowDefinition::new(vec![node("a")], vec![conn("a", "ghost")]);
        assert_eq!(
            ExecutionGraph::build(&def),
            Err(DefinitionError::UnknownNodeReference("ghost".into()))
        );
    }

    #[test]
    fn cycle_is_rejected() {
        let def = WorkflowDefinition::new(
            vec![node("a"), node("b"), node("c")],
            vec![conn("a", "b"), conn("b", "c"), conn("c", "a")],
        );
        assert_eq!(ExecutionGraph::build(&def), Err(DefinitionError::Cycle));
    }

    #[test]
    fn successors_filters_by_output_name() {
        let def = WorkflowDefinition::new(
            vec![node("if_node"), node("t"), node("f")],
            vec![
                Connection::new(key("if_node"), "true", key("t"), "main"),
                Connection::new(key("if_node"), "false", key("f"), "main"),
            ],
        );
        let graph = ExecutionGraph::build(&def).unwrap();
        assert_eq!(graph.successors(&key("if_node"), Some("true")), vec![key("t")]);
        assert_eq!(graph.successors(&key("if_node"), Some("false")), vec![key("f")]);
        let mut all = graph.successors(&key("if_node"), None);
        all.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(all, vec![key("f"), key("t")]);
    }

    #[test]
    fn single_root_node_no_edges() {
        let def = WorkflowDefinition::new(vec![node("solo")], vec![]);
        let graph = ExecutionGraph::build(&def).unwrap();
        assert_eq!(graph.roots(), vec![key("solo")]);
        assert!(graph.successors(&key("solo"), None).is_empty());
        assert!(graph.predecessors(&key("solo")).is_empty());
    }

    #[test]
    fn predecessors_returns_inbound_nodes() {
        let def = WorkflowDefinition::new(
            vec![node("a"), node("b"), node("merge")],
            vec![conn("a", "merge"), conn("b", "merge")],
        );
        let graph = ExecutionGraph::build(&def).unwrap();
        let mut preds = graph.predecessors(&key("merge"));
        preds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(preds, vec![key("a"), key("b")]);
    }
}
