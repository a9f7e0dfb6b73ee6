//! The dependency graph (§3 "Graph node" / "Graph edge", §4.2).
//!
//! Modeled directly as §3 describes it — a map from `mod_id` to node plus a
//! map from `mod_id` to outgoing edges — rather than forcing every edge
//! endpoint through `petgraph`'s `NodeIndex`, because §3's invariants
//! require edges whose target has no node at all ("incoming edges can point
//! to uninstalled MODs"). `petgraph` is still used internally for
//! strongly-connected-component analysis, where every node participating
//! genuinely exists (grounded on the retrieval pack's
//! `empack::dependency_graph`, which resolves the equivalent packwiz
//! dependency graph with `petgraph::algo`).

pub mod validator;

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::dependency::DependencyKind;
use crate::error::{Error, Result};
use crate::modid::ModId;
use crate::remote::Release;
use crate::version::{ModVersion, VersionRequirement};

/// What the planner intends to do to a node once the plan executes
/// (§3 "Graph node" `planned_op`; `nil` is represented as `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannedOp {
  Enable,
  Disable,
  Install,
  Uninstall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
  pub mod_id: ModId,
  pub version: ModVersion,
  pub enabled: bool,
  pub installed: bool,
  pub planned_op: Option<PlannedOp>,
}

impl GraphNode {
  pub fn new(mod_id: ModId, version: ModVersion, enabled: bool, installed: bool) -> Self {
    Self {
      mod_id,
      version,
      enabled,
      installed,
      planned_op: None,
    }
  }
}

impl PartialEq for GraphNode {
  fn eq(&self, other: &Self) -> bool {
    self.mod_id == other.mod_id
  }
}

impl Eq for GraphNode {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
  pub from: ModId,
  pub to: ModId,
  pub kind: DependencyKind,
  pub requirement: Option<VersionRequirement>,
}

/// `{mod_id -> node}` plus `{mod_id -> outgoing edges}` (§3 "Graph edge").
#[derive(Debug, Default)]
pub struct Graph {
  nodes: HashMap<ModId, GraphNode>,
  insertion_order: Vec<ModId>,
  outgoing: HashMap<ModId, Vec<GraphEdge>>,
}

impl Graph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
    if self.nodes.contains_key(&node.mod_id) {
      return Err(Error::GraphError(format!(
        "a node for `{}` already exists",
        node.mod_id
      )));
    }
    self.insertion_order.push(node.mod_id.clone());
    self.outgoing.entry(node.mod_id.clone()).or_default();
    self.nodes.insert(node.mod_id.clone(), node);
    Ok(())
  }

  pub fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
    if !self.nodes.contains_key(&edge.from) {
      return Err(Error::GraphError(format!(
        "cannot add edge: source node `{}` does not exist",
        edge.from
      )));
    }
    self.outgoing.entry(edge.from.clone()).or_default().push(edge);
    Ok(())
  }

  /// §4.2 `add_uninstalled`: no-op if the node already exists; otherwise
  /// creates an `installed=false` node and wires up its dependencies,
  /// skipping `base`.
  pub fn add_uninstalled(&mut self, mod_id: ModId, release: &Release, op: PlannedOp) -> Result<()> {
    if self.contains_node(&mod_id) {
      return Ok(());
    }

    self.add_node(GraphNode {
      mod_id: mod_id.clone(),
      version: release.version,
      enabled: false,
      installed: false,
      planned_op: Some(op),
    })?;

    for dep in release.info_json.dependency_list()?.iter() {
      if dep.mod_id.is_base() {
        continue;
      }
      self.add_edge(GraphEdge {
        from: mod_id.clone(),
        to: dep.mod_id.clone(),
        kind: dep.kind,
        requirement: dep.version_requirement,
      })?;
    }
    Ok(())
  }

  pub fn node(&self, mod_id: &ModId) -> Option<&GraphNode> {
    self.nodes.get(mod_id)
  }

  pub fn node_mut(&mut self, mod_id: &ModId) -> Option<&mut GraphNode> {
    self.nodes.get_mut(mod_id)
  }

  pub fn contains_node(&self, mod_id: &ModId) -> bool {
    self.nodes.contains_key(mod_id)
  }

  /// Nodes in insertion order, for deterministic iteration/reporting.
  pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
    self.insertion_order.iter().filter_map(move |id| self.nodes.get(id))
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn edges_from(&self, mod_id: &ModId) -> &[GraphEdge] {
    self.outgoing.get(mod_id).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn edges_to(&self, mod_id: &ModId) -> Vec<&GraphEdge> {
    self
      .insertion_order
      .iter()
      .flat_map(|id| self.outgoing.get(id).into_iter().flatten())
      .filter(|e| &e.to == mod_id)
      .collect()
  }

  fn required_edges(&self) -> impl Iterator<Item = &GraphEdge> {
    self
      .insertion_order
      .iter()
      .flat_map(|id| self.outgoing.get(id).into_iter().flatten())
      .filter(|e| e.kind.is_required())
  }

  /// Topological order in which every required dependency precedes its
  /// dependent, breaking ties by node-insertion order (§4.2).
  pub fn topological_order(&self) -> Result<Vec<ModId>> {
    let mut remaining_deps: HashMap<ModId, usize> =
      self.insertion_order.iter().cloned().map(|id| (id, 0)).collect();
    let mut dependents_of: HashMap<ModId, Vec<ModId>> = HashMap::new();

    for edge in self.required_edges() {
      if self.contains_node(&edge.to) {
        *remaining_deps.get_mut(&edge.from).unwrap() += 1;
        dependents_of.entry(edge.to.clone()).or_default().push(edge.from.clone());
      }
    }

    let mut order = Vec::with_capacity(self.insertion_order.len());
    let mut visited: HashMap<ModId, bool> =
      self.insertion_order.iter().cloned().map(|id| (id, false)).collect();

    loop {
      let ready = self
        .insertion_order
        .iter()
        .find(|id| !visited[*id] && remaining_deps[*id] == 0)
        .cloned();

      let Some(next) = ready else { break };
      visited.insert(next.clone(), true);
      order.push(next.clone());
      if let Some(dependents) = dependents_of.get(&next) {
        for dependent in dependents {
          *remaining_deps.get_mut(dependent).unwrap() -= 1;
        }
      }
    }

    if order.len() != self.insertion_order.len() {
      let cyclic_members: Vec<String> = self
        .insertion_order
        .iter()
        .filter(|id| !visited[*id])
        .map(|id| id.as_str().to_string())
        .collect();
      return Err(Error::CycleError(cyclic_members));
    }

    Ok(order)
  }

  pub fn cyclic(&self) -> bool {
    self.topological_order().is_err()
  }

  fn required_subgraph(&self) -> (DiGraph<ModId, ()>, HashMap<ModId, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut index_of = HashMap::new();
    for id in &self.insertion_order {
      index_of.insert(id.clone(), graph.add_node(id.clone()));
    }
    for edge in self.required_edges() {
      if let (Some(&from), Some(&to)) = (index_of.get(&edge.from), index_of.get(&edge.to)) {
        graph.add_edge(from, to, ());
      }
    }
    (graph, index_of)
  }

  /// Strongly connected components of the required-edge subgraph, each
  /// ordered by node insertion order, used to report cycles (§4.2, §4.3
  /// `CIRCULAR_DEPENDENCY`).
  pub fn strongly_connected_components(&self) -> Vec<Vec<ModId>> {
    let (graph, _) = self.required_subgraph();
    let insertion_index: HashMap<&ModId, usize> = self
      .insertion_order
      .iter()
      .enumerate()
      .map(|(i, id)| (id, i))
      .collect();

    let mut components: Vec<Vec<ModId>> = tarjan_scc(&graph)
      .into_iter()
      .map(|component| {
        let mut members: Vec<ModId> = component.into_iter().map(|idx| graph[idx].clone()).collect();
        members.sort_by_key(|id| insertion_index[id]);
        members
      })
      .collect();

    components.sort_by_key(|members| insertion_index[&members[0]]);
    components
  }

  /// MODs whose *enabled* node has a *required* outgoing edge to `mod_id`
  /// (§4.2).
  pub fn find_enabled_dependents(&self, mod_id: &ModId) -> Vec<ModId> {
    self
      .nodes()
      .filter(|node| node.enabled)
      .filter(|node| {
        self
          .edges_from(&node.mod_id)
          .iter()
          .any(|e| e.kind.is_required() && &e.to == mod_id)
      })
      .map(|node| node.mod_id.clone())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn node(name: &str, enabled: bool) -> GraphNode {
    GraphNode::new(ModId::new(name), ModVersion::new(1, 0, 0), enabled, true)
  }

  fn required_edge(from: &str, to: &str) -> GraphEdge {
    GraphEdge {
      from: ModId::new(from),
      to: ModId::new(to),
      kind: DependencyKind::Required,
      requirement: None,
    }
  }

  #[test]
  fn topological_order_respects_required_edges() {
    let mut graph = Graph::new();
    graph.add_node(node("a", true)).unwrap();
    graph.add_node(node("b", true)).unwrap();
    graph.add_node(node("c", true)).unwrap();
    graph.add_edge(required_edge("a", "b")).unwrap();
    graph.add_edge(required_edge("b", "c")).unwrap();

    let order = graph.topological_order().unwrap();
    let pos = |name: &str| order.iter().position(|id| id.as_str() == name).unwrap();
    assert!(pos("c") < pos("b"));
    assert!(pos("b") < pos("a"));
  }

  #[test]
  fn detects_cycle() {
    let mut graph = Graph::new();
    graph.add_node(node("a", true)).unwrap();
    graph.add_node(node("b", true)).unwrap();
    graph.add_node(node("c", true)).unwrap();
    graph.add_edge(required_edge("a", "b")).unwrap();
    graph.add_edge(required_edge("b", "c")).unwrap();
    graph.add_edge(required_edge("c", "a")).unwrap();

    assert!(graph.cyclic());
    let sccs = graph.strongly_connected_components();
    let big = sccs.iter().find(|c| c.len() == 3).unwrap();
    let names: Vec<&str> = big.iter().map(|id| id.as_str()).collect();
    assert!(names.contains(&"a") && names.contains(&"b") && names.contains(&"c"));
  }

  #[test]
  fn dangling_edge_does_not_block_order() {
    let mut graph = Graph::new();
    graph.add_node(node("a", true)).unwrap();
    graph.add_edge(required_edge("a", "missing")).unwrap();

    let order = graph.topological_order().unwrap();
    assert_eq!(order.len(), 1);
    assert_eq!(order[0].as_str(), "a");
  }

  #[test]
  fn find_enabled_dependents_filters_by_enabled_and_required() {
    let mut graph = Graph::new();
    graph.add_node(node("lib", true)).unwrap();
    graph.add_node(node("consumer-on", true)).unwrap();
    graph.add_node(node("consumer-off", false)).unwrap();
    graph.add_edge(required_edge("consumer-on", "lib")).unwrap();
    graph.add_edge(required_edge("consumer-off", "lib")).unwrap();

    let dependents = graph.find_enabled_dependents(&ModId::new("lib"));
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].as_str(), "consumer-on");
  }

  #[test]
  fn add_node_twice_fails() {
    let mut graph = Graph::new();
    graph.add_node(node("a", true)).unwrap();
    assert!(graph.add_node(node("a", true)).is_err());
  }
}
