//! The mutable in-memory resource graph all rewrite passes operate on.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::inventory::Inventory;
use crate::resource;

/// Working attribute map attached to a resource.
pub type AttrMap = serde_json::Map<String, Value>;

/// Adjacency map plus per-resource metadata.
///
/// A resource's edge list records the resources it depends on or contains;
/// direction semantics vary by pass and are disambiguated by node-type
/// classification. Node iteration follows explicit insertion order
/// (`node_list`), never map iteration order.
///
/// `original_metadata` holds the raw attributes from the source inventory and
/// is never mutated by passes; working state goes to `metadata` only.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    node_list: Vec<String>,
    edges: HashMap<String, Vec<String>>,
    metadata: HashMap<String, AttrMap>,
    original_metadata: HashMap<String, AttrMap>,
    hidden: HashSet<String>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial graph from a raw inventory plus the upstream
    /// parser's declared dependency map, when one was supplied.
    pub fn from_inventory(
        inventory: &Inventory,
        graphdict: Option<&HashMap<String, Vec<String>>>,
    ) -> Self {
        let mut graph = Self::new();
        for resource in &inventory.resources {
            graph.add_node(&resource.address(), resource.attributes.clone());
        }
        if let Some(edges) = graphdict {
            for resource in &inventory.resources {
                let address = resource.address();
                if let Some(targets) = edges.get(&address) {
                    for target in targets {
                        graph.add_edge(&address, target);
                    }
                }
            }
        }
        graph
    }

    /// Insert a node if absent. The attribute map becomes the node's
    /// read-only original metadata; an already-present node is untouched.
    pub fn add_node(&mut self, id: &str, attributes: AttrMap) {
        if self.edges.contains_key(id) {
            return;
        }
        self.node_list.push(id.to_string());
        self.edges.insert(id.to_string(), Vec::new());
        self.metadata.insert(id.to_string(), AttrMap::new());
        self.original_metadata.insert(id.to_string(), attributes);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.node_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_list.is_empty()
    }

    /// Snapshot of all node ids in insertion order.
    ///
    /// Passes iterate over this snapshot and apply mutations afterwards, so
    /// no pass ever mutates the graph while scanning a live view of it.
    pub fn nodes(&self) -> Vec<String> {
        self.node_list.clone()
    }

    /// Snapshot of node ids whose type matches the given prefix.
    pub fn nodes_matching(&self, prefix: &str) -> Vec<String> {
        self.node_list
            .iter()
            .filter(|id| resource::matches_prefix(id, prefix))
            .cloned()
            .collect()
    }

    /// First node whose type matches the given prefix, in insertion order.
    pub fn find_by_type(&self, prefix: &str) -> Option<&str> {
        self.node_list
            .iter()
            .find(|id| resource::matches_prefix(id, prefix))
            .map(String::as_str)
    }

    /// Add an edge, creating missing endpoints with empty metadata.
    /// Duplicate edges are collapsed.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(from, AttrMap::new());
        self.add_node(to, AttrMap::new());
        let targets = self.edges.get_mut(from).unwrap_or_else(|| unreachable!());
        if !targets.iter().any(|t| t == to) {
            targets.push(to.to_string());
        }
    }

    pub fn remove_edge(&mut self, from: &str, to: &str) {
        if let Some(targets) = self.edges.get_mut(from) {
            targets.retain(|t| t != to);
        }
    }

    /// Remove a node and every reference to it across the graph.
    pub fn remove_node(&mut self, id: &str) {
        self.node_list.retain(|n| n != id);
        self.edges.remove(id);
        self.metadata.remove(id);
        self.original_metadata.remove(id);
        self.hidden.remove(id);
        for targets in self.edges.values_mut() {
            targets.retain(|t| t != id);
        }
    }

    /// Rename a node, rewriting every reference to point at the new id.
    ///
    /// Merge-aware: if the new id already exists its edge lists and metadata
    /// are merged instead of clobbered, so consolidation stays idempotent.
    pub fn rename_node(&mut self, old: &str, new: &str) {
        if old == new || !self.contains(old) {
            return;
        }
        let old_targets = self.edges.remove(old).unwrap_or_default();
        let old_meta = self.metadata.remove(old).unwrap_or_default();
        let old_original = self.original_metadata.remove(old).unwrap_or_default();
        let was_hidden = self.hidden.remove(old);

        if self.contains(new) {
            // visibility follows the surviving node: a hidden alias folding
            // into a visible canonical node must not hide it
            self.node_list.retain(|n| n != old);
            for target in old_targets {
                if target != new {
                    self.add_edge(new, &target);
                }
            }
            let merged = self.metadata.entry(new.to_string()).or_default();
            for (key, value) in old_meta {
                merged.entry(key).or_insert(value);
            }
            let merged = self.original_metadata.entry(new.to_string()).or_default();
            for (key, value) in old_original {
                merged.entry(key).or_insert(value);
            }
        } else {
            for slot in self.node_list.iter_mut() {
                if slot == old {
                    *slot = new.to_string();
                }
            }
            self.edges.insert(
                new.to_string(),
                old_targets.into_iter().filter(|t| t != new).collect(),
            );
            self.metadata.insert(new.to_string(), old_meta);
            self.original_metadata.insert(new.to_string(), old_original);
            if was_hidden {
                self.hidden.insert(new.to_string());
            }
        }

        for targets in self.edges.values_mut() {
            let mut seen = HashSet::new();
            for target in targets.iter_mut() {
                if target == old {
                    *target = new.to_string();
                }
            }
            targets.retain(|t| seen.insert(t.clone()));
        }
        // a node never lists itself
        if let Some(targets) = self.edges.get_mut(new) {
            targets.retain(|t| t != new);
        }
    }

    /// Rewrite every edge pointing at `old` to point at `new` instead,
    /// leaving the `old` node itself in place.
    pub fn replace_target(&mut self, old: &str, new: &str) {
        for (from, targets) in self.edges.iter_mut() {
            if from == new {
                targets.retain(|t| t != old);
                continue;
            }
            let mut seen = HashSet::new();
            for target in targets.iter_mut() {
                if target == old {
                    *target = new.to_string();
                }
            }
            targets.retain(|t| seen.insert(t.clone()));
        }
    }

    /// The ordered edge list of a node.
    pub fn children(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All nodes whose edge list contains `id`, in insertion order.
    pub fn parents_of(&self, id: &str) -> Vec<String> {
        self.node_list
            .iter()
            .filter(|from| self.children(from).iter().any(|t| t == id))
            .cloned()
            .collect()
    }

    pub fn metadata(&self, id: &str) -> Option<&AttrMap> {
        self.metadata.get(id)
    }

    pub fn metadata_mut(&mut self, id: &str) -> &mut AttrMap {
        self.metadata.entry(id.to_string()).or_default()
    }

    /// Raw source attributes. Read-only for passes.
    pub fn original(&self, id: &str) -> Option<&AttrMap> {
        self.original_metadata.get(id)
    }

    /// Synthetic replication count assigned by the multi-instance detector.
    pub fn count(&self, id: &str) -> Option<u64> {
        self.metadata
            .get(id)
            .and_then(|meta| meta.get("count"))
            .and_then(Value::as_u64)
    }

    /// First writer wins; passes never downgrade an existing count.
    pub fn set_count_if_absent(&mut self, id: &str, count: u64) {
        let meta = self.metadata_mut(id);
        meta.entry("count".to_string())
            .or_insert_with(|| Value::from(count));
    }

    pub fn hide(&mut self, id: &str) {
        if self.contains(id) {
            self.hidden.insert(id.to_string());
        }
    }

    pub fn is_hidden(&self, id: &str) -> bool {
        self.hidden.contains(id)
    }

    pub fn hidden(&self) -> &HashSet<String> {
        &self.hidden
    }

    pub(crate) fn edges_map(&self) -> &HashMap<String, Vec<String>> {
        &self.edges
    }

    pub(crate) fn metadata_map(&self) -> &HashMap<String, AttrMap> {
        &self.metadata
    }

    pub(crate) fn original_map(&self) -> &HashMap<String, AttrMap> {
        &self.original_metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph_with(edges: &[(&str, &str)]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    #[test]
    fn test_add_edge_dedups() {
        let mut graph = graph_with(&[("aws_vpc.main", "aws_subnet.a")]);
        graph.add_edge("aws_vpc.main", "aws_subnet.a");
        assert_eq!(graph.children("aws_vpc.main"), ["aws_subnet.a"]);
    }

    #[test]
    fn test_remove_node_drops_references() {
        let mut graph = graph_with(&[
            ("aws_vpc.main", "aws_subnet.a"),
            ("aws_instance.web", "aws_subnet.a"),
        ]);
        graph.remove_node("aws_subnet.a");
        assert!(!graph.contains("aws_subnet.a"));
        assert!(graph.children("aws_vpc.main").is_empty());
        assert!(graph.children("aws_instance.web").is_empty());
    }

    #[test]
    fn test_rename_rewrites_references() {
        let mut graph = graph_with(&[
            ("aws_instance.web", "aws_lb_listener.front"),
            ("aws_lb_listener.front", "aws_subnet.a"),
        ]);
        graph.rename_node("aws_lb_listener.front", "aws_lb.front");
        assert!(!graph.contains("aws_lb_listener.front"));
        assert_eq!(graph.children("aws_instance.web"), ["aws_lb.front"]);
        assert_eq!(graph.children("aws_lb.front"), ["aws_subnet.a"]);
    }

    #[test]
    fn test_rename_merges_into_existing() {
        let mut graph = graph_with(&[
            ("aws_lb.front", "aws_subnet.a"),
            ("aws_lb_listener.front", "aws_subnet.b"),
            ("aws_instance.web", "aws_lb_listener.front"),
        ]);
        graph.rename_node("aws_lb_listener.front", "aws_lb.front");
        let children = graph.children("aws_lb.front");
        assert_eq!(children, ["aws_subnet.a", "aws_subnet.b"]);
        assert_eq!(graph.children("aws_instance.web"), ["aws_lb.front"]);
        // rename is idempotent once the source is gone
        let before = graph.clone();
        graph.rename_node("aws_lb_listener.front", "aws_lb.front");
        assert_eq!(before.nodes(), graph.nodes());
    }

    #[test]
    fn test_merge_keeps_surviving_visibility() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_lb_listener.front", AttrMap::new());
        graph.add_node("aws_lb.elb", AttrMap::new());
        graph.hide("aws_lb_listener.front");

        graph.rename_node("aws_lb_listener.front", "aws_lb.elb");

        assert!(!graph.is_hidden("aws_lb.elb"));
        assert!(!graph.hidden().contains("aws_lb_listener.front"));
    }

    #[test]
    fn test_rename_never_self_references() {
        let mut graph = graph_with(&[("aws_lb_listener.front", "aws_lb.front")]);
        graph.rename_node("aws_lb_listener.front", "aws_lb.front");
        assert!(graph.children("aws_lb.front").is_empty());
    }

    #[test]
    fn test_replace_target_leaves_old_node() {
        let mut graph = graph_with(&[
            ("aws_instance.web", "aws_subnet.a"),
            ("aws_instance.api", "aws_subnet.a"),
        ]);
        graph.replace_target("aws_subnet.a", "aws_subnet.b");
        assert!(graph.contains("aws_subnet.a"));
        assert_eq!(graph.children("aws_instance.web"), ["aws_subnet.b"]);
        assert_eq!(graph.children("aws_instance.api"), ["aws_subnet.b"]);
    }

    #[test]
    fn test_count_first_writer_wins() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_lb.front", AttrMap::new());
        graph.set_count_if_absent("aws_lb.front", 3);
        graph.set_count_if_absent("aws_lb.front", 2);
        assert_eq!(graph.count("aws_lb.front"), Some(3));
    }

    #[test]
    fn test_parents_of() {
        let graph = graph_with(&[
            ("aws_vpc.main", "aws_subnet.a"),
            ("aws_security_group.web", "aws_subnet.a"),
        ]);
        assert_eq!(
            graph.parents_of("aws_subnet.a"),
            ["aws_vpc.main", "aws_security_group.web"]
        );
    }
}
