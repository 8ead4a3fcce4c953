//! Interchange document for the post-pipeline graph.
//!
//! The host CLI persists this JSON shape for caching and debugging; its
//! field names are a stable contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{AttrMap, ResourceGraph};
use crate::inventory::{Inventory, RawResource};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphExport {
    pub graphdict: BTreeMap<String, Vec<String>>,
    pub meta_data: BTreeMap<String, AttrMap>,
    pub original_metadata: BTreeMap<String, AttrMap>,
    pub node_list: Vec<String>,
    pub hidden: Vec<String>,
    pub all_resource: Vec<RawResource>,
}

impl GraphExport {
    pub fn from_graph(graph: &ResourceGraph, inventory: &Inventory) -> Self {
        let mut hidden: Vec<String> = graph.hidden().iter().cloned().collect();
        hidden.sort();
        Self {
            graphdict: graph
                .edges_map()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            meta_data: graph
                .metadata_map()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            original_metadata: graph
                .original_map()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            node_list: graph.nodes(),
            hidden,
            all_resource: inventory.resources.clone(),
        }
    }

    /// Rebuild the working graph and inventory from a persisted document.
    pub fn into_graph(self) -> (ResourceGraph, Inventory) {
        let mut graph = ResourceGraph::new();
        for node in &self.node_list {
            let original = self.original_metadata.get(node).cloned().unwrap_or_default();
            graph.add_node(node, original);
        }
        for (from, targets) in &self.graphdict {
            for target in targets {
                graph.add_edge(from, target);
            }
        }
        for (node, meta) in self.meta_data {
            *graph.metadata_mut(&node) = meta;
        }
        for node in &self.hidden {
            graph.hide(node);
        }
        (graph, Inventory::new(self.all_resource))
    }
}
