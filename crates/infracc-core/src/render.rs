//! Rendering traversal.
//!
//! Recursive descent over the rewritten graph that instantiates drawing
//! primitives exactly once per resource, resolves edge visibility and
//! labels, and stops at cycles. The output is a nested group/node/edge
//! structure for an external layout engine; no image I/O happens here.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use infracc_error::Result;

use crate::graph::ResourceGraph;
use crate::registry::ProviderRegistry;
use crate::resource;
use crate::rules::RuleConfig;
use std::sync::Arc;

/// Handle to a drawing primitive inside a [`Diagram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Handle {
    Node(usize),
    Group(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeStyle {
    /// Visually rendered edge.
    Solid,
    /// Present for layout ranking only, not shown.
    Invisible,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawnNode {
    pub id: String,
    pub label: String,
    pub node_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawnGroup {
    pub id: String,
    pub label: String,
    pub members: Vec<Handle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawnEdge {
    pub from: Handle,
    pub to: Handle,
    pub style: EdgeStyle,
    pub label: String,
}

/// Nested group/node/edge structure handed to the layout engine.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagram {
    pub nodes: Vec<DrawnNode>,
    pub groups: Vec<DrawnGroup>,
    pub edges: Vec<DrawnEdge>,
}

impl Diagram {
    pub fn node(&self, handle: Handle) -> Option<&DrawnNode> {
        match handle {
            Handle::Node(index) => self.nodes.get(index),
            Handle::Group(_) => None,
        }
    }

    pub fn handle_id(&self, handle: Handle) -> &str {
        match handle {
            Handle::Node(index) => &self.nodes[index].id,
            Handle::Group(index) => &self.groups[index].id,
        }
    }

    /// Look up the handle a resource id was drawn as.
    pub fn find(&self, id: &str) -> Option<Handle> {
        if let Some(index) = self.nodes.iter().position(|n| n.id == id) {
            return Some(Handle::Node(index));
        }
        self.groups
            .iter()
            .position(|g| g.id == id)
            .map(Handle::Group)
    }
}

/// Recursive renderer threading a drawn-set so every resource becomes at
/// most one drawing primitive.
pub struct Renderer<'a> {
    graph: &'a ResourceGraph,
    registry: &'a ProviderRegistry,
    drawn: HashMap<String, Handle>,
    connected: HashMap<String, HashSet<String>>,
    diagram: Diagram,
}

impl<'a> Renderer<'a> {
    pub fn new(graph: &'a ResourceGraph, registry: &'a ProviderRegistry) -> Self {
        Self {
            graph,
            registry,
            drawn: HashMap::new(),
            connected: HashMap::new(),
            diagram: Diagram::default(),
        }
    }

    /// Walk the provider draw order, then everything else in insertion
    /// order, and return the finished diagram.
    pub fn render(mut self) -> Result<Diagram> {
        for id in self.draw_order() {
            if self.drawn.contains_key(&id) || self.skipped(&id) {
                continue;
            }
            if self.is_group(&id) {
                self.draw_group(&id)?;
            } else {
                self.draw_node(&id)?;
            }
        }
        Ok(self.diagram)
    }

    fn rules_for(&self, id: &str) -> Option<Arc<RuleConfig>> {
        let provider = self.registry.detect_for_node(id)?;
        let context = self.registry.context(provider).ok()?;
        context.rules().ok()
    }

    /// A node renders as a container only while it actually holds members;
    /// an emptied group type degrades to a plain node.
    fn is_group(&self, id: &str) -> bool {
        !self.graph.children(id).is_empty()
            && self.rules_for(id).is_some_and(|r| r.is_group_type(id))
    }

    fn skipped(&self, id: &str) -> bool {
        if self.graph.is_hidden(id) {
            return true;
        }
        self.rules_for(id).is_some_and(|r| r.is_never_draw(id))
    }

    /// Ordered list of node ids: outer-boundary nodes first, then
    /// edge/boundary nodes, then containers, then consolidated nodes, then
    /// the remainder, per each provider's declared stages.
    fn draw_order(&self) -> Vec<String> {
        let mut ordered = Vec::new();
        let mut taken = HashSet::new();
        let nodes = self.graph.nodes();

        for provider in self.registry.all_providers() {
            let Ok(context) = self.registry.context(provider) else {
                continue;
            };
            let Ok(rules) = context.rules() else {
                continue;
            };
            for stage in &rules.draw_order {
                for id in &nodes {
                    if !taken.contains(id)
                        && stage.iter().any(|prefix| resource::matches_prefix(id, prefix))
                    {
                        taken.insert(id.clone());
                        ordered.push(id.clone());
                    }
                }
            }
        }
        for id in nodes {
            if !taken.contains(&id) {
                ordered.push(id);
            }
        }
        ordered
    }

    /// Create a container primitive and recurse into its children:
    /// sub-groups become nested containers, leaves become nodes.
    fn draw_group(&mut self, id: &str) -> Result<Handle> {
        if let Some(&handle) = self.drawn.get(id) {
            return Ok(handle);
        }
        let index = self.diagram.groups.len();
        let handle = Handle::Group(index);
        self.diagram.groups.push(DrawnGroup {
            id: id.to_string(),
            label: self.label_for(id),
            members: Vec::new(),
        });
        self.drawn.insert(id.to_string(), handle);
        debug!(group = id, "drawing group");

        let children = self.graph.children(id).to_vec();
        for child in children {
            if self.skipped(&child) || child == id {
                continue;
            }
            let member = if self.is_group(&child) {
                self.draw_group(&child)?
            } else {
                self.draw_node(&child)?
            };
            let group = &mut self.diagram.groups[index];
            if !group.members.contains(&member) {
                group.members.push(member);
            }
        }
        Ok(handle)
    }

    /// Create a node primitive and connect it to its drawable targets.
    fn draw_node(&mut self, id: &str) -> Result<Handle> {
        if let Some(&handle) = self.drawn.get(id) {
            return Ok(handle);
        }
        let index = self.diagram.nodes.len();
        let handle = Handle::Node(index);
        self.diagram.nodes.push(DrawnNode {
            id: id.to_string(),
            label: self.label_for(id),
            node_type: resource::resource_type(id).to_string(),
        });
        self.drawn.insert(id.to_string(), handle);
        debug!(node = id, "drawing node");

        let children = self.graph.children(id).to_vec();
        for target in children {
            // unknown types and self-edges never become connections
            if target == id || !self.graph.contains(&target) || self.skipped(&target) {
                continue;
            }
            let target_handle = if self.graph.children(&target).iter().any(|t| t == id) {
                // two-cycle back to this node: draw the target as a leaf
                // without recursing into its own connections
                self.draw_leaf(&target)?
            } else if self.is_group(&target) {
                self.draw_group(&target)?
            } else {
                self.draw_node(&target)?
            };
            self.connect(id, &target, handle, target_handle);
        }
        Ok(handle)
    }

    /// Draw a node primitive without following its outgoing edges.
    fn draw_leaf(&mut self, id: &str) -> Result<Handle> {
        if let Some(&handle) = self.drawn.get(id) {
            return Ok(handle);
        }
        let index = self.diagram.nodes.len();
        let handle = Handle::Node(index);
        self.diagram.nodes.push(DrawnNode {
            id: id.to_string(),
            label: self.label_for(id),
            node_type: resource::resource_type(id).to_string(),
        });
        self.drawn.insert(id.to_string(), handle);
        Ok(handle)
    }

    /// Connect an origin/destination pair at most once, honoring the
    /// suppression and visibility policies.
    fn connect(&mut self, from_id: &str, to_id: &str, from: Handle, to: Handle) {
        let seen = self.connected.entry(from_id.to_string()).or_default();
        if !seen.insert(to_id.to_string()) {
            return;
        }
        if !self.ok_to_connect(from_id, to_id) {
            debug!(from = from_id, to = to_id, "edge suppressed");
            return;
        }
        let (style, label) = if self.always_draw_edge(from_id, to_id) {
            (EdgeStyle::Solid, self.edge_label(from_id, to_id))
        } else {
            (EdgeStyle::Invisible, String::new())
        };
        self.diagram.edges.push(DrawnEdge {
            from,
            to,
            style,
            label,
        });
    }

    /// Edges touching exactly one shared-service endpoint are suppressed
    /// entirely unless an endpoint is in the always-draw set, to avoid
    /// clutter from hub resources.
    fn ok_to_connect(&self, origin: &str, dest: &str) -> bool {
        let origin_rules = self.rules_for(origin);
        let dest_rules = self.rules_for(dest);
        let shared = |rules: &Option<Arc<RuleConfig>>, id: &str| {
            rules.as_deref().is_some_and(|r| r.is_shared_service(id))
        };
        let always = |rules: &Option<Arc<RuleConfig>>, id: &str| {
            rules.as_deref().is_some_and(|r| r.is_always_draw(id))
        };
        let origin_shared = shared(&origin_rules, origin);
        let dest_shared = shared(&dest_rules, dest);
        if origin_shared == dest_shared {
            return true;
        }
        always(&origin_rules, origin) || always(&dest_rules, dest)
    }

    /// An edge is rendered solid if either endpoint type is in the
    /// always-draw set, is edge/boundary-classified, carries an edge-label
    /// annotation, or appears in the provider's annotation table.
    fn always_draw_edge(&self, origin: &str, dest: &str) -> bool {
        for (rules, id) in [(self.rules_for(origin), origin), (self.rules_for(dest), dest)] {
            let Some(rules) = rules else { continue };
            if rules.is_always_draw(id)
                || rules.is_edge_type(id)
                || rules.is_outer_type(id)
                || rules.has_annotation(id)
            {
                return true;
            }
        }
        if let Some(meta) = self.graph.metadata(origin)
            && meta.contains_key("edge_labels")
        {
            return true;
        }
        false
    }

    /// Resolve an edge label from the origin's annotation list, falling back
    /// to the owning consolidated node's entries.
    fn edge_label(&self, origin: &str, dest: &str) -> String {
        self.rules_for(origin)
            .and_then(|rules| rules.edge_label(origin, dest).map(str::to_string))
            .unwrap_or_default()
    }

    fn label_for(&self, id: &str) -> String {
        if let Some(meta) = self.graph.metadata(id)
            && let Some(label) = meta.get("label").and_then(|v| v.as_str())
        {
            return label.to_string();
        }
        resource::resource_name(id)
            .unwrap_or(id)
            .replace('~', " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceGraph;
    use crate::pass::Pass;
    use crate::registry::{ProviderHandler, ProviderRegistry};
    use pretty_assertions::assert_eq;

    struct TestProvider;

    impl ProviderHandler for TestProvider {
        fn name(&self) -> &'static str {
            "aws"
        }

        fn prefixes(&self) -> &'static [&'static str] {
            &["aws_"]
        }

        fn rules_toml(&self) -> &'static str {
            r#"
            group_nodes = ["aws_vpc", "aws_subnet"]
            edge_nodes = ["aws_internet_gateway"]
            shared_services = ["aws_cloudwatch"]
            always_draw = ["aws_route53"]
            never_draw = ["aws_iam_policy"]
            draw_order = [["aws_route53"], ["aws_internet_gateway"], ["aws_vpc"]]
            "#
        }

        fn passes(&self) -> Vec<Pass> {
            Vec::new()
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry
            .register(std::sync::Arc::new(TestProvider), true)
            .unwrap();
        registry
    }

    #[test]
    fn test_two_cycle_draws_each_node_once() {
        let registry = registry();
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_instance.a", "aws_instance.b");
        graph.add_edge("aws_instance.b", "aws_instance.a");

        let diagram = Renderer::new(&graph, &registry).render().unwrap();
        assert_eq!(diagram.nodes.len(), 2);
        assert!(diagram.find("aws_instance.a").is_some());
        assert!(diagram.find("aws_instance.b").is_some());
    }

    #[test]
    fn test_groups_nest() {
        let registry = registry();
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_vpc.main", "aws_subnet.app");
        graph.add_edge("aws_subnet.app", "aws_instance.web");

        let diagram = Renderer::new(&graph, &registry).render().unwrap();
        let vpc = diagram.find("aws_vpc.main").unwrap();
        let subnet = diagram.find("aws_subnet.app").unwrap();
        assert!(matches!(vpc, Handle::Group(_)));
        assert!(matches!(subnet, Handle::Group(_)));
        let Handle::Group(vpc_index) = vpc else {
            unreachable!()
        };
        assert_eq!(diagram.groups[vpc_index].members, vec![subnet]);
    }

    #[test]
    fn test_shared_service_edges_suppressed() {
        let registry = registry();
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_instance.web", "aws_cloudwatch_log_group.logs");

        let diagram = Renderer::new(&graph, &registry).render().unwrap();
        assert_eq!(diagram.nodes.len(), 2);
        assert!(diagram.edges.is_empty());
    }

    #[test]
    fn test_always_draw_overrides_suppression() {
        let registry = registry();
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_route53_record.www", "aws_cloudwatch_log_group.logs");

        let diagram = Renderer::new(&graph, &registry).render().unwrap();
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].style, EdgeStyle::Solid);
    }

    #[test]
    fn test_plain_edges_are_invisible() {
        let registry = registry();
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_instance.web", "aws_db_instance.db");

        let diagram = Renderer::new(&graph, &registry).render().unwrap();
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].style, EdgeStyle::Invisible);
    }

    #[test]
    fn test_never_draw_and_hidden_skipped() {
        let registry = registry();
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_instance.web", "aws_iam_policy.p");
        graph.add_edge("aws_instance.web", "aws_db_instance.db");
        graph.hide("aws_db_instance.db");

        let diagram = Renderer::new(&graph, &registry).render().unwrap();
        assert_eq!(diagram.nodes.len(), 1);
        assert!(diagram.edges.is_empty());
    }

    #[test]
    fn test_duplicate_pairs_connected_once() {
        let registry = registry();
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_internet_gateway.gw", "aws_instance.web");
        graph.add_edge("aws_lb.front", "aws_internet_gateway.gw");
        graph.add_edge("aws_lb.front", "aws_instance.web");

        let diagram = Renderer::new(&graph, &registry).render().unwrap();
        let pairs: Vec<(&str, &str)> = diagram
            .edges
            .iter()
            .map(|e| (diagram.handle_id(e.from), diagram.handle_id(e.to)))
            .collect();
        let mut deduped = pairs.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(pairs.len(), deduped.len());
    }
}
