//! DOT emission for rendered diagrams.
//!
//! Transforms a [`Diagram`] into Graphviz DOT: groups become nested
//! `subgraph cluster_*` blocks, invisible layout edges get `style="invis"`,
//! and edges touching a group anchor on a representative member node with
//! `lhead`/`ltail` (the graph is emitted with `compound=true`).

mod dot;

use std::collections::HashSet;

use infracc_core::render::{Diagram, DrawnGroup, EdgeStyle, Handle};

pub use dot::{DotBuilder, escape_label, sanitize_id};

/// Render a diagram to DOT text.
pub fn render_dot(diagram: &Diagram, name: &str) -> String {
    let mut builder = DotBuilder::new(name);
    builder
        .attr("rankdir", "LR")
        .attr("compound", "true")
        .node_style("shape=box, style=rounded")
        .blank();

    let nested = nested_handles(diagram);
    for (index, group) in diagram.groups.iter().enumerate() {
        if !nested.contains(&Handle::Group(index)) {
            emit_group(&mut builder, diagram, group);
        }
    }
    for (index, node) in diagram.nodes.iter().enumerate() {
        if !nested.contains(&Handle::Node(index)) {
            builder.node(&node.id, &node.label);
        }
    }

    builder.blank();
    for edge in &diagram.edges {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if edge.style == EdgeStyle::Invisible {
            attrs.push(("style", "invis"));
        }
        if !edge.label.is_empty() {
            attrs.push(("label", edge.label.as_str()));
        }

        let from = anchor(diagram, edge.from);
        let to = anchor(diagram, edge.to);
        let tail_cluster;
        if let Handle::Group(index) = edge.from {
            tail_cluster = format!("cluster_{}", sanitize_id(&diagram.groups[index].id));
            attrs.push(("ltail", tail_cluster.as_str()));
        }
        let head_cluster;
        if let Handle::Group(index) = edge.to {
            head_cluster = format!("cluster_{}", sanitize_id(&diagram.groups[index].id));
            attrs.push(("lhead", head_cluster.as_str()));
        }
        builder.edge_with_attrs(from, to, &attrs);
    }
    builder.build()
}

/// Every handle that appears as a member of some group.
fn nested_handles(diagram: &Diagram) -> HashSet<Handle> {
    diagram
        .groups
        .iter()
        .flat_map(|g| g.members.iter().copied())
        .collect()
}

fn emit_group(builder: &mut DotBuilder, diagram: &Diagram, group: &DrawnGroup) {
    builder.start_cluster(&group.id, &group.label);
    for member in &group.members {
        match member {
            Handle::Node(index) => {
                let node = &diagram.nodes[*index];
                builder.node(&node.id, &node.label);
            }
            Handle::Group(index) => emit_group(builder, diagram, &diagram.groups[*index]),
        }
    }
    builder.end_cluster();
}

/// The node id a DOT edge can anchor on: the handle itself for nodes, the
/// first (transitively) contained node for groups.
fn anchor(diagram: &Diagram, handle: Handle) -> &str {
    match handle {
        Handle::Node(index) => &diagram.nodes[index].id,
        Handle::Group(index) => {
            let group = &diagram.groups[index];
            for member in &group.members {
                if let Handle::Node(node_index) = member {
                    return &diagram.nodes[*node_index].id;
                }
            }
            for member in &group.members {
                if let Handle::Group(_) = member {
                    return anchor(diagram, *member);
                }
            }
            &group.id
        }
    }
}
