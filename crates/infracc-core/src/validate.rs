//! Hierarchy & connection validator.
//!
//! Read-only invariant checks over the final graph. Findings are advisory
//! diagnostics for pipeline authors, not fatal errors: they indicate
//! visual-quality risks, and the renderer still runs.

use std::fmt;

use crate::graph::ResourceGraph;
use crate::resource;
use crate::rules::RuleConfig;

/// One validator finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A node's type sits under no allowed parent type.
    Hierarchy {
        node: String,
        child_prefix: String,
        allowed: Vec<String>,
    },
    /// An un-numbered node is listed under more than one group-type parent.
    SharedParent { node: String, parents: Vec<String> },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Hierarchy {
                node,
                child_prefix,
                allowed,
            } => write!(
                f,
                "hierarchy violation: '{}' (rule '{}') has no parent of an allowed type [{}]",
                node,
                child_prefix,
                allowed.join(", ")
            ),
            Violation::SharedParent { node, parents } => write!(
                f,
                "shared parent violation: '{}' is contained by multiple groups [{}]",
                node,
                parents.join(", ")
            ),
        }
    }
}

/// Check every declared hierarchy rule and the single-structural-parent
/// invariant against one provider's rules. Never mutates the graph.
pub fn validate(graph: &ResourceGraph, rules: &RuleConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    for rule in &rules.hierarchy {
        for node in graph.nodes_matching(&rule.child) {
            if graph.is_hidden(&node) {
                continue;
            }
            let parents = graph.parents_of(&node);
            let satisfied = parents
                .iter()
                .any(|parent| resource::matches_any_prefix(parent, &rule.parents));
            if !satisfied {
                violations.push(Violation::Hierarchy {
                    node,
                    child_prefix: rule.child.clone(),
                    allowed: rule.parents.clone(),
                });
            }
        }
    }

    // a node without a ~N suffix must sit under at most one container,
    // otherwise the layout engine cannot place it
    for node in graph.nodes() {
        if graph.is_hidden(&node) || resource::instance_suffix(&node).is_some() {
            continue;
        }
        let group_parents: Vec<String> = graph
            .parents_of(&node)
            .into_iter()
            .filter(|parent| rules.is_group_type(parent))
            .collect();
        if group_parents.len() > 1 {
            violations.push(Violation::SharedParent {
                node,
                parents: group_parents,
            });
        }
    }

    violations
}
