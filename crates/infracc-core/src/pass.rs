//! Structural rewrite passes.
//!
//! Providers register their special-resource handlers as an ordered table of
//! `(type prefix, pass function)` pairs; the driver runs each entry once iff
//! some node in the graph matches the prefix. Passes snapshot the node set
//! they scan before applying mutations (two-phase), so ordering is explicit
//! and deterministic.
//!
//! Two passes are provider-neutral and live here: consolidation and implied
//! connections. Both are rules-driven and idempotent.

use tracing::debug;

use infracc_error::Result;

use crate::graph::ResourceGraph;
use crate::registry::ProviderContext;
use crate::resource;
use crate::rules::RuleConfig;

/// A structural rewrite over the resource graph.
pub type PassFn = fn(&mut ResourceGraph, &RuleConfig) -> Result<()>;

/// One entry of a provider's special-resource dispatch table.
#[derive(Clone)]
pub struct Pass {
    /// Resource-type prefix that arms this pass.
    pub prefix: &'static str,
    /// Name used in logs and structural-error messages.
    pub name: &'static str,
    pub run: PassFn,
}

impl Pass {
    pub fn new(prefix: &'static str, name: &'static str, run: PassFn) -> Self {
        Self { prefix, name, run }
    }
}

/// Run a provider's pass table over the graph in declared order.
///
/// A provider whose rules fail to load is skipped with a warning: core
/// consolidation and draw-order logic fall back to generic behavior for that
/// provider's nodes. Structural errors from a pass abort the run.
pub fn run_provider_passes(graph: &mut ResourceGraph, context: &ProviderContext) -> Result<()> {
    let rules = match context.rules() {
        Ok(rules) => rules,
        Err(err) => {
            tracing::warn!(
                provider = context.name(),
                error = %err,
                "provider rules unavailable, skipping special processing"
            );
            return Ok(());
        }
    };

    for pass in context.passes() {
        let armed = graph
            .nodes()
            .iter()
            .any(|id| resource::matches_prefix(id, pass.prefix));
        if !armed {
            continue;
        }
        debug!(provider = context.name(), pass = pass.name, "running pass");
        (pass.run)(graph, &rules).map_err(|err| err.with_context("pass", pass.name))?;
    }
    Ok(())
}

/// Canonicalize every node matching a consolidation prefix into its
/// provider-declared consolidated identifier. Idempotent: canonical nodes
/// are exempt from further folding and re-running changes nothing.
pub fn consolidate(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    let snapshot = graph.nodes();
    for id in snapshot {
        let Some(rule) = rules.consolidation_for(&id) else {
            continue;
        };
        let canonical = match resource::instance_suffix(&id) {
            Some(n) => resource::numbered(&rule.into, n),
            None => rule.into.clone(),
        };
        if id == canonical {
            continue;
        }
        debug!(from = %id, to = %canonical, "consolidating");
        graph.rename_node(&id, &canonical);
        if !rule.label.is_empty() {
            graph
                .metadata_mut(&canonical)
                .entry("label".to_string())
                .or_insert_with(|| serde_json::Value::from(rule.label.clone()));
        }
    }
    Ok(())
}

/// Add edges the raw inventory implies but never states: an attribute whose
/// name contains a configured key connects its resource to the first node of
/// the mapped target type. Best-effort per resource.
pub fn implied_connections(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    let snapshot = graph.nodes();
    let mut additions = Vec::new();
    for id in &snapshot {
        let Some(original) = graph.original(id) else {
            continue;
        };
        for (needle, target_type) in &rules.implied {
            if !original.keys().any(|key| key.contains(needle.as_str())) {
                continue;
            }
            if let Some(target) = graph.find_by_type(target_type)
                && target != id
            {
                additions.push((id.clone(), target.to_string()));
            }
        }
    }
    for (from, to) in additions {
        debug!(%from, %to, "implied connection");
        graph.add_edge(&from, &to);
    }
    Ok(())
}

/// Shared-network-boundary wrapping (security-group equivalent).
///
/// Resources reference their boundary in the raw inventory, which puts the
/// boundary at the child end of the edge. Reverse it so the boundary node
/// contains the wrapped resource; a resource that already sits in a
/// container keeps its parent. Boundary nodes left with zero members are
/// deleted, never left dangling. A member claimed by several boundaries
/// keeps only the first; later claims are merged into numbered metadata
/// notes on the member so the membership is not lost.
pub fn wrap_boundaries(
    graph: &mut ResourceGraph,
    rules: &RuleConfig,
    boundary_prefix: &str,
) -> Result<()> {
    let boundaries = graph.nodes_matching(boundary_prefix);

    for boundary in &boundaries {
        // a boundary that references a container belongs inside it
        for child in graph.children(boundary).to_vec() {
            if rules.is_group_type(&child) && !resource::matches_prefix(&child, boundary_prefix) {
                graph.remove_edge(boundary, &child);
                graph.add_edge(&child, boundary);
            }
        }

        for member in graph.parents_of(boundary) {
            if resource::matches_prefix(&member, boundary_prefix) {
                continue;
            }
            let has_container = graph
                .parents_of(&member)
                .iter()
                .any(|p| p != boundary && rules.is_group_type(p));
            if has_container {
                // already contained elsewhere, keep the plain connection
                continue;
            }
            graph.remove_edge(&member, boundary);
            graph.add_edge(boundary, &member);
        }
    }

    // merge duplicate boundary parents: the first wrap wins, later claims
    // become numbered metadata notes
    let snapshot = graph.nodes();
    for node in &snapshot {
        let wrappers: Vec<String> = graph
            .parents_of(node)
            .into_iter()
            .filter(|p| resource::matches_prefix(p, boundary_prefix))
            .collect();
        for (index, extra) in wrappers.iter().enumerate().skip(1) {
            graph.remove_edge(extra, node);
            graph.metadata_mut(node).insert(
                format!("merged_boundary~{index}"),
                serde_json::Value::String(extra.clone()),
            );
        }
    }

    for boundary in &boundaries {
        if graph.contains(boundary) && graph.children(boundary).is_empty() {
            debug!(boundary = %boundary, "removing orphaned boundary node");
            graph.remove_node(boundary);
        }
    }
    Ok(())
}

/// Collect every shared-service node under one synthetic cluster node.
/// Already-consolidated members are canonicalized first. Idempotent:
/// re-running never nests clusters.
pub fn cluster_shared_services(
    graph: &mut ResourceGraph,
    rules: &RuleConfig,
    cluster_id: &str,
) -> Result<()> {
    let members: Vec<String> = graph
        .nodes()
        .into_iter()
        .filter(|id| id != cluster_id && rules.is_shared_service(id))
        .map(|id| match rules.consolidation_for(&id) {
            Some(rule) if graph.contains(&rule.into) => rule.into.clone(),
            _ => id,
        })
        .collect();
    if members.len() < 2 {
        return Ok(());
    }

    graph.add_node(cluster_id, crate::graph::AttrMap::new());
    for member in members {
        for parent in graph.parents_of(&member) {
            if parent != cluster_id && rules.is_group_type(&parent) {
                graph.remove_edge(&parent, &member);
            }
        }
        graph.add_edge(cluster_id, &member);
    }
    Ok(())
}

/// Expand every node carrying a synthetic `count` of N into N numbered
/// siblings and repoint all structural references at the specific sibling.
///
/// Referrers that already carry a `~i` suffix are matched to sibling `i`;
/// un-numbered referrers fan out to every sibling. The un-numbered base
/// node is removed, so no reference to it can survive.
pub fn expand_multi_instance(graph: &mut ResourceGraph) -> Result<()> {
    let targets: Vec<(String, u64)> = graph
        .nodes()
        .into_iter()
        .filter(|id| resource::instance_suffix(id).is_none())
        .filter_map(|id| graph.count(&id).filter(|&n| n > 1).map(|n| (id, n)))
        .collect();

    for (base, count) in targets {
        debug!(resource = %base, count, "expanding multi-instance resource");
        let children = graph.children(&base).to_vec();
        let parents = graph.parents_of(&base);
        let meta = graph.metadata(&base).cloned().unwrap_or_default();
        let original = graph.original(&base).cloned().unwrap_or_default();

        for i in 1..=count as u32 {
            let sibling = resource::numbered(&base, i);
            graph.add_node(&sibling, original.clone());
            *graph.metadata_mut(&sibling) = meta.clone();
            for child in &children {
                graph.add_edge(&sibling, child);
            }
        }

        for parent in parents {
            graph.remove_edge(&parent, &base);
            match resource::instance_suffix(&parent) {
                Some(i) if u64::from(i) <= count => {
                    graph.add_edge(&parent, &resource::numbered(&base, i));
                }
                _ => {
                    for i in 1..=count as u32 {
                        graph.add_edge(&parent, &resource::numbered(&base, i));
                    }
                }
            }
        }
        graph.remove_node(&base);
    }

    // second sweep: siblings whose targets were expanded after them now
    // point at vanished base ids unless matched up by suffix
    let sweep = graph.nodes();
    for id in sweep {
        let Some(i) = resource::instance_suffix(&id) else {
            continue;
        };
        let children = graph.children(&id).to_vec();
        for child in children {
            if !graph.contains(&child) {
                let matched = resource::numbered(&child, i);
                graph.remove_edge(&id, &child);
                if graph.contains(&matched) {
                    graph.add_edge(&id, &matched);
                }
            }
        }
    }
    Ok(())
}
