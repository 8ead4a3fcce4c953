//! Multi-instance detection.
//!
//! Scans the raw inventory for resources implicitly fanned out across
//! multiple zones/subnets/targets without an explicit replication count and
//! assigns a synthetic `count`, flagging associated resources for the same
//! expansion so dependents expand in lock-step with their owner.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use infracc_error::Result;

use crate::graph::ResourceGraph;
use crate::inventory::Inventory;
use crate::resource;
use crate::rules::RuleConfig;

/// Extract distinct resource references from an attribute value, recursing
/// into arrays and objects. This is a substring reference extractor, not an
/// expression evaluator. Order of first appearance is preserved.
pub fn extract_references(value: &Value, pattern: &Regex) -> Vec<String> {
    let mut found = Vec::new();
    collect_references(value, pattern, &mut found);
    found
}

fn collect_references(value: &Value, pattern: &Regex, found: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            for m in pattern.find_iter(text) {
                let reference = m.as_str().to_string();
                if !found.contains(&reference) {
                    found.push(reference);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, pattern, found);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_references(item, pattern, found);
            }
        }
        _ => {}
    }
}

/// Find the graph node a raw reference resolves to: the reference itself, or
/// the canonical consolidated node an earlier pass renamed it into.
fn resolve_in_graph(graph: &ResourceGraph, rules: &RuleConfig, id: &str) -> Option<String> {
    if graph.contains(id) {
        return Some(id.to_string());
    }
    let stripped = resource::strip_modules(id);
    if stripped != id && graph.contains(stripped) {
        return Some(stripped.to_string());
    }
    let consolidation = rules.consolidation_for(id)?;
    graph
        .contains(&consolidation.into)
        .then(|| consolidation.into.clone())
}

/// Run every configured expansion pattern over the inventory, writing
/// synthetic counts into the graph metadata. First writer wins; counts are
/// never downgraded.
pub fn detect_multi_instance(
    inventory: &Inventory,
    graph: &mut ResourceGraph,
    rules: &RuleConfig,
) -> Result<()> {
    let Some(pattern) = rules.reference_regex() else {
        return Ok(());
    };

    for expand in &rules.expand {
        for record in &inventory.resources {
            if !expand.types.iter().any(|t| record.resource_type == *t) {
                continue;
            }

            let mut references = Vec::new();
            for trigger in &expand.triggers {
                if let Some(value) = record.attributes.get(trigger) {
                    for reference in extract_references(value, pattern) {
                        if !references.contains(&reference) {
                            references.push(reference);
                        }
                    }
                }
            }
            if references.len() < 2 {
                continue;
            }

            let count = references.len() as u64;
            let address = record.address();
            let Some(owner) = resolve_in_graph(graph, rules, &address) else {
                continue;
            };
            debug!(resource = %owner, count, "multi-instance resource detected");
            graph.set_count_if_absent(&owner, count);

            // dependents named by the also-expand attributes inherit the
            // owner's count, not their own reference count
            for attribute in &expand.also {
                let Some(value) = record.attributes.get(attribute) else {
                    continue;
                };
                for reference in extract_references(value, pattern) {
                    if let Some(dependent) = resolve_in_graph(graph, rules, &reference) {
                        graph.set_count_if_absent(&dependent, count);
                    }
                }
            }
        }
    }
    Ok(())
}
