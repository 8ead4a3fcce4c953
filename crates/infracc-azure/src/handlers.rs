//! Azure structural passes. Thin compared to AWS: most of the shaping is
//! the provider-neutral boundary and clustering machinery with Azure types.

use tracing::debug;

use infracc_core::graph::ResourceGraph;
use infracc_core::resource;
use infracc_core::rules::RuleConfig;
use infracc_error::Result;

/// Subnets reference their virtual network; the container orientation is
/// the other way around. Reverse those edges, leaving subnets that already
/// sit under a vnet untouched.
pub fn group_vnet_subnets(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    for subnet in graph.nodes_matching("azurerm_subnet") {
        if graph
            .parents_of(&subnet)
            .iter()
            .any(|p| resource::matches_prefix(p, "azurerm_virtual_network"))
        {
            continue;
        }
        for vnet in graph.children(&subnet).to_vec() {
            if resource::matches_prefix(&vnet, "azurerm_virtual_network") {
                debug!(subnet = %subnet, vnet = %vnet, "parenting subnet under virtual network");
                graph.remove_edge(&subnet, &vnet);
                graph.add_edge(&vnet, &subnet);
            }
        }
    }
    Ok(())
}

/// Network-security-group boundary wrapping.
pub fn wrap_network_security_groups(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    infracc_core::pass::wrap_boundaries(graph, rules, "azurerm_network_security_group")
}

/// Gather shared services under the synthetic cluster node.
pub fn cluster_shared(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    infracc_core::pass::cluster_shared_services(graph, rules, "azure_group.shared_services")
}

const ARTIFACT_PREFIXES: &[&str] = &["random_", "null_resource", "time_sleep"];

/// Delete synthetic helper resources outright.
pub fn prune_artifacts(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let doomed: Vec<String> = graph
        .nodes()
        .into_iter()
        .filter(|id| {
            ARTIFACT_PREFIXES
                .iter()
                .any(|p| resource::matches_prefix(id, p))
        })
        .collect();
    for id in doomed {
        debug!(node = %id, "pruning synthetic artifact");
        graph.remove_node(&id);
    }
    Ok(())
}
