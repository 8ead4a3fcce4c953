//! GCP structural passes.

use tracing::debug;

use infracc_core::graph::ResourceGraph;
use infracc_core::resource;
use infracc_core::rules::RuleConfig;
use infracc_error::Result;

/// Subnetworks reference their network; reverse into containment.
pub fn group_network_subnetworks(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    for subnetwork in graph.nodes_matching("google_compute_subnetwork") {
        if graph
            .parents_of(&subnetwork)
            .iter()
            .any(|p| resource::resource_type(p) == "google_compute_network")
        {
            continue;
        }
        for network in graph.children(&subnetwork).to_vec() {
            if resource::resource_type(&network) == "google_compute_network" {
                debug!(subnetwork = %subnetwork, network = %network, "parenting subnetwork under network");
                graph.remove_edge(&subnetwork, &network);
                graph.add_edge(&network, &subnetwork);
            }
        }
    }
    Ok(())
}

/// Firewall boundary wrapping.
pub fn wrap_firewalls(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    infracc_core::pass::wrap_boundaries(graph, rules, "google_compute_firewall")
}

/// Gather shared services under the synthetic cluster node.
pub fn cluster_shared(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    infracc_core::pass::cluster_shared_services(graph, rules, "gcp_group.shared_services")
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

#[cfg(test)]
mod tests {
    use super::*;
    use infracc_core::graph::AttrMap;
    use pretty_assertions::assert_eq;

    fn rules() -> RuleConfig {
        RuleConfig::from_toml_str(
            "gcp",
            r#"
            group_nodes = ["google_compute_network", "google_compute_subnetwork", "google_compute_firewall", "gcp_group"]
            shared_services = ["google_kms", "google_logging"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_subnetwork_reference_reversed() {
        let mut graph = ResourceGraph::new();
        graph.add_edge("google_compute_subnetwork.app", "google_compute_network.main");

        group_network_subnetworks(&mut graph, &rules()).unwrap();

        assert_eq!(
            graph.children("google_compute_network.main"),
            ["google_compute_subnetwork.app"]
        );
    }

    #[test]
    fn test_firewall_wraps_instances() {
        let mut graph = ResourceGraph::new();
        graph.add_edge("google_compute_instance.web", "google_compute_firewall.web");

        wrap_firewalls(&mut graph, &rules()).unwrap();

        assert_eq!(
            graph.children("google_compute_firewall.web"),
            ["google_compute_instance.web"]
        );
    }

    #[test]
    fn test_shared_cluster_and_pruning() {
        let mut graph = ResourceGraph::new();
        graph.add_node("google_kms_crypto_key.main", AttrMap::new());
        graph.add_node("google_logging_project_sink.logs", AttrMap::new());
        graph.add_node("null_resource.wait", AttrMap::new());

        cluster_shared(&mut graph, &rules()).unwrap();
        prune_artifacts(&mut graph, &rules()).unwrap();

        assert_eq!(
            graph.children("gcp_group.shared_services"),
            ["google_kms_crypto_key.main", "google_logging_project_sink.logs"]
        );
        assert!(!graph.contains("null_resource.wait"));
    }
}
