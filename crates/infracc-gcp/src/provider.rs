//! The GCP provider handler.

use infracc_core::pass::Pass;
use infracc_core::registry::ProviderHandler;

use crate::handlers;

// gcp_group covers the synthetic cluster nodes the passes create
const PREFIXES: &[&str] = &["google_", "gcp_group", "random_", "null_resource", "time_sleep"];

#[derive(Debug, Default)]
pub struct GcpProvider;

impl GcpProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderHandler for GcpProvider {
    fn name(&self) -> &'static str {
        "gcp"
    }

    fn prefixes(&self) -> &'static [&'static str] {
        PREFIXES
    }

    fn rules_toml(&self) -> &'static str {
        include_str!("rules.toml")
    }

    fn passes(&self) -> Vec<Pass> {
        vec![
            Pass::new(
                "google_compute_subnetwork",
                "gcp::group_network_subnetworks",
                handlers::group_network_subnetworks,
            ),
            Pass::new(
                "google_compute_firewall",
                "gcp::wrap_firewalls",
                handlers::wrap_firewalls,
            ),
            Pass::new(
                "google_",
                "gcp::cluster_shared_services",
                handlers::cluster_shared,
            ),
            Pass::new("random_", "gcp::prune_artifacts", handlers::prune_artifacts),
            Pass::new(
                "null_resource",
                "gcp::prune_artifacts",
                handlers::prune_artifacts,
            ),
            Pass::new(
                "time_sleep",
                "gcp::prune_artifacts",
                handlers::prune_artifacts,
            ),
        ]
    }
}
