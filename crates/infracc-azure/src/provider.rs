//! The Azure provider handler.

use infracc_core::pass::Pass;
use infracc_core::registry::ProviderHandler;

use crate::handlers;

const PREFIXES: &[&str] = &[
    "azurerm_",
    "azuread_",
    // synthetic cluster nodes the passes create
    "azure_group",
    "random_",
    "null_resource",
    "time_sleep",
];

#[derive(Debug, Default)]
pub struct AzureProvider;

impl AzureProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderHandler for AzureProvider {
    fn name(&self) -> &'static str {
        "azure"
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
                "azurerm_subnet",
                "azure::group_vnet_subnets",
                handlers::group_vnet_subnets,
            ),
            Pass::new(
                "azurerm_network_security_group",
                "azure::wrap_network_security_groups",
                handlers::wrap_network_security_groups,
            ),
            Pass::new(
                "azurerm_",
                "azure::cluster_shared_services",
                handlers::cluster_shared,
            ),
            Pass::new("random_", "azure::prune_artifacts", handlers::prune_artifacts),
            Pass::new(
                "null_resource",
                "azure::prune_artifacts",
                handlers::prune_artifacts,
            ),
            Pass::new(
                "time_sleep",
                "azure::prune_artifacts",
                handlers::prune_artifacts,
            ),
        ]
    }
}
