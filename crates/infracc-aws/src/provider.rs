//! The AWS provider handler.

use infracc_core::pass::Pass;
use infracc_core::registry::ProviderHandler;

use crate::{compute, network, repair};

/// Resource-type prefixes AWS inventories use, including the helper
/// artifacts Terraform configs commonly mix in.
const PREFIXES: &[&str] = &["aws_", "random_", "null_resource", "time_sleep"];

#[derive(Debug, Default)]
pub struct AwsProvider;

impl AwsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderHandler for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn prefixes(&self) -> &'static [&'static str] {
        PREFIXES
    }

    fn rules_toml(&self) -> &'static str {
        include_str!("rules.toml")
    }

    /// Ordered special-resource pass table.
    ///
    /// Repairs that add or rewire edges come first; container-shaping passes
    /// run next so they see the repaired edges; pruning runs last once no
    /// later pass could still need the artifact nodes.
    fn passes(&self) -> Vec<Pass> {
        vec![
            Pass::new(
                "aws_cloudfront",
                "aws::fold_cloudfront_origins",
                repair::fold_cloudfront_origins,
            ),
            Pass::new(
                "aws_nat_gateway",
                "aws::attach_nat_gateways",
                repair::attach_nat_gateways,
            ),
            Pass::new(
                "aws_iam_role",
                "aws::link_iam_roles",
                repair::link_iam_roles,
            ),
            Pass::new(
                "aws_autoscaling_group",
                "aws::link_autoscaling",
                compute::link_autoscaling,
            ),
            Pass::new(
                "aws_subnet",
                "aws::group_subnets_by_zone",
                network::group_subnets_by_zone,
            ),
            Pass::new(
                "aws_security_group",
                "aws::wrap_security_groups",
                network::wrap_security_groups,
            ),
            Pass::new(
                "aws_",
                "aws::cluster_shared_services",
                compute::cluster_shared,
            ),
            Pass::new(
                "aws_lb",
                "aws::resolve_lb_variants",
                compute::resolve_lb_variants,
            ),
            Pass::new(
                "aws_db_subnet_group",
                "aws::reparent_db_subnet_groups",
                network::reparent_db_subnet_groups,
            ),
            Pass::new(
                "aws_vpc_endpoint",
                "aws::flatten_vpc_endpoints",
                network::flatten_vpc_endpoints,
            ),
            Pass::new("random_", "aws::prune_artifacts", repair::prune_artifacts),
            Pass::new("null_resource", "aws::prune_artifacts", repair::prune_artifacts),
            Pass::new("time_sleep", "aws::prune_artifacts", repair::prune_artifacts),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_document_parses() {
        let provider = AwsProvider::new();
        let rules = provider.load_rules().unwrap();
        assert!(rules.is_group_type("aws_vpc.main"));
        assert!(rules.is_shared_service("aws_kms_key.main"));
        assert!(rules.reference_regex().is_some());
        assert!(!rules.draw_order.is_empty());
    }

    #[test]
    fn test_owns_helper_artifacts() {
        let provider = AwsProvider::new();
        assert!(provider.owns_node("aws_subnet.private"));
        assert!(provider.owns_node("random_id.suffix"));
        assert!(provider.owns_node("null_resource.wait"));
        assert!(!provider.owns_node("azurerm_subnet.private"));
    }

    #[test]
    fn test_pruning_runs_last() {
        let passes = AwsProvider::new().passes();
        let last = passes.last().unwrap();
        assert_eq!(last.name, "aws::prune_artifacts");
    }
}
