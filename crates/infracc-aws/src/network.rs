//! Network-shaping passes: availability-zone grouping, security-group
//! wrapping, DB-subnet-group repair and VPC-endpoint placement.

use serde_json::Value;
use tracing::debug;

use infracc_core::graph::{AttrMap, ResourceGraph};
use infracc_core::resource;
use infracc_core::rules::RuleConfig;
use infracc_error::{Error, Result};

/// Availability-zone id for a subnet: the declared zone name when the
/// metadata carries one, otherwise the numbered-instance suffix.
fn zone_id_for(graph: &ResourceGraph, subnet: &str) -> String {
    let declared = graph
        .original(subnet)
        .and_then(|meta| meta.get("availability_zone"))
        .and_then(Value::as_str);
    if let Some(zone) = declared {
        let slug: String = zone
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        return format!("aws_az.az_{slug}");
    }
    match resource::instance_suffix(subnet) {
        Some(i) => format!("aws_az.az~{i}"),
        None => "aws_az.az".to_string(),
    }
}

/// Insert a synthetic availability-zone container between every VPC and its
/// subnets. Numbered subnets land in the matching numbered zone; subnets
/// already under a zone are left alone, so re-running changes nothing.
pub fn group_subnets_by_zone(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let subnets = graph.nodes_matching("aws_subnet");
    for subnet in &subnets {
        let parents = graph.parents_of(subnet);
        if parents
            .iter()
            .any(|p| resource::matches_prefix(p, "aws_az"))
        {
            continue;
        }
        let az = zone_id_for(graph, subnet);
        debug!(subnet = %subnet, zone = %az, "grouping subnet under availability zone");
        graph.add_node(&az, AttrMap::new());
        for vpc in parents
            .iter()
            .filter(|p| resource::resource_type(p) == "aws_vpc")
        {
            graph.remove_edge(vpc, subnet);
            graph.add_edge(vpc, &az);
        }
        graph.add_edge(&az, subnet);
    }
    Ok(())
}

/// Security-group boundary wrapping, driven by the shared boundary pass.
pub fn wrap_security_groups(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    infracc_core::pass::wrap_boundaries(graph, rules, "aws_security_group")
}

/// DB subnet groups arrive backwards twice over: databases reference the
/// group, and the group references the subnets it spans. Reverse the
/// database edges so the group contains them, drop the subnet references,
/// and parent the group under the VPC unless a security group already
/// claims it. A group left holding nothing is deleted.
pub fn reparent_db_subnet_groups(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let groups = graph.nodes_matching("aws_db_subnet_group");
    for group in &groups {
        for member in graph.parents_of(group) {
            if resource::matches_prefix(&member, "aws_db_")
                || resource::matches_prefix(&member, "aws_rds")
                || resource::matches_prefix(&member, "aws_elasticache")
            {
                graph.remove_edge(&member, group);
                graph.add_edge(group, &member);
            }
        }

        for subnet in graph.children(group).to_vec() {
            if resource::resource_type(&subnet) == "aws_subnet" {
                graph.remove_edge(group, &subnet);
            }
        }

        let protected = graph
            .parents_of(group)
            .iter()
            .any(|p| resource::matches_prefix(p, "aws_security_group"));
        if !protected
            && let Some(vpc) = graph.find_by_type("aws_vpc").map(String::from)
        {
            graph.add_edge(&vpc, group);
        }

        if graph.children(group).is_empty() {
            debug!(group = %group, "removing empty db subnet group");
            graph.remove_node(group);
        }
    }
    Ok(())
}

/// Re-parent every VPC endpoint directly under the single VPC. Endpoints
/// only make sense relative to one VPC; anything else is a malformed
/// inventory and the pass refuses to guess.
pub fn flatten_vpc_endpoints(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let vpcs: Vec<String> = graph
        .nodes()
        .into_iter()
        .filter(|id| resource::resource_type(id) == "aws_vpc")
        .collect();
    if vpcs.len() != 1 {
        return Err(Error::missing_resource(format!(
            "vpc endpoints require exactly one aws_vpc, found {}",
            vpcs.len()
        ))
        .with_operation("aws::flatten_vpc_endpoints"));
    }
    let vpc = &vpcs[0];

    for endpoint in graph.nodes_matching("aws_vpc_endpoint") {
        for parent in graph.parents_of(&endpoint) {
            if &parent != vpc {
                graph.remove_edge(&parent, &endpoint);
            }
        }
        graph.add_edge(vpc, &endpoint);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rules() -> RuleConfig {
        RuleConfig::from_toml_str(
            "aws",
            r#"group_nodes = ["aws_vpc", "aws_az", "aws_subnet", "aws_security_group", "aws_db_subnet_group"]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_numbered_subnets_get_numbered_zones() {
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_vpc.main", "aws_subnet.app~1");
        graph.add_edge("aws_vpc.main", "aws_subnet.app~2");

        group_subnets_by_zone(&mut graph, &rules()).unwrap();

        assert_eq!(graph.children("aws_vpc.main"), ["aws_az.az~1", "aws_az.az~2"]);
        assert_eq!(graph.children("aws_az.az~1"), ["aws_subnet.app~1"]);
        assert_eq!(graph.children("aws_az.az~2"), ["aws_subnet.app~2"]);
    }

    #[test]
    fn test_declared_zone_name_wins() {
        let mut graph = ResourceGraph::new();
        let mut attrs = AttrMap::new();
        attrs.insert("availability_zone".into(), Value::from("eu-west-1a"));
        graph.add_node("aws_subnet.app", attrs);
        graph.add_edge("aws_vpc.main", "aws_subnet.app");

        group_subnets_by_zone(&mut graph, &rules()).unwrap();

        assert_eq!(graph.children("aws_az.az_eu_west_1a"), ["aws_subnet.app"]);
    }

    #[test]
    fn test_zone_grouping_is_idempotent() {
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_vpc.main", "aws_subnet.app~1");
        group_subnets_by_zone(&mut graph, &rules()).unwrap();
        let once = graph.clone();
        group_subnets_by_zone(&mut graph, &rules()).unwrap();
        assert_eq!(once.nodes(), graph.nodes());
    }

    #[test]
    fn test_db_subnet_group_wraps_database_under_vpc() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_vpc.main", AttrMap::new());
        graph.add_edge("aws_db_instance.app", "aws_db_subnet_group.app");
        graph.add_edge("aws_db_subnet_group.app", "aws_subnet.a");

        reparent_db_subnet_groups(&mut graph, &rules()).unwrap();

        assert_eq!(
            graph.children("aws_db_subnet_group.app"),
            ["aws_db_instance.app"]
        );
        assert_eq!(graph.children("aws_vpc.main"), ["aws_db_subnet_group.app"]);
        // subnet reference dropped
        assert!(graph.parents_of("aws_subnet.a").is_empty());
    }

    #[test]
    fn test_db_subnet_group_prefers_security_group_parent() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_vpc.main", AttrMap::new());
        graph.add_edge("aws_security_group.db", "aws_db_subnet_group.app");
        graph.add_edge("aws_db_instance.app", "aws_db_subnet_group.app");

        reparent_db_subnet_groups(&mut graph, &rules()).unwrap();

        assert_eq!(
            graph.parents_of("aws_db_subnet_group.app"),
            ["aws_security_group.db"]
        );
        assert!(graph.children("aws_vpc.main").is_empty());
    }

    #[test]
    fn test_empty_db_subnet_group_removed() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_vpc.main", AttrMap::new());
        graph.add_edge("aws_db_subnet_group.app", "aws_subnet.a");

        reparent_db_subnet_groups(&mut graph, &rules()).unwrap();

        assert!(!graph.contains("aws_db_subnet_group.app"));
    }

    #[test]
    fn test_vpc_endpoints_reparented_under_single_vpc() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_vpc.main", AttrMap::new());
        graph.add_edge("aws_subnet.a", "aws_vpc_endpoint.s3");

        flatten_vpc_endpoints(&mut graph, &rules()).unwrap();

        assert_eq!(graph.parents_of("aws_vpc_endpoint.s3"), ["aws_vpc.main"]);
    }

    #[test]
    fn test_vpc_endpoint_without_vpc_is_fatal() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_vpc_endpoint.s3", AttrMap::new());

        let err = flatten_vpc_endpoints(&mut graph, &rules()).unwrap_err();
        assert_eq!(err.kind(), infracc_error::ErrorKind::MissingResource);
    }

    #[test]
    fn test_vpc_endpoint_ignores_endpoint_typed_vpc_lookalikes() {
        // aws_vpc_endpoint must not count as a vpc during the lookup
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_vpc.main", AttrMap::new());
        graph.add_node("aws_vpc.second", AttrMap::new());
        graph.add_node("aws_vpc_endpoint.s3", AttrMap::new());

        let err = flatten_vpc_endpoints(&mut graph, &rules()).unwrap_err();
        assert_eq!(err.kind(), infracc_error::ErrorKind::MissingResource);
    }
}
