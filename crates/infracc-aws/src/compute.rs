//! Compute-side passes: autoscaling linkage, load-balancer variant
//! resolution and shared-service clustering.

use tracing::debug;

use infracc_core::graph::ResourceGraph;
use infracc_core::resource;
use infracc_core::rules::RuleConfig;
use infracc_error::Result;

/// Autoscaling groups reference the subnets they span; the diagram wants
/// the subnet to contain the group. Numbered groups already sit on their
/// matching subnet, so the reversal is one-to-one; an un-numbered group
/// keeps its first subnet and drops the rest of the reference list. Launch
/// configurations and templates are plumbing, not boxes, and get hidden.
pub fn link_autoscaling(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let mut groups = graph.nodes_matching("aws_autoscaling_group");
    groups.extend(graph.nodes_matching("aws_appautoscaling_target"));

    for asg in &groups {
        let mut subnets = Vec::new();
        for child in graph.children(asg).to_vec() {
            if resource::resource_type(&child) == "aws_subnet" {
                subnets.push(child);
            } else if resource::matches_prefix(&child, "aws_launch_") {
                graph.hide(&child);
            }
        }
        let Some((host, rest)) = subnets.split_first() else {
            continue;
        };
        debug!(group = %asg, subnet = %host, "parenting autoscaling group under subnet");
        graph.remove_edge(asg, host);
        graph.add_edge(host, asg);
        for dropped in rest {
            graph.remove_edge(asg, dropped);
        }
    }
    Ok(())
}

/// Resolve generic load balancers into their concrete variant type.
///
/// Keywords are searched in declared order against the serialized raw
/// metadata; the first hit wins and a node with no hit falls through to the
/// first declared variant. The rename migrates every edge.
pub fn resolve_lb_variants(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    for id in graph.nodes() {
        let variants = rules.variants_for(&id);
        if variants.is_empty() {
            continue;
        }
        let haystack = graph
            .original(&id)
            .map(|meta| serde_json::Value::Object(meta.clone()).to_string())
            .unwrap_or_default();
        let chosen = variants
            .iter()
            .find(|v| haystack.contains(&v.keyword))
            .or_else(|| variants.first());
        let Some(variant) = chosen else {
            continue;
        };
        let Some(name) = resource::resource_name(&id) else {
            continue;
        };
        let renamed = format!("{}.{}", variant.node_type, name);
        debug!(from = %id, to = %renamed, "resolving load balancer variant");
        graph.rename_node(&id, &renamed);
    }
    Ok(())
}

/// Gather shared services under the synthetic cluster node.
pub fn cluster_shared(graph: &mut ResourceGraph, rules: &RuleConfig) -> Result<()> {
    infracc_core::pass::cluster_shared_services(graph, rules, "aws_group.shared_services")
}

#[cfg(test)]
mod tests {
    use super::*;
    use infracc_core::graph::AttrMap;
    use pretty_assertions::assert_eq;

    fn rules() -> RuleConfig {
        RuleConfig::from_toml_str(
            "aws",
            r#"
            group_nodes = ["aws_vpc", "aws_subnet", "aws_group"]
            shared_services = ["aws_kms", "aws_cloudwatch"]

            [[variants]]
            parent = "aws_lb"
            keyword = "application"
            node_type = "aws_alb"

            [[variants]]
            parent = "aws_lb"
            keyword = "network"
            node_type = "aws_nlb"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_numbered_groups_reverse_onto_matching_subnets() {
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_autoscaling_group.web~1", "aws_subnet.app~1");
        graph.add_edge("aws_autoscaling_group.web~2", "aws_subnet.app~2");

        link_autoscaling(&mut graph, &rules()).unwrap();

        assert_eq!(
            graph.children("aws_subnet.app~1"),
            ["aws_autoscaling_group.web~1"]
        );
        assert_eq!(
            graph.children("aws_subnet.app~2"),
            ["aws_autoscaling_group.web~2"]
        );
    }

    #[test]
    fn test_unnumbered_group_keeps_one_subnet() {
        let mut graph = ResourceGraph::new();
        graph.add_edge("aws_autoscaling_group.web", "aws_subnet.a");
        graph.add_edge("aws_autoscaling_group.web", "aws_subnet.b");
        graph.add_edge("aws_autoscaling_group.web", "aws_launch_template.web");

        link_autoscaling(&mut graph, &rules()).unwrap();

        assert_eq!(graph.children("aws_subnet.a"), ["aws_autoscaling_group.web"]);
        assert!(graph.children("aws_subnet.b").is_empty());
        assert!(graph.is_hidden("aws_launch_template.web"));
    }

    #[test]
    fn test_variant_keyword_first_wins() {
        let mut graph = ResourceGraph::new();
        let mut attrs = AttrMap::new();
        attrs.insert(
            "load_balancer_type".into(),
            serde_json::Value::from("network"),
        );
        graph.add_node("aws_lb.front~2", attrs);
        graph.add_edge("aws_instance.web", "aws_lb.front~2");

        resolve_lb_variants(&mut graph, &rules()).unwrap();

        assert!(!graph.contains("aws_lb.front~2"));
        assert_eq!(graph.children("aws_instance.web"), ["aws_nlb.front~2"]);
    }

    #[test]
    fn test_variant_falls_through_to_first() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_lb.front", AttrMap::new());

        resolve_lb_variants(&mut graph, &rules()).unwrap();

        assert!(graph.contains("aws_alb.front"));
    }

    #[test]
    fn test_cluster_wrapper_uses_synthetic_group() {
        let mut graph = ResourceGraph::new();
        graph.add_node("aws_kms_key.main", AttrMap::new());
        graph.add_node("aws_cloudwatch_log_group.logs", AttrMap::new());

        cluster_shared(&mut graph, &rules()).unwrap();

        assert_eq!(
            graph.children("aws_group.shared_services"),
            ["aws_kms_key.main", "aws_cloudwatch_log_group.logs"]
        );
    }
}
