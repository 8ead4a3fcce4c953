//! Best-effort edge repair for resources whose relationships only exist as
//! literal strings in the raw attributes, plus synthetic artifact pruning.

use tracing::debug;

use infracc_core::graph::ResourceGraph;
use infracc_core::resource;
use infracc_core::rules::RuleConfig;
use infracc_error::Result;

/// Types a CloudFront distribution can name as an origin.
const ORIGIN_TYPES: &[&str] = &[
    "aws_s3_bucket",
    "aws_lb",
    "aws_alb",
    "aws_nlb",
    "aws_elb",
    "aws_api_gateway",
];

/// CloudFront origins are literal domain names, not references, so the
/// detector never sees them. Scan the serialized distribution attributes
/// for the declared names of origin-capable resources and add the edges
/// directly. Best-effort: no match, no edge.
pub fn fold_cloudfront_origins(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let distributions = graph.nodes_matching("aws_cloudfront");
    let candidates: Vec<String> = graph
        .nodes()
        .into_iter()
        .filter(|id| ORIGIN_TYPES.iter().any(|t| resource::resource_type(id) == *t))
        .collect();

    for dist in &distributions {
        let haystack = match graph.original(dist) {
            Some(meta) if !meta.is_empty() => serde_json::Value::Object(meta.clone()).to_string(),
            _ => continue,
        };
        for candidate in &candidates {
            let Some(name) = resource::resource_name(resource::base_id(candidate)) else {
                continue;
            };
            if name.len() >= 3 && haystack.contains(name) {
                debug!(distribution = %dist, origin = %candidate, "folding cloudfront origin");
                graph.add_edge(dist, candidate);
            }
        }
    }
    Ok(())
}

/// Zonal attachments (NAT gateways, EFS mount targets) that reference their
/// subnet get the edge reversed so the subnet hosts them; ones with no
/// subnet reference at all are repaired by numbered-suffix matching, first
/// subnet as the fallback.
pub fn attach_nat_gateways(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let mut zonal = graph.nodes_matching("aws_nat_gateway");
    zonal.extend(graph.nodes_matching("aws_efs_mount_target"));

    for node in &zonal {
        if graph
            .parents_of(node)
            .iter()
            .any(|p| resource::resource_type(p) == "aws_subnet")
        {
            continue;
        }
        let referenced = graph
            .children(node)
            .iter()
            .find(|c| resource::resource_type(c) == "aws_subnet")
            .cloned();
        if let Some(subnet) = referenced {
            graph.remove_edge(node, &subnet);
            graph.add_edge(&subnet, node);
            continue;
        }
        let subnets = graph.nodes_matching("aws_subnet");
        let host = match resource::instance_suffix(node) {
            Some(i) => subnets
                .iter()
                .find(|s| resource::instance_suffix(s) == Some(i))
                .or_else(|| subnets.first()),
            None => subnets.first(),
        }
        .cloned();
        if let Some(subnet) = host {
            debug!(node = %node, subnet = %subnet, "attaching zonal service by suffix");
            graph.add_edge(&subnet, node);
        }
    }
    Ok(())
}

/// IAM roles usually enter other resources as literal ARNs or bare name
/// strings rather than references, so the detector never links them. Match
/// `role`-carrying attribute values against declared role names by suffix
/// and add the missing edge directly. Best-effort: no match, no edge.
pub fn link_iam_roles(graph: &mut ResourceGraph, _rules: &RuleConfig) -> Result<()> {
    let roles: Vec<String> = graph
        .nodes()
        .into_iter()
        .filter(|id| resource::resource_type(id) == "aws_iam_role")
        .collect();
    if roles.is_empty() {
        return Ok(());
    }

    let mut additions = Vec::new();
    for id in graph.nodes() {
        if resource::matches_prefix(&id, "aws_iam_") {
            continue;
        }
        let Some(original) = graph.original(&id) else {
            continue;
        };
        for (key, value) in original {
            if !key.contains("role") {
                continue;
            }
            let texts: Vec<&str> = match value {
                serde_json::Value::String(text) => vec![text.as_str()],
                serde_json::Value::Array(items) => {
                    items.iter().filter_map(|v| v.as_str()).collect()
                }
                _ => continue,
            };
            for text in texts {
                for role in &roles {
                    let Some(name) = resource::resource_name(resource::base_id(role)) else {
                        continue;
                    };
                    if name.len() >= 3 && text.ends_with(name) {
                        additions.push((id.clone(), role.clone()));
                    }
                }
            }
        }
    }
    for (from, to) in additions {
        debug!(resource = %from, role = %to, "linking iam role by suffix");
        graph.add_edge(&from, &to);
    }
    Ok(())
}

/// Prefixes of helper artifacts Terraform configs carry that mean nothing
/// in an architecture diagram.
const ARTIFACT_PREFIXES: &[&str] = &["random_", "null_resource", "time_sleep"];

/// Delete synthetic helper resources outright. Runs after every other pass
/// so nothing downstream still needs them.
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
