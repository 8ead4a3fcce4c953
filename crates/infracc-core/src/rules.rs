//! Per-provider rule configuration.
//!
//! Each provider ships one TOML document declaring its classification lists,
//! consolidation targets, draw order, node-type variants, edge-label
//! annotations, implied connections, multi-instance expansion patterns and
//! hierarchy rules. The tables that are order-sensitive (variants, draw
//! order, consolidations, expansion patterns) are arrays of tables so the
//! declared order survives deserialization; nothing ever depends on map
//! iteration order.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use infracc_error::{Error, Result};

use crate::resource;

/// Merge a family of raw resource types into one canonical drawing node.
#[derive(Debug, Clone, Deserialize)]
pub struct Consolidation {
    /// Type prefix the family members match.
    pub prefix: String,
    /// Canonical `type.name` identifier the members collapse into.
    pub into: String,
    #[serde(default)]
    pub label: String,
}

/// Resolve a generic node type into a concrete variant by metadata keyword.
/// First matching keyword in declared order wins.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantRule {
    /// Generic type the rule applies to (e.g. a generic load balancer).
    pub parent: String,
    /// Substring searched for in the node's raw metadata.
    pub keyword: String,
    /// Concrete type the node is rewritten to.
    pub node_type: String,
}

/// Label attached to a rendered edge between two resource types.
#[derive(Debug, Clone, Deserialize)]
pub struct Annotation {
    /// Origin type prefix.
    pub origin: String,
    /// Destination type prefix (consolidated-prefix matches allowed).
    pub dest: String,
    pub label: String,
}

/// Multi-instance detector pattern.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpandRule {
    /// Resource types the pattern applies to.
    pub types: Vec<String>,
    /// Attributes whose reference count decides the replication count.
    pub triggers: Vec<String>,
    /// Attributes whose referenced resources expand in lock-step.
    #[serde(default)]
    pub also: Vec<String>,
}

/// Allowed parent types for a child type prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyRule {
    pub child: String,
    pub parents: Vec<String>,
}

/// Static, per-provider rule tables. Loaded once per provider and cached by
/// the registry; never mutated at runtime.
#[derive(Debug, Default, Deserialize)]
pub struct RuleConfig {
    /// Types drawn as containers holding other resources.
    #[serde(default)]
    pub group_nodes: Vec<String>,
    /// Boundary/connector types whose edges are always visible.
    #[serde(default)]
    pub edge_nodes: Vec<String>,
    /// Types drawn outside every container (entry points).
    #[serde(default)]
    pub outer_nodes: Vec<String>,
    /// Hub types whose fan-out edges clutter the diagram.
    #[serde(default)]
    pub shared_services: Vec<String>,
    /// Types whose edges are always rendered solid.
    #[serde(default)]
    pub always_draw: Vec<String>,
    /// Types never rendered at all.
    #[serde(default)]
    pub never_draw: Vec<String>,
    /// Ordered stages of type prefixes the traversal driver walks before
    /// falling back to insertion order.
    #[serde(default)]
    pub draw_order: Vec<Vec<String>>,
    /// Reference extractor used by the multi-instance detector.
    #[serde(default)]
    pub reference_pattern: Option<String>,
    #[serde(default)]
    pub consolidate: Vec<Consolidation>,
    #[serde(default)]
    pub variants: Vec<VariantRule>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Attribute-name substring to implied target type.
    #[serde(default)]
    pub implied: BTreeMap<String, String>,
    #[serde(default)]
    pub expand: Vec<ExpandRule>,
    #[serde(default)]
    pub hierarchy: Vec<HierarchyRule>,

    #[serde(skip)]
    compiled_pattern: OnceLock<Option<Regex>>,
}

impl RuleConfig {
    /// Parse a provider's embedded TOML rule document.
    pub fn from_toml_str(provider: &str, text: &str) -> Result<Self> {
        let config: RuleConfig = toml::from_str(text).map_err(|err| {
            Error::provider_load_failed(provider, format!("invalid rule TOML: {err}"))
                .with_operation("rules::from_toml_str")
        })?;
        if let Some(pattern) = &config.reference_pattern {
            Regex::new(pattern).map_err(|err| {
                Error::provider_load_failed(provider, format!("invalid reference pattern: {err}"))
                    .with_operation("rules::from_toml_str")
            })?;
        }
        Ok(config)
    }

    pub fn is_group_type(&self, id: &str) -> bool {
        resource::matches_any_prefix(id, &self.group_nodes)
    }

    pub fn is_edge_type(&self, id: &str) -> bool {
        resource::matches_any_prefix(id, &self.edge_nodes)
    }

    pub fn is_outer_type(&self, id: &str) -> bool {
        resource::matches_any_prefix(id, &self.outer_nodes)
    }

    pub fn is_shared_service(&self, id: &str) -> bool {
        resource::matches_any_prefix(id, &self.shared_services)
    }

    pub fn is_always_draw(&self, id: &str) -> bool {
        resource::matches_any_prefix(id, &self.always_draw)
    }

    pub fn is_never_draw(&self, id: &str) -> bool {
        resource::matches_any_prefix(id, &self.never_draw)
    }

    /// The consolidation rule a resource id falls under, if any.
    ///
    /// The canonical node itself is exempt, otherwise re-running the
    /// consolidation pass would fold it into itself forever.
    pub fn consolidation_for(&self, id: &str) -> Option<&Consolidation> {
        if self
            .consolidate
            .iter()
            .any(|c| resource::base_id(id) == c.into)
        {
            return None;
        }
        self.consolidate
            .iter()
            .find(|c| resource::matches_prefix(id, &c.prefix))
    }

    /// Whether `id` is the canonical node of some consolidation family.
    pub fn is_consolidated_node(&self, id: &str) -> bool {
        self.consolidate
            .iter()
            .any(|c| resource::base_id(id) == c.into)
    }

    /// All type prefixes that consolidate into the same canonical node as
    /// `id`'s type (the consolidation-equivalence set).
    pub fn equivalent_prefixes(&self, id: &str) -> Vec<&str> {
        let Some(target) = self
            .consolidate
            .iter()
            .find(|c| resource::matches_prefix(id, &c.prefix))
        else {
            return Vec::new();
        };
        self.consolidate
            .iter()
            .filter(|c| c.into == target.into)
            .map(|c| c.prefix.as_str())
            .collect()
    }

    /// Variant rules for a generic node type, in declared order.
    pub fn variants_for<'a>(&'a self, id: &str) -> Vec<&'a VariantRule> {
        let ty = resource::resource_type(id).to_string();
        self.variants
            .iter()
            .filter(|v| v.parent == ty)
            .collect()
    }

    /// Edge label for an origin/destination pair, checking direct type
    /// matches first, then consolidated-prefix matches on either endpoint.
    pub fn edge_label(&self, origin: &str, dest: &str) -> Option<&str> {
        let direct = self.annotations.iter().find(|a| {
            resource::matches_prefix(origin, &a.origin) && resource::matches_prefix(dest, &a.dest)
        });
        if let Some(annotation) = direct {
            return Some(&annotation.label);
        }
        let origin_equivalents = self.equivalent_prefixes(origin);
        let dest_equivalents = self.equivalent_prefixes(dest);
        let matches = |id: &str, declared: &str, equivalents: &[&str]| {
            resource::matches_prefix(id, declared)
                || equivalents
                    .iter()
                    .any(|p| p.starts_with(declared) || declared.starts_with(p))
        };
        self.annotations
            .iter()
            .find(|a| {
                matches(origin, &a.origin, &origin_equivalents)
                    && matches(dest, &a.dest, &dest_equivalents)
            })
            .map(|a| a.label.as_str())
    }

    /// Whether either endpoint of an edge carries an annotation entry.
    pub fn has_annotation(&self, id: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| resource::matches_prefix(id, &a.origin) || resource::matches_prefix(id, &a.dest))
    }

    /// Compiled reference extractor, if the provider declared one.
    pub fn reference_regex(&self) -> Option<&Regex> {
        self.compiled_pattern
            .get_or_init(|| {
                self.reference_pattern
                    .as_deref()
                    .and_then(|p| Regex::new(p).ok())
            })
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RULES: &str = r#"
        group_nodes = ["aws_vpc", "aws_az", "aws_subnet", "aws_security_group"]
        shared_services = ["aws_cloudwatch"]
        always_draw = ["aws_route53"]
        reference_pattern = '[a-z][a-z0-9_]*\.[A-Za-z][A-Za-z0-9_-]*'
        draw_order = [["aws_route53"], ["aws_vpc"]]

        [[consolidate]]
        prefix = "aws_lb"
        into = "aws_lb.elb"
        label = "Load Balancer"

        [[consolidate]]
        prefix = "aws_alb"
        into = "aws_lb.elb"

        [[variants]]
        parent = "aws_lb"
        keyword = "application"
        node_type = "aws_alb"

        [[variants]]
        parent = "aws_lb"
        keyword = "network"
        node_type = "aws_nlb"

        [[annotations]]
        origin = "aws_eks_cluster"
        dest = "aws_autoscaling_group"
        label = "Manages"

        [[annotations]]
        origin = "aws_alb"
        dest = "aws_route53"
        label = "Fronts"
    "#;

    fn rules() -> RuleConfig {
        RuleConfig::from_toml_str("aws", RULES).unwrap()
    }

    #[test]
    fn test_classification_queries() {
        let rules = rules();
        assert!(rules.is_group_type("aws_vpc.main"));
        assert!(rules.is_group_type("module.net.aws_subnet.a~2"));
        assert!(rules.is_shared_service("aws_cloudwatch_log_group.app"));
        assert!(!rules.is_group_type("aws_instance.web"));
    }

    #[test]
    fn test_consolidation_lookup() {
        let rules = rules();
        let rule = rules.consolidation_for("aws_lb_listener.front").unwrap();
        assert_eq!(rule.into, "aws_lb.elb");
        // the canonical node never consolidates into itself
        assert!(rules.consolidation_for("aws_lb.elb").is_none());
        assert!(rules.is_consolidated_node("aws_lb.elb"));
        assert_eq!(
            rules.equivalent_prefixes("aws_alb.front"),
            vec!["aws_lb", "aws_alb"]
        );
    }

    #[test]
    fn test_variant_order() {
        let rules = rules();
        let variants = rules.variants_for("aws_lb.front");
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].node_type, "aws_alb");
    }

    #[test]
    fn test_edge_label() {
        let rules = rules();
        assert_eq!(
            rules.edge_label("aws_eks_cluster.main", "aws_autoscaling_group.workers"),
            Some("Manages")
        );
        assert_eq!(rules.edge_label("aws_instance.web", "aws_subnet.a"), None);
    }

    #[test]
    fn test_edge_label_falls_back_through_origin_consolidation() {
        let rules = rules();
        // the canonical load balancer inherits its family's annotations
        assert_eq!(
            rules.edge_label("aws_lb.elb", "aws_route53_record.dns"),
            Some("Fronts")
        );
    }

    #[test]
    fn test_invalid_toml_is_load_error() {
        let err = RuleConfig::from_toml_str("aws", "group_nodes = 3").unwrap_err();
        assert_eq!(err.kind(), infracc_error::ErrorKind::ProviderLoadFailed);
    }

    #[test]
    fn test_reference_regex() {
        let rules = rules();
        let re = rules.reference_regex().unwrap();
        assert!(re.is_match("aws_subnet.private_a"));
    }
}
