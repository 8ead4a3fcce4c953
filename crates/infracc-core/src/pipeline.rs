//! Core processing pipeline: detect providers → consolidate → imply
//! connections → expand multi-instance resources → provider passes →
//! validate.

use tracing::{info, warn};

use infracc_error::Result;

use crate::detector::detect_multi_instance;
use crate::graph::ResourceGraph;
use crate::inventory::Inventory;
use crate::pass::{consolidate, expand_multi_instance, implied_connections, run_provider_passes};
use crate::registry::ProviderRegistry;
use crate::validate::{Violation, validate};

/// Pipeline driver owning the provider registry for one run.
///
/// The whole pipeline is single-threaded and synchronous; a pass either
/// completes or raises an error that aborts the run.
pub struct Pipeline<'r> {
    registry: &'r ProviderRegistry,
}

impl<'r> Pipeline<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Run every rewrite stage over the graph, then the validator.
    ///
    /// Validator findings are returned as diagnostics, never raised: they
    /// indicate visual-quality risks rather than correctness failures.
    pub fn run(&self, inventory: &Inventory, graph: &mut ResourceGraph) -> Result<Vec<Violation>> {
        let providers = self.registry.detect_providers(inventory);
        info!(?providers, nodes = graph.len(), "starting rewrite pipeline");

        for provider in &providers {
            let context = self.registry.context(provider)?;
            let rules = match context.rules() {
                Ok(rules) => rules,
                Err(err) => {
                    warn!(provider, error = %err, "rules unavailable, generic behavior only");
                    continue;
                }
            };
            consolidate(graph, &rules)?;
            implied_connections(graph, &rules)?;
            detect_multi_instance(inventory, graph, &rules)?;
        }

        expand_multi_instance(graph)?;

        for provider in &providers {
            let context = self.registry.context(provider)?;
            run_provider_passes(graph, &context)?;
        }

        let mut violations = Vec::new();
        for provider in &providers {
            let context = self.registry.context(provider)?;
            if let Ok(rules) = context.rules() {
                violations.extend(validate(graph, &rules));
            }
        }
        info!(
            nodes = graph.len(),
            violations = violations.len(),
            "rewrite pipeline finished"
        );
        Ok(violations)
    }
}
