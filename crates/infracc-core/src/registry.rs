//! Dynamic provider registry for multi-cloud support.
//!
//! Runtime polymorphism over cloud providers: any number of providers can be
//! registered and resolved dynamically without compile-time generic
//! parameters. The registry owns a per-provider context cache; the cache is
//! populated on first access and cleared only by an explicit [`ProviderRegistry::reset`],
//! which keeps test runs isolated.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use infracc_error::{Error, Result};

use crate::inventory::Inventory;
use crate::pass::Pass;
use crate::resource;
use crate::rules::RuleConfig;

/// Object-safe provider handler trait.
pub trait ProviderHandler: Send + Sync {
    /// Unique provider identifier (e.g. "aws", "azure", "gcp")
    fn name(&self) -> &'static str;

    /// Ordered resource-type prefixes this provider owns
    fn prefixes(&self) -> &'static [&'static str];

    /// The provider's embedded TOML rule document
    fn rules_toml(&self) -> &'static str;

    /// Ordered special-resource pass table. Most-specific prefixes come
    /// before the catch-all entries; later passes may assume earlier
    /// passes' renames and merges already happened.
    fn passes(&self) -> Vec<Pass>;

    /// Check if a resource identifier belongs to this provider
    fn owns_node(&self, id: &str) -> bool {
        self.prefixes()
            .iter()
            .any(|prefix| resource::matches_prefix(id, prefix))
    }

    /// Parse the rule document. Failures surface as `ProviderLoadFailed`.
    fn load_rules(&self) -> Result<RuleConfig> {
        RuleConfig::from_toml_str(self.name(), self.rules_toml())
    }
}

/// Cached runtime context for one provider: the handler plus its lazily
/// loaded rule configuration.
pub struct ProviderContext {
    handler: Arc<dyn ProviderHandler>,
    rules: OnceLock<std::result::Result<Arc<RuleConfig>, String>>,
}

impl ProviderContext {
    fn new(handler: Arc<dyn ProviderHandler>) -> Self {
        Self {
            handler,
            rules: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.handler.name()
    }

    pub fn handler(&self) -> &Arc<dyn ProviderHandler> {
        &self.handler
    }

    /// The provider's rule configuration, parsed once and cached.
    pub fn rules(&self) -> Result<Arc<RuleConfig>> {
        let cached = self.rules.get_or_init(|| {
            self.handler
                .load_rules()
                .map(Arc::new)
                .map_err(|err| err.to_string())
        });
        match cached {
            Ok(rules) => Ok(rules.clone()),
            Err(message) => Err(Error::provider_load_failed(self.handler.name(), message)
                .with_operation("registry::rules")),
        }
    }

    /// The provider's ordered pass table.
    pub fn passes(&self) -> Vec<Pass> {
        self.handler.passes()
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field("provider", &self.handler.name())
            .finish_non_exhaustive()
    }
}

/// Registry of available provider handlers, owned by the pipeline driver.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Handlers in registration order
    handlers: Vec<Arc<dyn ProviderHandler>>,
    by_name: HashMap<&'static str, Arc<dyn ProviderHandler>>,
    default: Option<&'static str>,
    contexts: RwLock<HashMap<&'static str, Arc<ProviderContext>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider handler. Fails if the identifier already exists.
    pub fn register(&mut self, handler: Arc<dyn ProviderHandler>, default: bool) -> Result<()> {
        let name = handler.name();
        if self.by_name.contains_key(name) {
            return Err(Error::duplicate_provider(name).with_operation("registry::register"));
        }
        self.by_name.insert(name, handler.clone());
        self.handlers.push(handler);
        if default {
            self.default = Some(name);
        }
        Ok(())
    }

    pub fn default_provider(&self) -> Option<&'static str> {
        self.default
    }

    pub fn all_providers(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Detect the owning provider for a resource identifier by prefix match
    /// after stripping module-path segments. Registration order breaks ties.
    pub fn detect_for_node(&self, id: &str) -> Option<&'static str> {
        self.handlers
            .iter()
            .find(|handler| handler.owns_node(id))
            .map(|handler| handler.name())
    }

    /// Detect every provider in play for an inventory.
    ///
    /// Primary strategy reads the explicit provider-source field per raw
    /// resource; fallback prefix-matches resource types; if neither yields a
    /// result the single default provider is returned.
    pub fn detect_providers(&self, inventory: &Inventory) -> Vec<&'static str> {
        let mut found: Vec<&'static str> = Vec::new();
        for record in &inventory.resources {
            let detected = record
                .provider_hint()
                .and_then(|hint| self.by_name.get_key_value(hint.as_str()).map(|(k, _)| *k))
                .or_else(|| self.detect_for_node(&record.address()));
            if let Some(name) = detected
                && !found.contains(&name)
            {
                found.push(name);
            }
        }
        if found.is_empty()
            && let Some(default) = self.default
        {
            debug!(provider = default, "no provider detected, using default");
            found.push(default);
        }
        found
    }

    /// Cached context lookup. Unknown identifiers fall back to the default
    /// provider; with no default registered the lookup fails.
    pub fn context(&self, name: &str) -> Result<Arc<ProviderContext>> {
        let handler = match self.by_name.get(name) {
            Some(handler) => handler.clone(),
            None => {
                let Some(default) = self.default.and_then(|d| self.by_name.get(d)) else {
                    return Err(Error::unknown_provider(name).with_operation("registry::context"));
                };
                debug!(provider = name, "unknown provider, using default");
                default.clone()
            }
        };

        let key = handler.name();
        if let Some(context) = self.contexts.read().get(key) {
            return Ok(context.clone());
        }
        let mut contexts = self.contexts.write();
        let context = contexts
            .entry(key)
            .or_insert_with(|| Arc::new(ProviderContext::new(handler)));
        Ok(context.clone())
    }

    /// Clear every cached context. Intended for test isolation.
    pub fn reset(&self) {
        self.contexts.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test with mock provider handlers
    struct MockProvider {
        name: &'static str,
        prefixes: &'static [&'static str],
        rules: &'static str,
    }

    impl ProviderHandler for MockProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn prefixes(&self) -> &'static [&'static str] {
            self.prefixes
        }

        fn rules_toml(&self) -> &'static str {
            self.rules
        }

        fn passes(&self) -> Vec<Pass> {
            Vec::new()
        }
    }

    fn aws() -> Arc<dyn ProviderHandler> {
        Arc::new(MockProvider {
            name: "aws",
            prefixes: &["aws_"],
            rules: "group_nodes = [\"aws_vpc\"]",
        })
    }

    fn azure() -> Arc<dyn ProviderHandler> {
        Arc::new(MockProvider {
            name: "azure",
            prefixes: &["azurerm_"],
            rules: "",
        })
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ProviderRegistry::new();
        registry.register(aws(), true).unwrap();
        let err = registry.register(aws(), false).unwrap_err();
        assert_eq!(err.kind(), infracc_error::ErrorKind::DuplicateProvider);
    }

    #[test]
    fn test_detect_for_node_strips_modules() {
        let mut registry = ProviderRegistry::new();
        registry.register(aws(), true).unwrap();
        registry.register(azure(), false).unwrap();

        assert_eq!(
            registry.detect_for_node("module.vpc.aws_subnet.private"),
            registry.detect_for_node("aws_subnet.private")
        );
        assert_eq!(registry.detect_for_node("azurerm_subnet.private"), Some("azure"));
        assert_eq!(registry.detect_for_node("google_compute_network.net"), None);
    }

    #[test]
    fn test_detect_providers_prefers_source_field() {
        let mut registry = ProviderRegistry::new();
        registry.register(aws(), true).unwrap();
        registry.register(azure(), false).unwrap();

        let mut record = crate::inventory::RawResource::new("azurerm_subnet", "a");
        record.provider_source = Some("registry.terraform.io/hashicorp/azure".into());
        let inventory = Inventory::new(vec![record]);
        assert_eq!(registry.detect_providers(&inventory), vec!["azure"]);

        let empty = Inventory::new(vec![crate::inventory::RawResource::new("custom", "x")]);
        assert_eq!(registry.detect_providers(&empty), vec!["aws"]);
    }

    #[test]
    fn test_context_caching_and_fallback() {
        let mut registry = ProviderRegistry::new();
        registry.register(aws(), true).unwrap();

        let first = registry.context("aws").unwrap();
        let second = registry.context("aws").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // unknown falls back to the default provider
        let fallback = registry.context("oraclecloud").unwrap();
        assert_eq!(fallback.name(), "aws");

        registry.reset();
        let third = registry.context("aws").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_context_debug_names_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(aws(), true).unwrap();
        let context = registry.context("aws").unwrap();
        assert!(format!("{context:?}").contains("aws"));
    }

    #[test]
    fn test_unknown_without_default_fails() {
        let registry = ProviderRegistry::new();
        let err = registry.context("aws").unwrap_err();
        assert_eq!(err.kind(), infracc_error::ErrorKind::UnknownProvider);
    }

    #[test]
    fn test_rules_cached_per_context() {
        let mut registry = ProviderRegistry::new();
        registry.register(aws(), true).unwrap();
        let context = registry.context("aws").unwrap();
        let rules = context.rules().unwrap();
        assert!(rules.is_group_type("aws_vpc.main"));
        let again = context.rules().unwrap();
        assert!(Arc::ptr_eq(&rules, &again));
    }
}
