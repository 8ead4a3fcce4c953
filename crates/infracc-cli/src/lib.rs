//! infracc command-line interface.

pub mod options;
pub mod output;
pub mod pipeline;

use std::sync::Arc;

use infracc_aws::AwsProvider;
use infracc_azure::AzureProvider;
use infracc_core::registry::ProviderRegistry;
use infracc_error::Result;
use infracc_gcp::GcpProvider;

pub use options::{Cli, OutputFormat};
pub use pipeline::{load_graphdict, load_inventory};

/// Options for running infracc.
pub struct InfraccOptions {
    /// Resource inventory JSON file.
    pub inventory: String,
    /// Optional dependency-map JSON file.
    pub graphdict: Option<String>,
    pub format: OutputFormat,
    /// Diagram name used in the DOT header.
    pub name: String,
}

/// Registry with every built-in provider; AWS is the default fallback.
pub fn default_registry() -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(AwsProvider::new()), true)?;
    registry.register(Arc::new(AzureProvider::new()), false)?;
    registry.register(Arc::new(GcpProvider::new()), false)?;
    Ok(registry)
}

/// Main entry point.
pub fn run_main(opts: &InfraccOptions) -> Result<String> {
    pipeline::run(opts)
}
