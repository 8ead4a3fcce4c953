//! CLI pipeline: load inputs, run the rewrite pipeline, render.

use std::collections::HashMap;

use tracing::{info, warn};

use infracc_core::export::GraphExport;
use infracc_core::graph::ResourceGraph;
use infracc_core::inventory::Inventory;
use infracc_core::pipeline::Pipeline;
use infracc_core::render::Renderer;
use infracc_error::{Error, ErrorKind, Result};

use crate::{InfraccOptions, OutputFormat, output};

/// Load the resource inventory from a JSON file.
pub fn load_inventory(path: &str) -> Result<Inventory> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|err| {
        Error::new(
            ErrorKind::DeserializationFailed,
            format!("invalid inventory JSON: {err}"),
        )
        .with_operation("cli::load_inventory")
        .with_context("path", path)
    })
}

/// Load the optional dependency map from a JSON file.
pub fn load_graphdict(path: &str) -> Result<HashMap<String, Vec<String>>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|err| {
        Error::new(
            ErrorKind::DeserializationFailed,
            format!("invalid dependency-map JSON: {err}"),
        )
        .with_operation("cli::load_graphdict")
        .with_context("path", path)
    })
}

pub fn run(opts: &InfraccOptions) -> Result<String> {
    let registry = crate::default_registry()?;
    let inventory = load_inventory(&opts.inventory)?;
    let edges = opts
        .graphdict
        .as_deref()
        .map(load_graphdict)
        .transpose()?;

    let mut graph = ResourceGraph::from_inventory(&inventory, edges.as_ref());
    info!(resources = inventory.resources.len(), "inventory loaded");

    let violations = Pipeline::new(&registry).run(&inventory, &mut graph)?;
    for violation in &violations {
        warn!(%violation, "layout risk");
    }

    if opts.format == OutputFormat::Graph {
        let export = GraphExport::from_graph(&graph, &inventory);
        return output::format_graph(&export);
    }

    let diagram = Renderer::new(&graph, &registry).render()?;
    output::format_diagram(&diagram, opts.format, &opts.name)
}
