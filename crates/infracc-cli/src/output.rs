//! Output generation (DOT, diagram JSON, or the interchange document).

use infracc_core::export::GraphExport;
use infracc_core::render::Diagram;
use infracc_error::{Error, ErrorKind, Result};

use crate::OutputFormat;

pub fn format_diagram(diagram: &Diagram, format: OutputFormat, name: &str) -> Result<String> {
    match format {
        OutputFormat::Dot => Ok(infracc_dot::render_dot(diagram, name)),
        OutputFormat::Json => serde_json::to_string_pretty(diagram).map_err(|err| {
            Error::new(ErrorKind::SerializationFailed, err.to_string())
                .with_operation("cli::format_diagram")
        }),
        OutputFormat::Graph => Err(Error::invalid_argument(
            "graph format is emitted from the graph, not the diagram",
        )
        .with_operation("cli::format_diagram")),
    }
}

pub fn format_graph(export: &GraphExport) -> Result<String> {
    serde_json::to_string_pretty(export).map_err(|err| {
        Error::new(ErrorKind::SerializationFailed, err.to_string())
            .with_operation("cli::format_graph")
    })
}
