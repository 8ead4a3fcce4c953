//! Command-line options.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Graphviz DOT text.
    Dot,
    /// The diagram structure as JSON.
    Json,
    /// The post-pipeline graph as the interchange document.
    Graph,
}

#[derive(Parser, Debug)]
#[command(
    name = "infracc",
    about = "infracc: derive a clean architecture diagram from an infrastructure inventory",
    version
)]
pub struct Cli {
    /// Resource inventory JSON file (a list of {type, name, attributes})
    #[arg(value_name = "INVENTORY")]
    pub inventory: String,

    /// Dependency map JSON file ({"type.name": ["type.name", ...]})
    #[arg(long = "graphdict", value_name = "FILE")]
    pub graphdict: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Dot)]
    pub format: OutputFormat,

    /// Diagram name used in the DOT header
    #[arg(long, default_value = "architecture")]
    pub name: String,

    /// Output file path (writes to file instead of stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<String>,
}
