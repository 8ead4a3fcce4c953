pub mod detector;
pub mod export;
pub mod graph;
pub mod inventory;
pub mod pass;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod resource;
pub mod rules;
pub mod validate;

pub use infracc_error::{Error, ErrorKind, ErrorStatus, Result};

pub use detector::detect_multi_instance;
pub use export::GraphExport;
pub use graph::{AttrMap, ResourceGraph};
pub use inventory::{Inventory, RawResource};
pub use pass::{
    Pass, PassFn, cluster_shared_services, consolidate, expand_multi_instance,
    implied_connections, run_provider_passes, wrap_boundaries,
};
pub use pipeline::Pipeline;
pub use registry::{ProviderContext, ProviderHandler, ProviderRegistry};
pub use render::{Diagram, DrawnEdge, DrawnGroup, DrawnNode, EdgeStyle, Handle, Renderer};
pub use rules::RuleConfig;
pub use validate::{Violation, validate};
