// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::indexing_slicing
    )
)]

pub mod attribute;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod export;
pub mod graph;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod serializer;
pub mod utils;

// Re-export commonly used types
pub use attribute::{AttrMap, AttrPath, AttrValue};
pub use catalog::{
    load_catalog, parse_catalog, CatalogError, CustomResolver, MemberGroupResolver, RefDescriptor,
    RefTarget, ReferenceCatalog, ResourceSpec, ResourceType,
};
pub use collector::{CollectError, CollectOptions, Collector, Corpus, ResourceInstance};
pub use config::{load_config, parse_config, ConfigError, ExportConfig, ExportFormat};
pub use export::{run_export, ExportError, ExportErrorKind, ExportReport, ExportStage};
pub use graph::{build, CycleError, CycleReport, CycleValidator, Granularity, Graph, TypeGraph};
pub use registry::{
    DiscoveredInstance, EnumerateError, InMemoryRegistry, Registry, SnapshotError,
    SnapshotRegistry,
};
pub use resolver::{resolve, resolve_all, ExportIndex, ResolvedInstance, ResolvedValue};
pub use serializer::{SerializeError, SerializeOptions};
