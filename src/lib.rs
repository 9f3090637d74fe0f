pub mod api_types;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod eras;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod hierarchy;
pub mod layout;
pub mod loader;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod stats;
pub mod viz_export;

pub use config::{DataOrigin, SourceConfig, TimelineConfig};
pub use dates::CanonicalDate;
pub use dedup::EventCollection;
pub use error::{DateError, FetchError, IngestError, TimelineError};
pub use hierarchy::{Hierarchy, HierarchyBucket};
pub use layout::{Layout, LayoutEngine, LayoutMode, LayoutParams, LayoutPoint};
pub use loader::ChunkedLoader;
pub use models::{Category, EventKind, NormalizedEvent};
pub use orchestrator::{Scope, Timeline};
