pub mod config;
pub mod error;
pub mod filter;
pub mod links;
pub mod query;
pub mod store;

// Re-exports for convenience
pub use config::{ConfigError, FrameRateTable, ValoConfig};
pub use error::QueryError;
pub use filter::{AttrKind, AttributeTable, EntityKind, FilterCompiler};
pub use links::{RowLinks, VodLinks};
pub use query::{SearchOutcome, VersusOutcome, parse_request};
pub use store::ValoStore;
