//! Shared types for valo.
//!
//! The query contract consumed from the presentation layer and the result rows
//! produced by the core pipeline. Kept free of DataFusion so the CLI and any
//! other frontend can depend on it cheaply.

pub mod filter;
pub mod formatting;
pub mod records;

pub use filter::{FilterValue, SearchRequest, StateFilter};
pub use records::{
    EnrichedRound, FrameKey, MapRecord, MatchOverview, MatchRound, MatchedFrameGroup, RoundRecord,
    VersusReport, VersusRow,
};
