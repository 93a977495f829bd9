//! Error types for the query pipeline.

use datafusion::error::DataFusionError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::filter::EntityKind;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Input is missing required structure (e.g. no filter list)
    #[error("{0}")]
    MalformedQuery(String),

    /// A filter object had no attribute recognized for its entity kind
    #[error("filter has no recognized {kind} attributes")]
    UnrecognizedFilter { kind: EntityKind },

    /// A recognized attribute carried the wrong value shape
    #[error("attribute `{key}` expects a {expected} value, got {found}")]
    MismatchedFilterValue {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("agent_state_list must contain at least one filter")]
    MissingFilterList,

    /// Valid query, nothing matched
    #[error("Nothing found matching your query.")]
    NoMatchingFrames,

    #[error("no match with id {0}")]
    MatchNotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] DataFusionError),

    /// Result batch did not have the expected columns
    #[error("column error: {0}")]
    Column(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl QueryError {
    /// Whether this is a "nothing found" outcome rather than a fault
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatchingFrames)
    }
}
