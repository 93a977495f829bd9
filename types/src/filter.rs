//! Query input contract.
//!
//! A search is an ordered list of state filters that must all hold on the same
//! frame, plus optional round-level and map-level filters:
//!
//! ```json
//! {
//!   "agent_state_list": [
//!     { "health": [0, 20], "is_attacking": true },
//!     { "agent_name": ["Sage"], "ult_points": [7, 7] }
//!   ],
//!   "round_filter": { "round_number": [1, 12] },
//!   "map_filter": { "map_name": ["Ascent"] }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key holding the member-count bounds of a state filter
pub const STATE_COUNT_KEY: &str = "state_count";

/// A single typed constraint value.
///
/// The JSON shape decides the variant: `[min, max]` integers, a list of
/// strings, or a boolean. Anything else is kept as [`FilterValue::Other`] so a
/// stray key cannot fail the whole request; whether it matters is decided when
/// the filter is compiled against its attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Range([i64; 2]),
    List(Vec<String>),
    Flag(bool),
    Other(serde_json::Value),
}

impl FilterValue {
    /// Short name of the value shape, used in error messages
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Range(_) => "range",
            Self::List(_) => "list",
            Self::Flag(_) => "boolean",
            Self::Other(_) => "unsupported value",
        }
    }
}

/// Mapping from attribute name to constraint.
///
/// Keys are kept sorted so compiled predicates come out in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateFilter(pub BTreeMap<String, FilterValue>);

impl StateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and programmatic queries
    pub fn with(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A full search request as posted by the presentation layer.
///
/// `agent_state_list` is optional at the serde level so a missing list can be
/// reported as a malformed query rather than a generic parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub agent_state_list: Option<Vec<StateFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_filter: Option<StateFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_filter: Option<StateFilter>,
}

impl SearchRequest {
    pub fn from_filters(filters: Vec<StateFilter>) -> Self {
        Self {
            agent_state_list: Some(filters),
            ..Self::default()
        }
    }
}
