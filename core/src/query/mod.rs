//! Query pipeline over the match store.
//!
//! raw request → filter compiler → matcher (per filter) → joiner → enricher,
//! then optionally the versus correlator across two requests.

mod enrich;
mod joiner;
mod matcher;
mod overview;
mod versus;

#[cfg(test)]
mod pipeline_tests;

pub use enrich::enrich_rounds;
pub use joiner::intersect_frame_sets;
pub use matcher::{DEFAULT_STATE_COUNT, DEFAULT_STATE_COUNT_BY_SIDE, state_count_bounds};
pub use overview::{first_half_sides, winning_team};
pub use versus::correlate;

use valo_types::{EnrichedRound, SearchRequest, StateFilter, VersusReport};

use crate::error::QueryError;
use crate::store::ValoStore;

/// Result of a single-mode search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Matches(Vec<EnrichedRound>),
    NoMatches,
}

/// Result of a versus search
#[derive(Debug, Clone, PartialEq)]
pub enum VersusOutcome {
    Matches(VersusReport),
    NoMatches,
}

/// Parse a JSON search request.
pub fn parse_request(json: &str) -> Result<SearchRequest, QueryError> {
    serde_json::from_str(json).map_err(|e| QueryError::MalformedQuery(e.to_string()))
}

fn filter_list(request: &SearchRequest) -> Result<&[StateFilter], QueryError> {
    request
        .agent_state_list
        .as_deref()
        .ok_or_else(|| QueryError::MalformedQuery("No agent_state_list found in JSON data.".to_string()))
}

impl ValoStore {
    /// Run the full single-mode pipeline.
    pub async fn search(
        &self,
        request: &SearchRequest,
        group_by_side: bool,
    ) -> Result<SearchOutcome, QueryError> {
        match self.enriched(request, group_by_side).await {
            Ok(rows) => Ok(SearchOutcome::Matches(rows)),
            Err(e) if e.is_no_match() => Ok(SearchOutcome::NoMatches),
            Err(e) => Err(e),
        }
    }

    /// Run both requests grouped by side and correlate them.
    pub async fn versus(
        &self,
        team_1: &SearchRequest,
        team_2: &SearchRequest,
    ) -> Result<VersusOutcome, QueryError> {
        let side_1 = match self.enriched(team_1, true).await {
            Ok(rows) => rows,
            Err(e) if e.is_no_match() => return Ok(VersusOutcome::NoMatches),
            Err(e) => return Err(e),
        };
        let side_2 = match self.enriched(team_2, true).await {
            Ok(rows) => rows,
            Err(e) if e.is_no_match() => return Ok(VersusOutcome::NoMatches),
            Err(e) => return Err(e),
        };
        Ok(VersusOutcome::Matches(correlate(&side_1, &side_2)))
    }

    async fn enriched(
        &self,
        request: &SearchRequest,
        group_by_side: bool,
    ) -> Result<Vec<EnrichedRound>, QueryError> {
        let filters = filter_list(request)?;
        let frames = self.join_agent_states(filters, group_by_side).await?;
        let rows = self
            .enrich(frames, request.round_filter.as_ref(), request.map_filter.as_ref())
            .await?;
        tracing::info!(filters = filters.len(), rounds = rows.len(), group_by_side, "Search complete");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = parse_request(r#"{"agent_state_list": [{"health": [0, 20]}]}"#).unwrap();
        assert_eq!(filter_list(&request).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_request_not_an_object() {
        assert!(matches!(
            parse_request("[1, 2]"),
            Err(QueryError::MalformedQuery(_))
        ));
        assert!(matches!(
            parse_request("not json"),
            Err(QueryError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_missing_filter_list_is_malformed() {
        let request = parse_request(r#"{"map_filter": {"map_name": ["Bind"]}}"#).unwrap();
        let err = filter_list(&request).unwrap_err();
        assert_eq!(err.to_string(), "No agent_state_list found in JSON data.");
    }
}
