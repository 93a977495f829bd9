//! Agent-state matcher.
//!
//! Filters `agent_state` with one compiled state filter, groups the surviving
//! rows by frame (and optionally side) and keeps groups whose member count is
//! inside the filter's `state_count` bounds.

use datafusion::functions_aggregate::expr_fn::count;
use datafusion::prelude::{col, lit};
use valo_types::filter::STATE_COUNT_KEY;
use valo_types::{FilterValue, FrameKey, MatchedFrameGroup, StateFilter};

use crate::error::QueryError;
use crate::filter::EntityKind;
use crate::store::{AGENT_STATE_TABLE, ValoStore, col_bool, col_i64, col_strings};

/// A full team per side
pub const DEFAULT_STATE_COUNT_BY_SIDE: (i64, i64) = (1, 5);
/// Both teams
pub const DEFAULT_STATE_COUNT: (i64, i64) = (1, 10);

/// Inclusive member-count bounds for a filter
pub fn state_count_bounds(
    filter: &StateFilter,
    group_by_side: bool,
) -> Result<(i64, i64), QueryError> {
    match filter.get(STATE_COUNT_KEY) {
        None if group_by_side => Ok(DEFAULT_STATE_COUNT_BY_SIDE),
        None => Ok(DEFAULT_STATE_COUNT),
        Some(FilterValue::Range([min, max])) => Ok((*min, *max)),
        Some(other) => Err(QueryError::MismatchedFilterValue {
            key: STATE_COUNT_KEY.to_string(),
            expected: "range",
            found: other.shape(),
        }),
    }
}

impl ValoStore {
    /// Frame groups satisfying `filter`, sorted by key.
    ///
    /// A filter that matches no rows gives an empty result, not an error.
    pub async fn match_agent_states(
        &self,
        filter: &StateFilter,
        group_by_side: bool,
    ) -> Result<Vec<MatchedFrameGroup>, QueryError> {
        let compiled = self.compiler().compile(EntityKind::AgentState, filter)?;
        let predicate = compiled
            .predicate()
            .ok_or(QueryError::UnrecognizedFilter {
                kind: EntityKind::AgentState,
            })?;
        let (count_min, count_max) = state_count_bounds(filter, group_by_side)?;

        let mut group_by = vec![
            col("game_uuid"),
            col("round_number"),
            col("frames_since_round_start"),
        ];
        if group_by_side {
            group_by.push(col("is_attacking"));
        }

        let batches = self
            .table(AGENT_STATE_TABLE)
            .await?
            .filter(predicate)?
            .aggregate(group_by, vec![count(lit(1)).alias(STATE_COUNT_KEY)])?
            .filter(col(STATE_COUNT_KEY).between(lit(count_min), lit(count_max)))?
            .collect()
            .await?;

        let mut groups = Vec::new();
        for batch in &batches {
            let uuids = col_strings(batch, "game_uuid")?;
            let rounds = col_i64(batch, "round_number")?;
            let frames = col_i64(batch, "frames_since_round_start")?;
            let counts = col_i64(batch, STATE_COUNT_KEY)?;
            let sides = if group_by_side {
                Some(col_bool(batch, "is_attacking")?)
            } else {
                None
            };

            for i in 0..batch.num_rows() {
                groups.push(MatchedFrameGroup {
                    key: FrameKey {
                        game_uuid: uuids[i].clone(),
                        round_number: rounds[i],
                        frames_since_round_start: frames[i],
                        is_attacking: sides.as_ref().map(|s| s[i]),
                    },
                    state_count: counts[i],
                });
            }
        }
        groups.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!(
            groups = groups.len(),
            group_by_side,
            count_min,
            count_max,
            "Matched agent states"
        );
        Ok(groups)
    }
}
