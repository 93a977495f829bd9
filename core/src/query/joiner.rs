//! Multi-filter joiner.
//!
//! Every filter in a search must hold on the same frame, so the per-filter
//! match sets are inner-joined on their frame key.

use std::collections::{BTreeSet, HashSet};

use valo_types::{FrameKey, MatchedFrameGroup, StateFilter};

use crate::error::QueryError;
use crate::store::ValoStore;

/// Keys present in every set, ordered by match, round, frame offset, side.
pub fn intersect_frame_sets(
    sets: Vec<Vec<MatchedFrameGroup>>,
) -> Result<Vec<FrameKey>, QueryError> {
    let mut sets = sets.into_iter();
    let first = sets.next().ok_or(QueryError::MissingFilterList)?;
    let mut keys: BTreeSet<FrameKey> = first.into_iter().map(|g| g.key).collect();

    for set in sets {
        if keys.is_empty() {
            break;
        }
        let other: HashSet<FrameKey> = set.into_iter().map(|g| g.key).collect();
        keys.retain(|k| other.contains(k));
    }
    Ok(keys.into_iter().collect())
}

impl ValoStore {
    /// Frames where all `filters` hold at once
    pub async fn join_agent_states(
        &self,
        filters: &[StateFilter],
        group_by_side: bool,
    ) -> Result<Vec<FrameKey>, QueryError> {
        if filters.is_empty() {
            return Err(QueryError::MissingFilterList);
        }

        let mut sets = Vec::with_capacity(filters.len());
        for filter in filters {
            sets.push(self.match_agent_states(filter, group_by_side).await?);
        }
        let keys = intersect_frame_sets(sets)?;

        tracing::debug!(filters = filters.len(), frames = keys.len(), "Joined agent state filters");
        Ok(keys)
    }
}
