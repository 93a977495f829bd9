//! Round/map enricher.
//!
//! Joins matched frames against `round_info` and `map_info`, derives the first
//! and last matching frame of each round as absolute frame numbers, and
//! collapses to one row per (match, round).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::collections::btree_map::Entry;

use datafusion::prelude::{Expr, col, lit};
use valo_types::{EnrichedRound, FrameKey, MapRecord, RoundRecord, StateFilter};

use crate::error::QueryError;
use crate::filter::{EntityKind, FRAME_OFFSET_ATTR};
use crate::store::ValoStore;

/// Join `frames` against the candidate rounds and maps.
///
/// Frames whose round or map is not among the candidates are dropped.
/// Non-aggregated columns (side, round and map metadata) come from the first
/// frame of each round in input order. Output is ordered by match id then
/// round number.
pub fn enrich_rounds(
    frames: &[FrameKey],
    rounds: &[RoundRecord],
    maps: &[MapRecord],
) -> Result<Vec<EnrichedRound>, QueryError> {
    if frames.is_empty() {
        return Err(QueryError::NoMatchingFrames);
    }

    let mut round_index: HashMap<(&str, i64), &RoundRecord> = HashMap::new();
    for round in rounds {
        round_index
            .entry((round.game_uuid.as_str(), round.round_number))
            .or_insert(round);
    }
    let mut map_index: HashMap<&str, &MapRecord> = HashMap::new();
    for map in maps {
        map_index.entry(map.game_uuid.as_str()).or_insert(map);
    }

    // Offsets stay relative until every frame of the round has been seen
    let mut grouped: BTreeMap<(&str, i64), EnrichedRound> = BTreeMap::new();
    for frame in frames {
        let key = (frame.game_uuid.as_str(), frame.round_number);
        let Some(round) = round_index.get(&key) else {
            continue;
        };
        let Some(map) = map_index.get(key.0) else {
            continue;
        };
        let offset = frame.frames_since_round_start;

        match grouped.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(EnrichedRound {
                    round: (*round).clone(),
                    map: (*map).clone(),
                    is_attacking: frame.is_attacking,
                    first_true_frame: offset,
                    last_true_frame: offset,
                });
            }
            Entry::Occupied(mut slot) => {
                let row = slot.get_mut();
                row.first_true_frame = row.first_true_frame.min(offset);
                row.last_true_frame = row.last_true_frame.max(offset);
            }
        }
    }

    if grouped.is_empty() {
        return Err(QueryError::NoMatchingFrames);
    }

    Ok(grouped
        .into_values()
        .map(|mut row| {
            row.first_true_frame += row.round.round_start_frame;
            row.last_true_frame += row.round.round_start_frame;
            row
        })
        .collect())
}

/// `round_info` rows that could match `frames`: a superset, narrowed by the join
fn round_keys_predicate(frames: &[FrameKey]) -> Expr {
    let uuids: BTreeSet<&str> = frames.iter().map(|f| f.game_uuid.as_str()).collect();
    let numbers: BTreeSet<i64> = frames.iter().map(|f| f.round_number).collect();
    match_ids_expr(uuids).and(col("round_number").in_list(numbers.into_iter().map(lit).collect(), false))
}

fn match_ids_predicate(frames: &[FrameKey]) -> Expr {
    match_ids_expr(frames.iter().map(|f| f.game_uuid.as_str()).collect())
}

fn match_ids_expr(uuids: BTreeSet<&str>) -> Expr {
    col("game_uuid").in_list(uuids.into_iter().map(lit).collect(), false)
}

impl ValoStore {
    /// Enrich a joined frame set.
    ///
    /// Explicit round and map filters constrain the candidates directly;
    /// otherwise candidates are looked up from the keys in `frames`.
    pub async fn enrich(
        &self,
        mut frames: Vec<FrameKey>,
        round_filter: Option<&StateFilter>,
        map_filter: Option<&StateFilter>,
    ) -> Result<Vec<EnrichedRound>, QueryError> {
        if frames.is_empty() {
            return Err(QueryError::NoMatchingFrames);
        }

        let explicit_rounds = match round_filter {
            Some(filter) => {
                let mut compiled = self.compiler().compile(EntityKind::Round, filter)?;
                if let Some(clause) = compiled.take_clause(FRAME_OFFSET_ATTR) {
                    frames.retain(|f| clause.matches_int(f.frames_since_round_start));
                }
                compiled.predicate()
            }
            None => None,
        };
        if frames.is_empty() {
            return Err(QueryError::NoMatchingFrames);
        }

        let round_predicate = explicit_rounds.unwrap_or_else(|| round_keys_predicate(&frames));
        let rounds = self.fetch_rounds(round_predicate).await?;

        let map_predicate = match map_filter {
            Some(filter) => self
                .compiler()
                .compile(EntityKind::Map, filter)?
                .predicate()
                .ok_or(QueryError::UnrecognizedFilter {
                    kind: EntityKind::Map,
                })?,
            None => match_ids_predicate(&frames),
        };
        let maps = self.fetch_maps(map_predicate).await?;

        tracing::debug!(
            frames = frames.len(),
            rounds = rounds.len(),
            maps = maps.len(),
            "Resolved enrichment candidates"
        );
        enrich_rounds(&frames, &rounds, &maps)
    }
}
