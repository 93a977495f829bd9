//! Versus correlator.
//!
//! Cross-joins two enriched result sets (one per side) and keeps the rounds
//! where opposing sides were in their described states at overlapping times.

use valo_types::{EnrichedRound, VersusReport, VersusRow};

/// Correlate two sides.
///
/// Rows pair up when they share match and round, sit on opposite sides, and
/// their closed `[first, last]` intervals overlap (touching endpoints count).
/// Rows without a side cannot pair.
///
/// This is a full cross product, O(n₁·n₂). Inputs are one row per round, so
/// sizes are bounded by the number of recorded rounds rather than frames.
pub fn correlate(side_1: &[EnrichedRound], side_2: &[EnrichedRound]) -> VersusReport {
    let mut rows = Vec::new();

    for a in side_1 {
        for b in side_2 {
            if a.round.game_uuid != b.round.game_uuid || a.round.round_number != b.round.round_number {
                continue;
            }
            let (Some(attacking_1), Some(attacking_2)) = (a.is_attacking, b.is_attacking) else {
                continue;
            };
            if attacking_1 == attacking_2 {
                continue;
            }
            if a.first_true_frame > b.last_true_frame || a.last_true_frame < b.first_true_frame {
                continue;
            }

            rows.push(VersusRow {
                round: a.round.clone(),
                map: a.map.clone(),
                is_attacking_1: attacking_1,
                is_attacking_2: attacking_2,
                first_true_frame: a.first_true_frame.max(b.first_true_frame),
                last_true_frame: a.last_true_frame.min(b.last_true_frame),
                side_1_won_round: attacking_1 == a.round.attackers_won,
            });
        }
    }

    tracing::debug!(
        side_1 = side_1.len(),
        side_2 = side_2.len(),
        overlaps = rows.len(),
        "Correlated versus sides"
    );
    VersusReport::from_rows(rows)
}
