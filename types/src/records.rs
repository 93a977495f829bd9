//! Store rows and pipeline result rows.

use serde::{Deserialize, Serialize};

/// One row of `round_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub game_uuid: String,
    pub round_number: i64,
    pub attackers_won: bool,
    /// Absolute frame of the round start within the full recording
    pub round_start_frame: i64,
    pub total_events: i64,
}

/// One row of `map_info` (one per match).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRecord {
    pub game_uuid: String,
    pub map_name: String,
    pub vod_link: String,
    /// Frame rate as stored; may be a truncated value (29, 59)
    pub vod_fps: i64,
    pub first_half_attacking_team: String,
    pub first_half_defending_team: String,
    pub game_vod_time: String,
}

/// Composite key of a matched frame.
///
/// Field order gives the display ordering: match, round, frame offset, side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameKey {
    pub game_uuid: String,
    pub round_number: i64,
    /// Relative to round start
    pub frames_since_round_start: i64,
    /// Only set when grouping by side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_attacking: Option<bool>,
}

/// A frame group whose member count satisfied the filter's state count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedFrameGroup {
    #[serde(flatten)]
    pub key: FrameKey,
    pub state_count: i64,
}

/// One row per (match, round) after joining against round and map metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRound {
    #[serde(flatten)]
    pub round: RoundRecord,
    pub map: MapRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_attacking: Option<bool>,
    /// Absolute frame of the earliest matching frame in the round
    pub first_true_frame: i64,
    /// Absolute frame of the latest matching frame in the round
    pub last_true_frame: i64,
}

/// An overlapping engagement between two opposing sides.
///
/// Round and map metadata come from side 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersusRow {
    #[serde(flatten)]
    pub round: RoundRecord,
    pub map: MapRecord,
    pub is_attacking_1: bool,
    pub is_attacking_2: bool,
    /// Start of the intersection of both intervals
    pub first_true_frame: i64,
    /// End of the intersection of both intervals
    pub last_true_frame: i64,
    pub side_1_won_round: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersusReport {
    pub rows: Vec<VersusRow>,
    pub side_1_won: usize,
    pub side_1_lost: usize,
}

impl VersusReport {
    pub fn from_rows(rows: Vec<VersusRow>) -> Self {
        let side_1_won = rows.iter().filter(|r| r.side_1_won_round).count();
        let side_1_lost = rows.len() - side_1_won;
        Self {
            rows,
            side_1_won,
            side_1_lost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRound {
    #[serde(flatten)]
    pub round: RoundRecord,
    pub winning_team: String,
}

/// Every round of a single match with its map metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOverview {
    pub map: MapRecord,
    pub rounds: Vec<MatchRound>,
}
