//! Match overview: every round of one match with its winner.

use datafusion::prelude::{col, lit};
use valo_types::{MapRecord, MatchOverview, MatchRound};

use crate::error::QueryError;
use crate::store::ValoStore;

/// Rounds in regulation per half
const HALF_LENGTH: i64 = 12;
/// Last regulation round; sides alternate every round after it
const REGULATION_ROUNDS: i64 = 24;

/// Whether the first-half attacking team is attacking in `round_number`
pub fn first_half_sides(round_number: i64) -> bool {
    (1..=HALF_LENGTH).contains(&round_number)
        || (round_number > REGULATION_ROUNDS && round_number % 2 != 0)
}

/// Name of the team that won the round
pub fn winning_team(round_number: i64, attackers_won: bool, map: &MapRecord) -> &str {
    if first_half_sides(round_number) == attackers_won {
        &map.first_half_attacking_team
    } else {
        &map.first_half_defending_team
    }
}

impl ValoStore {
    pub async fn match_overview(&self, game_uuid: &str) -> Result<MatchOverview, QueryError> {
        let map = self
            .fetch_maps(col("game_uuid").eq(lit(game_uuid)))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::MatchNotFound(game_uuid.to_string()))?;

        let mut rounds = self.fetch_rounds(col("game_uuid").eq(lit(game_uuid))).await?;
        rounds.sort_by_key(|r| r.round_number);

        let rounds = rounds
            .into_iter()
            .map(|round| MatchRound {
                winning_team: winning_team(round.round_number, round.attackers_won, &map).to_string(),
                round,
            })
            .collect();

        Ok(MatchOverview { map, rounds })
    }
}
