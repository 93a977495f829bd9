//! End-to-end tests for the query pipeline
//!
//! Runs searches against MemTable-backed stores built from small fixtures.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use valo_types::{FilterValue, SearchRequest, StateFilter};

use super::*;
use crate::error::QueryError;
use crate::filter::FilterCompiler;
use crate::store::{
    AGENT_STATE_TABLE, MAP_INFO_TABLE, ROUND_INFO_TABLE, agent_state_schema, map_info_schema,
    round_info_schema,
};

/// One agent_state row; unlisted columns get fixed values
#[derive(Clone, Copy)]
struct State {
    game: &'static str,
    round: i32,
    frame: i64,
    attacking: bool,
    agent: &'static str,
    health: i32,
}

fn state(
    game: &'static str,
    round: i32,
    frame: i64,
    attacking: bool,
    agent: &'static str,
    health: i32,
) -> State {
    State {
        game,
        round,
        frame,
        attacking,
        agent,
        health,
    }
}

fn agent_state_batch(rows: &[State]) -> RecordBatch {
    let n = rows.len();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(rows.iter().map(|r| r.game).collect::<Vec<_>>())),
        Arc::new(Int32Array::from(rows.iter().map(|r| r.round).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.frame).collect::<Vec<_>>())),
        Arc::new(BooleanArray::from(rows.iter().map(|r| r.attacking).collect::<Vec<_>>())),
        Arc::new(StringArray::from(rows.iter().map(|r| r.agent).collect::<Vec<_>>())),
        Arc::new(StringArray::from(rows.iter().map(|r| format!("{}_player", r.agent)).collect::<Vec<_>>())),
        Arc::new(StringArray::from(vec!["Vandal"; n])),
        Arc::new(Int32Array::from(vec![4_000; n])),
        Arc::new(Int32Array::from(rows.iter().map(|r| r.health).collect::<Vec<_>>())),
        Arc::new(Int32Array::from(vec![50; n])),
        Arc::new(Int32Array::from(vec![0; n])),
        Arc::new(Int32Array::from(vec![1; n])),
        Arc::new(Int32Array::from(vec![1; n])),
        Arc::new(Int32Array::from(vec![1; n])),
    ];
    RecordBatch::try_new(agent_state_schema(), columns).unwrap()
}

/// (game, round, attackers_won, round_start_frame)
fn round_info_batch(rows: &[(&str, i32, bool, i64)]) -> RecordBatch {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
        Arc::new(Int32Array::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())),
        Arc::new(BooleanArray::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.3).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(vec![100i64; rows.len()])),
    ];
    RecordBatch::try_new(round_info_schema(), columns).unwrap()
}

/// (game, map_name)
fn map_info_batch(rows: &[(&str, &str)]) -> RecordBatch {
    let n = rows.len();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
        Arc::new(StringArray::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())),
        Arc::new(StringArray::from(vec!["https://www.youtube.com/watch?v=abc123"; n])),
        Arc::new(Int32Array::from(vec![60; n])),
        Arc::new(StringArray::from(vec!["Alpha"; n])),
        Arc::new(StringArray::from(vec!["Bravo"; n])),
        Arc::new(StringArray::from(vec!["2023-03-01 18:00"; n])),
    ];
    RecordBatch::try_new(map_info_schema(), columns).unwrap()
}

fn store(states: &[State], rounds: &[(&str, i32, bool, i64)], maps: &[(&str, &str)]) -> ValoStore {
    let store = ValoStore::new(FilterCompiler::default());
    store.register_batch(AGENT_STATE_TABLE, agent_state_batch(states)).unwrap();
    store.register_batch(ROUND_INFO_TABLE, round_info_batch(rounds)).unwrap();
    store.register_batch(MAP_INFO_TABLE, map_info_batch(maps)).unwrap();
    store
}

fn filter(json: &str) -> StateFilter {
    serde_json::from_str(json).unwrap()
}

fn health(min: i64, max: i64) -> StateFilter {
    StateFilter::new().with("health", FilterValue::Range([min, max]))
}

/// Two rounds of one match plus a second match
fn fixture() -> ValoStore {
    store(
        &[
            state("m1", 1, 100, true, "Jett", 10),
            state("m1", 1, 100, true, "Sage", 15),
            state("m1", 1, 100, false, "Omen", 100),
            state("m1", 1, 200, true, "Jett", 5),
            state("m1", 2, 50, false, "Omen", 20),
            state("m1", 2, 60, false, "Omen", 90),
            state("m2", 1, 10, true, "Sova", 0),
        ],
        &[("m1", 1, true, 1_000), ("m1", 2, false, 5_000), ("m2", 1, true, 300)],
        &[("m1", "Ascent"), ("m2", "Bind")],
    )
}

#[tokio::test]
async fn test_single_filter_end_to_end() {
    let store = store(
        &[
            state("m1", 1, 100, true, "Jett", 10),
            state("m1", 1, 100, true, "Sage", 10),
        ],
        &[("m1", 1, true, 7_000)],
        &[("m1", "Ascent")],
    );

    let groups = store.match_agent_states(&health(0, 20), false).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].state_count, 2);
    assert_eq!(groups[0].key.is_attacking, None);

    let request = SearchRequest::from_filters(vec![health(0, 20)]);
    let SearchOutcome::Matches(rows) = store.search(&request, false).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].first_true_frame, 7_100);
    assert_eq!(rows[0].last_true_frame, 7_100);
    assert_eq!(rows[0].map.map_name, "Ascent");
}

#[tokio::test]
async fn test_range_bounds_inclusive() {
    let store = store(
        &[
            state("m1", 1, 1, true, "Jett", 10),
            state("m1", 1, 2, true, "Jett", 20),
            state("m1", 1, 3, true, "Jett", 21),
            state("m1", 1, 4, true, "Jett", 9),
        ],
        &[],
        &[],
    );
    let groups = store.match_agent_states(&health(10, 20), false).await.unwrap();
    let frames: Vec<i64> = groups.iter().map(|g| g.key.frames_since_round_start).collect();
    assert_eq!(frames, vec![1, 2]);
}

#[tokio::test]
async fn test_empty_enum_list_matches_nothing() {
    let store = fixture();
    let groups = store
        .match_agent_states(&filter(r#"{"agent_name": []}"#), false)
        .await
        .unwrap();
    assert!(groups.is_empty());
}

#[tokio::test]
async fn test_enum_and_flag_filters() {
    let store = fixture();
    let groups = store
        .match_agent_states(&filter(r#"{"agent_name": ["Jett", "Sova"], "is_attacking": true}"#), false)
        .await
        .unwrap();
    let keys: Vec<_> = groups
        .iter()
        .map(|g| (g.key.game_uuid.as_str(), g.key.frames_since_round_start))
        .collect();
    assert_eq!(keys, vec![("m1", 100), ("m1", 200), ("m2", 10)]);
}

#[tokio::test]
async fn test_default_state_count_by_side() {
    let mut rows = Vec::new();
    // Five attackers at frame 10, six at frame 20
    for _ in 0..5 {
        rows.push(state("m1", 1, 10, true, "Jett", 50));
    }
    for _ in 0..6 {
        rows.push(state("m1", 1, 20, true, "Jett", 50));
    }
    let store = store(&rows, &[], &[]);

    let groups = store.match_agent_states(&health(0, 100), true).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.frames_since_round_start, 10);
    assert_eq!(groups[0].key.is_attacking, Some(true));
    assert_eq!(groups[0].state_count, 5);

    // Without side grouping the default upper bound is 10
    let groups = store.match_agent_states(&health(0, 100), false).await.unwrap();
    assert_eq!(groups.len(), 2);
}

#[tokio::test]
async fn test_explicit_state_count() {
    let store = fixture();
    let groups = store
        .match_agent_states(&filter(r#"{"health": [0, 20], "state_count": [2, 2]}"#), false)
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.round_number, 1);
    assert_eq!(groups[0].key.frames_since_round_start, 100);
}

#[tokio::test]
async fn test_group_by_side_splits_frames() {
    let store = fixture();
    let groups = store
        .match_agent_states(&filter(r#"{"health": [0, 100]}"#), true)
        .await
        .unwrap();
    let at_100: Vec<_> = groups
        .iter()
        .filter(|g| g.key.round_number == 1 && g.key.frames_since_round_start == 100)
        .map(|g| (g.key.is_attacking, g.state_count))
        .collect();
    assert_eq!(at_100, vec![(Some(false), 1), (Some(true), 2)]);
}

#[tokio::test]
async fn test_join_requires_all_filters() {
    let store = fixture();
    let filters = vec![
        filter(r#"{"agent_name": ["Jett"]}"#),
        filter(r#"{"agent_name": ["Omen"], "health": [100, 100]}"#),
    ];
    let keys = store.join_agent_states(&filters, false).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].frames_since_round_start, 100);

    // Same filters again on the same store
    let again = store.join_agent_states(&filters, false).await.unwrap();
    assert_eq!(keys, again);
}

#[tokio::test]
async fn test_join_errors() {
    let store = fixture();
    assert!(matches!(
        store.join_agent_states(&[], false).await,
        Err(QueryError::MissingFilterList)
    ));
    assert!(matches!(
        store.join_agent_states(&[health(0, 10), StateFilter::new()], false).await,
        Err(QueryError::UnrecognizedFilter { .. })
    ));
}

#[tokio::test]
async fn test_search_enriches_every_round() {
    let store = fixture();
    let request = SearchRequest::from_filters(vec![health(0, 20)]);
    let SearchOutcome::Matches(rows) = store.search(&request, false).await.unwrap() else {
        panic!("expected matches");
    };

    let summary: Vec<_> = rows
        .iter()
        .map(|r| {
            (
                r.round.game_uuid.as_str(),
                r.round.round_number,
                r.first_true_frame,
                r.last_true_frame,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![("m1", 1, 1_100, 1_200), ("m1", 2, 5_050, 5_050), ("m2", 1, 310, 310)]
    );
    for row in &rows {
        assert!(row.first_true_frame <= row.last_true_frame);
    }
    assert_eq!(rows[2].map.map_name, "Bind");
}

#[tokio::test]
async fn test_unknown_keys_do_not_reject_request() {
    let store = fixture();
    let request =
        parse_request(r#"{"agent_state_list": [{"health": [0, 20], "note": "low hp", "xs": [1, 2, 3]}]}"#)
            .unwrap();
    let SearchOutcome::Matches(rows) = store.search(&request, false).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_search_no_matches_is_not_an_error() {
    let store = fixture();
    let request = SearchRequest::from_filters(vec![filter(r#"{"agent_name": ["Nobody"]}"#)]);
    assert_eq!(store.search(&request, false).await.unwrap(), SearchOutcome::NoMatches);
}

#[tokio::test]
async fn test_search_malformed() {
    let store = fixture();
    let err = store.search(&SearchRequest::default(), false).await.unwrap_err();
    assert!(matches!(err, QueryError::MalformedQuery(_)));

    let err = store
        .search(&SearchRequest::from_filters(vec![]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::MissingFilterList));
}

#[tokio::test]
async fn test_explicit_round_filter() {
    let store = fixture();
    let mut request = SearchRequest::from_filters(vec![health(0, 20)]);
    request.round_filter = Some(filter(r#"{"round_number": [2, 2]}"#));

    let SearchOutcome::Matches(rows) = store.search(&request, false).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].round.round_number, 2);
    assert!(!rows[0].round.attackers_won);
}

#[tokio::test]
async fn test_frame_offset_round_filter() {
    let store = fixture();
    let mut request = SearchRequest::from_filters(vec![health(0, 20)]);
    request.round_filter = Some(filter(r#"{"frames_since_round_start": [150, 250]}"#));

    let SearchOutcome::Matches(rows) = store.search(&request, false).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].first_true_frame, 1_200);
    assert_eq!(rows[0].last_true_frame, 1_200);

    request.round_filter = Some(filter(r#"{"frames_since_round_start": [5000, 6000]}"#));
    assert_eq!(store.search(&request, false).await.unwrap(), SearchOutcome::NoMatches);
}

#[tokio::test]
async fn test_explicit_map_filter() {
    let store = fixture();
    let mut request = SearchRequest::from_filters(vec![health(0, 20)]);
    request.map_filter = Some(filter(r#"{"map_name": ["Bind"]}"#));

    let SearchOutcome::Matches(rows) = store.search(&request, false).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].round.game_uuid, "m2");

    request.map_filter = Some(filter(r#"{"map_name": ["Split"]}"#));
    assert_eq!(store.search(&request, false).await.unwrap(), SearchOutcome::NoMatches);
}

#[tokio::test]
async fn test_empty_map_filter_rejected() {
    let store = fixture();
    let mut request = SearchRequest::from_filters(vec![health(0, 20)]);
    request.map_filter = Some(StateFilter::new());
    assert!(matches!(
        store.search(&request, false).await,
        Err(QueryError::UnrecognizedFilter { .. })
    ));
}

#[tokio::test]
async fn test_versus_end_to_end() {
    let store = store(
        &[
            state("m1", 1, 10, true, "Jett", 30),
            state("m1", 1, 15, true, "Jett", 30),
            state("m1", 1, 20, true, "Jett", 30),
            state("m1", 1, 15, false, "Sage", 100),
            state("m1", 1, 20, false, "Sage", 100),
            state("m1", 1, 25, false, "Sage", 100),
        ],
        &[("m1", 1, true, 1_000)],
        &[("m1", "Ascent")],
    );
    let team_1 = SearchRequest::from_filters(vec![filter(r#"{"is_attacking": true, "health": [0, 50]}"#)]);
    let team_2 = SearchRequest::from_filters(vec![filter(r#"{"is_attacking": false, "agent_name": ["Sage"]}"#)]);

    let VersusOutcome::Matches(report) = store.versus(&team_1, &team_2).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.first_true_frame, 1_015);
    assert_eq!(row.last_true_frame, 1_020);
    assert!(row.is_attacking_1);
    assert!(!row.is_attacking_2);
    assert!(row.side_1_won_round);
    assert_eq!((report.side_1_won, report.side_1_lost), (1, 0));

    // Swapping sides flips the outcome
    let VersusOutcome::Matches(report) = store.versus(&team_2, &team_1).await.unwrap() else {
        panic!("expected matches");
    };
    assert!(!report.rows[0].side_1_won_round);
    assert_eq!((report.side_1_won, report.side_1_lost), (0, 1));
}

#[tokio::test]
async fn test_versus_side_1_matching_both_sides_of_a_round() {
    // Team 1 has no side constraint, so its round collapses to the side of the
    // earliest matched frame while the interval spans frames from both sides.
    let states = [
        state("m1", 1, 10, true, "Jett", 30),
        state("m1", 1, 20, true, "Jett", 30),
        state("m1", 1, 40, false, "Omen", 30),
        state("m1", 1, 15, false, "Sage", 100),
        state("m1", 1, 25, false, "Sage", 100),
    ];
    let store_1 = store(&states, &[("m1", 1, true, 1_000)], &[("m1", "Ascent")]);
    let team_1 = SearchRequest::from_filters(vec![health(0, 50)]);
    let team_2 = SearchRequest::from_filters(vec![filter(r#"{"is_attacking": false, "agent_name": ["Sage"]}"#)]);

    let SearchOutcome::Matches(rows) = store_1.search(&team_1, true).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].is_attacking, Some(true));
    assert_eq!((rows[0].first_true_frame, rows[0].last_true_frame), (1_010, 1_040));

    let VersusOutcome::Matches(report) = store_1.versus(&team_1, &team_2).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert!(row.is_attacking_1);
    assert!(!row.is_attacking_2);
    assert_eq!((row.first_true_frame, row.last_true_frame), (1_015, 1_025));

    // A defender matching first makes team 1's round a defending one, which
    // no longer opposes team 2
    let mut states = states.to_vec();
    states.push(state("m1", 1, 5, false, "Omen", 30));
    let store_2 = store(&states, &[("m1", 1, true, 1_000)], &[("m1", "Ascent")]);

    let SearchOutcome::Matches(rows) = store_2.search(&team_1, true).await.unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rows[0].is_attacking, Some(false));
    assert_eq!((rows[0].first_true_frame, rows[0].last_true_frame), (1_005, 1_040));

    let VersusOutcome::Matches(report) = store_2.versus(&team_1, &team_2).await.unwrap() else {
        panic!("expected matches");
    };
    assert!(report.rows.is_empty());
    assert_eq!((report.side_1_won, report.side_1_lost), (0, 0));
}

#[tokio::test]
async fn test_versus_one_side_empty() {
    let store = fixture();
    let team_1 = SearchRequest::from_filters(vec![health(0, 20)]);
    let team_2 = SearchRequest::from_filters(vec![filter(r#"{"agent_name": ["Nobody"]}"#)]);
    assert_eq!(store.versus(&team_1, &team_2).await.unwrap(), VersusOutcome::NoMatches);
}

#[tokio::test]
async fn test_match_overview() {
    let store = fixture();
    let overview = store.match_overview("m1").await.unwrap();
    assert_eq!(overview.map.map_name, "Ascent");
    let rounds: Vec<_> = overview
        .rounds
        .iter()
        .map(|r| (r.round.round_number, r.winning_team.as_str()))
        .collect();
    assert_eq!(rounds, vec![(1, "Alpha"), (2, "Bravo")]);

    assert!(matches!(
        store.match_overview("missing").await,
        Err(QueryError::MatchNotFound(_))
    ));
}

#[tokio::test]
async fn test_parquet_backed_store() {
    use crate::config::{TablePaths, ValoConfig};
    use parquet::arrow::ArrowWriter;

    let dir = std::env::temp_dir().join(format!("valo-parquet-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let write = |name: &str, batch: RecordBatch| {
        let file = std::fs::File::create(dir.join(name)).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    };
    write(
        "agent_state.parquet",
        agent_state_batch(&[state("m1", 3, 40, false, "Omen", 1)]),
    );
    write("round_info.parquet", round_info_batch(&[("m1", 3, false, 9_000)]));
    write("map_info.parquet", map_info_batch(&[("m1", "Lotus")]));

    let config = ValoConfig {
        data_dir: dir.clone(),
        tables: TablePaths::default(),
        ..ValoConfig::default()
    };
    let store = ValoStore::open(&config, FilterCompiler::default()).await.unwrap();
    let outcome = store
        .search(&SearchRequest::from_filters(vec![health(0, 5)]), false)
        .await
        .unwrap();
    std::fs::remove_dir_all(&dir).ok();

    let SearchOutcome::Matches(rows) = outcome else {
        panic!("expected matches");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].first_true_frame, 9_040);
    assert_eq!(rows[0].map.map_name, "Lotus");
}
