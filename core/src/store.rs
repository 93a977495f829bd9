//! Read-only access to the match store through DataFusion.
//!
//! The store is three tables (`agent_state`, `round_info`, `map_info`)
//! registered into one [`SessionContext`], either from parquet or from
//! in-memory Arrow batches. A [`ValoStore`] is built per request and dropped
//! with it, which releases everything it registered.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, Int32Array, Int64Array, LargeStringArray, StringArray, StringViewArray,
    UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use valo_types::{MapRecord, RoundRecord};

use crate::config::ValoConfig;
use crate::error::QueryError;
use crate::filter::FilterCompiler;

pub const AGENT_STATE_TABLE: &str = "agent_state";
pub const ROUND_INFO_TABLE: &str = "round_info";
pub const MAP_INFO_TABLE: &str = "map_info";

// ─────────────────────────────────────────────────────────────────────────────
// Table Schemas
// ─────────────────────────────────────────────────────────────────────────────

/// Per-participant, per-frame state rows
pub fn agent_state_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("game_uuid", DataType::Utf8, false),
        Field::new("round_number", DataType::Int32, false),
        Field::new("frames_since_round_start", DataType::Int64, false),
        Field::new("is_attacking", DataType::Boolean, false),
        Field::new("agent_name", DataType::Utf8, true),
        Field::new("player_name", DataType::Utf8, true),
        Field::new("gun", DataType::Utf8, true),
        Field::new("credits", DataType::Int32, true),
        Field::new("health", DataType::Int32, true),
        Field::new("armor", DataType::Int32, true),
        Field::new("ult_points", DataType::Int32, true),
        Field::new("c_util", DataType::Int32, true),
        Field::new("q_util", DataType::Int32, true),
        Field::new("e_util", DataType::Int32, true),
    ]))
}

pub fn round_info_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("game_uuid", DataType::Utf8, false),
        Field::new("round_number", DataType::Int32, false),
        Field::new("attackers_won", DataType::Boolean, false),
        Field::new("round_start_frame", DataType::Int64, false),
        Field::new("total_events", DataType::Int64, false),
    ]))
}

pub fn map_info_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("game_uuid", DataType::Utf8, false),
        Field::new("map_name", DataType::Utf8, false),
        Field::new("vod_link", DataType::Utf8, false),
        Field::new("vod_fps", DataType::Int32, false),
        Field::new("first_half_attacking_team", DataType::Utf8, false),
        Field::new("first_half_defending_team", DataType::Utf8, false),
        Field::new("game_vod_time", DataType::Utf8, false),
    ]))
}

// ─────────────────────────────────────────────────────────────────────────────
// Column Extractors (handles Arrow type variations automatically)
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn col_index(batch: &RecordBatch, name: &str) -> Result<usize, QueryError> {
    batch
        .schema_ref()
        .index_of(name)
        .map_err(|_| QueryError::Column(format!("missing column `{name}`")))
}

pub(crate) fn col_strings(batch: &RecordBatch, name: &str) -> Result<Vec<String>, QueryError> {
    let col = batch.column(col_index(batch, name)?);
    if let Some(a) = col.as_any().downcast_ref::<StringArray>() {
        return Ok((0..a.len()).map(|i| a.value(i).to_string()).collect());
    }
    if let Some(a) = col.as_any().downcast_ref::<StringViewArray>() {
        return Ok((0..a.len()).map(|i| a.value(i).to_string()).collect());
    }
    if let Some(a) = col.as_any().downcast_ref::<LargeStringArray>() {
        return Ok((0..a.len()).map(|i| a.value(i).to_string()).collect());
    }
    Err(QueryError::Column(format!(
        "{name}: expected string, got {:?}",
        col.data_type()
    )))
}

pub(crate) fn col_i64(batch: &RecordBatch, name: &str) -> Result<Vec<i64>, QueryError> {
    let col = batch.column(col_index(batch, name)?);
    if let Some(a) = col.as_any().downcast_ref::<Int64Array>() {
        return Ok((0..a.len()).map(|i| a.value(i)).collect());
    }
    if let Some(a) = col.as_any().downcast_ref::<Int32Array>() {
        return Ok((0..a.len()).map(|i| a.value(i) as i64).collect());
    }
    if let Some(a) = col.as_any().downcast_ref::<UInt64Array>() {
        return Ok((0..a.len()).map(|i| a.value(i) as i64).collect());
    }
    if let Some(a) = col.as_any().downcast_ref::<UInt32Array>() {
        return Ok((0..a.len()).map(|i| a.value(i) as i64).collect());
    }
    Err(QueryError::Column(format!(
        "{name}: expected int, got {:?}",
        col.data_type()
    )))
}

pub(crate) fn col_bool(batch: &RecordBatch, name: &str) -> Result<Vec<bool>, QueryError> {
    let col = batch.column(col_index(batch, name)?);
    if let Some(a) = col.as_any().downcast_ref::<BooleanArray>() {
        return Ok((0..a.len()).map(|i| a.value(i)).collect());
    }
    Err(QueryError::Column(format!(
        "{name}: expected bool, got {:?}",
        col.data_type()
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

pub struct ValoStore {
    ctx: SessionContext,
    compiler: FilterCompiler,
}

impl Default for ValoStore {
    fn default() -> Self {
        Self::new(FilterCompiler::default())
    }
}

impl ValoStore {
    /// An empty store; tables must be registered before querying
    pub fn new(compiler: FilterCompiler) -> Self {
        Self {
            ctx: SessionContext::new(),
            compiler,
        }
    }

    /// Open the parquet tables named by `config`
    pub async fn open(config: &ValoConfig, compiler: FilterCompiler) -> Result<Self, QueryError> {
        let store = Self::new(compiler);
        store
            .register_parquet(AGENT_STATE_TABLE, &config.agent_state_path())
            .await?;
        store
            .register_parquet(ROUND_INFO_TABLE, &config.round_info_path())
            .await?;
        store
            .register_parquet(MAP_INFO_TABLE, &config.map_info_path())
            .await?;
        tracing::debug!(data_dir = %config.data_dir.display(), "Opened store");
        Ok(store)
    }

    pub fn compiler(&self) -> &FilterCompiler {
        &self.compiler
    }

    pub fn register_batch(&self, table: &str, batch: RecordBatch) -> Result<(), QueryError> {
        let schema = batch.schema();
        let mem_table = MemTable::try_new(schema, vec![vec![batch]])?;
        self.ctx.register_table(table, Arc::new(mem_table))?;
        Ok(())
    }

    pub async fn register_parquet(&self, table: &str, path: &Path) -> Result<(), QueryError> {
        self.ctx
            .register_parquet(
                table,
                path.to_string_lossy().as_ref(),
                ParquetReadOptions::default(),
            )
            .await?;
        Ok(())
    }

    pub(crate) async fn table(&self, name: &str) -> Result<DataFrame, QueryError> {
        Ok(self.ctx.table(name).await?)
    }

    /// Rows of `round_info` matching `predicate`
    pub(crate) async fn fetch_rounds(&self, predicate: Expr) -> Result<Vec<RoundRecord>, QueryError> {
        let batches = self
            .table(ROUND_INFO_TABLE)
            .await?
            .filter(predicate)?
            .collect()
            .await?;

        let mut rounds = Vec::new();
        for batch in &batches {
            let uuids = col_strings(batch, "game_uuid")?;
            let numbers = col_i64(batch, "round_number")?;
            let won = col_bool(batch, "attackers_won")?;
            let starts = col_i64(batch, "round_start_frame")?;
            let events = col_i64(batch, "total_events")?;

            for i in 0..batch.num_rows() {
                rounds.push(RoundRecord {
                    game_uuid: uuids[i].clone(),
                    round_number: numbers[i],
                    attackers_won: won[i],
                    round_start_frame: starts[i],
                    total_events: events[i],
                });
            }
        }
        Ok(rounds)
    }

    /// Rows of `map_info` matching `predicate`
    pub(crate) async fn fetch_maps(&self, predicate: Expr) -> Result<Vec<MapRecord>, QueryError> {
        let batches = self
            .table(MAP_INFO_TABLE)
            .await?
            .filter(predicate)?
            .collect()
            .await?;

        let mut maps = Vec::new();
        for batch in &batches {
            let uuids = col_strings(batch, "game_uuid")?;
            let names = col_strings(batch, "map_name")?;
            let links = col_strings(batch, "vod_link")?;
            let fps = col_i64(batch, "vod_fps")?;
            let attacking = col_strings(batch, "first_half_attacking_team")?;
            let defending = col_strings(batch, "first_half_defending_team")?;
            let times = col_strings(batch, "game_vod_time")?;

            for i in 0..batch.num_rows() {
                maps.push(MapRecord {
                    game_uuid: uuids[i].clone(),
                    map_name: names[i].clone(),
                    vod_link: links[i].clone(),
                    vod_fps: fps[i],
                    first_half_attacking_team: attacking[i].clone(),
                    first_half_defending_team: defending[i].clone(),
                    game_vod_time: times[i].clone(),
                });
            }
        }
        Ok(maps)
    }
}
