//! Video links for result rows.

use valo_types::formatting::{embed_link, frame_to_secs, video_id, watch_link};
use valo_types::{EnrichedRound, MapRecord, VersusRow};

use crate::config::FrameRateTable;

/// Watch links for the three timestamps shown on every result row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowLinks {
    pub round_start: Option<String>,
    pub first_true: Option<String>,
    pub last_true: Option<String>,
}

/// Builds timestamped links using corrected frame rates.
#[derive(Debug, Clone, Default)]
pub struct VodLinks {
    frame_rates: FrameRateTable,
}

impl VodLinks {
    pub fn new(frame_rates: FrameRateTable) -> Self {
        Self { frame_rates }
    }

    /// Seconds into the recording for an absolute frame
    pub fn secs(&self, map: &MapRecord, frame: i64) -> u64 {
        frame_to_secs(frame, self.frame_rates.actual(map.vod_fps))
    }

    pub fn watch(&self, map: &MapRecord, frame: i64) -> Option<String> {
        let id = video_id(&map.vod_link)?;
        Some(watch_link(id, Some(self.secs(map, frame))))
    }

    pub fn embed(&self, map: &MapRecord, frame: i64) -> Option<String> {
        let id = video_id(&map.vod_link)?;
        Some(embed_link(id, Some(self.secs(map, frame))))
    }

    pub fn for_round(&self, row: &EnrichedRound) -> RowLinks {
        self.row_links(
            &row.map,
            row.round.round_start_frame,
            row.first_true_frame,
            row.last_true_frame,
        )
    }

    pub fn for_versus(&self, row: &VersusRow) -> RowLinks {
        self.row_links(
            &row.map,
            row.round.round_start_frame,
            row.first_true_frame,
            row.last_true_frame,
        )
    }

    fn row_links(&self, map: &MapRecord, start: i64, first: i64, last: i64) -> RowLinks {
        RowLinks {
            round_start: self.watch(map, start),
            first_true: self.watch(map, first),
            last_true: self.watch(map, last),
        }
    }
}
