use crate::error::Result;
use crate::player::PlayerId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One row of the external match-log table. The game clients write these
/// out of band; the validation engine only ever reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchLogRow {
    pub player_id: PlayerId,
    pub game_mode: u8,
    pub map_number: u32,
    pub is_win: bool,
    pub is_valid: bool,
    pub team_score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub headshots: u32,
    pub logged_at: DateTime<Utc>,
}

/// Filter for a single-round-trip fetch covering all active matches.
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub game_mode: u8,
    pub valid_only: bool,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub player_ids: Vec<PlayerId>,
}

/// Read-only view of the external log table.
#[async_trait]
pub trait MatchLogSource: Send + Sync {
    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<MatchLogRow>>;
}

/// In-memory log source for tests: push rows, the engine finds them.
pub struct InMemoryLogSource {
    rows: Arc<RwLock<Vec<MatchLogRow>>>,
}

impl InMemoryLogSource {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn push(&self, row: MatchLogRow) {
        self.rows.write().await.push(row);
    }
}

impl Default for InMemoryLogSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchLogSource for InMemoryLogSource {
    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<MatchLogRow>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| {
                row.game_mode == query.game_mode
                    && (!query.valid_only || row.is_valid)
                    && row.logged_at >= query.since
                    && row.logged_at <= query.until
                    && query.player_ids.contains(&row.player_id)
            })
            .cloned()
            .collect())
    }
}
