use super::records::{MatchRecord, MatchRecordStatus, PlayerResultRow, PlayerStatsRow};
use crate::error::Result;
use crate::player::{Player, PlayerId, PlayerRank};
use async_trait::async_trait;

/// Relational store abstraction. Write-mostly from the pipeline; the match
/// row here is authoritative for the final result.
#[async_trait]
pub trait MatchStore: Send + Sync {
    // Players
    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>>;
    async fn find_player_by_social_id(&self, social_id: &str) -> Result<Option<Player>>;
    async fn upsert_player(&self, player: &Player) -> Result<()>;

    /// Mutate a player's ladder position. Only result settlement calls this.
    async fn update_player_rating(
        &self,
        id: PlayerId,
        mmr: i32,
        rank: PlayerRank,
    ) -> Result<()>;

    // Match rows
    async fn create_match(&self, record: &MatchRecord) -> Result<()>;
    async fn load_match(&self, match_id: &str) -> Result<Option<MatchRecord>>;
    async fn update_status(&self, match_id: &str, status: MatchRecordStatus) -> Result<()>;
    async fn set_map(&self, match_id: &str, map: &str) -> Result<()>;

    /// Bind the chosen host to the row. Returns false when the row is no
    /// longer in `ready` status, in which case the stage must not advance.
    async fn set_host(&self, match_id: &str, host: PlayerId) -> Result<bool>;

    /// Room confirmation: `status=in-progress` plus room and map, atomically.
    async fn confirm_room(&self, match_id: &str, room_id: &str, map_number: u32) -> Result<()>;

    async fn cancel_match(&self, match_id: &str, end_reason: &str) -> Result<()>;

    async fn complete_match(
        &self,
        match_id: &str,
        winner: crate::player::TeamSide,
        score_alpha: i32,
        score_bravo: i32,
        duration_seconds: i64,
    ) -> Result<()>;

    // Settlement rows
    async fn insert_player_results(&self, rows: &[PlayerResultRow]) -> Result<()>;
    async fn load_player_stats(&self, id: PlayerId) -> Result<Option<PlayerStatsRow>>;
    async fn upsert_player_stats(&self, stats: &PlayerStatsRow) -> Result<()>;
}
