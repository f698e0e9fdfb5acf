use crate::player::{PlayerId, RankTier, TeamSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the authoritative match row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchRecordStatus {
    Ready,
    AwaitingHost,
    InProgress,
    AwaitingConfirmation,
    Completed,
    Cancelled,
}

impl MatchRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchRecordStatus::Ready => "ready",
            MatchRecordStatus::AwaitingHost => "awaiting-host",
            MatchRecordStatus::InProgress => "in-progress",
            MatchRecordStatus::AwaitingConfirmation => "awaiting-confirmation",
            MatchRecordStatus::Completed => "completed",
            MatchRecordStatus::Cancelled => "cancelled",
        }
    }
}

/// The relational match row. Redis owns in-flight coordination; this row
/// is authoritative for the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub map: Option<String>,
    pub room_id: Option<String>,
    pub host: Option<PlayerId>,
    pub status: MatchRecordStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub score_alpha: i32,
    pub score_bravo: i32,
    pub winner_team: Option<TeamSide>,
    pub end_reason: Option<String>,
}

impl MatchRecord {
    /// Row created at lobby start, before a map exists.
    pub fn pending(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            map: None,
            room_id: None,
            host: None,
            status: MatchRecordStatus::Ready,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            score_alpha: 0,
            score_bravo: 0,
            winner_team: None,
            end_reason: None,
        }
    }

    pub fn new(match_id: impl Into<String>, map: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            map: Some(map.into()),
            room_id: None,
            host: None,
            status: MatchRecordStatus::Ready,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            score_alpha: 0,
            score_bravo: 0,
            winner_team: None,
            end_reason: None,
        }
    }
}

/// Per-player result row inserted at settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResultRow {
    pub match_id: String,
    pub player_id: PlayerId,
    pub team: TeamSide,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub headshots: u32,
    pub mmr_change: i32,
    pub placement_seeding_bonus: i32,
    pub abandoned: bool,
    pub confirmed_result: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Aggregate per-player ladder statistics, merged with upsert semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatsRow {
    pub player_id: PlayerId,
    pub rank_tier: RankTier,
    pub rank_points: i32,
    pub elo_rating: i32,
    pub matches_played: u32,
    pub matches_won: u32,
    pub placement_completed: bool,
    pub last_match_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
