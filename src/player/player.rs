use super::{ClassProfile, PlayerRank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable 64-bit player identity, assigned on first authenticated connect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered player. Rank tier and points are mutated only by result
/// settlement; everything else is profile data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub social_id: Option<String>,
    pub mmr: i32,
    pub rank: PlayerRank,
    pub classes: ClassProfile,
    pub banned_until: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>, mmr: i32) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            social_id: None,
            mmr,
            rank: PlayerRank::default(),
            classes: ClassProfile::default(),
            banned_until: None,
            created_at: Utc::now(),
        }
    }

    pub fn active_ban(&self, now_ms: i64) -> Option<i64> {
        self.banned_until.filter(|until| *until > now_ms)
    }
}
