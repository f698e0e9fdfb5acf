use crate::player::{ClassProfile, PlayerId, Role, TeamSide, WeaponClass};
use serde::{Deserialize, Serialize};

/// Per-player field of the `match:{id}:classes` hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignment {
    pub primary: WeaponClass,
    pub secondary: WeaponClass,
    pub assigned_role: Role,
    pub was_autofill: bool,
}

/// One of the ten players in a published cohort, with their team and
/// assigned role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortPlayer {
    pub player_id: PlayerId,
    pub display_name: String,
    pub mmr: i32,
    pub classes: ClassProfile,
    pub queued_at: i64,
    pub team: TeamSide,
    pub role: Role,
    pub was_autofill: bool,
}

/// Ten players selected for a single match attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohort {
    pub match_id: String,
    pub players: Vec<CohortPlayer>,
}

impl Cohort {
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.player_id).collect()
    }

    pub fn team(&self, side: TeamSide) -> Vec<&CohortPlayer> {
        self.players.iter().filter(|p| p.team == side).collect()
    }

    pub fn get(&self, player: PlayerId) -> Option<&CohortPlayer> {
        self.players.iter().find(|p| p.player_id == player)
    }

    pub fn side_of(&self, player: PlayerId) -> Option<TeamSide> {
        self.get(player).map(|p| p.team)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.get(player).is_some()
    }

    /// The team leader is the first-listed player of that team.
    pub fn leader(&self, side: TeamSide) -> Option<&CohortPlayer> {
        self.players.iter().find(|p| p.team == side)
    }

    pub fn team_avg_mmr(&self, side: TeamSide) -> i32 {
        let team = self.team(side);
        if team.is_empty() {
            return 0;
        }
        team.iter().map(|p| p.mmr).sum::<i32>() / team.len() as i32
    }
}
