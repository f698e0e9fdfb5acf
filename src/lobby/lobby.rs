use super::maps::MapPool;
use super::state::LobbyPhase;
use super::swap::SwapBook;
use super::veto::VetoState;
use crate::error::{CoordinatorError, Result};
use crate::player::{PlayerId, Role};
use crate::session::messages::{LobbyPlayerView, LobbyView};
use crate::team::Cohort;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Post-ready lobby state for one match: veto progress, pending swaps, and
/// the live role assignment (mutable through swaps).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lobby {
    pub match_id: String,
    pub phase: LobbyPhase,
    pub veto: VetoState,
    pub swaps: SwapBook,
    pub roles: HashMap<PlayerId, Role>,
}

impl Lobby {
    pub fn new(cohort: &Cohort, pool: &MapPool) -> Self {
        Self {
            match_id: cohort.match_id.clone(),
            phase: LobbyPhase::Vetoing,
            veto: VetoState::new(pool),
            swaps: SwapBook::new(),
            roles: cohort
                .players
                .iter()
                .map(|p| (p.player_id, p.role))
                .collect(),
        }
    }

    pub fn transition_to(&mut self, new_phase: LobbyPhase) -> Result<()> {
        if !self.phase.can_transition_to(new_phase) {
            return Err(CoordinatorError::InvalidTransition(format!(
                "lobby {:?} -> {:?}",
                self.phase, new_phase
            )));
        }
        self.phase = new_phase;
        Ok(())
    }

    pub fn role_of(&self, player: PlayerId) -> Option<Role> {
        self.roles.get(&player).copied()
    }

    /// Exchange two players' roles. Intra-team only; the per-team role set
    /// is preserved by construction.
    pub fn apply_swap(&mut self, cohort: &Cohort, first: PlayerId, second: PlayerId) -> Result<()> {
        let side_a = cohort.side_of(first).ok_or(CoordinatorError::NotInMatch {
            match_id: self.match_id.clone(),
            player: first,
        })?;
        let side_b = cohort.side_of(second).ok_or(CoordinatorError::NotInMatch {
            match_id: self.match_id.clone(),
            player: second,
        })?;
        if side_a != side_b {
            return Err(CoordinatorError::SwapAcrossTeams);
        }

        let role_a = self.role_of(first).ok_or(CoordinatorError::SwapNotFound)?;
        let role_b = self.role_of(second).ok_or(CoordinatorError::SwapNotFound)?;
        self.roles.insert(first, role_b);
        self.roles.insert(second, role_a);
        self.swaps.clear_for(first);
        self.swaps.clear_for(second);
        Ok(())
    }

    /// The lobby as one viewer sees it: teammates by name, opponents
    /// anonymized by roster position.
    pub fn view_for(&self, cohort: &Cohort, viewer: PlayerId) -> Option<LobbyView> {
        let side = cohort.side_of(viewer)?;

        let teammates = cohort
            .team(side)
            .iter()
            .map(|p| LobbyPlayerView {
                player_id: p.player_id,
                display_name: p.display_name.clone(),
                role: self.role_of(p.player_id).unwrap_or(p.role),
                mmr: p.mmr,
            })
            .collect();

        let opponents = cohort
            .team(side.opposite())
            .iter()
            .enumerate()
            .map(|(i, p)| LobbyPlayerView {
                player_id: p.player_id,
                display_name: format!("Player {:02}", i + 1),
                role: self.role_of(p.player_id).unwrap_or(p.role),
                mmr: p.mmr,
            })
            .collect();

        Some(LobbyView {
            match_id: self.match_id.clone(),
            phase: self.phase.as_str().to_string(),
            team: side,
            teammates,
            opponents,
            remaining_maps: self.veto.remaining_ids(),
            vetoed_maps: self.veto.vetoed_ids(),
            current_turn: self.veto.current_turn(),
            selected_map: self.veto.selected().map(|m| m.map_id.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{ClassProfile, TeamSide, WeaponClass};
    use crate::team::CohortPlayer;

    fn cohort() -> Cohort {
        let roles = [Role::Sniper, Role::T1, Role::T2, Role::T3, Role::T4];
        let players = (0..10u64)
            .map(|i| CohortPlayer {
                player_id: PlayerId(i + 1),
                display_name: format!("name-{}", i + 1),
                mmr: 1500,
                classes: ClassProfile::new(WeaponClass::T1, WeaponClass::T2),
                queued_at: 0,
                team: if i < 5 { TeamSide::Alpha } else { TeamSide::Bravo },
                role: roles[(i % 5) as usize],
                was_autofill: false,
            })
            .collect();
        Cohort {
            match_id: "1".to_string(),
            players,
        }
    }

    #[test]
    fn swap_preserves_team_role_set() {
        let cohort = cohort();
        let mut lobby = Lobby::new(&cohort, &MapPool::standard());

        let before: Vec<Role> = (1..=5).filter_map(|i| lobby.role_of(PlayerId(i))).collect();
        lobby.apply_swap(&cohort, PlayerId(1), PlayerId(2)).unwrap();
        let mut after: Vec<Role> = (1..=5).filter_map(|i| lobby.role_of(PlayerId(i))).collect();

        assert_eq!(lobby.role_of(PlayerId(1)), Some(Role::T1));
        assert_eq!(lobby.role_of(PlayerId(2)), Some(Role::Sniper));

        let mut before_sorted = before;
        before_sorted.sort_by_key(|r| format!("{r:?}"));
        after.sort_by_key(|r| format!("{r:?}"));
        assert_eq!(before_sorted, after);
    }

    #[test]
    fn cross_team_swap_is_rejected() {
        let cohort = cohort();
        let mut lobby = Lobby::new(&cohort, &MapPool::standard());
        let err = lobby
            .apply_swap(&cohort, PlayerId(1), PlayerId(6))
            .unwrap_err();
        assert_eq!(err.reason_code(), "SWAP_ACROSS_TEAMS");
    }

    #[test]
    fn view_hides_opponent_names_only() {
        let cohort = cohort();
        let lobby = Lobby::new(&cohort, &MapPool::standard());
        let view = lobby.view_for(&cohort, PlayerId(1)).unwrap();

        assert!(view.teammates.iter().all(|p| p.display_name.starts_with("name-")));
        assert!(view
            .opponents
            .iter()
            .all(|p| p.display_name.starts_with("Player ")));
        assert_eq!(view.opponents[0].display_name, "Player 01");
    }

    #[test]
    fn phase_transitions_follow_the_pipeline() {
        let cohort = cohort();
        let mut lobby = Lobby::new(&cohort, &MapPool::standard());

        assert!(lobby.transition_to(LobbyPhase::HostSelecting).is_err());
        lobby.transition_to(LobbyPhase::MapSelected).unwrap();
        lobby.transition_to(LobbyPhase::HostSelecting).unwrap();
        lobby.transition_to(LobbyPhase::InProgress).unwrap();
        lobby.transition_to(LobbyPhase::Closed).unwrap();
    }
}
