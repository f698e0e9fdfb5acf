//! Pure classification of a match's accumulated log evidence.

use crate::persistence::MatchLogRow;
use crate::player::{PlayerId, TeamSide};
use crate::team::Cohort;

#[derive(Debug, Clone)]
pub struct Classification {
    pub winner: TeamSide,
    pub score_alpha: i32,
    pub score_bravo: i32,
    pub alpha_count: usize,
    pub bravo_count: usize,
    pub abandoned: Vec<PlayerId>,
}

/// Classify one match's logs (one row per observed player).
///
/// Invalid (None) when either team has fewer than three observed players
/// or the observation skew exceeds two. The winner is the team with more
/// `is_win` entries; abandonments are expected players with no row.
pub fn validate_teams(cohort: &Cohort, rows: &[MatchLogRow]) -> Option<Classification> {
    let mut alpha_count = 0usize;
    let mut bravo_count = 0usize;
    let mut alpha_wins = 0usize;
    let mut bravo_wins = 0usize;
    let mut score_alpha = 0i32;
    let mut score_bravo = 0i32;

    for row in rows {
        let side = cohort.side_of(row.player_id)?;
        match side {
            TeamSide::Alpha => {
                alpha_count += 1;
                if row.is_win {
                    alpha_wins += 1;
                }
                score_alpha = score_alpha.max(row.team_score as i32);
            }
            TeamSide::Bravo => {
                bravo_count += 1;
                if row.is_win {
                    bravo_wins += 1;
                }
                score_bravo = score_bravo.max(row.team_score as i32);
            }
        }
    }

    if alpha_count < 3 || bravo_count < 3 {
        return None;
    }
    if alpha_count.abs_diff(bravo_count) > 2 {
        return None;
    }

    let winner = if alpha_wins != bravo_wins {
        if alpha_wins > bravo_wins {
            TeamSide::Alpha
        } else {
            TeamSide::Bravo
        }
    } else if score_alpha >= score_bravo {
        TeamSide::Alpha
    } else {
        TeamSide::Bravo
    };

    let observed: Vec<PlayerId> = rows.iter().map(|r| r.player_id).collect();
    let abandoned = cohort
        .player_ids()
        .into_iter()
        .filter(|id| !observed.contains(id))
        .collect();

    Some(Classification {
        winner,
        score_alpha,
        score_bravo,
        alpha_count,
        bravo_count,
        abandoned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{ClassProfile, Role, WeaponClass};
    use crate::team::CohortPlayer;
    use chrono::Utc;

    fn cohort() -> Cohort {
        let players = (1..=10u64)
            .map(|id| CohortPlayer {
                player_id: PlayerId(id),
                display_name: format!("player-{id}"),
                mmr: 1500,
                classes: ClassProfile::new(WeaponClass::T1, WeaponClass::T2),
                queued_at: 0,
                team: if id <= 5 { TeamSide::Alpha } else { TeamSide::Bravo },
                role: Role::T1,
                was_autofill: false,
            })
            .collect();
        Cohort {
            match_id: "9".to_string(),
            players,
        }
    }

    fn row(id: u64, is_win: bool, team_score: u32) -> MatchLogRow {
        MatchLogRow {
            player_id: PlayerId(id),
            game_mode: 5,
            map_number: 1,
            is_win,
            is_valid: true,
            team_score,
            kills: 10,
            deaths: 8,
            assists: 2,
            headshots: 3,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn full_evidence_classifies_with_no_abandons() {
        let cohort = cohort();
        let rows: Vec<MatchLogRow> = (1..=10)
            .map(|id| row(id, id <= 5, if id <= 5 { 13 } else { 9 }))
            .collect();
        let c = validate_teams(&cohort, &rows).unwrap();
        assert_eq!(c.winner, TeamSide::Alpha);
        assert_eq!(c.score_alpha, 13);
        assert_eq!(c.score_bravo, 9);
        assert!(c.abandoned.is_empty());
    }

    #[test]
    fn four_versus_four_is_valid_with_two_abandons() {
        let cohort = cohort();
        // Players 5 and 10 never show up.
        let rows: Vec<MatchLogRow> = (1..=4)
            .map(|id| row(id, false, 7))
            .chain((6..=9).map(|id| row(id, true, 13)))
            .collect();
        let c = validate_teams(&cohort, &rows).unwrap();
        assert_eq!(c.winner, TeamSide::Bravo);
        assert_eq!(c.alpha_count, 4);
        assert_eq!(c.bravo_count, 4);
        let mut abandoned = c.abandoned.clone();
        abandoned.sort();
        assert_eq!(abandoned, vec![PlayerId(5), PlayerId(10)]);
    }

    #[test]
    fn undersized_team_is_invalid() {
        let cohort = cohort();
        let rows: Vec<MatchLogRow> = (1..=2)
            .map(|id| row(id, true, 13))
            .chain((6..=10).map(|id| row(id, false, 9)))
            .collect();
        assert!(validate_teams(&cohort, &rows).is_none());
    }

    #[test]
    fn lopsided_observation_is_invalid() {
        let cohort = cohort();
        // 5 vs 3: skew of 2 is fine, 5 vs 2 is not; check the boundary.
        let rows: Vec<MatchLogRow> = (1..=5)
            .map(|id| row(id, true, 13))
            .chain((6..=8).map(|id| row(id, false, 9)))
            .collect();
        assert!(validate_teams(&cohort, &rows).is_some());

        let rows: Vec<MatchLogRow> = (1..=5)
            .map(|id| row(id, true, 13))
            .chain((6..=7).map(|id| row(id, false, 9)))
            .collect();
        assert!(validate_teams(&cohort, &rows).is_none());
    }

    #[test]
    fn win_majority_decides_over_score() {
        let cohort = cohort();
        let rows: Vec<MatchLogRow> = (1..=5)
            .map(|id| row(id, false, 20))
            .chain((6..=10).map(|id| row(id, true, 5)))
            .collect();
        let c = validate_teams(&cohort, &rows).unwrap();
        assert_eq!(c.winner, TeamSide::Bravo);
    }

    #[test]
    fn unknown_player_in_logs_is_invalid() {
        let cohort = cohort();
        let mut rows: Vec<MatchLogRow> = (1..=10).map(|id| row(id, id <= 5, 10)).collect();
        rows.push(row(99, true, 10));
        assert!(validate_teams(&cohort, &rows).is_none());
    }
}
