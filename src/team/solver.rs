//! Backtracking team-composition solver.
//!
//! Ten ordered slots, alternating ALPHA/BRAVO per role, filled depth-first.
//! The strict pass enforces per-team effective-class uniqueness; the
//! autofill pass relaxes eligibility and drops the uniqueness constraint.
//! Both minimize the absolute MMR difference between the teams, stopping
//! early on a perfect split.

use crate::error::{CoordinatorError, Result};
use crate::player::{Role, TeamSide, WeaponClass};
use crate::queue::QueueEntry;

/// A player's slot in a solved composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlacement {
    pub entry_index: usize,
    pub team: TeamSide,
    pub role: Role,
    pub priority: u8,
    pub was_autofill: bool,
}

/// A complete two-team split of ten players.
#[derive(Debug, Clone)]
pub struct TeamSplit {
    pub placements: Vec<SlotPlacement>,
    pub mmr_diff: i32,
}

const SLOTS: [(TeamSide, Role); 10] = [
    (TeamSide::Alpha, Role::Sniper),
    (TeamSide::Bravo, Role::Sniper),
    (TeamSide::Alpha, Role::T1),
    (TeamSide::Bravo, Role::T1),
    (TeamSide::Alpha, Role::T2),
    (TeamSide::Bravo, Role::T2),
    (TeamSide::Alpha, Role::T3),
    (TeamSide::Bravo, Role::T3),
    (TeamSide::Alpha, Role::T4),
    (TeamSide::Bravo, Role::T4),
];

/// Solve for ten entries: strict first, autofill only when strict finds
/// no composition at all.
pub fn build_teams(entries: &[QueueEntry]) -> Result<TeamSplit> {
    if entries.len() != 10 {
        return Err(CoordinatorError::OperationFailed(format!(
            "team solver needs exactly 10 players, got {}",
            entries.len()
        )));
    }
    solve(entries, Mode::Strict)
        .or_else(|| solve(entries, Mode::Autofill))
        .ok_or(CoordinatorError::NoTeamComposition)
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Strict,
    Autofill,
}

/// Strict eligibility for a slot, lower priority wins.
fn strict_priority(entry: &QueueEntry, role: Role) -> Option<u8> {
    match role {
        Role::Sniper => {
            if entry.classes.primary == WeaponClass::Sniper {
                Some(0)
            } else if entry.classes.secondary == WeaponClass::Sniper {
                Some(1)
            } else {
                None
            }
        }
        tier => {
            let native = tier.native_class();
            if entry.classes.primary == native {
                Some(0)
            } else if entry.classes.primary == WeaponClass::Smg {
                Some(1)
            } else {
                None
            }
        }
    }
}

/// Relaxed eligibility: everyone fits somewhere, worse fits cost more.
fn autofill_priority(entry: &QueueEntry, role: Role) -> u8 {
    let native = role.native_class();
    if entry.classes.primary == native {
        0
    } else if entry.classes.secondary == native {
        1
    } else if entry.classes.primary == WeaponClass::Smg {
        2
    } else if entry.classes.secondary == WeaponClass::Smg {
        3
    } else {
        4
    }
}

/// The class a player occupies on their team once placed in `role`.
fn effective_class(entry: &QueueEntry, role: Role) -> WeaponClass {
    if role == Role::Sniper {
        WeaponClass::Sniper
    } else if entry.classes.primary == WeaponClass::Smg {
        WeaponClass::Smg
    } else {
        entry.classes.primary
    }
}

fn class_bit(class: WeaponClass) -> u8 {
    match class {
        WeaponClass::T1 => 1,
        WeaponClass::T2 => 1 << 1,
        WeaponClass::T3 => 1 << 2,
        WeaponClass::T4 => 1 << 3,
        WeaponClass::Sniper => 1 << 4,
        WeaponClass::Smg => 1 << 5,
    }
}

// Backstop for degenerate inputs where everyone is eligible everywhere;
// the best split found inside the budget wins.
const NODE_BUDGET: usize = 100_000;

struct Search<'a> {
    entries: &'a [QueueEntry],
    mode: Mode,
    used: [bool; 10],
    class_sets: [u8; 2],
    mmr_sums: [i64; 2],
    remaining_mmr: i64,
    nodes: usize,
    current: Vec<SlotPlacement>,
    best: Option<TeamSplit>,
}

impl<'a> Search<'a> {
    /// Returns true when the search should stop (perfect split found or
    /// node budget exhausted).
    fn run(&mut self, slot: usize) -> bool {
        if slot == SLOTS.len() {
            let diff = (self.mmr_sums[0] - self.mmr_sums[1]).unsigned_abs() as i32;
            if self
                .best
                .as_ref()
                .map(|b| diff < b.mmr_diff)
                .unwrap_or(true)
            {
                self.best = Some(TeamSplit {
                    placements: self.current.clone(),
                    mmr_diff: diff,
                });
            }
            return diff == 0;
        }

        self.nodes += 1;
        if self.nodes > NODE_BUDGET {
            return true;
        }

        // The unplaced players bound how much the current imbalance can
        // still shrink; a subtree that cannot beat the best is dead.
        if let Some(best) = &self.best {
            let imbalance = (self.mmr_sums[0] - self.mmr_sums[1]).abs();
            let floor = imbalance - self.remaining_mmr;
            if floor >= best.mmr_diff as i64 {
                return false;
            }
        }

        let (team, role) = SLOTS[slot];
        let team_idx = match team {
            TeamSide::Alpha => 0,
            TeamSide::Bravo => 1,
        };

        let mut candidates: Vec<(u8, i64, i32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.used[*i])
            .filter_map(|(i, entry)| {
                let priority = match self.mode {
                    Mode::Strict => strict_priority(entry, role)?,
                    Mode::Autofill => autofill_priority(entry, role),
                };
                Some((priority, entry.queued_at, entry.mmr, i))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(b.2.cmp(&a.2)));

        for (priority, _, _, idx) in candidates {
            let entry = &self.entries[idx];
            let bit = class_bit(effective_class(entry, role));
            if self.mode == Mode::Strict && self.class_sets[team_idx] & bit != 0 {
                continue;
            }

            self.used[idx] = true;
            let prev_set = self.class_sets[team_idx];
            self.class_sets[team_idx] |= bit;
            self.mmr_sums[team_idx] += entry.mmr as i64;
            self.remaining_mmr -= entry.mmr as i64;
            self.current.push(SlotPlacement {
                entry_index: idx,
                team,
                role,
                priority,
                was_autofill: self.mode == Mode::Autofill && priority == 4,
            });

            let perfect = self.run(slot + 1);

            self.current.pop();
            self.mmr_sums[team_idx] -= entry.mmr as i64;
            self.remaining_mmr += entry.mmr as i64;
            self.class_sets[team_idx] = prev_set;
            self.used[idx] = false;

            if perfect {
                return true;
            }
        }

        false
    }
}

fn solve(entries: &[QueueEntry], mode: Mode) -> Option<TeamSplit> {
    let mut search = Search {
        entries,
        mode,
        used: [false; 10],
        class_sets: [0; 2],
        mmr_sums: [0; 2],
        remaining_mmr: entries.iter().map(|e| e.mmr as i64).sum(),
        nodes: 0,
        current: Vec::with_capacity(10),
        best: None,
    };
    search.run(0);
    search.best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{ClassProfile, PlayerId};

    fn entry(id: u64, primary: WeaponClass, secondary: WeaponClass, mmr: i32) -> QueueEntry {
        QueueEntry {
            player_id: PlayerId(id),
            display_name: format!("player-{id}"),
            mmr,
            classes: ClassProfile::new(primary, secondary),
            queued_at: id as i64,
            party_id: None,
        }
    }

    fn full_role_spread(mmr: i32) -> Vec<QueueEntry> {
        use WeaponClass::*;
        vec![
            entry(1, Sniper, T1, mmr),
            entry(2, Sniper, T2, mmr),
            entry(3, T1, T2, mmr),
            entry(4, T1, T3, mmr),
            entry(5, T2, T1, mmr),
            entry(6, T2, T4, mmr),
            entry(7, T3, T1, mmr),
            entry(8, T3, T2, mmr),
            entry(9, T4, T1, mmr),
            entry(10, T4, T3, mmr),
        ]
    }

    #[test]
    fn strict_solve_balances_even_cohort_perfectly() {
        let split = build_teams(&full_role_spread(1500)).unwrap();
        assert_eq!(split.mmr_diff, 0);
        assert_eq!(split.placements.len(), 10);
        assert!(split.placements.iter().all(|p| p.priority == 0));
        assert!(split.placements.iter().all(|p| !p.was_autofill));
    }

    #[test]
    fn each_team_carries_one_of_each_role() {
        let split = build_teams(&full_role_spread(1500)).unwrap();
        for side in [TeamSide::Alpha, TeamSide::Bravo] {
            let mut roles: Vec<Role> = split
                .placements
                .iter()
                .filter(|p| p.team == side)
                .map(|p| p.role)
                .collect();
            roles.sort_by_key(|r| format!("{r:?}"));
            assert_eq!(roles.len(), 5);
            for role in Role::ALL {
                assert_eq!(roles.iter().filter(|r| **r == role).count(), 1);
            }
        }
    }

    #[test]
    fn smg_players_flex_into_missing_tier_role() {
        use WeaponClass::*;
        // No primary T3 at all; the two SMGs must cover T3, one per team.
        let entries = vec![
            entry(1, Sniper, T1, 1500),
            entry(2, Sniper, T2, 1500),
            entry(3, T1, T2, 1500),
            entry(4, T1, T3, 1500),
            entry(5, T2, T1, 1500),
            entry(6, T2, T4, 1500),
            entry(7, Smg, T1, 1500),
            entry(8, Smg, T2, 1500),
            entry(9, T4, T1, 1500),
            entry(10, T4, T3, 1500),
        ];
        let split = build_teams(&entries).unwrap();

        let t3_fills: Vec<&SlotPlacement> = split
            .placements
            .iter()
            .filter(|p| p.role == Role::T3)
            .collect();
        assert_eq!(t3_fills.len(), 2);
        for placement in &t3_fills {
            assert!(matches!(placement.entry_index, 6 | 7));
            assert!(!placement.was_autofill);
        }
        assert_ne!(t3_fills[0].team, t3_fills[1].team);
    }

    #[test]
    fn strict_path_never_duplicates_effective_classes() {
        use WeaponClass::*;
        let entries = vec![
            entry(1, Sniper, T1, 1400),
            entry(2, Sniper, T2, 1600),
            entry(3, T1, T2, 1450),
            entry(4, T1, T3, 1550),
            entry(5, T2, T1, 1500),
            entry(6, T2, T4, 1500),
            entry(7, Smg, T1, 1480),
            entry(8, Smg, T2, 1520),
            entry(9, T4, T1, 1490),
            entry(10, T4, T3, 1510),
        ];
        let split = build_teams(&entries).unwrap();
        for side in [TeamSide::Alpha, TeamSide::Bravo] {
            let classes: Vec<WeaponClass> = split
                .placements
                .iter()
                .filter(|p| p.team == side)
                .map(|p| effective_class(&entries[p.entry_index], p.role))
                .collect();
            let mut dedup = classes.clone();
            dedup.sort_by_key(|c| format!("{c:?}"));
            dedup.dedup();
            assert_eq!(classes.len(), dedup.len(), "duplicate class on {side:?}");
        }
    }

    #[test]
    fn primary_sniper_never_takes_a_tier_slot_in_strict() {
        use WeaponClass::*;
        let entries = vec![
            entry(1, Sniper, T1, 1500),
            entry(2, Sniper, T2, 1500),
            entry(3, Sniper, T2, 1500),
            entry(4, T1, T3, 1500),
            entry(5, T2, T1, 1500),
            entry(6, T2, T4, 1500),
            entry(7, T3, T1, 1500),
            entry(8, T3, T2, 1500),
            entry(9, T4, T1, 1500),
            entry(10, T4, T3, 1500),
        ];
        // Three primary snipers but only two sniper slots: strict has no
        // composition (the second T1 slot is uncoverable), so the relaxed
        // pass places the surplus sniper on a tier slot via their secondary.
        let split = build_teams(&entries).unwrap();
        let sniper_fills: Vec<usize> = split
            .placements
            .iter()
            .filter(|p| p.role == Role::Sniper)
            .map(|p| p.entry_index)
            .collect();
        assert!(sniper_fills.iter().all(|i| *i <= 2));

        let leftover = split
            .placements
            .iter()
            .find(|p| p.entry_index <= 2 && p.role != Role::Sniper)
            .expect("surplus sniper placed on a tier slot");
        assert!(leftover.priority >= 1);
    }

    #[test]
    fn autofill_covers_hopeless_class_spreads() {
        use WeaponClass::*;
        let entries: Vec<QueueEntry> =
            (1..=10).map(|i| entry(i, Smg, Smg, 1500)).collect();
        let split = build_teams(&entries).unwrap();
        assert_eq!(split.placements.len(), 10);
        // SMGs flex tiers natively but nobody declares sniper; both sniper
        // slots are autofilled.
        let sniper_fills = split
            .placements
            .iter()
            .filter(|p| p.role == Role::Sniper)
            .count();
        assert_eq!(sniper_fills, 2);
    }

    #[test]
    fn solver_minimizes_mmr_imbalance() {
        use WeaponClass::*;
        let entries = vec![
            entry(1, Sniper, T1, 2000),
            entry(2, Sniper, T2, 1000),
            entry(3, T1, T2, 2000),
            entry(4, T1, T3, 1000),
            entry(5, T2, T1, 2000),
            entry(6, T2, T4, 1000),
            entry(7, T3, T1, 2000),
            entry(8, T3, T2, 1000),
            entry(9, T4, T1, 2000),
            entry(10, T4, T3, 1000),
        ];
        let split = build_teams(&entries).unwrap();
        assert_eq!(split.mmr_diff, 0);
    }

    #[test]
    fn rejects_wrong_cohort_size() {
        let entries = full_role_spread(1500)[..8].to_vec();
        assert!(build_teams(&entries).is_err());
    }
}
