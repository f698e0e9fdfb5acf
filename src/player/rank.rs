use serde::{Deserialize, Serialize};

/// The 17-step ranked ladder, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankTier {
    Bronze1,
    Bronze2,
    Bronze3,
    Silver1,
    Silver2,
    Silver3,
    Gold1,
    Gold2,
    Gold3,
    Platinum1,
    Platinum2,
    Platinum3,
    Diamond1,
    Diamond2,
    Diamond3,
    Master,
    Grandmaster,
}

impl RankTier {
    pub const ALL: [RankTier; 17] = [
        RankTier::Bronze1,
        RankTier::Bronze2,
        RankTier::Bronze3,
        RankTier::Silver1,
        RankTier::Silver2,
        RankTier::Silver3,
        RankTier::Gold1,
        RankTier::Gold2,
        RankTier::Gold3,
        RankTier::Platinum1,
        RankTier::Platinum2,
        RankTier::Platinum3,
        RankTier::Diamond1,
        RankTier::Diamond2,
        RankTier::Diamond3,
        RankTier::Master,
        RankTier::Grandmaster,
    ];

    pub fn next(&self) -> Option<RankTier> {
        let idx = Self::ALL.iter().position(|t| t == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    pub fn previous(&self) -> Option<RankTier> {
        let idx = Self::ALL.iter().position(|t| t == self)?;
        idx.checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Points are capped at 100 everywhere except the top tier.
    pub fn is_top(&self) -> bool {
        matches!(self, RankTier::Grandmaster)
    }
}

/// A player's position on the ladder: tier plus points within the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRank {
    pub tier: RankTier,
    pub points: i32,
}

impl PlayerRank {
    pub fn new(tier: RankTier, points: i32) -> Self {
        Self { tier, points }
    }

    /// Apply a point delta, promoting/demoting across tier boundaries.
    /// Points never go below zero at the bottom of the ladder.
    pub fn apply(&self, delta: i32) -> PlayerRank {
        let mut tier = self.tier;
        let mut points = self.points + delta;

        while points >= 100 && !tier.is_top() {
            match tier.next() {
                Some(next) => {
                    tier = next;
                    points -= 100;
                }
                None => break,
            }
        }
        while points < 0 {
            match tier.previous() {
                Some(prev) => {
                    tier = prev;
                    points += 100;
                }
                None => {
                    points = 0;
                    break;
                }
            }
        }

        PlayerRank { tier, points }
    }
}

impl Default for PlayerRank {
    fn default() -> Self {
        Self {
            tier: RankTier::Silver1,
            points: 0,
        }
    }
}

/// Match outcome from a single player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win,
    Loss,
}

impl MatchOutcome {
    pub fn score(&self) -> f64 {
        match self {
            MatchOutcome::Win => 1.0,
            MatchOutcome::Loss => 0.0,
        }
    }
}

/// Settlement output for one player: the MMR delta and the resulting
/// ladder position. Produced by a [`RankFunction`], consumed verbatim by
/// the validation engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankAdjustment {
    pub mmr_change: i32,
    pub new_rank: PlayerRank,
}

/// The rank formula as a pure function. The pipeline never inspects the
/// arithmetic; it only persists the adjustment.
pub trait RankFunction: Send + Sync {
    fn adjust(
        &self,
        mmr: i32,
        rank: PlayerRank,
        opponent_avg_mmr: i32,
        outcome: MatchOutcome,
    ) -> RankAdjustment;

    fn name(&self) -> &str;
}

/// Elo-style default: expected score against the opposing team average,
/// scaled by a fixed K factor.
pub struct EloRankFunction {
    k_factor: f64,
}

impl EloRankFunction {
    pub fn new(k_factor: f64) -> Self {
        Self { k_factor }
    }

    fn expected_score(&self, rating_a: f64, rating_b: f64) -> f64 {
        1.0 / (1.0 + 10_f64.powf((rating_b - rating_a) / 400.0))
    }
}

impl Default for EloRankFunction {
    fn default() -> Self {
        Self { k_factor: 32.0 }
    }
}

impl RankFunction for EloRankFunction {
    fn adjust(
        &self,
        mmr: i32,
        rank: PlayerRank,
        opponent_avg_mmr: i32,
        outcome: MatchOutcome,
    ) -> RankAdjustment {
        let expected = self.expected_score(mmr as f64, opponent_avg_mmr as f64);
        let delta = (self.k_factor * (outcome.score() - expected)).round() as i32;

        RankAdjustment {
            mmr_change: delta,
            new_rank: rank.apply(delta),
        }
    }

    fn name(&self) -> &str {
        "Elo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ladder_has_seventeen_ordered_steps() {
        assert_eq!(RankTier::ALL.len(), 17);
        for pair in RankTier::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn points_promote_across_tier_boundary() {
        let rank = PlayerRank::new(RankTier::Gold3, 90);
        let after = rank.apply(25);
        assert_eq!(after.tier, RankTier::Platinum1);
        assert_eq!(after.points, 15);
    }

    #[test]
    fn points_demote_and_floor_at_ladder_bottom() {
        let rank = PlayerRank::new(RankTier::Bronze1, 10);
        let after = rank.apply(-40);
        assert_eq!(after.tier, RankTier::Bronze1);
        assert_eq!(after.points, 0);
    }

    #[test]
    fn top_tier_points_are_unbounded() {
        let rank = PlayerRank::new(RankTier::Grandmaster, 250);
        let after = rank.apply(60);
        assert_eq!(after.tier, RankTier::Grandmaster);
        assert_eq!(after.points, 310);
    }

    #[test]
    fn elo_winner_gains_and_loser_loses() {
        let f = EloRankFunction::default();
        let win = f.adjust(1500, PlayerRank::default(), 1500, MatchOutcome::Win);
        let loss = f.adjust(1500, PlayerRank::default(), 1500, MatchOutcome::Loss);
        assert!(win.mmr_change > 0);
        assert!(loss.mmr_change < 0);
    }
}
