//! Alternating map veto. ALPHA vetoes first; on turn expiry the engine
//! vetoes the lexicographically-first remaining map on that team's behalf.

use super::maps::{MapInfo, MapPool};
use crate::error::{CoordinatorError, Result};
use crate::player::TeamSide;
use crate::session::messages::VetoReason;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VetoRecord {
    pub team: TeamSide,
    pub map_id: String,
    pub reason: VetoReason,
    pub at: i64,
}

/// What a single veto did to the pool.
#[derive(Debug, Clone)]
pub enum VetoOutcome {
    Continue {
        vetoed: MapInfo,
        next_turn: TeamSide,
    },
    Selected {
        vetoed: MapInfo,
        selected: MapInfo,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetoState {
    remaining: Vec<MapInfo>,
    history: Vec<VetoRecord>,
    current_turn: TeamSide,
    selected: Option<MapInfo>,
}

impl VetoState {
    pub fn new(pool: &MapPool) -> Self {
        Self {
            remaining: pool.maps().to_vec(),
            history: Vec::new(),
            current_turn: TeamSide::Alpha,
            selected: None,
        }
    }

    pub fn current_turn(&self) -> TeamSide {
        self.current_turn
    }

    pub fn remaining_ids(&self) -> Vec<String> {
        self.remaining.iter().map(|m| m.map_id.clone()).collect()
    }

    pub fn vetoed_ids(&self) -> Vec<String> {
        self.history.iter().map(|r| r.map_id.clone()).collect()
    }

    pub fn history(&self) -> &[VetoRecord] {
        &self.history
    }

    pub fn selected(&self) -> Option<&MapInfo> {
        self.selected.as_ref()
    }

    /// Apply a team's veto for one remaining map.
    pub fn apply(&mut self, team: TeamSide, map_id: &str) -> Result<VetoOutcome> {
        if self.selected.is_some() {
            return Err(CoordinatorError::InvalidTransition(
                "veto after map selection".to_string(),
            ));
        }
        if team != self.current_turn {
            return Err(CoordinatorError::NotYourTurn);
        }
        let idx = self
            .remaining
            .iter()
            .position(|m| m.map_id == map_id)
            .ok_or_else(|| CoordinatorError::MapNotAvailable(map_id.to_string()))?;
        Ok(self.veto_at(idx, VetoReason::Chosen))
    }

    /// Turn expiry: veto the lexicographically-first remaining map on the
    /// current team's behalf.
    pub fn timeout(&mut self) -> Result<VetoOutcome> {
        if self.selected.is_some() {
            return Err(CoordinatorError::InvalidTransition(
                "veto after map selection".to_string(),
            ));
        }
        let idx = self
            .remaining
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.map_id.cmp(&b.map_id))
            .map(|(i, _)| i)
            .ok_or_else(|| CoordinatorError::InvalidTransition("empty veto pool".to_string()))?;
        Ok(self.veto_at(idx, VetoReason::Timeout))
    }

    fn veto_at(&mut self, idx: usize, reason: VetoReason) -> VetoOutcome {
        let vetoed = self.remaining.remove(idx);
        self.history.push(VetoRecord {
            team: self.current_turn,
            map_id: vetoed.map_id.clone(),
            reason,
            at: Utc::now().timestamp_millis(),
        });

        if self.remaining.len() == 1 {
            let selected = self.remaining[0].clone();
            self.selected = Some(selected.clone());
            VetoOutcome::Selected { vetoed, selected }
        } else {
            self.current_turn = self.current_turn.opposite();
            VetoOutcome::Continue {
                vetoed,
                next_turn: self.current_turn,
            }
        }
    }
}
