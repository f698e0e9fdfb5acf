//! Offense tracking: escalating decline and abandon cooldowns over rolling
//! 24-hour counters, plus the short host-failure cooldown. Decline and
//! abandon counters are deliberately separate keys.

use crate::error::Result;
use crate::player::PlayerId;
use crate::store::{keys, StateStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// A cooldown that was just applied to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownGrant {
    pub seconds: u64,
    pub ends_at: i64,
}

pub struct PenaltyTracker {
    store: Arc<dyn StateStore>,
}

impl PenaltyTracker {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Escalation for ready-check declines. The first offense in the
    /// window is free; offenses 2/3/4/5+ map to 5/15/30/60 minutes.
    pub async fn record_decline(&self, player: PlayerId) -> Result<Option<CooldownGrant>> {
        let count = self
            .store
            .incr(&keys::decline_count(player), Some(keys::OFFENSE_COUNTER_TTL))
            .await?;

        let minutes = match count {
            0 | 1 => return Ok(None),
            2 => 5,
            3 => 15,
            4 => 30,
            _ => 60,
        };
        self.apply_cooldown(player, Duration::from_secs(minutes * 60))
            .await
            .map(Some)
    }

    /// Escalation for lobby abandons: 30 min / 2 h / 24 h for offenses
    /// 1/2/3+ in the window. Every abandon is penalized.
    pub async fn record_abandon(&self, player: PlayerId) -> Result<CooldownGrant> {
        let count = self
            .store
            .incr(&keys::abandon_count(player), Some(keys::OFFENSE_COUNTER_TTL))
            .await?;

        let minutes = match count {
            0 | 1 => 30,
            2 => 120,
            _ => 1440,
        };
        self.apply_cooldown(player, Duration::from_secs(minutes * 60))
            .await
    }

    async fn apply_cooldown(&self, player: PlayerId, duration: Duration) -> Result<CooldownGrant> {
        let ends_at = Utc::now().timestamp_millis() + duration.as_millis() as i64;
        self.store
            .set(&keys::cooldown(player), &ends_at.to_string(), Some(duration))
            .await?;
        Ok(CooldownGrant {
            seconds: duration.as_secs(),
            ends_at,
        })
    }

    /// Queue-blocking cooldown, if one is still running.
    pub async fn active_cooldown(&self, player: PlayerId) -> Result<Option<i64>> {
        let raw = match self.store.get(&keys::cooldown(player)).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let ends_at: i64 = raw.parse().unwrap_or(0);
        if ends_at > Utc::now().timestamp_millis() {
            Ok(Some(ends_at))
        } else {
            Ok(None)
        }
    }

    /// Five-minute host cooldown after a failed or timed-out host attempt.
    pub async fn record_host_failure(&self, player: PlayerId, reason: &str) -> Result<()> {
        self.store
            .set(
                &keys::host_cooldown(player),
                reason,
                Some(keys::HOST_COOLDOWN_TTL),
            )
            .await
    }

    pub async fn host_cooldown_active(&self, player: PlayerId) -> Result<bool> {
        self.store.exists(&keys::host_cooldown(player)).await
    }
}
