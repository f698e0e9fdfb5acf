use serde::{Deserialize, Serialize};

/// Dynamic MMR window: the ± range around a reference player used to
/// gather a matchmaking pool. Starts narrow for strong players and grows
/// stepwise with wait time, capped at `max`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowPolicy {
    pub max: i32,
    pub step_ms: i64,
    pub low_base: i32,
    pub low_growth: i32,
    pub mid_base: i32,
    pub mid_growth: i32,
    pub high_base: i32,
    pub high_growth: i32,
    pub mid_threshold: i32,
    pub high_threshold: i32,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            max: 500,
            step_ms: 30_000,
            low_base: 150,
            low_growth: 60,
            mid_base: 100,
            mid_growth: 40,
            high_base: 50,
            high_growth: 25,
            mid_threshold: 1400,
            high_threshold: 2000,
        }
    }
}

impl WindowPolicy {
    pub fn window(&self, mmr: i32, wait_ms: i64) -> i32 {
        let (base, growth) = if mmr >= self.high_threshold {
            (self.high_base, self.high_growth)
        } else if mmr >= self.mid_threshold {
            (self.mid_base, self.mid_growth)
        } else {
            (self.low_base, self.low_growth)
        };
        let steps = (wait_ms / self.step_ms) as i32;
        (base + steps.saturating_mul(growth)).min(self.max)
    }
}
