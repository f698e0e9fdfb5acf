use crate::lobby::MapPool;
use crate::queue::QueueEngineConfig;
use crate::validation::ValidationConfig;
use std::time::Duration;

/// Every timing constant of the pipeline in one place.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub queue: QueueEngineConfig,
    pub validation: ValidationConfig,
    /// Ready-check consensus window.
    pub ready_timeout: Duration,
    /// Per-team veto turn timer.
    pub veto_turn_timeout: Duration,
    /// Window for the chosen host to open the room.
    pub host_timeout: Duration,
    /// Cadence of the stale-transport sweep.
    pub heartbeat_interval: Duration,
    pub map_pool: MapPool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            queue: QueueEngineConfig::default(),
            validation: ValidationConfig::default(),
            ready_timeout: Duration::from_secs(20),
            veto_turn_timeout: Duration::from_secs(30),
            host_timeout: Duration::from_secs(120),
            heartbeat_interval: Duration::from_secs(30),
            map_pool: MapPool::standard(),
        }
    }
}

impl CoordinatorConfig {
    /// Short timings for tests: full pipeline runs in well under a second
    /// when every participant responds promptly.
    pub fn fast() -> Self {
        Self {
            queue: QueueEngineConfig::fast(),
            validation: ValidationConfig::fast(),
            ready_timeout: Duration::from_secs(5),
            veto_turn_timeout: Duration::from_secs(5),
            host_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_millis(200),
            map_pool: MapPool::standard(),
        }
    }
}
