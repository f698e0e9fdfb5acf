use crate::player::{ClassProfile, PlayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player's entry in the ranked queue. At most one per player; party
/// members share a `queued_at` so they move through FIFO together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub display_name: String,
    pub mmr: i32,
    pub classes: ClassProfile,
    /// Epoch milliseconds; FIFO reference and requeue priority.
    pub queued_at: i64,
    pub party_id: Option<Uuid>,
}

impl QueueEntry {
    pub fn wait_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.queued_at).max(0)
    }
}

/// TTL'd note letting a player re-enter the queue with their original
/// priority after a pre-game failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequeueHint {
    pub queued_at: i64,
    pub classes: ClassProfile,
}
