//! Well-known key patterns for the coordination keyspace. Every key the
//! pipeline touches is minted here; no format strings elsewhere.

use crate::player::PlayerId;
use std::time::Duration;

pub const QUEUE_ENTRY_TTL: Duration = Duration::from_secs(3600);
pub const REQUEUE_HINT_TTL: Duration = Duration::from_secs(600);
pub const HOST_COOLDOWN_TTL: Duration = Duration::from_secs(300);
pub const OFFENSE_COUNTER_TTL: Duration = Duration::from_secs(86400);
pub const MATCH_KEY_TTL: Duration = Duration::from_secs(7200);
pub const READY_HASH_TTL: Duration = Duration::from_secs(120);
pub const HOST_ATTEMPT_TTL: Duration = Duration::from_secs(300);
pub const LOBBY_TEMP_TTL: Duration = Duration::from_secs(300);
pub const MATCH_COUNTER_TTL: Duration = Duration::from_secs(86400);

pub fn queue_entry(player: PlayerId) -> String {
    format!("queue:ranked:{player}")
}

pub fn requeue_hint(player: PlayerId) -> String {
    format!("requeue:ranked:{player}")
}

pub fn cooldown(player: PlayerId) -> String {
    format!("cooldown:{player}")
}

pub fn host_cooldown(player: PlayerId) -> String {
    format!("cooldown:host:{player}")
}

pub fn decline_count(player: PlayerId) -> String {
    format!("decline:count:{player}")
}

pub fn abandon_count(player: PlayerId) -> String {
    format!("abandon:count:{player}")
}

pub fn match_status(match_id: &str) -> String {
    format!("match:{match_id}:status")
}

pub fn match_ready(match_id: &str) -> String {
    format!("match:{match_id}:ready")
}

pub fn match_classes(match_id: &str) -> String {
    format!("match:{match_id}:classes")
}

pub fn match_queue_snapshot(match_id: &str) -> String {
    format!("match:{match_id}:queueSnapshot")
}

pub fn match_host(match_id: &str) -> String {
    format!("match:{match_id}:host")
}

pub fn match_host_password(match_id: &str) -> String {
    format!("match:{match_id}:hostPassword")
}

pub fn match_room(match_id: &str) -> String {
    format!("match:{match_id}:room")
}

pub fn match_all(match_id: &str) -> String {
    format!("match:{match_id}:*")
}

pub fn lobby_temp(match_id: &str) -> String {
    format!("lobby:temp:{match_id}")
}

pub fn lobby_state(match_id: &str) -> String {
    format!("lobby:{match_id}:state")
}

pub fn lobby_vetos(match_id: &str) -> String {
    format!("lobby:{match_id}:vetos")
}

pub fn lobby_selected_map(match_id: &str) -> String {
    format!("lobby:{match_id}:selectedMap")
}

pub fn lobby_all(match_id: &str) -> String {
    format!("lobby:{match_id}:*")
}

pub fn match_counter() -> String {
    "match:counter".to_string()
}
