//! Wire message types. Tagged serialization keeps the external format
//! stable (SCREAMING_SNAKE_CASE types, camelCase fields) while the rest of
//! the crate works with the typed enums.

use crate::player::{PlayerId, RankTier, Role, TeamSide, WeaponClass};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatChannel {
    Team,
    General,
}

/// Declared classes as they arrive on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireClasses {
    pub primary: WeaponClass,
    pub secondary: WeaponClass,
}

/// Messages a connected client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Auth {
        oid_user: u64,
        token: String,
        discord_id: Option<String>,
    },
    QueueJoin {
        classes: Option<WireClasses>,
    },
    QueueLeave,
    ReadyAccept {
        match_id: String,
    },
    ReadyDecline {
        match_id: String,
    },
    MapVeto {
        match_id: String,
        map_id: String,
    },
    LobbyRequestSwap {
        match_id: String,
        to: PlayerId,
    },
    LobbyAcceptSwap {
        match_id: String,
        request_id: Uuid,
    },
    HostRoomCreated {
        match_id: String,
        room_id: String,
        map_number: u32,
    },
    HostFailed {
        match_id: String,
        reason: String,
    },
    LobbyAbandon {
        match_id: String,
    },
    ChatSend {
        match_id: String,
        channel: ChatChannel,
        message: String,
    },
}

/// A player's row in a lobby view. Opponent names arrive pre-anonymized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayerView {
    pub player_id: PlayerId,
    pub display_name: String,
    pub role: Role,
    pub mmr: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    pub match_id: String,
    pub phase: String,
    pub team: TeamSide,
    pub teammates: Vec<LobbyPlayerView>,
    pub opponents: Vec<LobbyPlayerView>,
    pub remaining_maps: Vec<String>,
    pub vetoed_maps: Vec<String>,
    pub current_turn: TeamSide,
    pub selected_map: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VetoReason {
    Chosen,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEndedPlayer {
    pub player_id: PlayerId,
    pub team: TeamSide,
    pub mmr_change: i32,
    pub abandoned: bool,
}

/// Messages the coordinator pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    AuthSuccess {
        player_id: PlayerId,
        display_name: String,
        mmr: i32,
        rank_tier: RankTier,
        rank_points: i32,
    },
    AuthFailed {
        reason: String,
    },
    QueueJoined {
        queue_size: usize,
        queued_at: i64,
    },
    QueueFailed {
        reason: String,
        ends_at: Option<i64>,
        existing_account: Option<PlayerId>,
    },
    QueueLeft,
    MatchFound {
        match_id: String,
        team: TeamSide,
        role: Role,
        ready_seconds: u64,
    },
    ReadyAccepted {
        match_id: String,
    },
    ReadyUpdate {
        match_id: String,
        ready: usize,
        total: usize,
    },
    ReadyDeclined {
        match_id: String,
    },
    ReadyCheckFailed {
        match_id: String,
        declined_by: Option<PlayerId>,
        reason: String,
    },
    CooldownSet {
        seconds: u64,
        ends_at: i64,
    },
    Requeue {
        queued_at: i64,
    },
    LobbyReady {
        match_id: String,
        redirect_to: String,
    },
    LobbyData(LobbyView),
    VetoUpdate {
        match_id: String,
        map_id: String,
        by_team: TeamSide,
        reason: VetoReason,
        remaining: Vec<String>,
    },
    TurnChange {
        match_id: String,
        current_turn: TeamSide,
        seconds: u64,
    },
    MapSelected {
        match_id: String,
        map_id: String,
        map_number: u32,
    },
    LobbySwapRequested {
        match_id: String,
        request_id: Uuid,
        from: PlayerId,
        offered_role: Role,
    },
    LobbySwapCompleted {
        match_id: String,
        first: PlayerId,
        second: PlayerId,
    },
    HostSelected {
        match_id: String,
        room_id: String,
        password: String,
        map_number: u32,
    },
    HostWaiting {
        match_id: String,
        host: PlayerId,
    },
    HostConfirmed {
        match_id: String,
        room_id: String,
        map_number: u32,
    },
    HostFailed {
        match_id: String,
        reason: String,
    },
    ChatMessage {
        match_id: String,
        channel: ChatChannel,
        from: String,
        message: String,
        sent_at: i64,
    },
    MatchEnded {
        match_id: String,
        winner: TeamSide,
        players: Vec<MatchEndedPlayer>,
    },
    MatchCancelled {
        match_id: String,
        reason: String,
    },
    MatchInvalid {
        match_id: String,
        reason: String,
    },
    ServerShutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_stable_wire_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"QUEUE_JOIN","classes":null}"#).unwrap();
        assert!(matches!(msg, ClientMessage::QueueJoin { classes: None }));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"READY_ACCEPT","matchId":"42"}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMessage::ReadyAccept { match_id } if match_id == "42"));
    }

    #[test]
    fn server_messages_render_camel_case_fields() {
        let json = serde_json::to_string(&ServerMessage::QueueJoined {
            queue_size: 3,
            queued_at: 1234,
        })
        .unwrap();
        assert!(json.contains(r#""type":"QUEUE_JOINED""#));
        assert!(json.contains(r#""queueSize":3"#));
        assert!(json.contains(r#""queuedAt":1234"#));
    }

    #[test]
    fn enum_payloads_keep_wire_casing() {
        let json = serde_json::to_string(&ServerMessage::MatchFound {
            match_id: "7".into(),
            team: TeamSide::Alpha,
            role: Role::Sniper,
            ready_seconds: 20,
        })
        .unwrap();
        assert!(json.contains(r#""team":"ALPHA""#));
        assert!(json.contains(r#""role":"SNIPER""#));
    }
}
