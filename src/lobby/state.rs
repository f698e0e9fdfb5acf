use serde::{Deserialize, Serialize};

/// Lobby lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyPhase {
    /// Teams are alternating map vetoes
    Vetoing,
    /// One map remains; host selection is next
    MapSelected,
    /// Waiting for the chosen host to open the room
    HostSelecting,
    /// Room confirmed, match is live
    InProgress,
    /// Lobby closed (settled or cancelled)
    Closed,
}

impl LobbyPhase {
    pub fn can_transition_to(&self, new_phase: LobbyPhase) -> bool {
        use LobbyPhase::*;
        matches!(
            (self, new_phase),
            (Vetoing, MapSelected)
                | (MapSelected, HostSelecting)
                | (HostSelecting, InProgress)
                | (_, Closed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LobbyPhase::Vetoing => "VETOING",
            LobbyPhase::MapSelected => "MAP_SELECTED",
            LobbyPhase::HostSelecting => "HOST_SELECTING",
            LobbyPhase::InProgress => "IN_PROGRESS",
            LobbyPhase::Closed => "CLOSED",
        }
    }
}
