use crate::player::PlayerId;
use crate::session::ChatChannel;
use uuid::Uuid;

/// Typed events a match actor receives over its bounded channel. The
/// session router stamps the authenticated sender; payload identities are
/// never trusted.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    ReadyAccept(PlayerId),
    ReadyDecline(PlayerId),
    Veto {
        player: PlayerId,
        map_id: String,
    },
    SwapRequest {
        from: PlayerId,
        to: PlayerId,
    },
    SwapAccept {
        player: PlayerId,
        request_id: Uuid,
    },
    Chat {
        from: PlayerId,
        channel: ChatChannel,
        message: String,
    },
    HostRoomCreated {
        player: PlayerId,
        room_id: String,
        map_number: u32,
    },
    HostFailed {
        player: PlayerId,
        reason: String,
    },
    Abandon(PlayerId),
    Disconnected(PlayerId),
}
