use crate::error::{CoordinatorError, Result};
use crate::player::PlayerId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A pending intra-team role swap offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub id: Uuid,
    pub from: PlayerId,
    pub to: PlayerId,
    pub requested_at: i64,
}

/// Pending swap offers for one lobby. A player has at most one
/// outstanding offer; a newer request replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwapBook {
    pending: HashMap<Uuid, SwapRequest>,
}

impl SwapBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, from: PlayerId, to: PlayerId) -> SwapRequest {
        self.pending.retain(|_, r| r.from != from);
        let request = SwapRequest {
            id: Uuid::new_v4(),
            from,
            to,
            requested_at: Utc::now().timestamp_millis(),
        };
        self.pending.insert(request.id, request.clone());
        request
    }

    /// Accept an offer. Only the addressed player may accept.
    pub fn accept(&mut self, request_id: Uuid, by: PlayerId) -> Result<SwapRequest> {
        let addressed = self
            .pending
            .get(&request_id)
            .map(|r| r.to == by)
            .unwrap_or(false);
        if !addressed {
            return Err(CoordinatorError::SwapNotFound);
        }
        self.pending
            .remove(&request_id)
            .ok_or(CoordinatorError::SwapNotFound)
    }

    /// Drop every offer involving a player (on swap completion or leave).
    pub fn clear_for(&mut self, player: PlayerId) {
        self.pending.retain(|_, r| r.from != player && r.to != player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_addressee_can_accept() {
        let mut book = SwapBook::new();
        let request = book.request(PlayerId(1), PlayerId(2));

        assert!(book.accept(request.id, PlayerId(3)).is_err());
        let accepted = book.accept(request.id, PlayerId(2)).unwrap();
        assert_eq!(accepted.from, PlayerId(1));
        // Consumed.
        assert!(book.accept(request.id, PlayerId(2)).is_err());
    }

    #[test]
    fn newer_request_replaces_previous_offer() {
        let mut book = SwapBook::new();
        let first = book.request(PlayerId(1), PlayerId(2));
        let second = book.request(PlayerId(1), PlayerId(3));

        assert!(book.accept(first.id, PlayerId(2)).is_err());
        assert!(book.accept(second.id, PlayerId(3)).is_ok());
    }
}
