//! Inbound edge: binds authenticated identities to transports and
//! translates wire messages into queue and pipeline calls. Identity comes
//! from the bound connection, never from message payloads.

use super::auth::Authenticator;
use super::messages::{ClientMessage, ServerMessage};
use super::registry::{ConnectionRegistry, Outbound};
use super::transport::Transport;
use crate::error::{CoordinatorError, Result};
use crate::persistence::MatchStore;
use crate::pipeline::{Coordinator, MatchEvent};
use crate::player::{ClassProfile, Player, PlayerId};
use std::sync::Arc;

const DEFAULT_MMR: i32 = 1500;

pub struct SessionRouter {
    coordinator: Arc<Coordinator>,
    registry: Arc<ConnectionRegistry>,
    matches: Arc<dyn MatchStore>,
    auth: Arc<dyn Authenticator>,
}

impl SessionRouter {
    pub fn new(
        coordinator: Arc<Coordinator>,
        registry: Arc<ConnectionRegistry>,
        matches: Arc<dyn MatchStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            matches,
            auth,
        }
    }

    /// AUTH: validate the token, create the player row on first connect,
    /// and bind the transport. Failure messages go straight out on the
    /// not-yet-bound transport.
    pub async fn authenticate(
        &self,
        oid_user: u64,
        token: &str,
        discord_id: Option<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<PlayerId> {
        let player_id = PlayerId(oid_user);

        let outcome = self
            .authenticate_inner(player_id, token, discord_id, transport.clone())
            .await;
        match &outcome {
            Ok(player) => {
                let _ = transport
                    .deliver(&ServerMessage::AuthSuccess {
                        player_id: player.id,
                        display_name: player.display_name.clone(),
                        mmr: player.mmr,
                        rank_tier: player.rank.tier,
                        rank_points: player.rank.points,
                    })
                    .await;
            }
            Err(e) => {
                let _ = transport
                    .deliver(&ServerMessage::AuthFailed {
                        reason: e.reason_code().to_string(),
                    })
                    .await;
            }
        }
        outcome.map(|p| p.id)
    }

    async fn authenticate_inner(
        &self,
        player_id: PlayerId,
        token: &str,
        discord_id: Option<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<Player> {
        self.auth.validate(player_id.0, token).await?;

        let player = match self.matches.find_player(player_id).await? {
            Some(mut player) => {
                if player.social_id.is_none() && discord_id.is_some() {
                    player.social_id = discord_id;
                    self.matches.upsert_player(&player).await?;
                }
                player
            }
            None => {
                let mut player =
                    Player::new(player_id, format!("Player{}", player_id.0), DEFAULT_MMR);
                player.social_id = discord_id;
                self.matches.upsert_player(&player).await?;
                tracing::info!(player = %player_id, "player created on first connect");
                player
            }
        };

        self.registry.bind(player_id, transport).await?;
        Ok(player)
    }

    /// Route one message from an authenticated player.
    pub async fn handle(&self, player: PlayerId, message: ClientMessage) {
        self.registry.touch(player).await;
        if let Err(e) = self.handle_inner(player, message).await {
            match e.kind() {
                crate::error::ErrorKind::Validation => {
                    tracing::debug!(player = %player, error = %e, "request refused");
                }
                _ => {
                    tracing::warn!(player = %player, error = %e, "request failed");
                }
            }
        }
    }

    async fn handle_inner(&self, player: PlayerId, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::Auth { .. } => {
                // Re-auth on a bound connection is a no-op.
                Ok(())
            }
            ClientMessage::QueueJoin { classes } => {
                let classes = classes.map(|c| ClassProfile::new(c.primary, c.secondary));
                match self.coordinator.queue_join(player, classes).await {
                    Ok((entry, queue_size)) => {
                        self.registry
                            .send_to(
                                player,
                                ServerMessage::QueueJoined {
                                    queue_size,
                                    queued_at: entry.queued_at,
                                },
                            )
                            .await;
                        Ok(())
                    }
                    Err(e) => {
                        let (ends_at, existing_account) = match &e {
                            CoordinatorError::CooldownActive { ends_at } => (Some(*ends_at), None),
                            CoordinatorError::Banned { until } => (Some(*until), None),
                            CoordinatorError::DuplicateSocialId { existing_account } => {
                                (None, Some(*existing_account))
                            }
                            _ => (None, None),
                        };
                        self.registry
                            .send_to(
                                player,
                                ServerMessage::QueueFailed {
                                    reason: e.reason_code().to_string(),
                                    ends_at,
                                    existing_account,
                                },
                            )
                            .await;
                        Ok(())
                    }
                }
            }
            ClientMessage::QueueLeave => {
                self.coordinator.queue_leave(player).await?;
                self.registry.send_to(player, ServerMessage::QueueLeft).await;
                Ok(())
            }
            ClientMessage::ReadyAccept { match_id } => {
                self.coordinator
                    .dispatch(&match_id, player, MatchEvent::ReadyAccept(player))
                    .await
            }
            ClientMessage::ReadyDecline { match_id } => {
                self.coordinator
                    .dispatch(&match_id, player, MatchEvent::ReadyDecline(player))
                    .await
            }
            ClientMessage::MapVeto { match_id, map_id } => {
                self.coordinator
                    .dispatch(&match_id, player, MatchEvent::Veto { player, map_id })
                    .await
            }
            ClientMessage::LobbyRequestSwap { match_id, to } => {
                self.coordinator
                    .dispatch(&match_id, player, MatchEvent::SwapRequest { from: player, to })
                    .await
            }
            ClientMessage::LobbyAcceptSwap {
                match_id,
                request_id,
            } => {
                self.coordinator
                    .dispatch(
                        &match_id,
                        player,
                        MatchEvent::SwapAccept { player, request_id },
                    )
                    .await
            }
            ClientMessage::HostRoomCreated {
                match_id,
                room_id,
                map_number,
            } => {
                self.coordinator
                    .dispatch(
                        &match_id,
                        player,
                        MatchEvent::HostRoomCreated {
                            player,
                            room_id,
                            map_number,
                        },
                    )
                    .await
            }
            ClientMessage::HostFailed { match_id, reason } => {
                self.coordinator
                    .dispatch(&match_id, player, MatchEvent::HostFailed { player, reason })
                    .await
            }
            ClientMessage::LobbyAbandon { match_id } => {
                self.coordinator
                    .dispatch(&match_id, player, MatchEvent::Abandon(player))
                    .await
            }
            ClientMessage::ChatSend {
                match_id,
                channel,
                message,
            } => {
                self.coordinator
                    .dispatch(
                        &match_id,
                        player,
                        MatchEvent::Chat {
                            from: player,
                            channel,
                            message,
                        },
                    )
                    .await
            }
        }
    }

    /// Transport closed: run the disconnect cascade.
    pub async fn disconnected(&self, player: PlayerId) {
        tracing::info!(player = %player, "player disconnected");
        self.coordinator.disconnect(player).await;
    }
}
