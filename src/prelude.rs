//! Prelude module with commonly used types and traits
//!
//! Import this module to get all the essential types for running the
//! coordinator:
//!
//! ```rust
//! use strikeforge::prelude::*;
//! ```

pub use crate::{
    error::{CoordinatorError, ErrorKind, Result},
    host::{HostAttempt, HostSelector},
    lobby::{Lobby, LobbyPhase, MapInfo, MapPool, SwapBook, VetoOutcome, VetoState},
    penalty::{CooldownGrant, PenaltyTracker},
    persistence::{
        InMemoryLogSource, InMemoryMatchStore, LogQuery, MatchLogRow, MatchLogSource, MatchRecord,
        MatchRecordStatus, MatchStore, PlayerResultRow, PlayerStatsRow,
    },
    pipeline::{Coordinator, CoordinatorConfig, MatchEvent},
    player::{
        ClassProfile, EloRankFunction, MatchOutcome, Player, PlayerId, PlayerRank, RankAdjustment,
        RankFunction, RankTier, Role, TeamSide, WeaponClass,
    },
    queue::{QueueEngine, QueueEngineConfig, QueueEntry, RequeueHint, WindowPolicy},
    ready::{ReadyCheck, ReadyProgress},
    session::{
        AllowAllAuthenticator, Authenticator, ChannelTransport, ChatChannel, ClientMessage,
        ConnectionRegistry, JwtAuthenticator, LobbyView, Outbound, ServerMessage, SessionRouter,
        Transport,
    },
    store::{InMemoryStore, StateStore, StoreBatch},
    team::{build_teams, Cohort, CohortPlayer, TeamSplit},
    validation::{
        validate_teams, Classification, MatchVerdict, ValidationConfig, ValidationEngine,
    },
};

// Re-export common external dependencies
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
pub use tokio::sync::RwLock;
pub use uuid::Uuid;
