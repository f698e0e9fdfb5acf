//! Strikeforge
//!
//! Ranked matchmaking coordinator for competitive 5v5 shooters: queue →
//! team build → ready check → map veto → host selection → live-match
//! validation → result settlement, with durable per-match coordination
//! state and pluggable storage backends.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use strikeforge::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // In-memory backends for development
//!     let store = Arc::new(InMemoryStore::new());
//!     let matches = Arc::new(InMemoryMatchStore::new());
//!     let logs = Arc::new(InMemoryLogSource::new());
//!     let registry = Arc::new(ConnectionRegistry::new());
//!
//!     let coordinator = Coordinator::new(
//!         CoordinatorConfig::default(),
//!         store,
//!         matches.clone(),
//!         logs,
//!         Arc::new(EloRankFunction::default()),
//!         registry.clone(),
//!     );
//!     coordinator.clone().start().await;
//!
//!     let router = SessionRouter::new(
//!         coordinator,
//!         registry,
//!         matches,
//!         Arc::new(AllowAllAuthenticator),
//!     );
//!
//!     // Bind transports through `router.authenticate(...)`, feed inbound
//!     // frames to `router.handle(...)`.
//!     let _ = router;
//! }
//! ```

pub mod error;
pub mod host;
pub mod lobby;
pub mod penalty;
pub mod persistence;
pub mod pipeline;
pub mod player;
pub mod queue;
pub mod ready;
pub mod server;
pub mod session;
pub mod store;
pub mod team;
pub mod validation;

// Re-export commonly used types
pub use error::{CoordinatorError, ErrorKind, Result};
pub use host::{HostAttempt, HostSelector};
pub use lobby::{Lobby, LobbyPhase, MapPool, VetoState};
pub use penalty::{CooldownGrant, PenaltyTracker};
pub use persistence::{
    InMemoryLogSource, InMemoryMatchStore, MatchLogRow, MatchLogSource, MatchRecord,
    MatchRecordStatus, MatchStore,
};
pub use pipeline::{Coordinator, CoordinatorConfig, MatchEvent};
pub use player::{
    ClassProfile, EloRankFunction, Player, PlayerId, PlayerRank, RankFunction, RankTier, Role,
    TeamSide, WeaponClass,
};
pub use queue::{QueueEngine, QueueEngineConfig, QueueEntry, WindowPolicy};
pub use ready::{ReadyCheck, ReadyProgress};
pub use session::{
    AllowAllAuthenticator, Authenticator, ChannelTransport, ChatChannel, ClientMessage,
    ConnectionRegistry, JwtAuthenticator, Outbound, ServerMessage, SessionRouter, Transport,
};
pub use store::{InMemoryStore, StateStore, StoreBatch};
pub use team::{build_teams, Cohort, CohortPlayer};
pub use validation::{validate_teams, MatchVerdict, ValidationConfig, ValidationEngine};

/// Prelude module for convenient imports
pub mod prelude;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
