use crate::player::PlayerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("User not found: {0}")]
    UserNotFound(PlayerId),

    #[error("Player already in queue: {0}")]
    AlreadyInQueue(PlayerId),

    #[error("Player not in queue: {0}")]
    NotInQueue(PlayerId),

    #[error("Cooldown active until {ends_at}")]
    CooldownActive { ends_at: i64 },

    #[error("Social id already bound to account {existing_account}")]
    DuplicateSocialId { existing_account: PlayerId },

    #[error("Player banned until {until}")]
    Banned { until: i64 },

    #[error("Match not found: {0}")]
    MatchNotFound(String),

    #[error("Player {player} is not part of match {match_id}")]
    NotInMatch { match_id: String, player: PlayerId },

    #[error("Not this team's turn")]
    NotYourTurn,

    #[error("Only the team leader may veto")]
    NotTeamLeader,

    #[error("Map not available for veto: {0}")]
    MapNotAvailable(String),

    #[error("Swap request not found or expired")]
    SwapNotFound,

    #[error("Role swap must stay within a team")]
    SwapAcrossTeams,

    #[error("Not the active host for match {0}")]
    NotActiveHost(String),

    #[error("Connection already open for player {0}")]
    AlreadyConnected(PlayerId),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("No valid team composition for cohort")]
    NoTeamComposition,

    #[error("State store error: {0}")]
    StoreError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Coarse classification driving the propagation policy: validation errors
/// surface to the client verbatim, transient errors retry at the next tick,
/// logical errors self-cancel the match, fatal errors propagate to shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transient,
    Logical,
    Fatal,
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        use CoordinatorError::*;
        match self {
            UserNotFound(_)
            | AlreadyInQueue(_)
            | NotInQueue(_)
            | CooldownActive { .. }
            | DuplicateSocialId { .. }
            | Banned { .. }
            | NotInMatch { .. }
            | NotYourTurn
            | NotTeamLeader
            | MapNotAvailable(_)
            | SwapNotFound
            | SwapAcrossTeams
            | NotActiveHost(_)
            | AlreadyConnected(_)
            | AuthFailed(_) => ErrorKind::Validation,
            StoreError(_) | DatabaseError(_) => ErrorKind::Transient,
            MatchNotFound(_)
            | InvalidTransition(_)
            | NoTeamComposition
            | SerializationError(_)
            | OperationFailed(_) => ErrorKind::Logical,
            InvalidConfiguration(_) => ErrorKind::Fatal,
        }
    }

    /// Stable reason string for message-typed failures (QUEUE_FAILED etc.),
    /// suitable for client-side localization.
    pub fn reason_code(&self) -> &'static str {
        use CoordinatorError::*;
        match self {
            UserNotFound(_) => "USER_NOT_FOUND",
            AlreadyInQueue(_) => "ALREADY_IN_QUEUE",
            NotInQueue(_) => "NOT_IN_QUEUE",
            CooldownActive { .. } => "COOLDOWN_ACTIVE",
            DuplicateSocialId { .. } => "DUPLICATE_SOCIAL_ID",
            Banned { .. } => "BANNED",
            MatchNotFound(_) => "MATCH_NOT_FOUND",
            NotInMatch { .. } => "NOT_IN_MATCH",
            NotYourTurn => "NOT_YOUR_TURN",
            NotTeamLeader => "NOT_TEAM_LEADER",
            MapNotAvailable(_) => "MAP_NOT_AVAILABLE",
            SwapNotFound => "SWAP_NOT_FOUND",
            SwapAcrossTeams => "SWAP_ACROSS_TEAMS",
            NotActiveHost(_) => "NOT_ACTIVE_HOST",
            AlreadyConnected(_) => "ALREADY_CONNECTED",
            AuthFailed(_) => "AUTH_FAILED",
            InvalidTransition(_) => "INVALID_TRANSITION",
            NoTeamComposition => "NO_TEAM_COMPOSITION",
            StoreError(_) => "STORE_ERROR",
            DatabaseError(_) => "DATABASE_ERROR",
            SerializationError(_) => "SERIALIZATION_ERROR",
            InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            OperationFailed(_) => "OPERATION_FAILED",
        }
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(err: serde_json::Error) -> Self {
        CoordinatorError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
