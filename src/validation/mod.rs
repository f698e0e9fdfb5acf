pub mod classify;
pub mod engine;

pub use classify::{validate_teams, Classification};
pub use engine::{MatchVerdict, SettledPlayer, ValidationConfig, ValidationEngine};
