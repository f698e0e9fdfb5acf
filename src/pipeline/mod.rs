pub mod actor;
pub mod config;
pub mod coordinator;
pub mod events;

pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use events::MatchEvent;
