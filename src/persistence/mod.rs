pub mod logs;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod records;
pub mod traits;

pub use logs::{InMemoryLogSource, LogQuery, MatchLogRow, MatchLogSource};
pub use memory::InMemoryMatchStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use records::{MatchRecord, MatchRecordStatus, PlayerResultRow, PlayerStatsRow};
pub use traits::MatchStore;
