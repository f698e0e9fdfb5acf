pub mod chat;
pub mod lobby;
pub mod maps;
pub mod state;
pub mod swap;
pub mod veto;

pub use chat::{chat_recipients, sender_name_for};
pub use lobby::Lobby;
pub use maps::{MapInfo, MapPool};
pub use state::LobbyPhase;
pub use swap::{SwapBook, SwapRequest};
pub use veto::{VetoOutcome, VetoRecord, VetoState};
