pub mod selector;

pub use selector::{HostAttempt, HostSelector, RoomInfo};
