pub mod check;

pub use check::{ReadyCheck, ReadyProgress};
