pub mod engine;
pub mod entry;
pub mod picker;
pub mod window;

pub use engine::{QueueEngine, QueueEngineConfig};
pub use entry::{QueueEntry, RequeueHint};
pub use picker::pick_role_contract;
pub use window::WindowPolicy;
