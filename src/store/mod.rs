pub mod keys;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod traits;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use traits::{StateStore, StoreBatch, StoreCommand};

use crate::error::Result;

/// Drop every coordination key a match ever wrote. Idempotent; used by
/// every cancellation path and by settlement.
pub async fn clear_match_keys(store: &dyn StateStore, match_id: &str) -> Result<()> {
    let mut batch = StoreBatch::new();
    for key in store.scan_keys(&keys::match_all(match_id)).await? {
        batch = batch.del(key);
    }
    for key in store.scan_keys(&keys::lobby_all(match_id)).await? {
        batch = batch.del(key);
    }
    batch = batch.del(keys::lobby_temp(match_id));
    store.batch(batch).await
}
