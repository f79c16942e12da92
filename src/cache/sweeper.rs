//! Background purge of expired list-cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::store::ListCache;

/// Spawn a task that purges expired entries every `interval`.
///
/// Reads already treat expired entries as absent; the sweep only bounds memory held
/// by keys nobody asks for again. Abort the returned handle on shutdown.
pub fn spawn_sweeper(cache: Arc<ListCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // Skip the first immediate tick
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(
                    target = "postwell::cache::sweeper",
                    purged,
                    remaining = cache.len(),
                    "purged expired list cache entries"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::cache::CacheConfig;

    #[tokio::test]
    async fn sweeper_purges_expired_entries() {
        let cache = Arc::new(ListCache::new(&CacheConfig::with_ttl(
            Duration::from_millis(10),
        )));
        cache.set("10:0", Bytes::from_static(b"[]"));

        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.abort();

        assert!(cache.is_empty());
    }
}
