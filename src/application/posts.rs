//! Post use-cases: the store paired with the list cache.

use std::sync::Arc;

use bytes::Bytes;
use postwell_api_types::PostDocument;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::pagination::{PageQuery, PageWindow};
use crate::application::repos::{PostsRepo, RepoError};
use crate::cache::ListCache;
use crate::domain::posts::{PostDraft, PostId, PostRecord};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to encode post listing: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A serialized page of posts and where it came from.
#[derive(Debug, Clone)]
pub struct PostListing {
    pub body: Bytes,
    pub cache: CacheStatus,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostsRepo>,
    cache: Arc<ListCache>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostsRepo>, cache: Arc<ListCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<ListCache> {
        &self.cache
    }

    /// Serve a page of posts as JSON bytes, from the cache when possible.
    ///
    /// Store errors are returned as-is and never cached.
    pub async fn list(&self, query: &PageQuery) -> Result<PostListing, PostServiceError> {
        let window = PageWindow::from_query(query);
        let key = window.cache_key();

        if let Some(body) = self.cache.get(&key) {
            debug!(key = %key, outcome = "hit", "serving cached post listing");
            return Ok(PostListing {
                body,
                cache: CacheStatus::Hit,
            });
        }

        // Taken before the store read so a flush racing this fill wins.
        let generation = self.cache.generation();
        let posts = self.store.list_posts(window.limit, window.offset).await?;
        let documents: Vec<PostDocument> = posts.into_iter().map(PostDocument::from).collect();
        let body = Bytes::from(serde_json::to_vec(&documents)?);

        let cached = self.cache.set_if_current(key.clone(), body.clone(), generation);
        debug!(
            key = %key,
            outcome = "miss",
            count = documents.len(),
            cached,
            "served post listing from store"
        );

        Ok(PostListing {
            body,
            cache: CacheStatus::Miss,
        })
    }

    pub async fn get(&self, id: PostId) -> Result<PostRecord, PostServiceError> {
        self.store
            .find_post(id)
            .await
            .ok_or(PostServiceError::NotFound)
    }

    /// Create a post and return it as stored.
    pub async fn create(&self, draft: PostDraft) -> Result<PostRecord, PostServiceError> {
        let id = self.store.create_post(draft).await?;
        self.cache.invalidate_all();
        info!(target = "postwell::posts", post_id = id, "post created");

        self.get(id).await
    }

    /// Update a post and return its new state.
    ///
    /// The store hands back the previous record; the response carries the re-read one.
    pub async fn update(
        &self,
        id: PostId,
        draft: PostDraft,
    ) -> Result<PostRecord, PostServiceError> {
        let previous = self.store.update_post(id, draft).await?;
        self.cache.invalidate_all();
        info!(
            target = "postwell::posts",
            post_id = id,
            previous_updated_at = %previous.updated_at,
            "post updated"
        );

        self.get(id).await
    }

    pub async fn delete(&self, id: PostId) -> Result<(), PostServiceError> {
        if !self.store.delete_post(id).await {
            return Err(PostServiceError::NotFound);
        }
        self.cache.invalidate_all();
        info!(target = "postwell::posts", post_id = id, "post deleted");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.store.count_posts().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::infra::memory::{InMemoryPostStore, StoreConfig};

    fn service() -> PostService {
        let store: Arc<dyn PostsRepo> = Arc::new(InMemoryPostStore::new(StoreConfig::default()));
        let cache = Arc::new(ListCache::new(&CacheConfig::with_ttl(
            Duration::from_secs(30),
        )));
        PostService::new(store, cache)
    }

    fn listed(listing: &PostListing) -> Vec<PostDocument> {
        serde_json::from_slice(&listing.body).expect("listing should be a JSON array")
    }

    #[tokio::test]
    async fn list_misses_then_hits() {
        let service = service();
        service
            .create(PostDraft::new("A", "B", ""))
            .await
            .expect("create should succeed");

        let query = PageQuery::default();
        let first = service.list(&query).await.expect("first list");
        let second = service.list(&query).await.expect("second list");

        assert_eq!(first.cache, CacheStatus::Miss);
        assert_eq!(second.cache, CacheStatus::Hit);
        assert_eq!(first.body, second.body);
        assert!(service.cache().get("10:0").is_some());
    }

    #[tokio::test]
    async fn create_invalidates_cached_listing() {
        let service = service();
        service
            .create(PostDraft::new("A", "B", ""))
            .await
            .expect("create should succeed");

        let query = PageQuery::new(1, 10);
        assert_eq!(listed(&service.list(&query).await.expect("list")).len(), 1);

        service
            .create(PostDraft::new("C", "D", ""))
            .await
            .expect("second create should succeed");
        assert!(service.cache().get("10:0").is_none());

        let listing = service.list(&query).await.expect("list after create");
        assert_eq!(listing.cache, CacheStatus::Miss);
        assert_eq!(listed(&listing).len(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_invalidate_cached_listing() {
        let service = service();
        let post = service
            .create(PostDraft::new("A", "B", ""))
            .await
            .expect("create should succeed");

        service.list(&PageQuery::default()).await.expect("warm");
        let updated = service
            .update(post.id, PostDraft::new("A2", "B", "body"))
            .await
            .expect("update should succeed");
        assert_eq!(updated.title, "A2");
        assert!(service.cache().is_empty());

        service.list(&PageQuery::default()).await.expect("rewarm");
        service.delete(post.id).await.expect("delete should succeed");
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn failed_writes_leave_cache_untouched() {
        let service = service();
        service
            .create(PostDraft::new("A", "B", ""))
            .await
            .expect("create should succeed");
        service.list(&PageQuery::default()).await.expect("warm");

        let err = service
            .create(PostDraft::new("", "B", ""))
            .await
            .expect_err("blank title must fail");
        assert!(matches!(
            err,
            PostServiceError::Repo(RepoError::InvalidInput(_))
        ));

        let err = service
            .update(999_999, PostDraft::new("A", "B", ""))
            .await
            .expect_err("unknown id must fail");
        assert!(matches!(err, PostServiceError::Repo(RepoError::NotFound)));

        let err = service.delete(999_999).await.expect_err("unknown id");
        assert!(matches!(err, PostServiceError::NotFound));

        assert!(service.cache().get("10:0").is_some());
    }

    #[tokio::test]
    async fn empty_store_listing_is_not_cached() {
        let service = service();

        let err = service
            .list(&PageQuery::default())
            .await
            .expect_err("empty store must fail");
        assert!(matches!(err, PostServiceError::Repo(RepoError::NotFound)));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn get_unknown_post_is_not_found() {
        let service = service();
        assert!(matches!(
            service.get(1).await,
            Err(PostServiceError::NotFound)
        ));
    }

    /// Store whose first page read is followed by a completed write, landing in the
    /// gap between the read and the cache fill.
    struct WriteAfterFirstRead {
        inner: InMemoryPostStore,
        cache: Arc<ListCache>,
        fired: AtomicBool,
    }

    #[async_trait]
    impl PostsRepo for WriteAfterFirstRead {
        async fn create_post(&self, draft: PostDraft) -> Result<PostId, RepoError> {
            self.inner.create(draft)
        }

        async fn find_post(&self, id: PostId) -> Option<PostRecord> {
            self.inner.get_by_id(id)
        }

        async fn list_posts(
            &self,
            limit: usize,
            offset: usize,
        ) -> Result<Vec<PostRecord>, RepoError> {
            let page = self.inner.get_all(limit, offset)?;
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.inner.create(PostDraft::new("late", "writer", ""))?;
                self.cache.invalidate_all();
            }
            Ok(page)
        }

        async fn update_post(
            &self,
            id: PostId,
            draft: PostDraft,
        ) -> Result<PostRecord, RepoError> {
            self.inner.update(id, draft)
        }

        async fn delete_post(&self, id: PostId) -> bool {
            self.inner.delete(id)
        }

        async fn count_posts(&self) -> usize {
            self.inner.len()
        }
    }

    #[tokio::test]
    async fn listing_read_before_a_write_is_not_cached_after_it() {
        let cache = Arc::new(ListCache::new(&CacheConfig::with_ttl(
            Duration::from_secs(30),
        )));
        let store = Arc::new(WriteAfterFirstRead {
            inner: InMemoryPostStore::new(StoreConfig::default()),
            cache: cache.clone(),
            fired: AtomicBool::new(false),
        });
        store
            .inner
            .create(PostDraft::new("first", "writer", ""))
            .expect("seed post");
        let service = PostService::new(store.clone(), cache);

        let query = PageQuery::default();
        let first = service.list(&query).await.expect("first list");
        assert_eq!(first.cache, CacheStatus::Miss);
        assert_eq!(listed(&first).len(), 1);
        assert!(service.cache().is_empty());

        let second = service.list(&query).await.expect("second list");
        assert_eq!(second.cache, CacheStatus::Miss);
        assert_eq!(listed(&second).len(), 2);
        assert_eq!(service.count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_stale_hit_after_concurrent_writes_finish() {
        let service = service();
        service
            .create(PostDraft::new("seed", "writer", ""))
            .await
            .expect("seed post");

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        service
                            .list(&PageQuery::new(1, 100))
                            .await
                            .expect("store is never empty");
                    }
                })
            })
            .collect();

        let writer = {
            let service = service.clone();
            tokio::spawn(async move {
                for n in 0..50 {
                    service
                        .create(PostDraft::new(format!("post {n}"), "writer", ""))
                        .await
                        .expect("id space has room");
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.expect("writer task");
        for reader in readers {
            reader.await.expect("reader task");
        }

        let listing = service
            .list(&PageQuery::new(1, 100))
            .await
            .expect("final list");
        assert_eq!(listed(&listing).len(), 51);
    }
}
