//! In-memory post storage.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rand::Rng;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::posts::{PostDraft, PostId, PostRecord};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::memory";
const DEFAULT_ID_SPACE: usize = 1000;
const DEFAULT_MAX_ID_DRAWS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Ids are drawn from `1..id_space`.
    pub id_space: usize,
    /// Random draws attempted before falling back to a scan for a free id.
    pub max_id_draws: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_space: DEFAULT_ID_SPACE,
            max_id_draws: DEFAULT_MAX_ID_DRAWS,
        }
    }
}

impl From<&crate::config::StoreSettings> for StoreConfig {
    fn from(settings: &crate::config::StoreSettings) -> Self {
        Self {
            id_space: settings.id_space,
            max_id_draws: settings.max_id_draws,
        }
    }
}

/// Process-wide post store guarded by a single reader/writer lock.
///
/// Reads share the lock; every write holds it exclusively across its whole
/// check-and-mutate sequence. Records are kept ordered by id, so pages are stable
/// between calls as long as nothing is written in between.
pub struct InMemoryPostStore {
    config: StoreConfig,
    posts: RwLock<BTreeMap<PostId, PostRecord>>,
}

impl InMemoryPostStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            posts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Largest number of posts the id space can hold.
    pub fn capacity(&self) -> usize {
        self.config.id_space.saturating_sub(1)
    }

    pub fn create(&self, draft: PostDraft) -> Result<PostId, RepoError> {
        draft.validate()?;

        let mut posts = rw_write(&self.posts, SOURCE, "create");
        let id = self.allocate_id(&posts)?;
        posts.insert(id, PostRecord::new(id, draft, OffsetDateTime::now_utc()));
        debug!(post_id = id, total = posts.len(), "post stored");

        Ok(id)
    }

    pub fn get_by_id(&self, id: PostId) -> Option<PostRecord> {
        if id < 1 {
            return None;
        }
        rw_read(&self.posts, SOURCE, "get_by_id").get(&id).cloned()
    }

    pub fn get_all(&self, limit: usize, offset: usize) -> Result<Vec<PostRecord>, RepoError> {
        let posts = rw_read(&self.posts, SOURCE, "get_all");
        if posts.is_empty() {
            return Err(RepoError::NotFound);
        }

        Ok(posts.values().skip(offset).take(limit).cloned().collect())
    }

    pub fn update(&self, id: PostId, draft: PostDraft) -> Result<PostRecord, RepoError> {
        draft.validate()?;

        let mut posts = rw_write(&self.posts, SOURCE, "update");
        let slot = posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        let revised = slot.revised(draft, OffsetDateTime::now_utc());

        Ok(std::mem::replace(slot, revised))
    }

    pub fn delete(&self, id: PostId) -> bool {
        rw_write(&self.posts, SOURCE, "delete")
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.posts, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick an unused id; the caller holds the write lock.
    fn allocate_id(&self, posts: &BTreeMap<PostId, PostRecord>) -> Result<PostId, RepoError> {
        let capacity = self.capacity();
        if posts.len() >= capacity {
            return Err(RepoError::Exhausted { capacity });
        }

        let upper = self.config.id_space as PostId;
        let mut rng = rand::thread_rng();
        for _ in 0..self.config.max_id_draws {
            let candidate = rng.gen_range(1..upper);
            if !posts.contains_key(&candidate) {
                return Ok(candidate);
            }
        }

        // Crowded id space: walk it once from a random point.
        let start = rng.gen_range(1..upper);
        let found = (start..upper)
            .chain(1..start)
            .find(|candidate| !posts.contains_key(candidate));
        debug!(
            draws = self.config.max_id_draws,
            occupied = posts.len(),
            found = found.is_some(),
            "id draws exhausted, scanned for a free id"
        );
        found.ok_or(RepoError::Exhausted { capacity })
    }
}

impl Default for InMemoryPostStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl PostsRepo for InMemoryPostStore {
    async fn create_post(&self, draft: PostDraft) -> Result<PostId, RepoError> {
        self.create(draft)
    }

    async fn find_post(&self, id: PostId) -> Option<PostRecord> {
        self.get_by_id(id)
    }

    async fn list_posts(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.get_all(limit, offset)
    }

    async fn update_post(&self, id: PostId, draft: PostDraft) -> Result<PostRecord, RepoError> {
        self.update(id, draft)
    }

    async fn delete_post(&self, id: PostId) -> bool {
        self.delete(id)
    }

    async fn count_posts(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::domain::error::DomainError;

    fn draft(title: &str, author: &str) -> PostDraft {
        PostDraft::new(title, author, format!("{title} by {author}"))
    }

    fn seeded(count: usize) -> InMemoryPostStore {
        let store = InMemoryPostStore::default();
        for i in 0..count {
            store
                .create(draft(&format!("post {i}"), "author"))
                .expect("seed create should succeed");
        }
        store
    }

    #[test]
    fn create_assigns_positive_id_and_equal_timestamps() {
        let store = InMemoryPostStore::default();
        let id = store.create(draft("A", "B")).expect("create");

        assert!((1..1000).contains(&id));
        let post = store.get_by_id(id).expect("created post is readable");
        assert_eq!(post.id, id);
        assert_eq!(post.title, "A");
        assert_eq!(post.author, "B");
        assert_eq!(post.body, "A by B");
        assert_eq!(post.created_at, post.updated_at);
    }

    #[test]
    fn create_rejects_blank_title_or_author_without_mutating() {
        let store = seeded(2);

        let err = store.create(draft("", "B")).expect_err("blank title");
        assert!(matches!(
            err,
            RepoError::InvalidInput(DomainError::EmptyField { field: "title" })
        ));

        let err = store.create(draft("A", "")).expect_err("blank author");
        assert!(matches!(
            err,
            RepoError::InvalidInput(DomainError::EmptyField { field: "author" })
        ));

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn ids_are_unique() {
        let store = seeded(300);
        let ids: HashSet<PostId> = store
            .get_all(usize::MAX, 0)
            .expect("list")
            .into_iter()
            .map(|post| post.id)
            .collect();
        assert_eq!(ids.len(), 300);
    }

    #[test]
    fn get_by_id_rejects_non_positive_and_unknown_ids() {
        let store = seeded(1);
        assert!(store.get_by_id(0).is_none());
        assert!(store.get_by_id(-4).is_none());
        assert!(store.get_by_id(1000).is_none());
    }

    #[test]
    fn get_all_on_empty_store_is_not_found() {
        let store = InMemoryPostStore::default();
        assert!(matches!(store.get_all(10, 0), Err(RepoError::NotFound)));
    }

    #[test]
    fn get_all_paginates() {
        let store = seeded(5);

        assert_eq!(store.get_all(2, 0).expect("first page").len(), 2);
        assert_eq!(store.get_all(2, 4).expect("last page").len(), 1);
        assert!(store.get_all(10, 10).expect("past the end").is_empty());
        assert!(store.get_all(10, 5).expect("exactly at end").is_empty());
    }

    #[test]
    fn get_all_orders_by_id() {
        let store = seeded(20);
        let ids: Vec<PostId> = store
            .get_all(20, 0)
            .expect("list")
            .iter()
            .map(|post| post.id)
            .collect();

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn update_returns_previous_record_and_preserves_identity() {
        let store = InMemoryPostStore::default();
        let id = store.create(draft("A", "B")).expect("create");
        let before = store.get_by_id(id).expect("stored");

        thread::sleep(Duration::from_millis(2));
        let previous = store
            .update(id, PostDraft::new("A2", "B2", "new body"))
            .expect("update");
        assert_eq!(previous, before);

        let after = store.get_by_id(id).expect("still stored");
        assert_eq!(after.id, id);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.title, "A2");
        assert_eq!(after.body, "new body");
    }

    #[test]
    fn update_unknown_id_is_not_found_and_leaves_store_alone() {
        let store = seeded(3);
        let before = store.get_all(10, 0).expect("list");

        assert!(matches!(
            store.update(0, draft("A", "B")),
            Err(RepoError::NotFound)
        ));
        assert_eq!(store.get_all(10, 0).expect("list"), before);
    }

    #[test]
    fn update_validates_before_lookup() {
        let store = InMemoryPostStore::default();
        let id = store.create(draft("A", "B")).expect("create");

        assert!(matches!(
            store.update(id, draft("A", " ")),
            Err(RepoError::InvalidInput(_))
        ));
        assert!(matches!(
            store.update(12_345, draft("", "B")),
            Err(RepoError::InvalidInput(_))
        ));
        assert_eq!(store.get_by_id(id).expect("unchanged").author, "B");
    }

    #[test]
    fn delete_reports_presence() {
        let store = seeded(2);
        let id = store.get_all(1, 0).expect("list")[0].id;

        assert!(store.delete(id));
        assert!(store.get_by_id(id).is_none());
        assert!(!store.delete(id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn small_id_space_fills_completely_then_exhausts() {
        let store = InMemoryPostStore::new(StoreConfig {
            id_space: 6,
            max_id_draws: 2,
        });

        let ids: HashSet<PostId> = (0..5)
            .map(|i| store.create(draft(&format!("p{i}"), "a")).expect("fits"))
            .collect();
        assert_eq!(ids, HashSet::from([1, 2, 3, 4, 5]));

        let err = store.create(draft("overflow", "a")).expect_err("full");
        assert!(matches!(err, RepoError::Exhausted { capacity: 5 }));

        assert!(store.delete(3));
        assert_eq!(store.create(draft("again", "a")).expect("slot freed"), 3);
    }

    #[test]
    fn degenerate_id_space_never_panics() {
        let store = InMemoryPostStore::new(StoreConfig {
            id_space: 1,
            max_id_draws: 8,
        });
        assert!(matches!(
            store.create(draft("A", "B")),
            Err(RepoError::Exhausted { capacity: 0 })
        ));
    }
}
