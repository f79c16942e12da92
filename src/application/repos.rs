//! Repository traits describing storage adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::posts::{PostDraft, PostId, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] DomainError),
    #[error("resource not found")]
    NotFound,
    #[error("identifier space exhausted: all {capacity} ids are assigned")]
    Exhausted { capacity: usize },
}

/// Storage for posts.
///
/// Implementations own the records outright and must be safe to share across
/// request handlers. Absence on lookup and delete is a normal outcome reported
/// through the return value, not an error.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Validate `draft`, assign a fresh id and store the record.
    async fn create_post(&self, draft: PostDraft) -> Result<PostId, RepoError>;

    /// `None` for ids below 1 and for unknown ids.
    async fn find_post(&self, id: PostId) -> Option<PostRecord>;

    /// Up to `limit` records starting at `offset`.
    ///
    /// Fails with [`RepoError::NotFound`] when the store holds no posts at all; an
    /// offset past the end yields an empty page instead.
    async fn list_posts(&self, limit: usize, offset: usize)
    -> Result<Vec<PostRecord>, RepoError>;

    /// Replace the content of `id` and return the record as it was before the update.
    async fn update_post(&self, id: PostId, draft: PostDraft) -> Result<PostRecord, RepoError>;

    /// `true` if a record was removed.
    async fn delete_post(&self, id: PostId) -> bool;

    async fn count_posts(&self) -> usize;
}
