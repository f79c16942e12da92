//! The post entity and the content callers may supply for it.

use postwell_api_types::{PostDocument, PostPayload};
use serde::Serialize;
use time::OffsetDateTime;

use super::error::DomainError;

/// Store-assigned identifier. Zero and negative values are never assigned.
pub type PostId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub author: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    /// Build a fresh record; both timestamps are `now`.
    pub fn new(id: PostId, draft: PostDraft, now: OffsetDateTime) -> Self {
        Self {
            id,
            title: draft.title,
            author: draft.author,
            body: draft.body,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the content, keeping `id` and `created_at`.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn revised(&self, draft: PostDraft, now: OffsetDateTime) -> Self {
        Self {
            id: self.id,
            title: draft.title,
            author: draft.author,
            body: draft.body,
            created_at: self.created_at,
            updated_at: now.max(self.updated_at),
        }
    }
}

impl From<PostRecord> for PostDocument {
    fn from(record: PostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            author: record.author,
            body: record.body,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Caller-supplied content for create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub author: String,
    pub body: String,
}

impl PostDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            body: body.into(),
        }
    }

    /// Title and author must carry non-whitespace text.
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(&self.title, "title")?;
        ensure_non_empty(&self.author, "author")?;
        Ok(())
    }
}

impl From<PostPayload> for PostDraft {
    fn from(payload: PostPayload) -> Self {
        Self {
            title: payload.title,
            author: payload.author,
            body: payload.body,
        }
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::empty_field(field));
    }
    Ok(())
}
