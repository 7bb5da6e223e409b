//! Record store for posts.

pub mod sea;

use async_trait::async_trait;
use common::storage::StoredMedia;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::entity::post;

pub use sea::SeaOrmPostStore;

/// Fields of a post about to be created.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Chosen by the caller, so a write that never answered can be looked up.
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub media: Option<StoredMedia>,
    pub owner_id: Uuid,
    pub owner_name: String,
}

/// Partial update of a post. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// `Some(vec![])` clears the tags.
    pub tags: Option<Vec<String>>,
    pub media: Option<StoredMedia>,
}

/// Which posts a listing returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Owner(Uuid),
    /// Exact match on the stored category.
    Category(String),
    /// Free-text search over title, description, tags and owner name.
    Search(String),
}

impl PostFilter {
    /// Whether `post` belongs in this listing.
    pub fn matches(&self, post: &post::Model) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Owner(owner_id) => post.owner_id == *owner_id,
            PostFilter::Category(category) => post.category.as_deref() == Some(category.as_str()),
            PostFilter::Search(term) => {
                let needle = term.to_lowercase();
                post.title.to_lowercase().contains(&needle)
                    || post.description.to_lowercase().contains(&needle)
                    || post.tags.iter().any(|tag| tag == term)
                    || post.owner_name.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Persistence for posts.
///
/// Owner-scoped operations match on `(id, owner_id)` in a single statement;
/// that predicate is the only guard against cross-owner writes.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(&self, post: NewPost) -> Result<post::Model, DbErr>;

    async fn find(&self, id: Uuid) -> Result<Option<post::Model>, DbErr>;

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<post::Model>, DbErr>;

    /// Apply `changes` and return the updated post, or `None` if no post
    /// matched `(id, owner_id)`.
    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<post::Model>, DbErr>;

    /// Returns `false` if no post matched `(id, owner_id)`.
    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<bool, DbErr>;

    /// Newest first.
    async fn list(&self, filter: PostFilter) -> Result<Vec<post::Model>, DbErr>;
}
