use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::post;

/// A blog post as returned by the API.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PostResponse {
    pub id: Uuid,
    #[schema(example = "Understanding ownership")]
    pub title: String,
    #[schema(example = "A walk through moves and borrows.")]
    pub description: String,
    #[schema(example = "https://cdn.example.com/posts/3f2a9c.png")]
    pub media_url: Option<String>,
    #[schema(example = "tech")]
    pub category: Option<String>,
    #[schema(example = json!(["rust", "memory"]))]
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    /// Author's username when the post was created.
    #[schema(example = "alice")]
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<post::Model> for PostResponse {
    fn from(m: post::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            media_url: m.media_url,
            category: m.category,
            tags: m.tags,
            owner_id: m.owner_id,
            owner_name: m.owner_name,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Response for a newly created post.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CreatePostResponse {
    #[schema(example = "Media uploaded successfully")]
    pub message: String,
    pub media_url: Option<String>,
    pub post: PostResponse,
}

/// Response for an updated post.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UpdatePostResponse {
    #[schema(example = "Blog post updated successfully")]
    pub message: String,
    pub post: PostResponse,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// Category to match. Blank returns every post.
    pub category: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free-text term. Blank returns every post.
    #[serde(rename = "searchTerm")]
    pub search_term: Option<String>,
}
