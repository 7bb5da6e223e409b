use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Public URL of the post image in the media store.
    pub media_url: Option<String>,
    /// Object id returned by the media store at upload time. NULL for rows
    /// written before it was tracked; those fall back to the URL.
    pub media_public_id: Option<String>,

    /// Always lowercase.
    pub category: Option<String>,
    pub tags: Vec<String>,

    #[sea_orm(indexed)]
    pub owner_id: Uuid,
    /// Owner's username when the post was created. Not kept in sync.
    pub owner_name: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Media store id of this post's image, if it has one.
    pub fn media_id(&self) -> Option<&str> {
        self.media_public_id.as_deref().or_else(|| {
            self.media_url
                .as_deref()
                .and_then(common::storage::public_id_from_url)
        })
    }
}

impl ActiveModelBehavior for ActiveModel {}
