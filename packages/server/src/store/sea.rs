use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use uuid::Uuid;

use super::{NewPost, PostChanges, PostFilter, PostStore};
use crate::entity::post;
use crate::models::shared::escape_like;

/// [`PostStore`] backed by the application database.
#[derive(Clone)]
pub struct SeaOrmPostStore {
    db: DatabaseConnection,
}

impl SeaOrmPostStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn owned(id: Uuid, owner_id: Uuid) -> Condition {
    Condition::all()
        .add(post::Column::Id.eq(id))
        .add(post::Column::OwnerId.eq(owner_id))
}

fn search_condition(term: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(term).to_lowercase());
    let contains = |column: post::Column| {
        Expr::expr(Func::lower(Expr::col(column)))
            .like(LikeExpr::new(pattern.clone()).escape('\\'))
    };

    Condition::any()
        .add(contains(post::Column::Title))
        .add(contains(post::Column::Description))
        .add(contains(post::Column::OwnerName))
        .add(Expr::cust_with_values(
            "? = ANY(\"post\".\"tags\")",
            [term.to_string()],
        ))
}

#[async_trait]
impl PostStore for SeaOrmPostStore {
    async fn insert(&self, new: NewPost) -> Result<post::Model, DbErr> {
        let now = Utc::now();
        let (media_url, media_public_id) = match new.media {
            Some(media) => (Some(media.url), Some(media.public_id)),
            None => (None, None),
        };

        post::ActiveModel {
            id: Set(new.id),
            title: Set(new.title),
            description: Set(new.description),
            media_url: Set(media_url),
            media_public_id: Set(media_public_id),
            category: Set(new.category),
            tags: Set(new.tags),
            owner_id: Set(new.owner_id),
            owner_name: Set(new.owner_name),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    async fn find(&self, id: Uuid) -> Result<Option<post::Model>, DbErr> {
        post::Entity::find_by_id(id).one(&self.db).await
    }

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<post::Model>, DbErr> {
        post::Entity::find()
            .filter(owned(id, owner_id))
            .one(&self.db)
            .await
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<post::Model>, DbErr> {
        let mut active = post::ActiveModel {
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(category) = changes.category {
            active.category = Set(Some(category));
        }
        if let Some(tags) = changes.tags {
            active.tags = Set(tags);
        }
        if let Some(media) = changes.media {
            active.media_url = Set(Some(media.url));
            active.media_public_id = Set(Some(media.public_id));
        }

        let updated = post::Entity::update_many()
            .set(active)
            .filter(owned(id, owner_id))
            .exec_with_returning(&self.db)
            .await?;

        Ok(updated.into_iter().next())
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<bool, DbErr> {
        let result = post::Entity::delete_many()
            .filter(owned(id, owner_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn list(&self, filter: PostFilter) -> Result<Vec<post::Model>, DbErr> {
        let select = match filter {
            PostFilter::All => post::Entity::find(),
            PostFilter::Owner(owner_id) => {
                post::Entity::find().filter(post::Column::OwnerId.eq(owner_id))
            }
            PostFilter::Category(category) => {
                post::Entity::find().filter(post::Column::Category.eq(category))
            }
            PostFilter::Search(term) => post::Entity::find().filter(search_condition(&term)),
        };

        select
            .order_by_desc(post::Column::CreatedAt)
            .all(&self.db)
            .await
    }
}
