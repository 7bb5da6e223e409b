//! Post orchestration: keeps the record store and the media store consistent.
//!
//! Media is uploaded before the record is written. A failed write removes the
//! freshly uploaded object again, and a replaced or deleted post's old object
//! is only removed once the record no longer points at it. A write that times
//! out may still have committed, so its upload is only removed once a re-read
//! shows the record does not reference it. Cleanup failures are logged and
//! never change the outcome reported to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::staging::StagedFile;
use common::storage::{MediaStore, StoredMedia};
use sea_orm::DbErr;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entity::post;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::store::{NewPost, PostChanges, PostFilter, PostStore};

/// What a re-read says about a record write that did not answer in time.
enum Unacknowledged {
    Landed(post::Model),
    Missing,
    Unknown,
}

/// Validated fields of a post about to be created.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    /// Lowercase.
    pub category: String,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostStore>,
    media: Arc<dyn MediaStore>,
    timeout: Duration,
}

impl PostService {
    /// `timeout` bounds every media store call and every record write.
    pub fn new(posts: Arc<dyn PostStore>, media: Arc<dyn MediaStore>, timeout: Duration) -> Self {
        Self {
            posts,
            media,
            timeout,
        }
    }

    /// Upload `staged` and create a post pointing at it.
    ///
    /// The staged file is removed whatever the outcome.
    #[instrument(skip_all, fields(owner_id = %owner.user_id))]
    pub async fn create(
        &self,
        owner: &AuthUser,
        draft: PostDraft,
        staged: StagedFile,
    ) -> Result<post::Model, AppError> {
        let result = self.create_with(owner, draft, &staged).await;
        staged.discard().await;
        result
    }

    async fn create_with(
        &self,
        owner: &AuthUser,
        draft: PostDraft,
        staged: &StagedFile,
    ) -> Result<post::Model, AppError> {
        let media = self.upload(staged).await?;

        let id = Uuid::now_v7();
        let new = NewPost {
            id,
            title: draft.title,
            description: draft.description,
            category: Some(draft.category),
            tags: draft.tags,
            media: Some(media.clone()),
            owner_id: owner.user_id,
            owner_name: owner.username.clone(),
        };

        let insert = async { self.posts.insert(new).await.map(Some) };
        let post = self
            .persist(insert, id, owner.user_id, Some(&media))
            .await?;

        info!(post_id = %post.id, public_id = %media.public_id, "Post created");
        Ok(post)
    }

    /// Apply `changes` to one of `owner`'s posts, replacing its media when a
    /// file is staged.
    ///
    /// The staged file is removed whatever the outcome.
    #[instrument(skip_all, fields(owner_id = %owner.user_id, post_id = %id))]
    pub async fn update(
        &self,
        owner: &AuthUser,
        id: Uuid,
        changes: PostChanges,
        staged: Option<StagedFile>,
    ) -> Result<post::Model, AppError> {
        let result = self.update_with(owner, id, changes, staged.as_ref()).await;
        if let Some(staged) = staged {
            staged.discard().await;
        }
        result
    }

    async fn update_with(
        &self,
        owner: &AuthUser,
        id: Uuid,
        mut changes: PostChanges,
        staged: Option<&StagedFile>,
    ) -> Result<post::Model, AppError> {
        let existing = self
            .posts
            .find_owned(id, owner.user_id)
            .await?
            .ok_or(AppError::NotFoundOrForbidden)?;

        let uploaded = match staged {
            Some(staged) => Some(self.upload(staged).await?),
            None => None,
        };
        changes.media = uploaded.clone();

        let update = self.posts.update_owned(id, owner.user_id, changes);
        let updated = self
            .persist(update, id, owner.user_id, uploaded.as_ref())
            .await?;

        if let Some(media) = &uploaded {
            match existing.media_id() {
                Some(old) if old != media.public_id => self.discard_remote(old).await,
                _ => {}
            }
        }

        info!(replaced_media = uploaded.is_some(), "Post updated");
        Ok(updated)
    }

    /// Delete one of `owner`'s posts and its media.
    ///
    /// Failing to remove the media never blocks deleting the post.
    #[instrument(skip_all, fields(owner_id = %owner.user_id, post_id = %id))]
    pub async fn delete(&self, owner: &AuthUser, id: Uuid) -> Result<(), AppError> {
        let existing = self
            .posts
            .find_owned(id, owner.user_id)
            .await?
            .ok_or(AppError::NotFoundOrForbidden)?;

        match existing.media_id() {
            Some(public_id) => self.discard_remote(public_id).await,
            None => debug!("Post has no media to remove"),
        }

        if !self.write(self.posts.delete_owned(id, owner.user_id)).await? {
            return Err(AppError::NotFoundOrForbidden);
        }

        info!("Post deleted");
        Ok(())
    }

    /// Look up a post by its textual id. Surrounding whitespace is ignored
    /// and ids that are not UUIDs are simply not found.
    pub async fn get(&self, id: &str) -> Result<post::Model, AppError> {
        let not_found = || AppError::NotFound("Blog post not found".into());
        let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
        self.posts.find(id).await?.ok_or_else(not_found)
    }

    pub async fn list_all(&self) -> Result<Vec<post::Model>, AppError> {
        Ok(self.posts.list(PostFilter::All).await?)
    }

    pub async fn list_for_owner(&self, owner: &AuthUser) -> Result<Vec<post::Model>, AppError> {
        Ok(self.posts.list(PostFilter::Owner(owner.user_id)).await?)
    }

    /// Blank or absent category lists every post.
    pub async fn filter_by_category(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<post::Model>, AppError> {
        let filter = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(category) => PostFilter::Category(category.to_lowercase()),
            None => PostFilter::All,
        };
        Ok(self.posts.list(filter).await?)
    }

    /// Blank or absent term lists every post.
    pub async fn search(&self, term: Option<&str>) -> Result<Vec<post::Model>, AppError> {
        let filter = match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => PostFilter::Search(term.to_string()),
            None => PostFilter::All,
        };
        Ok(self.posts.list(filter).await?)
    }

    async fn upload(&self, staged: &StagedFile) -> Result<StoredMedia, AppError> {
        let stored = timeout(self.timeout, self.media.upload(staged))
            .await
            .map_err(|_| {
                AppError::MediaUploadFailed(format!("upload timed out after {:?}", self.timeout))
            })?
            .map_err(|e| AppError::MediaUploadFailed(e.to_string()))?;

        debug!(
            public_id = %stored.public_id,
            size = staged.size(),
            "Uploaded media"
        );
        Ok(stored)
    }

    async fn write<T>(&self, op: impl Future<Output = Result<T, DbErr>>) -> Result<T, AppError> {
        timeout(self.timeout, op)
            .await
            .map_err(|_| self.write_timed_out())?
            .map_err(|e| AppError::PersistenceFailed(e.to_string()))
    }

    fn write_timed_out(&self) -> AppError {
        AppError::PersistenceFailed(format!("write timed out after {:?}", self.timeout))
    }

    /// Run a record write carrying freshly uploaded `media`, removing the
    /// upload again when the write definitely did not take effect.
    ///
    /// A write that matched no row is `NotFoundOrForbidden`.
    async fn persist(
        &self,
        op: impl Future<Output = Result<Option<post::Model>, DbErr>>,
        id: Uuid,
        owner_id: Uuid,
        media: Option<&StoredMedia>,
    ) -> Result<post::Model, AppError> {
        let err = match timeout(self.timeout, op).await {
            Ok(Ok(Some(post))) => return Ok(post),
            Ok(Ok(None)) => AppError::NotFoundOrForbidden,
            Ok(Err(e)) => AppError::PersistenceFailed(e.to_string()),
            Err(_) => {
                let err = self.write_timed_out();
                let Some(media) = media else {
                    return Err(err);
                };
                match self.recheck(id, owner_id, media).await {
                    Unacknowledged::Landed(post) => {
                        info!(post_id = %id, "Timed-out write was committed");
                        return Ok(post);
                    }
                    Unacknowledged::Missing => err,
                    Unacknowledged::Unknown => {
                        warn!(
                            public_id = %media.public_id,
                            "Keeping media of a write in unknown state"
                        );
                        return Err(err);
                    }
                }
            }
        };

        if let Some(media) = media {
            self.discard_remote(&media.public_id).await;
        }
        Err(err)
    }

    /// Re-read a post after a timed-out write to see whether it now
    /// references `media`.
    async fn recheck(&self, id: Uuid, owner_id: Uuid, media: &StoredMedia) -> Unacknowledged {
        match timeout(self.timeout, self.posts.find_owned(id, owner_id)).await {
            Ok(Ok(Some(post)))
                if post.media_public_id.as_deref() == Some(media.public_id.as_str()) =>
            {
                Unacknowledged::Landed(post)
            }
            Ok(Ok(_)) => Unacknowledged::Missing,
            Ok(Err(e)) => {
                warn!(post_id = %id, error = %e, "Re-reading post after timed-out write failed");
                Unacknowledged::Unknown
            }
            Err(_) => {
                warn!(post_id = %id, "Re-reading post after timed-out write timed out");
                Unacknowledged::Unknown
            }
        }
    }

    /// Best-effort removal of a remote object.
    async fn discard_remote(&self, public_id: &str) {
        match timeout(self.timeout, self.media.delete(public_id)).await {
            Ok(Ok(true)) => debug!(public_id, "Removed remote media"),
            Ok(Ok(false)) => debug!(public_id, "Remote media already absent"),
            Ok(Err(e)) => warn!(public_id, error = %e, "Failed to remove remote media"),
            Err(_) => warn!(public_id, "Timed out removing remote media"),
        }
    }
}
