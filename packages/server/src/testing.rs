//! In-memory collaborators for unit tests, with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::staging::{StagedFile, StagingArea};
use common::storage::{MediaStore, StorageError, StoredMedia, new_public_id};
use sea_orm::DbErr;
use tempfile::TempDir;
use uuid::Uuid;

use crate::entity::post;
use crate::extractors::auth::AuthUser;
use crate::service::PostService;
use crate::store::{NewPost, PostChanges, PostFilter, PostStore};

#[derive(Default)]
pub struct MemoryPostStore {
    posts: Mutex<Vec<post::Model>>,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    ack_delay: Mutex<Option<Duration>>,
    vanish_on_update: AtomicBool,
}

impl MemoryPostStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stall writes before they take effect.
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Stall writes after they have taken effect.
    pub fn delay_acks(&self, delay: Duration) {
        *self.ack_delay.lock().unwrap() = Some(delay);
    }

    /// Remove the target post right before an update, like a concurrent delete.
    pub fn vanish_on_update(&self, vanish: bool) {
        self.vanish_on_update.store(vanish, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<post::Model> {
        self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    pub fn push(&self, post: post::Model) {
        self.posts.lock().unwrap().push(post);
    }

    async fn before_write(&self) -> Result<(), DbErr> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("injected write failure".into()));
        }
        Ok(())
    }

    async fn after_write(&self) {
        let delay = *self.ack_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn apply(&self, id: Uuid, owner_id: Uuid, changes: PostChanges) -> Option<post::Model> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id && p.owner_id == owner_id)?;

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(description) = changes.description {
            post.description = description;
        }
        if let Some(category) = changes.category {
            post.category = Some(category);
        }
        if let Some(tags) = changes.tags {
            post.tags = tags;
        }
        if let Some(media) = changes.media {
            post.media_url = Some(media.url);
            post.media_public_id = Some(media.public_id);
        }
        post.updated_at = Utc::now();
        Some(post.clone())
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn insert(&self, new: NewPost) -> Result<post::Model, DbErr> {
        self.before_write().await?;
        let now = Utc::now();
        let (media_url, media_public_id) = match new.media {
            Some(media) => (Some(media.url), Some(media.public_id)),
            None => (None, None),
        };
        let post = post::Model {
            id: new.id,
            title: new.title,
            description: new.description,
            media_url,
            media_public_id,
            category: new.category,
            tags: new.tags,
            owner_id: new.owner_id,
            owner_name: new.owner_name,
            created_at: now,
            updated_at: now,
        };
        self.push(post.clone());
        self.after_write().await;
        Ok(post)
    }

    async fn find(&self, id: Uuid) -> Result<Option<post::Model>, DbErr> {
        Ok(self.get(id))
    }

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<post::Model>, DbErr> {
        Ok(self.get(id).filter(|p| p.owner_id == owner_id))
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<post::Model>, DbErr> {
        self.before_write().await?;
        if self.vanish_on_update.load(Ordering::SeqCst) {
            self.posts.lock().unwrap().retain(|p| p.id != id);
        }
        let updated = self.apply(id, owner_id, changes);
        self.after_write().await;
        Ok(updated)
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<bool, DbErr> {
        self.before_write().await?;
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| !(p.id == id && p.owner_id == owner_id));
        Ok(posts.len() < before)
    }

    async fn list(&self, filter: PostFilter) -> Result<Vec<post::Model>, DbErr> {
        let mut found: Vec<_> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[derive(Default)]
pub struct MemoryMediaStore {
    objects: Mutex<HashMap<String, String>>,
    uploads: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
    upload_delay: Mutex<Option<Duration>>,
}

impl MemoryMediaStore {
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn delay_uploads(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = Some(delay);
    }

    /// Upload attempts so far, failed ones included.
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.objects.lock().unwrap().contains_key(public_id)
    }

    pub fn url_of(&self, public_id: &str) -> Option<String> {
        self.objects.lock().unwrap().get(public_id).cloned()
    }

    pub fn insert(&self, public_id: &str, url: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(public_id.to_string(), url.to_string());
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, file: &StagedFile) -> Result<StoredMedia, StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.upload_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected upload failure".into()));
        }

        let public_id = new_public_id();
        let url = format!("https://media.test/posts/{public_id}.{}", file.extension());
        self.insert(&public_id, &url);
        Ok(StoredMedia { public_id, url })
    }

    async fn delete(&self, public_id: &str) -> Result<bool, StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected delete failure".into()));
        }
        Ok(self.objects.lock().unwrap().remove(public_id).is_some())
    }
}

/// Insert a post directly into `store`, bypassing the service.
pub fn seed_post(
    store: &MemoryPostStore,
    owner: &AuthUser,
    title: &str,
    customize: impl FnOnce(&mut post::Model),
) -> post::Model {
    let now = Utc::now();
    let mut post = post::Model {
        id: Uuid::now_v7(),
        title: title.into(),
        description: format!("About {title}"),
        media_url: None,
        media_public_id: None,
        category: Some("general".into()),
        tags: Vec::new(),
        owner_id: owner.user_id,
        owner_name: owner.username.clone(),
        created_at: now,
        updated_at: now,
    };
    customize(&mut post);
    store.push(post.clone());
    post
}

fn principal(username: &str) -> AuthUser {
    AuthUser {
        user_id: Uuid::now_v7(),
        username: username.into(),
        email: format!("{username}@example.com"),
    }
}

/// A [`PostService`] wired to in-memory stores, plus two users.
pub struct Harness {
    pub service: PostService,
    pub posts: Arc<MemoryPostStore>,
    pub media: Arc<MemoryMediaStore>,
    pub staging: StagingArea,
    pub alice: AuthUser,
    pub bob: AuthUser,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("uploads"), 1024 * 1024)
            .await
            .unwrap();
        let posts = Arc::new(MemoryPostStore::default());
        let media = Arc::new(MemoryMediaStore::default());
        let service = PostService::new(posts.clone(), media.clone(), Duration::from_secs(30));

        Self {
            service,
            posts,
            media,
            staging,
            alice: principal("alice"),
            bob: principal("bob"),
            _dir: dir,
        }
    }

    /// Stage a small PNG.
    pub async fn stage(&self) -> StagedFile {
        self.staging
            .stage("photo.png", Some("image/png"), b"\x89PNG fake image")
            .await
            .unwrap()
    }
}
