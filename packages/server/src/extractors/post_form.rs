use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use common::staging::{StagedFile, StagingArea};

use crate::error::AppError;
use crate::models::shared::{non_blank, parse_tags};
use crate::service::posts::PostDraft;
use crate::state::AppState;
use crate::store::PostChanges;

/// Multipart body of a post create/update request.
///
/// The media file is streamed into the staging area while the body is read,
/// so it is size- and type-checked before anything is sent to the media
/// store. Whoever ends up holding the form owns the staged file and must
/// discard it.
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// `None` when no `tags` field was sent.
    pub tags: Option<Vec<String>>,
    pub media: Option<StagedFile>,
}

impl PostForm {
    pub async fn discard(self) {
        if let Some(media) = self.media {
            media.discard().await;
        }
    }

    /// Fields and media of a new post. Title, description, category and a
    /// file are all required; on failure the staged file is discarded.
    pub async fn into_draft(self) -> Result<(PostDraft, StagedFile), AppError> {
        match (self.draft_fields(), self.media) {
            (Ok(draft), Some(media)) => Ok((draft, media)),
            (Ok(_), None) => Err(AppError::Validation("No file uploaded".into())),
            (Err(e), media) => {
                if let Some(media) = media {
                    media.discard().await;
                }
                Err(e)
            }
        }
    }

    fn draft_fields(&self) -> Result<PostDraft, AppError> {
        let required = |value: &Option<String>, message: &str| {
            non_blank(value.clone()).ok_or_else(|| AppError::Validation(message.into()))
        };

        Ok(PostDraft {
            title: required(&self.title, "Title is required")?,
            description: required(&self.description, "Description is required")?,
            category: required(&self.category, "Category is required")?.to_lowercase(),
            tags: self.tags.clone().unwrap_or_default(),
        })
    }

    /// Partial changes plus the optional replacement media. Blank text
    /// fields count as not supplied.
    pub fn into_changes(self) -> (PostChanges, Option<StagedFile>) {
        let changes = PostChanges {
            title: non_blank(self.title),
            description: non_blank(self.description),
            category: non_blank(self.category).map(|c| c.to_lowercase()),
            tags: self.tags,
            media: None,
        };
        (changes, self.media)
    }
}

/// Field names accepted for the media file. `mediaUrl` is the legacy name.
const MEDIA_FIELDS: &[&str] = &["media", "mediaUrl"];

impl FromRequest<AppState> for PostForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let mut form = PostForm::default();
        if let Err(e) = read_fields(&mut multipart, &mut form, &state.staging).await {
            form.discard().await;
            return Err(e);
        }
        Ok(form)
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    form: &mut PostForm,
    staging: &StagingArea,
) -> Result<(), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            n if MEDIA_FIELDS.contains(&n) => {
                if form.media.is_some() {
                    return Err(AppError::Validation(
                        "Only one media file may be uploaded".into(),
                    ));
                }
                form.media = Some(stage_field(field, staging).await?);
            }
            "title" => form.title = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "category" => form.category = Some(read_text(field).await?),
            "tags" => {
                let raw = read_text(field).await?;
                form.tags
                    .get_or_insert_with(Vec::new)
                    .extend(parse_tags(&raw));
            }
            _ => {} // Ignore unknown fields.
        }
    }
    Ok(())
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))
}

/// Stream a file field into the staging area.
async fn stage_field(mut field: Field<'_>, staging: &StagingArea) -> Result<StagedFile, AppError> {
    let file_name = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Media field must have a filename".into()))?;
    let content_type = field.content_type().map(str::to_string);

    let mut writer = staging.begin(&file_name, content_type.as_deref()).await?;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                writer.abort().await;
                return Err(AppError::Validation(format!("Failed to read media: {e}")));
            }
        };
        if let Err(e) = writer.write(&chunk).await {
            writer.abort().await;
            return Err(e.into());
        }
    }

    Ok(writer.finish().await?)
}
