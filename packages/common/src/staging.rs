//! Local staging area for inbound media.
//!
//! Uploads are streamed onto local disk first and only then forwarded to the
//! remote media store. Every staged file has a unique name of the form
//! `{unix millis}-{uuid}.{ext}` so concurrent uploads never collide.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// File extensions accepted as post media.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("File type not allowed: only jpg, jpeg, png and gif images are accepted")]
    UnsupportedType,
    #[error("File exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Uploaded file is empty")]
    Empty,
    #[error("staging IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StagingError {
    /// Whether the error was caused by the uploaded content rather than the server.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Check that a file is an accepted image, by extension AND declared content type.
///
/// Returns the lowercase extension.
pub fn image_extension(
    file_name: &str,
    content_type: Option<&str>,
) -> Result<String, StagingError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        .ok_or(StagingError::UnsupportedType)?;

    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .ok_or(StagingError::UnsupportedType)?;

    match declared.strip_prefix("image/") {
        Some(subtype) if IMAGE_EXTENSIONS.contains(&subtype) => Ok(ext),
        _ => Err(StagingError::UnsupportedType),
    }
}

/// Directory receiving inbound files before they are forwarded.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    max_size: u64,
}

impl StagingArea {
    /// Create the staging area, creating `dir` if needed.
    pub async fn new(dir: PathBuf, max_size: u64) -> Result<Self, StagingError> {
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, max_size })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate the file type and open a new staged file for writing.
    pub async fn begin(
        &self,
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<StagedWriter, StagingError> {
        let extension = image_extension(file_name, content_type)?;
        let path = self.dir.join(format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple(),
            extension
        ));
        let file = fs::File::create(&path).await?;

        Ok(StagedWriter {
            file,
            path,
            extension,
            written: 0,
            limit: self.max_size,
        })
    }

    /// Stage an in-memory buffer in one go.
    pub async fn stage(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<StagedFile, StagingError> {
        let mut writer = self.begin(file_name, content_type).await?;
        if let Err(e) = writer.write(data).await {
            writer.abort().await;
            return Err(e);
        }
        writer.finish().await
    }
}

/// A staged file that is still being written.
///
/// Callers must end it with either [`StagedWriter::finish`] or
/// [`StagedWriter::abort`]; a failed `write` leaves the partial file in place.
pub struct StagedWriter {
    file: fs::File,
    path: PathBuf,
    extension: String,
    written: u64,
    limit: u64,
}

impl StagedWriter {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StagingError> {
        self.written += chunk.len() as u64;
        if self.written > self.limit {
            return Err(StagingError::TooLarge { limit: self.limit });
        }
        self.file.write_all(chunk).await?;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StagedFile, StagingError> {
        if let Err(e) = self.file.flush().await {
            self.abort().await;
            return Err(e.into());
        }
        if self.written == 0 {
            self.abort().await;
            return Err(StagingError::Empty);
        }

        let content_type = mime_guess::from_ext(&self.extension)
            .first_or_octet_stream()
            .to_string();

        Ok(StagedFile {
            path: self.path,
            extension: self.extension,
            content_type,
            size: self.written,
        })
    }

    /// Drop the partial file.
    pub async fn abort(self) {
        drop(self.file);
        remove_quietly(&self.path).await;
    }
}

/// A complete file sitting in the staging area.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    extension: String,
    content_type: String,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Content type derived from the extension.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remove the file from the staging area. Failures are logged, never returned.
    pub async fn discard(self) {
        remove_quietly(&self.path).await;
    }
}

async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed staged file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged file"),
    }
}
