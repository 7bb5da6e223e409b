use super::error::StorageError;

/// Generate a fresh public id for a new object.
pub fn new_public_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Reject ids that could escape the store's namespace (path separators, dots, ...).
pub fn validate_public_id(public_id: &str) -> Result<(), StorageError> {
    let valid = !public_id.is_empty()
        && public_id.len() <= 128
        && public_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidPublicId(public_id.to_string()))
    }
}

/// Recover the public id from an object URL.
///
/// Takes the final path segment (after the last `/`) and strips its
/// extension (from the last `.`). Returns `None` if nothing is left.
pub fn public_id_from_url(url: &str) -> Option<&str> {
    let segment = url.rsplit('/').next().unwrap_or(url);
    let stem = match segment.rfind('.') {
        Some(dot) => &segment[..dot],
        None => segment,
    };
    (!stem.is_empty()).then_some(stem)
}
