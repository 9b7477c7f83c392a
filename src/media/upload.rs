use std::path::{Path, PathBuf};
use tokio::fs;

use crate::api::content_type_for;
use crate::api::model::UploadFile;
use crate::errors::{ApiError, ApiResult};
use crate::model::MediaType;

/// Guess a media type from the file's MIME type. Logos are never guessed.
pub fn guess_media_type(path: &Path) -> MediaType {
    let mime = content_type_for(path);
    if mime.starts_with("image/") {
        MediaType::Photo
    } else if mime.starts_with("video/") {
        MediaType::Video
    } else {
        MediaType::Document
    }
}

/// Check files exist, are within `max_bytes`, and attach a media type.
pub async fn prepare_uploads(
    paths: &[PathBuf],
    media_type: Option<MediaType>,
    max_bytes: u64,
) -> ApiResult<Vec<UploadFile>> {
    if paths.is_empty() {
        return Err(ApiError::InvalidInput("no files given".to_string()));
    }
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let meta = fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(ApiError::InvalidInput(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if meta.len() > max_bytes {
            return Err(ApiError::InvalidInput(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                meta.len(),
                max_bytes
            )));
        }
        files.push(UploadFile {
            path: path.clone(),
            media_type: media_type.unwrap_or_else(|| guess_media_type(path)),
        });
    }
    Ok(files)
}
