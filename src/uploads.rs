use axum::extract::Multipart;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Multipart field carrying the recording.
pub const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No audio file uploaded")]
    Missing,

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] io::Error),
}

impl From<axum::extract::multipart::MultipartError> for UploadError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        UploadError::Multipart(err.body_text())
    }
}

/// A recording written to the upload directory, owned by one request.
#[derive(Debug)]
pub struct UploadedAudio {
    path: PathBuf,
}

impl UploadedAudio {
    /// Absolute path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Failures are logged and swallowed.
    pub async fn remove(self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed upload {}", self.path.display()),
            Err(e) => warn!("Failed to remove upload {}: {}", self.path.display(), e),
        }
    }
}

/// Keep only a short alphanumeric extension from the client's file name.
fn safe_extension(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Stream the `audio` field of the form into `upload_dir` under a fresh name.
/// Other fields are skipped.
pub async fn store_audio_upload(
    multipart: &mut Multipart,
    upload_dir: &Path,
) -> Result<UploadedAudio, UploadError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        tokio::fs::create_dir_all(upload_dir).await?;
        let dir = tokio::fs::canonicalize(upload_dir).await?;
        let file_name = match safe_extension(field.file_name()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let upload = UploadedAudio {
            path: dir.join(file_name),
        };

        let mut file = tokio::fs::File::create(upload.path()).await?;
        let written: Result<u64, UploadError> = async {
            let mut total = 0u64;
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await?;
                total += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(total)
        }
        .await;

        return match written {
            Ok(bytes) => {
                debug!("Stored {} byte upload at {}", bytes, upload.path().display());
                Ok(upload)
            }
            Err(e) => {
                drop(file);
                upload.remove().await;
                Err(e)
            }
        };
    }

    Err(UploadError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_kept_when_plain() {
        assert_eq!(safe_extension(Some("voice note.WEBM")), Some("webm".to_string()));
        assert_eq!(safe_extension(Some("clip.mp3")), Some("mp3".to_string()));
    }

    #[test]
    fn suspicious_extensions_are_dropped() {
        assert_eq!(safe_extension(None), None);
        assert_eq!(safe_extension(Some("noext")), None);
        assert_eq!(safe_extension(Some("evil.sh;rm")), None);
        assert_eq!(safe_extension(Some("a.verylongextension")), None);
    }

    #[tokio::test]
    async fn remove_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        UploadedAudio { path: path.clone() }.remove().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn remove_of_missing_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        UploadedAudio {
            path: dir.path().join("gone.wav"),
        }
        .remove()
        .await;
    }
}
