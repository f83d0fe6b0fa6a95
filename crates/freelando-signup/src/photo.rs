//! Profile photo upload: image files become data URLs stored in the draft.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Result, SignupError};

/// A single image picked by the user.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Original file name; its extension decides the media type.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Wraps already-read contents.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads an image from disk.
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    /// The media type derived from the file extension.
    pub fn media_type(&self) -> Result<&'static str> {
        let extension = Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "png" => Ok("image/png"),
            "jpg" | "jpeg" => Ok("image/jpeg"),
            "gif" => Ok("image/gif"),
            "webp" => Ok("image/webp"),
            _ => Err(SignupError::UnsupportedImage(self.file_name.clone())),
        }
    }

    /// Encodes the image as a `data:` URL.
    pub fn to_data_url(&self) -> Result<String> {
        let media_type = self.media_type()?;
        Ok(format!(
            "data:{media_type};base64,{}",
            STANDARD.encode(&self.bytes)
        ))
    }
}
