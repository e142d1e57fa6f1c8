//! Image inputs selected for a try-on submission.
//!
//! An [`ImageInput`] is the payload of one upload slot: raw bytes, the
//! declared media type, and a file name. Inputs are never validated here;
//! the submission client decides whether an input is acceptable.

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TryOnError};

/// Media type used when a file extension is not recognized.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Image formats `load` can infer from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// `.png`
    Png,
    /// `.jpg` or `.jpeg`
    Jpeg,
    /// `.gif`
    Gif,
    /// `.webp`
    Webp,
    /// `.bmp`
    Bmp,
    /// `.svg`
    Svg,
}

impl ImageFormat {
    /// Maps a file extension (case-insensitive, without the dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let format = match ext.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "webp" => Self::Webp,
            "bmp" => Self::Bmp,
            "svg" => Self::Svg,
            _ => return None,
        };
        Some(format)
    }

    /// Format implied by the extension of `path`, if any.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }

    /// Media type sent with uploads of this format.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Svg => "image/svg+xml",
        }
    }
}

/// A selected image file awaiting submission.
///
/// Clones share the payload buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    file_name: String,
    media_type: String,
    data: Bytes,
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.size_bytes())
            .finish_non_exhaustive()
    }
}

impl ImageInput {
    /// Creates an input from in-memory bytes and a declared media type.
    ///
    /// # Examples
    ///
    /// ```
    /// use tryon_client::ImageInput;
    ///
    /// let input = ImageInput::from_bytes("me.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47]);
    /// assert_eq!(input.size_bytes(), 4);
    /// assert_eq!(input.media_type(), "image/png");
    /// ```
    #[must_use]
    pub fn from_bytes(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data: Bytes::from(data),
        }
    }

    /// Loads an input from disk, inferring the media type from the extension.
    ///
    /// Unrecognized extensions get [`FALLBACK_MEDIA_TYPE`], which the
    /// submission client rejects as an invalid format.
    ///
    /// # Errors
    ///
    /// Returns `TryOnError::ImageNotFound` if the file doesn't exist.
    /// Returns `TryOnError::Io` for any other read failure.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TryOnError::image_not_found(path)
            } else {
                TryOnError::Io(e)
            }
        })?;

        let media_type = ImageFormat::from_path(path)
            .map_or(FALLBACK_MEDIA_TYPE, |format| format.media_type());
        let file_name = path.file_name().map_or_else(
            || "upload".to_string(),
            |name| name.to_string_lossy().to_string(),
        );

        tracing::debug!(
            path = %path.display(),
            media_type,
            size = data.len(),
            "Loaded image input"
        );

        Ok(Self {
            file_name,
            media_type: media_type.to_string(),
            data: Bytes::from(data),
        })
    }

    /// File name sent with the multipart part.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared media type.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Raw payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the payload, for uploading without a copy.
    #[must_use]
    pub fn payload(&self) -> Bytes {
        self.data.clone()
    }

    /// Byte length of the payload.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns `true` if the declared media type is an `image/*` type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }

    /// Returns a serializable description of this input without the payload.
    #[must_use]
    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            file_name: self.file_name.clone(),
            media_type: self.media_type.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

/// Payload-free description of an [`ImageInput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    /// File name of the input.
    pub file_name: String,
    /// Declared media type.
    pub media_type: String,
    /// Byte length of the payload.
    pub size_bytes: u64,
}
