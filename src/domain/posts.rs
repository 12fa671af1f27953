//! Post invariants: text rules, display preview, image checks and the authorship gate.

use imagesize::{ImageError, ImageType};

use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::types::Viewer;

/// Number of characters a post is shortened to when displayed as a string.
pub const PREVIEW_CHARS: usize = 15;

/// First [`PREVIEW_CHARS`] characters of the text.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Validate and normalise post or comment text.
pub fn normalize_text(field: &'static str, text: &str) -> Result<String, DomainError> {
    let normalized = text.replace("\r\n", "\n");
    if normalized.trim().is_empty() {
        return Err(DomainError::validation(field, "This field is required."));
    }
    Ok(normalized)
}

/// Whether the viewer may edit or delete the post.
pub fn can_mutate(post: &PostRecord, viewer: &Viewer) -> bool {
    viewer.user_id() == Some(post.author_id)
}

/// Raster formats accepted for post images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Gif,
    Png,
    Jpeg,
    Webp,
    Bmp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Gif => "gif",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
            ImageFormat::Bmp => "bmp",
        }
    }
}

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Sniff the payload and confirm it is a supported, readable image.
pub fn detect_image(bytes: &[u8]) -> Result<ImageFormat, DomainError> {
    let format = match imagesize::image_type(bytes) {
        Ok(ImageType::Gif) => ImageFormat::Gif,
        Ok(ImageType::Png) => ImageFormat::Png,
        Ok(ImageType::Jpeg) => ImageFormat::Jpeg,
        Ok(ImageType::Webp) => ImageFormat::Webp,
        Ok(ImageType::Bmp) => ImageFormat::Bmp,
        Ok(_) | Err(ImageError::NotSupported) => {
            return Err(DomainError::validation("image", INVALID_IMAGE));
        }
        Err(ImageError::CorruptedImage) | Err(ImageError::IoError(_)) => {
            return Err(DomainError::validation("image", INVALID_IMAGE));
        }
    };

    match imagesize::blob_size(bytes) {
        Ok(size) if size.width > 0 && size.height > 0 => Ok(format),
        _ => Err(DomainError::validation("image", INVALID_IMAGE)),
    }
}
