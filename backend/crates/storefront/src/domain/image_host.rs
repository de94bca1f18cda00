//! Image Host
//!
//! Upload and deletion of product images, plus the pure URL helpers for
//! on-the-fly resizing.

use thiserror::Error;

use crate::domain::entity::product::ProductImage;

#[derive(Debug, Error)]
pub enum ImageHostError {
    #[error("image upload failed: {0}")]
    Upload(String),
    #[error("image deletion failed: {0}")]
    Delete(String),
    #[error("image host unreachable: {0}")]
    Transport(String),
}

#[trait_variant::make(ImageHost: Send)]
pub trait LocalImageHost {
    /// Upload raw bytes into `folder`
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<ProductImage, ImageHostError>;

    /// Delete by public id; `Ok(false)` when deletion is not possible
    /// (no credentials configured or the asset was already gone)
    async fn delete(&self, public_id: &str) -> Result<bool, ImageHostError>;
}

/// Resize/format transformation applied through the delivery URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTransform {
    pub width: u32,
    pub height: u32,
    pub quality: String,
    pub format: String,
    pub crop: String,
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            width: 400,
            height: 500,
            quality: "auto".to_string(),
            format: "auto".to_string(),
            crop: "fill".to_string(),
        }
    }
}

impl ImageTransform {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    fn segment(&self) -> String {
        format!(
            "w_{},h_{},q_{},f_{},c_{}",
            self.width, self.height, self.quality, self.format, self.crop
        )
    }
}

const UPLOAD_MARKER: &str = "/upload/";

/// Insert a transformation after `/upload/`; other URLs come back unchanged
pub fn build_optimized_url(url: &str, transform: &ImageTransform) -> String {
    match url.split_once(UPLOAD_MARKER) {
        Some((head, tail)) if !url.is_empty() => {
            format!("{head}{UPLOAD_MARKER}{}/{tail}", transform.segment())
        }
        _ => url.to_string(),
    }
}

/// Public id of an image-host URL: path after `/upload/`, minus
/// transformation and version segments and the file extension
pub fn extract_public_id(url: &str) -> Option<String> {
    let (_, tail) = url.split_once(UPLOAD_MARKER)?;

    let segments: Vec<&str> = tail
        .split('/')
        .skip_while(|segment| is_transformation(segment) || is_version(segment))
        .collect();

    let path = segments.join("/");
    let public_id = match path.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => path.as_str(),
    };

    (!public_id.is_empty()).then(|| public_id.to_string())
}

/// Transformation parameter keys that may open a delivery URL segment
const TRANSFORMATION_KEYS: &[&str] = &[
    "w", "h", "c", "q", "f", "g", "x", "y", "r", "e", "t", "a", "ar", "dpr", "fl",
];

fn is_transformation(segment: &str) -> bool {
    segment.split(',').all(|param| {
        param
            .split_once('_')
            .is_some_and(|(key, _)| TRANSFORMATION_KEYS.contains(&key))
    })
}

fn is_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}
