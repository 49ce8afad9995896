use actix_multipart::Multipart;
use futures::StreamExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::BlobStore;

/// Largest accepted upload, 5 MiB.
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Public path prefix under which stored images are served.
pub const IMAGE_ROUTE_PREFIX: &str = "/images/";

/// The image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    /// Kind implied by a blob key's extension.
    pub fn from_key(key: &str) -> Option<Self> {
        key.rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }
}

#[derive(Debug)]
pub struct ImageUpload {
    pub kind: ImageKind,
    pub data: Vec<u8>,
}

/// Checks a declared content type and a payload size against the upload rules.
pub fn validate_image(content_type: Option<&str>, size: usize) -> Result<ImageKind, AppError> {
    let kind = content_type
        .and_then(ImageKind::from_mime)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Unsupported image type {}. Allowed: image/jpeg, image/png, image/gif",
                content_type.unwrap_or("(none)")
            ))
        })?;
    if size == 0 {
        return Err(AppError::BadRequest("Uploaded image is empty".into()));
    }
    if size > MAX_IMAGE_SIZE {
        return Err(too_large());
    }
    Ok(kind)
}

fn too_large() -> AppError {
    AppError::BadRequest(format!(
        "Image too large. Maximum size is {} bytes",
        MAX_IMAGE_SIZE
    ))
}

/// Reads the first file field of a multipart body as an image.
///
/// Fields without a filename are skipped. Reading stops as soon as the field
/// grows past `MAX_IMAGE_SIZE`, so oversized uploads are never fully buffered.
pub async fn read_image_upload(mut payload: Multipart) -> Result<ImageUpload, AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        let is_file = field
            .content_disposition()
            .get_filename()
            .is_some();
        if !is_file {
            continue;
        }

        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        // Reject wrong types before reading the body.
        validate_image(content_type.as_deref(), 1)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > MAX_IMAGE_SIZE {
                return Err(too_large());
            }
            data.extend_from_slice(&chunk);
        }

        let kind = validate_image(content_type.as_deref(), data.len())?;
        return Ok(ImageUpload { kind, data });
    }
    Err(AppError::BadRequest("No image file provided".into()))
}

/// A fresh, collision-free key such as `recipe-<uuid>.png`.
pub fn new_image_key(prefix: &str, kind: ImageKind) -> String {
    format!("{}-{}.{}", prefix, Uuid::new_v4(), kind.extension())
}

pub fn image_url(key: &str) -> String {
    format!("{}{}", IMAGE_ROUTE_PREFIX, key)
}

/// Inverse of [`image_url`]. `None` for URLs this service did not produce.
pub fn key_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(IMAGE_ROUTE_PREFIX)
        .filter(|key| !key.is_empty())
}

/// Stores `upload` under a new key and returns its public URL.
pub async fn store_image(
    store: &dyn BlobStore,
    prefix: &str,
    upload: ImageUpload,
) -> Result<String, AppError> {
    let key = new_image_key(prefix, upload.kind);
    store.put(&key, upload.data).await?;
    Ok(image_url(&key))
}

/// Deletes the blob behind a previously issued image URL.
///
/// Failures are logged and swallowed: a dangling blob is not worth failing
/// the request that replaced or removed it.
pub async fn discard_image(store: &dyn BlobStore, url: Option<&str>) {
    let Some(key) = url.and_then(key_from_url) else {
        return;
    };
    if let Err(e) = store.delete(key).await {
        log::warn!("Failed to delete previous image {}: {}", key, e);
    }
}
