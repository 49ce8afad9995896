use crate::{error::AppError, images::ImageKind, storage::BlobStore};
use actix_web::{get, http::header, web, HttpResponse, Responder};

/// Serves a stored image by key.
///
/// The content type comes from the key's extension; keys this service
/// did not mint (unknown extension, path tricks) are reported as missing.
///
/// ## Responses:
/// - `200 OK`: The image bytes.
/// - `404 Not Found`: Unknown or malformed key.
#[get("/images/{key}")]
pub async fn get_image(
    store: web::Data<dyn BlobStore>,
    key: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let key = key.into_inner();
    let kind = ImageKind::from_key(&key)
        .ok_or_else(|| AppError::NotFound(format!("Image {} not found", key)))?;

    let data = store.get(&key).await?;

    Ok(HttpResponse::Ok()
        .content_type(kind.mime())
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(data))
}
