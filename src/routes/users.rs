use crate::{
    auth::{normalize_username, AuthenticatedUser},
    error::AppError,
    images::{discard_image, read_image_upload, store_image},
    models::{UpdateProfileRequest, User, USER_COLUMNS},
    routes::auth::find_user,
    storage::BlobStore,
};
use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Retrieves a user's public profile by username (case-insensitive).
///
/// ## Responses:
/// - `200 OK`: The `User` as JSON, without credentials.
/// - `404 Not Found`: No such user.
#[get("/{username}")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let username = normalize_username(&username);
    let profile = find_user(&pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(profile))
}

/// Updates the caller's own profile.
///
/// ## Responses:
/// - `200 OK`: The updated `User`.
/// - `400 Bad Request`: Validation failure.
/// - `403 Forbidden`: `{username}` is somebody else.
/// - `404 Not Found`: The account no longer exists.
#[put("/{username}")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
    profile_data: web::Json<UpdateProfileRequest>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let username = normalize_username(&username);
    user.ensure_is(&username)?;
    let profile_data = profile_data.into_inner().normalize();
    profile_data.validate()?;

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET first_name = $1, last_name = $2, bio = $3 \
         WHERE id = $4 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&profile_data.first_name)
    .bind(&profile_data.last_name)
    .bind(&profile_data.bio)
    .bind(user.id)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Uploads a new profile image for the caller.
///
/// Expects a `multipart/form-data` body with one file field (JPEG, PNG or GIF, at most 5 MiB).
/// The previous image is removed from the blob store on a best-effort basis.
///
/// ## Responses:
/// - `200 OK`: The updated `User`.
/// - `400 Bad Request`: Missing file, unsupported type, or too large.
/// - `403 Forbidden`: `{username}` is somebody else.
#[post("/{username}/image")]
pub async fn upload_user_image(
    pool: web::Data<PgPool>,
    store: web::Data<dyn BlobStore>,
    username: web::Path<String>,
    payload: Multipart,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let username = normalize_username(&username);
    user.ensure_is(&username)?;

    let upload = read_image_upload(payload).await?;

    let (previous,) =
        sqlx::query_as::<_, (Option<String>,)>("SELECT image_url FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_optional(&**pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let url = store_image(store.get_ref(), "user", upload).await?;

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET image_url = $1 WHERE id = $2 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&url)
    .bind(user.id)
    .fetch_one(&**pool)
    .await;

    let updated = match updated {
        Ok(updated) => updated,
        Err(e) => {
            // The row never pointed at the new blob; don't leave it behind.
            discard_image(store.get_ref(), Some(&url)).await;
            return Err(e.into());
        }
    };

    discard_image(store.get_ref(), previous.as_deref()).await;

    Ok(HttpResponse::Ok().json(updated))
}
