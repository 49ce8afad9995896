use crate::{
    auth::{
        generate_token, hash_password, normalize_username, verify_password, AuthResponse,
        AuthenticatedUser, LoginRequest, RegisterRequest, UsernameAvailability,
    },
    error::AppError,
    models::{User, USER_COLUMNS},
};
use actix_web::{get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Looks a user up by normalized username.
pub(crate) async fn find_user(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Register a new user
///
/// Creates a new user account and returns an authentication token.
///
/// ## Responses:
/// - `201 Created`: `{token, user}`.
/// - `400 Bad Request`: Validation failure, or the username (case/whitespace-insensitive) is taken.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let register_data = register_data.into_inner().normalize();
    register_data.validate()?;

    if find_user(&pool, &register_data.username).await?.is_some() {
        return Err(AppError::BadRequest("Username already taken".into()));
    }

    let password_hash = hash_password(&register_data.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (first_name, last_name, username, password_hash) \
         VALUES ($1, $2, $3, $4) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&register_data.first_name)
    .bind(&register_data.last_name)
    .bind(&register_data.username)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await
    .map_err(|e| match AppError::from(e) {
        // Lost a race with a concurrent registration of the same name.
        AppError::Conflict(_) => AppError::BadRequest("Username already taken".into()),
        other => other,
    })?;

    log::info!("Registered user {} ({})", user.username, user.id);

    let token = generate_token(user.id, &user.username)?;
    Ok(HttpResponse::Created().json(AuthResponse { token, user }))
}

/// Login user
///
/// Authenticates a user and returns an authentication token.
/// Unknown usernames and wrong passwords both yield `401 Unauthorized`.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let username = normalize_username(&login_data.username);
    let user = match find_user(&pool, &username).await? {
        Some(user) => user,
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
    };

    if !verify_password(&login_data.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = generate_token(user.id, &user.username)?;
    Ok(HttpResponse::Ok().json(AuthResponse { token, user }))
}

/// Reports whether a username is still free, after normalization.
#[get("/check-username/{username}")]
pub async fn check_username(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let username = normalize_username(&username);
    let available = find_user(&pool, &username).await?.is_none();
    Ok(HttpResponse::Ok().json(UsernameAvailability {
        username,
        available,
    }))
}

/// Returns the profile behind the bearer token.
#[get("/me")]
pub async fn me(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let profile = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(user.id)
    .fetch_optional(&**pool)
    .await?
    // The token outlived its account.
    .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

    Ok(HttpResponse::Ok().json(profile))
}
