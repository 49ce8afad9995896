#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::test;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use recipeshare::auth::AuthResponse;
use recipeshare::storage::{BlobStore, MemoryBlobStore};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const BOUNDARY: &str = "recipeshare-test-boundary";

/// Builds the full application the way `main.rs` does, minus CORS.
macro_rules! test_app {
    ($pool:expr, $store:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool))
                .app_data(actix_web::web::Data::from($store))
                .wrap(actix_web::middleware::Logger::default())
                .service(recipeshare::routes::health::health)
                .service(recipeshare::routes::images::get_image)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(recipeshare::auth::AuthMiddleware)
                        .configure(recipeshare::routes::config),
                ),
        )
        .await
    };
}

/// Every test binary uses the same secret, so setting it repeatedly is harmless.
pub fn init() {
    std::env::set_var("JWT_SECRET", JWT_SECRET);
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A pool that never connects. Enough for anything rejected before the first query.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/recipeshare_unused")
        .expect("lazy pool")
}

/// Connects to `DATABASE_URL` and applies migrations.
pub async fn db_pool() -> PgPool {
    dotenv::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    recipeshare::db::migrate(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub fn memory_store() -> (Arc<MemoryBlobStore>, Arc<dyn BlobStore>) {
    let store = Arc::new(MemoryBlobStore::new());
    let shared: Arc<dyn BlobStore> = store.clone();
    (store, shared)
}

/// A username no other test run has used, within the 32-character limit.
pub fn unique_username(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &suffix[..10])
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// A single-file `multipart/form-data` body and its content-type header value.
pub fn multipart_image(content_type: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{f}\"\r\n\
             Content-Type: {ct}\r\n\r\n",
            b = BOUNDARY,
            f = filename,
            ct = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub async fn register_user(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    password: &str,
) -> AuthResponse {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "firstName": "Test",
            "lastName": "Cook",
            "username": username,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Registration failed. Body: {}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).expect("Failed to parse registration response")
}

pub async fn cleanup_user(pool: &PgPool, username: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(username)
        .execute(pool)
        .await;
}
