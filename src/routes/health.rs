use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

/// Health check endpoint
///
/// Reports `ok` when the database answers a trivial query, `degraded` with
/// `503 Service Unavailable` when it does not.
#[get("/health")]
pub async fn health(pool: web::Data<PgPool>) -> impl Responder {
    let database = match sqlx::query("SELECT 1").execute(&**pool).await {
        Ok(_) => "ok",
        Err(e) => {
            log::warn!("Health check could not reach the database: {}", e);
            "unavailable"
        }
    };

    let body = json!({
        "status": if database == "ok" { "ok" } else { "degraded" },
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now()
    });

    if database == "ok" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
