use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use recipeshare::{
    auth::AuthMiddleware,
    config::Config,
    db,
    routes::{self, health, images},
    storage::{BlobStore, LocalBlobStore},
};

fn startup_error<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> std::io::Error {
    move |e| {
        log::error!("{}: {}", context, e);
        std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error("Invalid configuration"))?;

    let pool = db::connect(&config)
        .await
        .map_err(startup_error("Failed to connect to database"))?;
    db::migrate(&pool)
        .await
        .map_err(startup_error("Failed to run migrations"))?;

    let store: Arc<dyn BlobStore> = Arc::new(
        LocalBlobStore::new(&config.upload_dir)
            .await
            .map_err(startup_error("Failed to open upload directory"))?,
    );

    log::info!(
        "Starting recipeshare ({:?}) at {}",
        config.environment,
        config.server_url()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::from(store.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(images::get_image)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
