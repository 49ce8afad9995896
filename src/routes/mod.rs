pub mod auth;
pub mod health;
pub mod images;
pub mod recipes;
pub mod users;

use actix_web::{
    error::{Error as ActixError, JsonPayloadError, PathError, QueryPayloadError},
    web, HttpRequest,
};

use crate::error::AppError;

fn bad_request<E: std::fmt::Display>(err: E, _req: &HttpRequest) -> ActixError {
    AppError::BadRequest(err.to_string()).into()
}

/// Mounts the `/auth`, `/users` and `/recipes` groups. Meant to sit inside the `/api`
/// scope behind `AuthMiddleware`.
///
/// Malformed JSON bodies, paths and query strings are reported in the
/// same `{"error": ...}` shape as every other failure.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(bad_request::<JsonPayloadError>))
        .app_data(web::PathConfig::default().error_handler(bad_request::<PathError>))
        .app_data(web::QueryConfig::default().error_handler(bad_request::<QueryPayloadError>))
        .service(
            web::scope("/auth")
                .service(auth::login)
                .service(auth::register)
                .service(auth::check_username)
                .service(auth::me),
        )
        .service(
            web::scope("/users")
                .service(users::get_user)
                .service(users::update_user)
                .service(users::upload_user_image),
        )
        .service(
            // Literal segments first: `/{id}` would otherwise swallow them.
            web::scope("/recipes")
                .service(recipes::get_favorites)
                .service(recipes::get_recipes_by_user)
                .service(recipes::get_recipes)
                .service(recipes::create_recipe)
                .service(recipes::get_recipe)
                .service(recipes::update_recipe)
                .service(recipes::delete_recipe)
                .service(recipes::toggle_favorite)
                .service(recipes::upload_recipe_image),
        );
}
