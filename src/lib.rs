#![doc = "The `recipeshare` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, blob storage, routing configuration and error"]
#![doc = "handling for the recipe-sharing service. The binary (`main.rs`) wires them into"]
#![doc = "an Actix Web server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod models;
pub mod routes;
pub mod storage;

pub use crate::error::AppError;
