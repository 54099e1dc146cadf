#![doc = "The `taskmanager` library crate."]
#![doc = ""]
#![doc = "This crate contains the domain models, authentication, routing and error handling"]
#![doc = "for the task manager API (`src/main.rs`), and the newsletter signup relay"]
#![doc = "(`src/bin/newsletter.rs`)."]

pub mod auth;
pub mod avatar;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod newsletter;
pub mod routes;

pub use crate::error::AppError;
