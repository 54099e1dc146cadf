pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::auth::AuthMiddleware;
use crate::error::{json_error_handler, query_error_handler};

/// Registers the task manager API.
///
/// Expects `web::Data<PgPool>` and `web::Data<TokenSettings>` to be provided by the app.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(health::health)
        .service(
            web::scope("/users")
                .service(users::signup)
                .service(users::login)
                .service(users::logout)
                .service(users::logout_all)
                .service(users::get_profile)
                .service(users::update_profile)
                .service(users::delete_account)
                .service(users::upload_avatar)
                .service(users::delete_avatar)
                .service(users::get_avatar),
        )
        .service(
            web::scope("/tasks")
                .wrap(AuthMiddleware)
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
