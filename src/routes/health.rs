use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;

const DATABASE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check endpoint
///
/// Reports whether the database answers a trivial query.
#[get("/health")]
pub async fn health(pool: web::Data<PgPool>) -> impl Responder {
    let probe = sqlx::query("SELECT 1").execute(pool.get_ref());
    let database = match tokio::time::timeout(DATABASE_PROBE_TIMEOUT, probe).await {
        Ok(Ok(_)) => "ok",
        Ok(Err(e)) => {
            log::warn!("health check could not reach the database: {}", e);
            "unavailable"
        }
        Err(_) => {
            log::warn!("health check timed out waiting for the database");
            "unavailable"
        }
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "database": database,
        "timestamp": Utc::now()
    }))
}
