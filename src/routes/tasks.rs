use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{parse_update, Task, TaskInput, TaskQuery, TaskUpdate, TASK_UPDATE_FIELDS},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` or `false`.
/// - `limit` (optional): page size, `0` for no limit.
/// - `skip` (optional): number of tasks to skip.
/// - `sortBy` (optional): `createdAt`, `updatedAt`, `description` or `completed`,
///   optionally followed by `:asc` or `:desc`.
///
/// ## Responses:
/// - `200 OK`: a JSON array of `Task` objects owned by the caller.
/// - `400 Bad Request`: unparsable parameters or an unknown sort field.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let tasks = Task::list_owned(&pool, auth.user.id, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task owned by the authenticated user.
///
/// ## Request Body:
/// - `description`: required, non-empty after trimming.
/// - `completed` (optional): defaults to `false`.
///
/// ## Responses:
/// - `201 Created`: the created `Task`.
/// - `400 Bad Request`: invalid body.
/// - `401 Unauthorized`: missing or invalid token.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let input = task_data.into_inner().normalized();
    input.validate()?;

    let task = Task::new(input, auth.user.id).insert(&pool).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one of the caller's tasks.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = Task::find_owned(&pool, task_id.into_inner(), auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates one of the caller's tasks.
///
/// Only `description` and `completed` may be sent.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: a disallowed key or an invalid value.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[patch("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<Uuid>,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let update: TaskUpdate = parse_update(body.into_inner(), TASK_UPDATE_FIELDS)?;
    let update = update.normalized();
    update.validate()?;

    let task = Task::update_owned(&pool, task_id.into_inner(), auth.user.id, &update)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes one of the caller's tasks and returns it.
///
/// ## Responses:
/// - `200 OK`: the deleted `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = Task::delete_owned(&pool, task_id.into_inner(), auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}
