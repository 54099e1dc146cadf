pub mod task;
pub mod user;

use serde_json::{Map, Value};

use crate::error::AppError;

pub use task::{SortDirection, SortOrder, Task, TaskInput, TaskQuery, TaskUpdate, TASK_UPDATE_FIELDS};
pub use user::{NewUser, User, UserUpdate, USER_UPDATE_FIELDS};

/// Rejects an update body unless every key is in `allowed`.
pub fn ensure_allowed_fields(body: &Map<String, Value>, allowed: &[&str]) -> Result<(), AppError> {
    if body.keys().all(|key| allowed.contains(&key.as_str())) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid updates!".into()))
    }
}

/// Checks the keys of a JSON update body and then deserializes it.
pub fn parse_update<T>(body: Map<String, Value>, allowed: &[&str]) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    ensure_allowed_fields(&body, allowed)?;
    serde_json::from_value(Value::Object(body)).map_err(|e| AppError::BadRequest(e.to_string()))
}
