//! Tasks and the owner-scoped queries over them.
//!
//! Every statement that touches a single task filters on `id` and `owner_id`
//! together, so a task owned by someone else is indistinguishable from one
//! that does not exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Keys a client may send to `PATCH /tasks/{id}`.
pub const TASK_UPDATE_FIELDS: &[&str] = &["description", "completed"];

const TASK_COLUMNS: &str = "id, description, completed, owner_id, created_at, updated_at";

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Required; must be non-empty once trimmed.
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    /// Defaults to `false`.
    #[serde(default)]
    pub completed: bool,
}

impl TaskInput {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            completed: self.completed,
        }
    }
}

/// Partial update for a task. Keys are checked against [`TASK_UPDATE_FIELDS`] first.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    /// Identifier of the user who owns the task.
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters accepted by `GET /tasks`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Only tasks with this completion state.
    pub completed: Option<bool>,
    /// Page size; `0` or absent means no limit.
    pub limit: Option<u32>,
    /// Number of tasks to skip.
    pub skip: Option<u32>,
    /// `field` or `field:direction`, e.g. `createdAt:desc`.
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A validated sort order. Only whitelisted column names are ever produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: "created_at",
            direction: SortDirection::Asc,
        }
    }
}

impl SortOrder {
    /// Parses `field[:asc|desc]`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (field, direction) = match raw.split_once(':') {
            Some((field, direction)) => (field, Some(direction)),
            None => (raw, None),
        };

        let column = match field.trim() {
            "createdAt" | "created_at" => "created_at",
            "updatedAt" | "updated_at" => "updated_at",
            "description" => "description",
            "completed" => "completed",
            other => return Err(AppError::BadRequest(format!("Cannot sort by '{}'", other))),
        };

        let direction = match direction.map(|d| d.trim().to_ascii_lowercase()) {
            None => SortDirection::Asc,
            Some(d) if d == "asc" => SortDirection::Asc,
            Some(d) if d == "desc" => SortDirection::Desc,
            Some(d) => {
                return Err(AppError::BadRequest(format!("Invalid sort direction '{}'", d)))
            }
        };

        Ok(Self { column, direction })
    }
}

impl TaskQuery {
    /// Builds the list statement.
    ///
    /// Placeholders are numbered in bind order: `$1` owner, then `completed`
    /// if filtered, then `LIMIT` and `OFFSET` when present.
    pub fn to_sql(&self) -> Result<String, AppError> {
        let order = match &self.sort_by {
            Some(raw) => SortOrder::parse(raw)?,
            None => SortOrder::default(),
        };

        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1");
        let mut param_count = 2;

        if self.completed.is_some() {
            sql.push_str(&format!(" AND completed = ${}", param_count));
            param_count += 1;
        }

        sql.push_str(&format!(
            " ORDER BY {} {}, id {}",
            order.column,
            order.direction.as_sql(),
            order.direction.as_sql()
        ));

        if self.effective_limit().is_some() {
            sql.push_str(&format!(" LIMIT ${}", param_count));
            param_count += 1;
        }
        if self.skip.is_some() {
            sql.push_str(&format!(" OFFSET ${}", param_count));
        }

        Ok(sql)
    }

    fn effective_limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }
}

impl Task {
    pub fn new(input: TaskInput, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description,
            completed: input.completed,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, description, completed, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TASK_COLUMNS}"
        ))
        .bind(self.id)
        .bind(&self.description)
        .bind(self.completed)
        .bind(self.owner_id)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;
        Ok(task)
    }

    /// Tasks owned by `owner_id`, filtered, sorted and paginated per `query`.
    pub async fn list_owned(pool: &PgPool, owner_id: Uuid, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let sql = query.to_sql()?;

        let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(owner_id);
        if let Some(completed) = query.completed {
            query_builder = query_builder.bind(completed);
        }
        if let Some(limit) = query.effective_limit() {
            query_builder = query_builder.bind(i64::from(limit));
        }
        if let Some(skip) = query.skip {
            query_builder = query_builder.bind(i64::from(skip));
        }

        Ok(query_builder.fetch_all(pool).await?)
    }

    pub async fn find_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
        Ok(task)
    }

    /// Applies `update` to the task if `owner_id` owns it; `None` otherwise.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET \
                 description = COALESCE($3, description), \
                 completed = COALESCE($4, completed), \
                 updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(&update.description)
        .bind(update.completed)
        .fetch_optional(pool)
        .await?;
        Ok(task)
    }

    /// Deletes the task if `owner_id` owns it and returns it.
    pub async fn delete_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
        Ok(task)
    }
}
