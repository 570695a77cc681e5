use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateTaskRequest, UpdateTaskRequest},
    repo::TaskRepo,
    repo_types::{NewTask, Task, TaskChanges},
};
use crate::{
    error::{AppError, AppResult},
    validation::{char_len, Validator},
};

const TITLE_MIN: usize = 2;
const NOT_FOUND: AppError = AppError::NotFound("Not found");

/// Path ids that do not parse are answered like unknown ids.
pub fn parse_task_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| NOT_FOUND)
}

fn as_string(value: &Option<Value>) -> Option<Option<&str>> {
    value.as_ref().map(Value::as_str)
}

/// Same rules on create and update: a supplied title must be a string that
/// is at least two characters once trimmed. Only create requires it.
fn check_title(v: &mut Validator, raw: &Option<Value>, required: bool) -> Option<String> {
    let title = as_string(raw).map(|t| t.map(str::trim));
    v.field("title")
        .rule(!required || title.is_some(), "Title is required")
        .rule(!matches!(title, Some(None)), "Title must be a string")
        .rule(!matches!(title, Some(Some(""))), "Title is required")
        .rule(
            title.flatten().map_or(true, |t| char_len(t) >= TITLE_MIN),
            "Title must be at least 2 characters",
        );
    title.flatten().map(str::to_string)
}

pub fn validate_create(req: CreateTaskRequest) -> AppResult<NewTask> {
    let description = as_string(&req.description);

    let mut v = Validator::new();
    let title = check_title(&mut v, &req.title, true);
    v.field("description")
        .rule(!matches!(description, Some(None)), "Description must be a string");
    v.finish()?;

    Ok(NewTask {
        title: title.unwrap_or_default(),
        description: description.flatten().map(str::to_string),
    })
}

pub fn validate_update(req: UpdateTaskRequest) -> AppResult<TaskChanges> {
    let description = as_string(&req.description);
    let completed = req.completed.as_ref().map(Value::as_bool);

    let mut v = Validator::new();
    let title = check_title(&mut v, &req.title, false);
    v.field("description")
        .rule(!matches!(description, Some(None)), "Description must be a string");
    v.field("completed")
        .rule(!matches!(completed, Some(None)), "Completed must be boolean");
    v.finish()?;

    Ok(TaskChanges {
        title,
        description: description.flatten().map(str::to_string),
        completed: completed.flatten(),
    })
}

pub async fn create(tasks: &dyn TaskRepo, owner: Uuid, new: NewTask) -> AppResult<Task> {
    let task = tasks.create(owner, new).await?;
    info!(task_id = %task.id, user_id = %owner, "task created");
    Ok(task)
}

pub async fn list(tasks: &dyn TaskRepo, owner: Uuid, q: Option<&str>) -> AppResult<Vec<Task>> {
    Ok(tasks.list(owner, q.map(str::trim)).await?)
}

pub async fn get(tasks: &dyn TaskRepo, owner: Uuid, id: Uuid) -> AppResult<Task> {
    tasks.find(owner, id).await?.ok_or(NOT_FOUND)
}

pub async fn update(
    tasks: &dyn TaskRepo,
    owner: Uuid,
    id: Uuid,
    changes: TaskChanges,
) -> AppResult<Task> {
    tasks.update(owner, id, changes).await?.ok_or(NOT_FOUND)
}

pub async fn delete(tasks: &dyn TaskRepo, owner: Uuid, id: Uuid) -> AppResult<()> {
    if tasks.delete(owner, id).await? {
        info!(task_id = %id, user_id = %owner, "task deleted");
        Ok(())
    } else {
        Err(NOT_FOUND)
    }
}
