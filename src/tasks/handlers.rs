use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateTaskRequest, MessageResponse, SearchQuery, UpdateTaskRequest},
    repo_types::Task,
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState, validation::AppJson};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

#[instrument(skip(state, me, payload), fields(user_id = %me.id))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppJson(payload): AppJson<CreateTaskRequest>,
) -> AppResult<Json<Task>> {
    let new = services::validate_create(payload)?;
    let task = services::create(state.tasks.as_ref(), me.id, new).await?;
    Ok(Json(task))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = services::list(state.tasks.as_ref(), me.id, query.q.as_deref()).await?;
    Ok(Json(tasks))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Task>> {
    let id = services::parse_task_id(&id)?;
    let task = services::get(state.tasks.as_ref(), me.id, id).await?;
    Ok(Json(task))
}

#[instrument(skip(state, me, payload), fields(user_id = %me.id))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateTaskRequest>,
) -> AppResult<Json<Task>> {
    let id = services::parse_task_id(&id)?;
    let changes = services::validate_update(payload)?;
    let task = services::update(state.tasks.as_ref(), me.id, id, changes).await?;
    Ok(Json(task))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = services::parse_task_id(&id)?;
    services::delete(state.tasks.as_ref(), me.id, id).await?;
    Ok(Json(MessageResponse { message: "Deleted" }))
}
