use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use super::stream::json_array_response;
use super::{AppState, JsonBody};
use crate::error::AppResult;
use crate::records::TaskMove;
use crate::storage::{DeleteResult, Document, DocumentId, InsertResult, UpdateResult};

pub async fn create_task(
    State(state): State<AppState>,
    JsonBody(task): JsonBody<Document>,
) -> AppResult<Json<InsertResult>> {
    Ok(Json(state.tasks.create(task).await?))
}

pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<DeleteResult>> {
    let id: DocumentId = id.parse()?;
    Ok(Json(state.tasks.delete(id).await?))
}

/// GET /task streams every task instead of buffering the list.
pub async fn stream_tasks(State(state): State<AppState>) -> Response {
    json_array_response(state.tasks.stream_all())
}

pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Option<Document>>> {
    let id: DocumentId = id.parse()?;
    Ok(Json(state.tasks.find_by_id(id).await?))
}

async fn by_move(state: &AppState, column: TaskMove) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.tasks.list_by_move(column).await?))
}

pub async fn new_tasks(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> { by_move(&state, TaskMove::New).await }

pub async fn ongoing_tasks(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> {
    by_move(&state, TaskMove::Ongoing).await
}

pub async fn done_tasks(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> { by_move(&state, TaskMove::Done).await }

async fn move_to(state: &AppState, id: String, to: TaskMove) -> AppResult<Json<UpdateResult>> {
    let id: DocumentId = id.parse()?;
    Ok(Json(state.tasks.transition(id, to).await?))
}

pub async fn move_ongoing(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<UpdateResult>> {
    move_to(&state, id, TaskMove::Ongoing).await
}

pub async fn move_done(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<UpdateResult>> {
    move_to(&state, id, TaskMove::Done).await
}
