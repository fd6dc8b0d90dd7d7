use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{AppState, JsonBody};
use crate::error::AppResult;
use crate::identity::Authenticated;
use crate::records::{AcceptRequest, InviteRequest};
use crate::storage::{DeleteResult, Document, DocumentId, InsertResult, UpdateResult};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    location: Option<String>,
}

pub async fn send_invite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<InviteRequest>,
) -> AppResult<Json<UpdateResult>> {
    let id: DocumentId = id.parse()?;
    Ok(Json(state.works.send_invite(id, req).await?))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AcceptRequest>,
) -> AppResult<Json<UpdateResult>> {
    let id: DocumentId = id.parse()?;
    Ok(Json(state.works.accept_invite(id, req).await?))
}

pub async fn list_works(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.works.list().await?))
}

pub async fn works_invited(State(state): State<AppState>, Path(email): Path<String>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.works.invited(&email).await?))
}

pub async fn works_accepted(State(state): State<AppState>, Path(email): Path<String>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.works.accepted(&email).await?))
}

pub async fn works_by_user_email(State(state): State<AppState>, Path(email): Path<String>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.works.by_user_email(&email).await?))
}

pub async fn delete_work(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResult>> {
    let id: DocumentId = id.parse()?;
    Ok(Json(state.works.delete(id).await?))
}

/// PUT /works: no id in the path, so this patches the first work room.
pub async fn update_work(
    State(state): State<AppState>,
    _auth: Authenticated,
    JsonBody(patch): JsonBody<Document>,
) -> AppResult<Json<UpdateResult>> {
    Ok(Json(state.works.update_unscoped(patch).await?))
}

pub async fn create_work(
    State(state): State<AppState>,
    _auth: Authenticated,
    JsonBody(work): JsonBody<Document>,
) -> AppResult<Json<InsertResult>> {
    Ok(Json(state.works.create(work).await?))
}

pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.works.search(params.location.as_deref()).await?))
}

pub async fn get_work(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Option<Document>>> {
    let id: DocumentId = id.parse()?;
    Ok(Json(state.works.find_by_id(id).await?))
}
