use axum::extract::{Path, State};
use axum::Json;

use super::{AppState, JsonBody};
use crate::error::AppResult;
use crate::identity::{check_self_access, Admin, Authenticated};
use crate::records::UserUpsert;
use crate::storage::Document;

/// PUT /user/{email}: upsert the profile and hand back a fresh token.
pub async fn upsert_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    JsonBody(profile): JsonBody<Document>,
) -> AppResult<Json<UserUpsert>> {
    let out = state.users.upsert_and_issue(&email, profile, &state.tokens).await?;
    Ok(Json(out))
}

/// GET /users (admin only).
pub async fn list_users(State(state): State<AppState>, _admin: Admin) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.users.list().await?))
}

/// GET /user/{email}: only the caller's own record. Missing users serialize as `null`.
pub async fn get_user(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(email): Path<String>,
) -> AppResult<Json<Option<Document>>> {
    check_self_access(Some(&identity), &email)?;
    Ok(Json(state.users.find_by_email(&email).await?))
}

/// GET /allUsers: same listing as /users without any check.
pub async fn all_users(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.users.list().await?))
}
