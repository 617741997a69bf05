//! User route handlers.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use orderly_core::{Email, UserId};

use super::PageQuery;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::models::{NewUser, User, UserFilter, UserPatch};
use crate::services::ValidationError;
use crate::state::AppState;

/// Query parameters for `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub count: Option<u32>,
    pub page: Option<u32>,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// `GET /users`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>> {
    let page = PageQuery {
        count: query.count,
        page: query.page,
    }
    .page()?;
    let email = query
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(ValidationError::from)?;
    let filter = UserFilter {
        username: query.username,
        email,
    };

    Ok(Json(state.services().users.list(&filter, page).await?))
}

/// `GET /users/{id}`
pub async fn show(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<User>> {
    Ok(Json(state.services().users.get(id).await?))
}

/// `POST /users`
pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.services().users.create(new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `PUT /users/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>> {
    Ok(Json(state.services().users.update(id, patch).await?))
}

/// `DELETE /users/{id}`
pub async fn destroy(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<StatusCode> {
    state.services().users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
