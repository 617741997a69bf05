//! Address route handlers.

use axum::{extract::State, http::StatusCode};

use orderly_core::{AddressId, UserId};

use crate::error::Result;
use crate::extract::{Json, Path};
use crate::models::{Address, NewAddress};
use crate::state::AppState;

/// `GET /users/{id}/addresses`
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(state.services().addresses.list_for_user(user_id).await?))
}

/// `POST /users/{id}/addresses`
pub async fn create(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(new): Json<NewAddress>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = state.services().addresses.create(user_id, new).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// `DELETE /addresses/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    state.services().addresses.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
