//! Order route handlers.

use axum::{extract::State, http::StatusCode};

use orderly_core::{OrderId, UserId};

use super::PageQuery;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::models::{NewOrder, Order, OrderPatch};
use crate::state::AppState;

/// `GET /orders`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Order>>> {
    let page = query.page()?;
    Ok(Json(state.services().orders.list_orders(page).await?))
}

/// `GET /orders/u/{user_id}`
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Order>>> {
    let page = query.page()?;
    Ok(Json(
        state
            .services()
            .orders
            .list_user_orders(user_id, page)
            .await?,
    ))
}

/// `GET /orders/{id}`
pub async fn show(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<Json<Order>> {
    Ok(Json(state.services().orders.get_order(id).await?))
}

/// `POST /orders`
pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.services().orders.create_order(new).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `PUT /orders/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>> {
    Ok(Json(state.services().orders.update_order(id, patch).await?))
}

/// `DELETE /orders/{id}`
pub async fn destroy(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<StatusCode> {
    state.services().orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
