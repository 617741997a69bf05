//! Product route handlers.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use orderly_core::ProductId;

use super::PageQuery;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::models::{NewProduct, Product, ProductFilter, ProductPatch};
use crate::state::AppState;

/// Query parameters for `GET /products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub count: Option<u32>,
    pub page: Option<u32>,
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
}

/// `GET /products`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>> {
    let page = PageQuery {
        count: query.count,
        page: query.page,
    }
    .page()?;
    let filter = ProductFilter {
        product_name: query.product_name,
        quantity: query.quantity,
    };

    Ok(Json(state.services().products.list(&filter, page).await?))
}

/// `GET /products/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.services().products.get(id).await?))
}

/// `POST /products`
pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.services().products.create(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /products/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    Ok(Json(state.services().products.update(id, patch).await?))
}

/// `DELETE /products/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.services().products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
