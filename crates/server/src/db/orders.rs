//! Order repository for database operations.
//!
//! Orders are written in a single transaction together with their items.
//! Every product an order draws on is locked with `SELECT ... FOR UPDATE`
//! in id order and its stock re-checked before any `order_items` row is
//! written. Item writes take a key-share lock on their product, so they must
//! come after the product locks or two writers can deadlock.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgExecutor;
use sqlx::{PgConnection, PgPool, QueryBuilder};

use orderly_core::{AddressId, OrderId, OrderItemId, Page, ProductId, UserId};

use super::{OrderStore, RepositoryError, map_write_error, push_page};
use crate::models::{ItemChange, NewOrder, NewOrderItem, Order, OrderChanges, OrderFilter, OrderItem};

/// An `orders` row without its items.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    address_id: Option<AddressId>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            address_id: self.address_id,
            items,
        }
    }
}

/// Repository for order database operations.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn load_items<'e>(
    executor: impl PgExecutor<'e>,
    order_ids: &[OrderId],
) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
    let ids: Vec<i32> = order_ids.iter().map(OrderId::as_i32).collect();
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, quantity FROM order_items \
         WHERE order_id = ANY($1) ORDER BY id",
    )
    .bind(ids)
    .fetch_all(executor)
    .await?;

    let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    Ok(by_order)
}

async fn load_order(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, address_id FROM orders WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut items = load_items(&mut *conn, &[row.id]).await?;
    let items = items.remove(&row.id).unwrap_or_default();
    Ok(Some(row.into_order(items)))
}

/// Lock every product in `demands` and check each line against its stock.
async fn check_stock(
    conn: &mut PgConnection,
    demands: &[NewOrderItem],
) -> Result<(), RepositoryError> {
    if demands.is_empty() {
        return Ok(());
    }

    let mut ids: Vec<i32> = demands.iter().map(|d| d.product_id.as_i32()).collect();
    ids.sort_unstable();
    ids.dedup();

    let stock: HashMap<ProductId, i32> = sqlx::query_as::<_, (ProductId, i32)>(
        "SELECT id, quantity FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    for demand in demands {
        let available = stock.get(&demand.product_id).copied().ok_or_else(|| {
            RepositoryError::Conflict(format!("product {} does not exist", demand.product_id))
        })?;
        if demand.quantity > available {
            return Err(RepositoryError::InsufficientStock {
                product_id: demand.product_id,
                requested: demand.quantity,
                available,
            });
        }
    }
    Ok(())
}

async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    item: &NewOrderItem,
) -> Result<OrderItem, RepositoryError> {
    sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items (order_id, product_id, quantity) VALUES ($1, $2, $3) \
         RETURNING id, order_id, product_id, quantity",
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_write_error(e, "order item"))
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, id).await
    }

    async fn get_by_filter(
        &self,
        filter: &OrderFilter,
        page: Option<Page>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut query = QueryBuilder::new("SELECT id, user_id, address_id FROM orders WHERE TRUE");
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(address_id) = filter.address_id {
            query.push(" AND address_id = ").push_bind(address_id);
        }
        query.push(" ORDER BY id");
        push_page(&mut query, page);

        let rows = query
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut items = load_items(&self.pool, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let own = items.remove(&row.id).unwrap_or_default();
                row.into_order(own)
            })
            .collect())
    }

    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        check_stock(&mut tx, &order.items).await?;

        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (user_id, address_id) VALUES ($1, $2) \
             RETURNING id, user_id, address_id",
        )
        .bind(order.user_id)
        .bind(order.address_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "order"))?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            items.push(insert_item(&mut tx, row.id, item).await?);
        }

        tx.commit().await?;
        Ok(row.into_order(items))
    }

    async fn update(
        &self,
        id: OrderId,
        changes: &OrderChanges,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, OrderId>("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, quantity FROM order_items \
             WHERE order_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        // Effective (product, quantity) of every line this update touched
        let mut demands = Vec::new();
        let mut patched: Vec<OrderItemId> = Vec::new();
        let mut appended = Vec::new();
        for change in &changes.items {
            match *change {
                ItemChange::Append(item) => {
                    appended.push(item);
                    demands.push(item);
                }
                ItemChange::Patch {
                    id: item_id,
                    product_id,
                    quantity,
                } => {
                    if product_id.is_none() && quantity.is_none() {
                        continue;
                    }
                    let Some(item) = items.iter_mut().find(|i| i.id == item_id) else {
                        continue;
                    };
                    if let Some(product_id) = product_id {
                        item.product_id = product_id;
                    }
                    if let Some(quantity) = quantity {
                        item.quantity = quantity;
                    }
                    if !patched.contains(&item_id) {
                        patched.push(item_id);
                    }
                    demands.push(NewOrderItem {
                        product_id: item.product_id,
                        quantity: item.quantity,
                    });
                }
            }
        }

        check_stock(&mut tx, &demands).await?;

        if changes.user_id.is_some() || changes.address_id.is_some() {
            let mut query = QueryBuilder::new("UPDATE orders SET updated_at = NOW()");
            if let Some(user_id) = changes.user_id {
                query.push(", user_id = ").push_bind(user_id);
            }
            if let Some(address_id) = changes.address_id {
                query.push(", address_id = ").push_bind(address_id);
            }
            query.push(" WHERE id = ").push_bind(id);
            query
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_write_error(e, "order"))?;
        }

        for item in items.iter().filter(|i| patched.contains(&i.id)) {
            sqlx::query("UPDATE order_items SET product_id = $1, quantity = $2 WHERE id = $3")
                .bind(item.product_id)
                .bind(item.quantity)
                .bind(item.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_write_error(e, "order item"))?;
        }
        for item in &appended {
            insert_item(&mut tx, id, item).await?;
        }

        let order = load_order(&mut tx, id).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
