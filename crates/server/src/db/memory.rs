//! In-memory store.
//!
//! Implements every store trait over ordered maps behind one lock, with the
//! same constraint behaviour as the `PostgreSQL` schema: unique emails and
//! product names, non-negative stock, restrict on referenced users and
//! products, cascade from users to addresses and from orders to items.
//! Used by tests and for running the server without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use orderly_core::{AddressId, OrderId, OrderItemId, Page, ProductId, ReportId, UserId};

use super::{
    AddressStore, OrderStore, ProductStore, ReportStore, RepositoryError, StoreHealth, UserStore,
};
use crate::models::{
    Address, ItemChange, NewAddress, NewOrder, NewOrderItem, NewProduct, NewUser, Order,
    OrderChanges, OrderFilter, OrderItem, Product, ProductFilter, ProductPatch, Report, User,
    UserFilter, UserPatch,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    addresses: BTreeMap<AddressId, Address>,
    orders: BTreeMap<OrderId, Order>,
    reports: BTreeMap<ReportId, Report>,
    sequences: Sequences,
}

/// Per-table `SERIAL` counters.
#[derive(Debug, Default)]
struct Sequences {
    user: i32,
    product: i32,
    address: i32,
    order: i32,
    order_item: i32,
    report: i32,
}

const fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

fn paginate<'a, T: Clone + 'a>(rows: impl Iterator<Item = &'a T>, page: Option<Page>) -> Vec<T> {
    match page {
        Some(page) => rows
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .cloned()
            .collect(),
        None => rows.cloned().collect(),
    }
}

impl Tables {
    fn email_taken(&self, email: &orderly_core::Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == *email && Some(u.id) != except)
    }

    fn name_taken(&self, name: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.product_name == name && Some(p.id) != except)
    }

    /// Same outcome as the row-locked check in the `PostgreSQL` repository.
    fn check_stock(&self, demands: &[NewOrderItem]) -> Result<(), RepositoryError> {
        for demand in demands {
            if demand.quantity < 1 {
                return Err(RepositoryError::Conflict(
                    "order item violates a constraint".to_owned(),
                ));
            }
            let product = self.products.get(&demand.product_id).ok_or_else(|| {
                RepositoryError::Conflict(format!("product {} does not exist", demand.product_id))
            })?;
            if demand.quantity > product.quantity {
                return Err(RepositoryError::InsufficientStock {
                    product_id: demand.product_id,
                    requested: demand.quantity,
                    available: product.quantity,
                });
            }
        }
        Ok(())
    }

    fn check_header(
        &self,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<(), RepositoryError> {
        if !self.users.contains_key(&user_id) {
            return Err(RepositoryError::Conflict(
                "order is referenced by another record".to_owned(),
            ));
        }
        if let Some(address_id) = address_id
            && !self.addresses.contains_key(&address_id)
        {
            return Err(RepositoryError::Conflict(
                "order is referenced by another record".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Store backed by in-process maps.
///
/// Counts `get_by_id` calls on users and products so tests can assert that
/// a read was served by the cache.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    user_reads: AtomicUsize,
    product_reads: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `UserStore::get_by_id` calls so far.
    #[must_use]
    pub fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }

    /// Number of `ProductStore::get_by_id` calls so far.
    #[must_use]
    pub fn product_reads(&self) -> usize {
        self.product_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn get_by_filter(
        &self,
        filter: &UserFilter,
        page: Option<Page>,
    ) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(paginate(
            tables.users.values().filter(|u| filter.matches(u)),
            page,
        ))
    }

    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("user already exists".to_owned()));
        }

        let id = UserId::new(next(&mut tables.sequences.user));
        let created = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            description: user.description.clone(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(email) = patch.email.value()
            && tables.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("user already exists".to_owned()));
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = patch.username.value() {
            user.username.clone_from(username);
        }
        if let Some(email) = patch.email.value() {
            user.email = email.clone();
        }
        patch.description.clone().apply_to(&mut user.description);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.orders.values().any(|o| o.user_id == id) {
            return Err(RepositoryError::Conflict(
                "user is referenced by another record".to_owned(),
            ));
        }
        if tables.users.remove(&id).is_some() {
            let orphaned: Vec<AddressId> = tables
                .addresses
                .values()
                .filter(|a| a.user_id == id)
                .map(|a| a.id)
                .collect();
            for address_id in orphaned {
                tables.addresses.remove(&address_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn get_by_filter(
        &self,
        filter: &ProductFilter,
        page: Option<Page>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(paginate(
            tables.products.values().filter(|p| filter.matches(p)),
            page,
        ))
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.name_taken(&product.product_name, None) {
            return Err(RepositoryError::Conflict(
                "product already exists".to_owned(),
            ));
        }
        if product.quantity < 0 {
            return Err(RepositoryError::Conflict(
                "product violates a constraint".to_owned(),
            ));
        }

        let id = ProductId::new(next(&mut tables.sequences.product));
        let created = Product {
            id,
            product_name: product.product_name.clone(),
            quantity: product.quantity,
        };
        tables.products.insert(id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(name) = patch.product_name.value()
            && tables.name_taken(name, Some(id))
        {
            return Err(RepositoryError::Conflict(
                "product already exists".to_owned(),
            ));
        }
        if patch.quantity.value().is_some_and(|q| *q < 0) {
            return Err(RepositoryError::Conflict(
                "product violates a constraint".to_owned(),
            ));
        }

        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.product_name.value() {
            product.product_name.clone_from(name);
        }
        if let Some(quantity) = patch.quantity.value() {
            product.quantity = *quantity;
        }
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let referenced = tables
            .orders
            .values()
            .flat_map(|o| &o.items)
            .any(|i| i.product_id == id);
        if referenced {
            return Err(RepositoryError::Conflict(
                "product is referenced by another record".to_owned(),
            ));
        }
        tables.products.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn get_by_filter(
        &self,
        filter: &OrderFilter,
        page: Option<Page>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(paginate(
            tables.orders.values().filter(|o| filter.matches(o)),
            page,
        ))
    }

    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.check_header(order.user_id, order.address_id)?;
        tables.check_stock(&order.items)?;

        let id = OrderId::new(next(&mut tables.sequences.order));
        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            items.push(OrderItem {
                id: OrderItemId::new(next(&mut tables.sequences.order_item)),
                order_id: id,
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        let created = Order {
            id,
            user_id: order.user_id,
            address_id: order.address_id,
            items,
        };
        tables.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: OrderId,
        changes: &OrderChanges,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some(mut order) = tables.orders.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(user_id) = changes.user_id {
            order.user_id = user_id;
        }
        if let Some(address_id) = changes.address_id {
            order.address_id = address_id;
        }
        tables.check_header(order.user_id, order.address_id)?;

        // Work on a copy so a failed check leaves the stored order untouched
        let mut demands = Vec::new();
        let mut item_seq = tables.sequences.order_item;
        for change in &changes.items {
            match *change {
                ItemChange::Append(item) => {
                    order.items.push(OrderItem {
                        id: OrderItemId::new(next(&mut item_seq)),
                        order_id: id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                    });
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
                    let Some(item) = order.items.iter_mut().find(|i| i.id == item_id) else {
                        continue;
                    };
                    if let Some(product_id) = product_id {
                        item.product_id = product_id;
                    }
                    if let Some(quantity) = quantity {
                        item.quantity = quantity;
                    }
                    demands.push(NewOrderItem {
                        product_id: item.product_id,
                        quantity: item.quantity,
                    });
                }
            }
        }
        tables.check_stock(&demands)?;

        tables.sequences.order_item = item_seq;
        tables.orders.insert(id, order.clone());
        Ok(Some(order))
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.orders.remove(&id).is_some() {
            tables.reports.retain(|_, r| r.order_id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn get_by_id(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        Ok(self.tables.lock().await.addresses.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(RepositoryError::Conflict(
                "address is referenced by another record".to_owned(),
            ));
        }
        if address.is_primary {
            for existing in tables.addresses.values_mut() {
                if existing.user_id == user_id {
                    existing.is_primary = false;
                }
            }
        }

        let id = AddressId::new(next(&mut tables.sequences.address));
        let created = Address {
            id,
            user_id,
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip_code: address.zip_code.clone(),
            country: address.country.clone(),
            is_primary: address.is_primary,
        };
        tables.addresses.insert(id, created.clone());
        Ok(created)
    }

    async fn delete(&self, id: AddressId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.addresses.remove(&id).is_some() {
            for order in tables.orders.values_mut() {
                if order.address_id == Some(id) {
                    order.address_id = None;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Report>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reports
            .values()
            .filter(|r| r.report_at == date)
            .cloned()
            .collect())
    }

    async fn generate(&self, date: NaiveDate) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.reports.retain(|_, r| r.report_at != date);

        let totals: Vec<(OrderId, i64)> = tables
            .orders
            .values()
            .filter(|o| !o.items.is_empty())
            .map(|o| (o.id, o.items.iter().map(|i| i64::from(i.quantity)).sum()))
            .collect();

        let mut written = 0;
        for (order_id, count_product) in totals {
            let id = ReportId::new(next(&mut tables.sequences.report));
            tables.reports.insert(
                id,
                Report {
                    id,
                    report_at: date,
                    order_id,
                    count_product,
                },
            );
            written += 1;
        }
        Ok(written)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orderly_core::Email;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "Alex".to_owned(),
            email: Email::parse(email).unwrap(),
            description: None,
        }
    }

    fn new_product(name: &str, quantity: i32) -> NewProduct {
        NewProduct {
            product_name: name.to_owned(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_ids_are_assigned_sequentially() {
        let store = MemoryStore::new();
        let a = UserStore::create(&store, &new_user("a@x.com")).await.unwrap();
        let b = UserStore::create(&store, &new_user("b@x.com")).await.unwrap();
        assert_eq!(a.id, UserId::new(1));
        assert_eq!(b.id, UserId::new(2));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        UserStore::create(&store, &new_user("a@x.com")).await.unwrap();
        let err = UserStore::create(&store, &new_user("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_filter_and_page() {
        let store = MemoryStore::new();
        for i in 0..7 {
            ProductStore::create(&store, &new_product(&format!("p{i}"), i % 2))
                .await
                .unwrap();
        }

        let odd = ProductFilter {
            product_name: None,
            quantity: Some(1),
        };
        let all_odd = ProductStore::get_by_filter(&store, &odd, None).await.unwrap();
        assert_eq!(all_odd.len(), 3);

        let second = ProductStore::get_by_filter(&store, &odd, Some(Page::new(2, 2).unwrap()))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.first().map(|p| p.id), Some(ProductId::new(6)));
    }

    #[tokio::test]
    async fn test_order_update_ignores_foreign_items() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, &new_user("a@x.com")).await.unwrap();
        let product = ProductStore::create(&store, &new_product("Widget", 5))
            .await
            .unwrap();
        let line = NewOrderItem {
            product_id: product.id,
            quantity: 1,
        };
        let order = NewOrder {
            user_id: user.id,
            address_id: None,
            items: vec![line],
        };
        let first = OrderStore::create(&store, &order).await.unwrap();
        let second = OrderStore::create(&store, &order).await.unwrap();
        let foreign = second.items.first().unwrap().id;

        let changes = OrderChanges {
            items: vec![ItemChange::Patch {
                id: foreign,
                product_id: None,
                quantity: Some(4),
            }],
            ..OrderChanges::default()
        };
        let updated = OrderStore::update(&store, first.id, &changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated, first);

        let untouched = OrderStore::get_by_id(&store, second.id).await.unwrap().unwrap();
        assert_eq!(untouched.items.first().unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_failed_order_update_changes_nothing() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, &new_user("a@x.com")).await.unwrap();
        let product = ProductStore::create(&store, &new_product("Widget", 5))
            .await
            .unwrap();
        let order = OrderStore::create(
            &store,
            &NewOrder {
                user_id: user.id,
                address_id: None,
                items: vec![NewOrderItem {
                    product_id: product.id,
                    quantity: 2,
                }],
            },
        )
        .await
        .unwrap();

        let changes = OrderChanges {
            items: vec![
                ItemChange::Append(NewOrderItem {
                    product_id: product.id,
                    quantity: 1,
                }),
                ItemChange::Append(NewOrderItem {
                    product_id: product.id,
                    quantity: 9,
                }),
            ],
            ..OrderChanges::default()
        };
        let err = OrderStore::update(&store, order.id, &changes)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InsufficientStock { requested: 9, .. }
        ));

        let stored = OrderStore::get_by_id(&store, order.id).await.unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_referenced_user_and_product_cannot_be_deleted() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, &new_user("a@x.com")).await.unwrap();
        let product = ProductStore::create(&store, &new_product("Widget", 5))
            .await
            .unwrap();
        let order = OrderStore::create(
            &store,
            &NewOrder {
                user_id: user.id,
                address_id: None,
                items: vec![NewOrderItem {
                    product_id: product.id,
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap();

        assert!(UserStore::delete(&store, user.id).await.is_err());
        assert!(ProductStore::delete(&store, product.id).await.is_err());

        OrderStore::delete(&store, order.id).await.unwrap();
        UserStore::delete(&store, user.id).await.unwrap();
        ProductStore::delete(&store, product.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_address_delete_detaches_orders() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, &new_user("a@x.com")).await.unwrap();
        let address = AddressStore::create(
            &store,
            user.id,
            &NewAddress {
                street: "1 Main St".to_owned(),
                city: "Springfield".to_owned(),
                state: None,
                zip_code: None,
                country: "US".to_owned(),
                is_primary: true,
            },
        )
        .await
        .unwrap();
        let order = OrderStore::create(
            &store,
            &NewOrder {
                user_id: user.id,
                address_id: Some(address.id),
                items: Vec::new(),
            },
        )
        .await
        .unwrap();

        AddressStore::delete(&store, address.id).await.unwrap();
        let order = OrderStore::get_by_id(&store, order.id).await.unwrap().unwrap();
        assert_eq!(order.address_id, None);
    }

    #[tokio::test]
    async fn test_generate_report_is_idempotent() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, &new_user("a@x.com")).await.unwrap();
        let product = ProductStore::create(&store, &new_product("Widget", 5))
            .await
            .unwrap();
        let order = OrderStore::create(
            &store,
            &NewOrder {
                user_id: user.id,
                address_id: None,
                items: vec![
                    NewOrderItem {
                        product_id: product.id,
                        quantity: 2,
                    },
                    NewOrderItem {
                        product_id: product.id,
                        quantity: 3,
                    },
                ],
            },
        )
        .await
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(store.generate(date).await.unwrap(), 1);
        assert_eq!(store.generate(date).await.unwrap(), 1);

        let rows = store.list_by_date(date).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows.first().unwrap();
        assert_eq!(row.order_id, order.id);
        assert_eq!(row.count_product, 5);
    }
}
