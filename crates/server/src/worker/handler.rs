//! Applies decoded commands through the services.

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{Command, CommandError, Message, OrderCommand, ProductCommand};
use crate::services::Services;

/// What became of a message. Every outcome except `Applied` drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    /// The command broke a business rule.
    Rejected,
    /// The payload could not be decoded.
    Malformed,
    /// The store or another dependency failed.
    Failed,
}

/// Handles one message to completion.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, message: Message) -> Disposition;
}

/// [`MessageHandler`] that runs commands through the same services as the
/// HTTP API.
#[derive(Clone)]
pub struct CommandHandler {
    services: Services,
}

impl CommandHandler {
    #[must_use]
    pub const fn new(services: Services) -> Self {
        Self { services }
    }

    /// Run a decoded command, returning the id of the entity it touched.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Service` with whatever the service rejected.
    pub async fn execute(&self, command: Command) -> Result<i32, CommandError> {
        let id = match command {
            Command::Order(OrderCommand::Create(new)) => {
                self.services.orders.create_order(new).await?.id.as_i32()
            }
            Command::Order(OrderCommand::Update { id, patch }) => {
                self.services.orders.update_order(id, patch).await?.id.as_i32()
            }
            Command::Product(ProductCommand::Create(new)) => {
                self.services.products.create(new).await?.id.as_i32()
            }
            Command::Product(ProductCommand::Update { id, patch }) => {
                self.services.products.update(id, patch).await?.id.as_i32()
            }
            Command::Product(ProductCommand::OutOfStock { id }) => {
                self.services.products.mark_out_of_stock(id).await?.id.as_i32()
            }
        };
        Ok(id)
    }
}

#[async_trait]
impl MessageHandler for CommandHandler {
    async fn handle(&self, message: Message) -> Disposition {
        let channel = message.channel;
        let command = match Command::decode(channel, &message.payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(%channel, error = %e, "Dropping malformed command");
                return Disposition::Malformed;
            }
        };
        let action = command.action();

        match self.execute(command).await {
            Ok(id) => {
                info!(%channel, action, id, "Command applied");
                Disposition::Applied
            }
            Err(CommandError::Service(e)) if e.is_client_error() => {
                warn!(%channel, action, error = %e, "Command rejected");
                Disposition::Rejected
            }
            Err(e) => {
                error!(
                    %channel,
                    action,
                    payload = %message.payload,
                    error = %e,
                    "Command failed"
                );
                Disposition::Failed
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use orderly_core::{Email, ProductId};

    use super::*;
    use crate::cache::LocalCache;
    use crate::db::{MemoryStore, Stores};
    use crate::models::NewUser;
    use crate::worker::Channel;

    fn setup() -> (CommandHandler, Services) {
        let stores = Stores::memory(&Arc::new(MemoryStore::new()));
        let services = Services::new(&stores, Arc::new(LocalCache::new()));
        (CommandHandler::new(services.clone()), services)
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let (handler, services) = setup();

        let created = handler
            .handle(Message::new(
                Channel::Product,
                r#"{"product_name": "Widget", "quantity": 5}"#,
            ))
            .await;
        assert_eq!(created, Disposition::Applied);

        let drained = handler
            .handle(Message::new(
                Channel::Product,
                r#"{"action": "out_of_stock", "id": 1}"#,
            ))
            .await;
        assert_eq!(drained, Disposition::Applied);

        let product = services.products.get(ProductId::new(1)).await.unwrap();
        assert_eq!(product.quantity, 0);
    }

    #[tokio::test]
    async fn test_order_with_too_much_quantity_is_rejected() {
        let (handler, services) = setup();
        services
            .users
            .create(NewUser {
                username: "Alex".to_owned(),
                email: Email::parse("a@x.com").unwrap(),
                description: None,
            })
            .await
            .unwrap();
        handler
            .handle(Message::new(
                Channel::Product,
                r#"{"product_name": "Widget", "quantity": 5}"#,
            ))
            .await;

        let ok = handler
            .handle(Message::new(
                Channel::Order,
                r#"{"user_id": 1, "items": [{"product_id": 1, "quantity": 3}]}"#,
            ))
            .await;
        let too_many = handler
            .handle(Message::new(
                Channel::Order,
                r#"{"user_id": 1, "items": [{"product_id": 1, "quantity": 10}]}"#,
            ))
            .await;

        assert_eq!(ok, Disposition::Applied);
        assert_eq!(too_many, Disposition::Rejected);
    }

    #[tokio::test]
    async fn test_unknown_entities_are_rejected() {
        let (handler, _) = setup();
        let outcome = handler
            .handle(Message::new(
                Channel::Product,
                r#"{"action": "update", "id": 42, "quantity": 1}"#,
            ))
            .await;
        assert_eq!(outcome, Disposition::Rejected);
    }

    #[tokio::test]
    async fn test_bad_payloads_are_dropped() {
        let (handler, _) = setup();
        for payload in ["{", "42", r#"{"action": "out_of_stock", "id": 1}"#] {
            let outcome = handler.handle(Message::new(Channel::Order, payload)).await;
            assert_eq!(outcome, Disposition::Malformed, "payload {payload}");
        }
    }
}
