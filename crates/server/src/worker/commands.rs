//! Queue payload decoding.
//!
//! A payload is a JSON object whose `action` field selects the command.
//! `action` defaults to `create`. The remaining fields mirror the HTTP
//! request bodies, plus `id` for commands that address an existing entity.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use orderly_core::{OrderId, ProductId};

use crate::models::{NewOrder, NewProduct, OrderPatch, ProductPatch};
use crate::services::ServiceError;

/// The queue a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Order,
    Product,
}

impl Channel {
    /// Every channel the worker listens on.
    pub const ALL: [Self; 2] = [Self::Order, Self::Product];

    /// The Redis list name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(Self::Order),
            "product" => Ok(Self::Product),
            other => Err(CommandError::UnknownChannel(other.to_owned())),
        }
    }
}

/// Commands accepted on the `order` channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderCommand {
    Create(NewOrder),
    Update {
        id: OrderId,
        #[serde(flatten)]
        patch: OrderPatch,
    },
}

/// Commands accepted on the `product` channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProductCommand {
    Create(NewProduct),
    Update {
        id: ProductId,
        #[serde(flatten)]
        patch: ProductPatch,
    },
    OutOfStock {
        id: ProductId,
    },
}

/// A decoded command together with its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Order(OrderCommand),
    Product(ProductCommand),
}

impl Command {
    /// Decode a raw payload received on `channel`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::NotAnObject` unless the payload is a JSON
    /// object, and `CommandError::Malformed` for an unknown action or
    /// fields that do not fit it.
    pub fn decode(channel: Channel, payload: &str) -> Result<Self, CommandError> {
        let mut value: Value = serde_json::from_str(payload)?;
        let Some(fields) = value.as_object_mut() else {
            return Err(CommandError::NotAnObject);
        };
        fields
            .entry("action")
            .or_insert_with(|| Value::String("create".to_owned()));

        Ok(match channel {
            Channel::Order => Self::Order(serde_json::from_value(value)?),
            Channel::Product => Self::Product(serde_json::from_value(value)?),
        })
    }

    /// The action name, for logging.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Order(OrderCommand::Create(_)) | Self::Product(ProductCommand::Create(_)) => {
                "create"
            }
            Self::Order(OrderCommand::Update { .. })
            | Self::Product(ProductCommand::Update { .. }) => "update",
            Self::Product(ProductCommand::OutOfStock { .. }) => "out_of_stock",
        }
    }
}

/// Errors from handling one queue message.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("unknown channel {0:?}")]
    UnknownChannel(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orderly_core::{Patch, UserId};

    use super::*;
    use crate::models::NewOrderItem;

    #[test]
    fn test_action_defaults_to_create() {
        let command = Command::decode(
            Channel::Product,
            r#"{"product_name": "Widget", "quantity": 5}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::Product(ProductCommand::Create(NewProduct {
                product_name: "Widget".to_owned(),
                quantity: 5,
            }))
        );
        assert_eq!(command.action(), "create");
    }

    #[test]
    fn test_order_create() {
        let command = Command::decode(
            Channel::Order,
            r#"{"action": "create", "user_id": 1, "items": [{"product_id": 2, "quantity": 3}]}"#,
        )
        .unwrap();
        let Command::Order(OrderCommand::Create(order)) = command else {
            panic!("expected order create, got {command:?}");
        };
        assert_eq!(order.user_id, UserId::new(1));
        assert_eq!(order.address_id, None);
        assert_eq!(
            order.items,
            vec![NewOrderItem {
                product_id: ProductId::new(2),
                quantity: 3,
            }]
        );
    }

    #[test]
    fn test_order_update_keeps_null_and_absent_apart() {
        let command = Command::decode(
            Channel::Order,
            r#"{"action": "update", "id": 4, "address_id": null}"#,
        )
        .unwrap();
        let Command::Order(OrderCommand::Update { id, patch }) = command else {
            panic!("expected order update, got {command:?}");
        };
        assert_eq!(id, OrderId::new(4));
        assert_eq!(patch.address_id, Patch::Null);
        assert_eq!(patch.user_id, Patch::Absent);
        assert_eq!(patch.items, Patch::Absent);
    }

    #[test]
    fn test_update_requires_id() {
        let err = Command::decode(Channel::Product, r#"{"action": "update", "quantity": 2}"#)
            .unwrap_err();
        assert!(matches!(err, CommandError::Malformed(_)));
    }

    #[test]
    fn test_out_of_stock_only_on_product_channel() {
        let payload = r#"{"action": "out_of_stock", "id": 3}"#;
        assert_eq!(
            Command::decode(Channel::Product, payload).unwrap(),
            Command::Product(ProductCommand::OutOfStock {
                id: ProductId::new(3)
            })
        );
        assert!(matches!(
            Command::decode(Channel::Order, payload),
            Err(CommandError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_action_and_non_objects() {
        assert!(matches!(
            Command::decode(Channel::Product, r#"{"action": "restock", "id": 1}"#),
            Err(CommandError::Malformed(_))
        ));
        assert!(matches!(
            Command::decode(Channel::Order, "[1, 2]"),
            Err(CommandError::NotAnObject)
        ));
        assert!(matches!(
            Command::decode(Channel::Order, "not json"),
            Err(CommandError::Malformed(_))
        ));
    }

    #[test]
    fn test_channel_names() {
        assert_eq!("order".parse::<Channel>().unwrap(), Channel::Order);
        assert_eq!(Channel::Product.to_string(), "product");
        assert!("orders".parse::<Channel>().is_err());
    }
}
