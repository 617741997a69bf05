//! Queue command worker.
//!
//! Consumes create/update commands from the `order` and `product` queues and
//! runs them through the same services as the HTTP API. A message that
//! fails for any reason is logged and dropped; the loop never stops on a
//! bad message.
//!
//! # Modules
//!
//! - `commands` - Payload decoding into closed command enums
//! - `handler` - Dispatch to the services and outcome logging
//! - `source` - Message sources (Redis lists, in-process channels)
//! - `consumer` - Bounded-concurrency consumer loop

pub mod commands;
pub mod consumer;
pub mod handler;
pub mod source;

pub use commands::{Channel, Command, CommandError, OrderCommand, ProductCommand};
pub use consumer::Consumer;
pub use handler::{CommandHandler, Disposition, MessageHandler};
pub use source::{CommandSource, Message, RedisQueueSource};
