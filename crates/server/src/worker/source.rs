//! Where queue messages come from.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use tokio::sync::mpsc;

use super::Channel;
use crate::cache::CacheError;

/// A raw message popped from a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: Channel,
    pub payload: String,
}

impl Message {
    #[must_use]
    pub fn new(channel: Channel, payload: impl Into<String>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }
}

/// A stream of queue messages.
#[async_trait]
pub trait CommandSource: Send {
    /// Wait for the next message. `None` means the source is exhausted.
    async fn next(&mut self) -> Option<Message>;
}

#[async_trait]
impl CommandSource for mpsc::Receiver<Message> {
    async fn next(&mut self) -> Option<Message> {
        self.recv().await
    }
}

/// Seconds a single `BLPOP` waits before polling again.
const BLOCK_SECS: f64 = 5.0;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Pops messages off the `order` and `product` Redis lists.
///
/// Each message is delivered to exactly one consumer. Connection failures
/// are retried forever with exponential backoff, so [`CommandSource::next`]
/// never returns `None`.
pub struct RedisQueueSource {
    pool: Pool,
    keys: Vec<&'static str>,
    backoff: Duration,
}

impl RedisQueueSource {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            keys: Channel::ALL.iter().map(|c| c.as_str()).collect(),
            backoff: INITIAL_BACKOFF,
        }
    }

    async fn pop(&self) -> Result<Option<(String, String)>, CacheError> {
        let mut conn = self.pool.get().await?;
        Ok(conn.blpop(&self.keys, BLOCK_SECS).await?)
    }
}

#[async_trait]
impl CommandSource for RedisQueueSource {
    async fn next(&mut self) -> Option<Message> {
        loop {
            match self.pop().await {
                Ok(Some((list, payload))) => {
                    self.backoff = INITIAL_BACKOFF;
                    match list.parse() {
                        Ok(channel) => return Some(Message::new(channel, payload)),
                        Err(e) => tracing::warn!(error = %e, "Ignoring message"),
                    }
                }
                Ok(None) => self.backoff = INITIAL_BACKOFF,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        backoff_secs = self.backoff.as_secs(),
                        "Queue connection error, reconnecting..."
                    );
                    tokio::time::sleep(self.backoff).await;
                    self.backoff = (self.backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_ends_when_senders_drop() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Message::new(Channel::Order, "{}")).await.unwrap();
        drop(tx);

        assert_eq!(rx.next().await, Some(Message::new(Channel::Order, "{}")));
        assert_eq!(rx.next().await, None);
    }

    #[test]
    fn test_listens_on_every_channel() {
        let pool = crate::cache::redis::create_pool("redis://127.0.0.1:6379", 1).unwrap();
        let source = RedisQueueSource::new(pool);
        assert_eq!(source.keys, ["order", "product"]);
    }
}
