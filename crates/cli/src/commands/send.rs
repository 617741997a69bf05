//! Queue command publisher.
//!
//! Payloads are decoded with the worker's own decoder before they are
//! pushed, so a command the worker would drop is refused here instead.

use redis::AsyncCommands;
use secrecy::{ExposeSecret, SecretString};

use orderly_server::cache::{CacheError, redis::create_pool};
use orderly_server::worker::{Channel, Command};

use super::CliError;

/// Check `payload` and append it to the `channel` list.
///
/// # Errors
///
/// Returns `CliError::InvalidCommand` for a payload the worker would reject
/// as malformed, or `CliError::Queue` if Redis is unreachable.
pub async fn push(redis_url: &SecretString, channel: Channel, payload: &str) -> Result<(), CliError> {
    let command = Command::decode(channel, payload)?;

    let pool = create_pool(redis_url.expose_secret(), 1)?;
    let mut conn = pool.get().await.map_err(CacheError::from)?;
    let depth: u64 = conn
        .rpush(channel.as_str(), payload)
        .await
        .map_err(CacheError::from)?;

    tracing::info!(
        queue = %channel,
        action = command.action(),
        depth,
        "Command queued"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url() -> SecretString {
        SecretString::from("redis://127.0.0.1:1")
    }

    #[tokio::test]
    async fn test_refuses_commands_the_worker_would_drop() {
        let err = push(&url(), Channel::Order, r#"{"action": "out_of_stock", "id": 1}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidCommand(_)));

        let err = push(&url(), Channel::Product, "not json").await.unwrap_err();
        assert!(matches!(err, CliError::InvalidCommand(_)));
    }
}
