//! The consumer loop.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use super::{CommandSource, MessageHandler};

/// Runs each message in its own task, at most `concurrency` at a time.
pub struct Consumer<H> {
    handler: Arc<H>,
    permits: Arc<Semaphore>,
}

impl<H: MessageHandler> Consumer<H> {
    /// A `concurrency` of zero is treated as one.
    #[must_use]
    pub fn new(handler: H, concurrency: usize) -> Self {
        Self {
            handler: Arc::new(handler),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Consume `source` until it is exhausted or `shutdown` completes, then
    /// wait for in-flight messages.
    ///
    /// Returns the number of messages dispatched.
    pub async fn run<S, F>(&self, mut source: S, shutdown: F) -> usize
    where
        S: CommandSource,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        loop {
            let permit = tokio::select! {
                () = &mut shutdown => break,
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    log_task_exit(result);
                    continue;
                }
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let message = tokio::select! {
                () = &mut shutdown => break,
                message = source.next() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            dispatched += 1;
            let handler = Arc::clone(&self.handler);
            tasks.spawn(async move {
                let _permit = permit;
                handler.handle(message).await;
            });
        }

        tracing::info!(in_flight = tasks.len(), "Consumer stopping");
        while let Some(result) = tasks.join_next().await {
            log_task_exit(result);
        }
        dispatched
    }
}

fn log_task_exit(result: Result<(), JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!(error = %e, "Command handler panicked");
    }
}
