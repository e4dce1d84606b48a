//! Spawned reconciliation: keep a view fresh by refetching on every
//! row change, without the owner driving the loop.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::realtime::{ChangeEvent, Subscription};

/// Background task that turns change notifications into full re-fetches.
///
/// Every event from the subscription produces exactly one `refetch` call,
/// awaited before the next event is read. A transport error ends the loop.
/// Stopping or dropping the handle cancels the task and with it the
/// subscription.
pub struct Reconciler {
    task: JoinHandle<()>,
}

impl Reconciler {
    pub fn spawn<F, Fut>(mut subscription: Subscription, mut refetch: F) -> Self
    where
        F: FnMut(ChangeEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(item) = subscription.next().await {
                match item {
                    Ok(event) => {
                        tracing::info!(
                            table = %event.table,
                            kind = %event.kind,
                            "change received, refetching"
                        );
                        refetch(event).await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "change feed failed, reconciliation stopped");
                        break;
                    }
                }
            }
            tracing::debug!("reconciler finished");
        });
        Self { task }
    }

    /// True once the feed has ended or failed.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.task.abort();
    }
}
