//! Request-scoped cancellation and deadlines
//!
//! Every trait method receives a [`Context`]. Handlers do not interpret it;
//! they pass the remote call through [`Context::run`] so that a cancelled
//! request or an expired deadline stops waiting on the API.

use crate::error::{Result, TfplugError};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Context {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                cancel: Arc::new(cancel),
            }),
        }
    }

    /// Derives a context that expires after `timeout`. Cancelling either the
    /// parent or the child cancels both; the earlier deadline wins.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                cancel: self.inner.cancel.clone(),
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    pub fn cancel(&self) {
        self.inner.cancel.send_replace(true);
    }

    /// Fails fast when the context is already cancelled or past its deadline
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(TfplugError::Cancelled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TfplugError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drives `future` until it completes, the context is cancelled or the
    /// deadline passes.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output> {
        self.check()?;

        let mut cancelled = self.inner.cancel.subscribe();
        let on_cancel = async move {
            if cancelled.wait_for(|c| *c).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        let bounded = async {
            match self.inner.deadline {
                Some(deadline) => {
                    tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), future)
                        .await
                        .map_err(|_| TfplugError::DeadlineExceeded)
                }
                None => Ok(future.await),
            }
        };

        tokio::select! {
            result = bounded => result,
            _ = on_cancel => Err(TfplugError::Cancelled),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_runs_future_to_completion() {
        let ctx = Context::new();
        let value = ctx.run(async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn context_timeout_stops_waiting() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        let result = ctx.run(sleep(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(TfplugError::DeadlineExceeded)));
        assert!(matches!(ctx.check(), Err(TfplugError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();
        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
        let result = ctx.run(async { 1 }).await;
        assert!(matches!(result, Err(TfplugError::Cancelled)));
    }

    #[tokio::test]
    async fn child_context_shares_cancellation_and_keeps_earlier_deadline() {
        let parent = Context::new().with_timeout(Duration::from_millis(100));
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());

        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn context_without_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.check().is_ok());
    }
}
