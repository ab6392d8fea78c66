//! Cancellation and deadline for blocking reads.

use std::future::Future;
use std::time::Duration;

use llhls_common::{Error, Result};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounds a blocking read: it gives up when the token is cancelled or the
/// instant passes, whichever comes first.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    cancel: CancellationToken,
    until: Option<Instant>,
}

impl Deadline {
    /// No timeout; only the token can end the wait.
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel, until: None }
    }

    /// Give up after `timeout`.
    pub fn after(timeout: Duration) -> Self {
        Self::default().with_timeout(timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.until = Some(Instant::now() + timeout);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `fut` until it completes or the deadline fires. The future is
    /// dropped on expiry, which unregisters any waiter it holds.
    pub async fn run<F: Future>(&self, what: &str, fut: F) -> Result<F::Output> {
        let expiry = async {
            match self.until {
                Some(until) => tokio::time::sleep_until(until).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            out = fut => Ok(out),
            _ = expiry => Err(Error::timeout(what)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_completes_before_deadline() {
        let deadline = Deadline::after(Duration::from_secs(1));
        assert_eq!(deadline.run("value", async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_times_out() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let result = deadline.run("segment 4", std::future::pending::<()>()).await;
        assert_matches!(result, Err(Error::Timeout(what)) if what == "segment 4");
    }

    #[tokio::test]
    async fn test_cancelled() {
        let token = CancellationToken::new();
        let deadline = Deadline::new(token.clone());
        let waiter = tokio::spawn(async move { deadline.run("x", std::future::pending::<()>()).await });
        token.cancel();
        assert_matches!(waiter.await.unwrap(), Err(Error::Cancelled));
    }
}
