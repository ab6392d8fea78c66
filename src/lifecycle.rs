//! Minimal worker lifecycle: run a step function until stopped.
//!
//! A failing step is logged and the loop carries on; a panicking step is
//! caught the same way. [`Step::shutdown`] runs exactly once when the loop
//! ends, whatever ended it.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use llhls_common::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the runner should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

#[async_trait]
pub trait Step: Send + 'static {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// One unit of work. Should return promptly once `stop` is cancelled.
    async fn step(&mut self, stop: &CancellationToken) -> Result<Flow>;

    /// Release resources. Called once, after the last step.
    fn shutdown(&mut self) {}
}

/// Spawn `step` onto the runtime. Cancel `stop` to end it.
pub fn spawn<S: Step>(mut step: S, stop: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = step.name();
        tracing::debug!(worker = name, "worker started");

        while !stop.is_cancelled() {
            match AssertUnwindSafe(step.step(&stop)).catch_unwind().await {
                Ok(Ok(Flow::Continue)) => {}
                Ok(Ok(Flow::Break)) => break,
                Ok(Err(e)) => tracing::warn!(worker = name, error = %e, "step failed"),
                Err(_) => {
                    tracing::error!(worker = name, "step panicked");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }

        step.shutdown();
        tracing::debug!(worker = name, "worker stopped");
    })
}
