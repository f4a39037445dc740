use crate::engine::workflow::{ExecutionProbe, WorkflowClient};
use crate::model::ClipOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Parameters for one execution's status poll loop.
pub(crate) struct PollParams {
    pub client: WorkflowClient,
    pub execution_id: String,
    pub interval: Duration,
    pub cancel: Arc<AtomicBool>,
}

/// Terminal outcome observed by a poll loop.
#[derive(Debug)]
pub(crate) enum PollOutcome {
    Succeeded(Option<ClipOutcome>),
    Failed(String),
    Cancelled,
}

/// Poll the status endpoint until the execution reaches a terminal state.
///
/// A failed status fetch does not stop the loop: the execution is still
/// running as far as anyone knows, so the next cycle tries again. There is no
/// retry cap; the loop exits through a terminal status or the cancel flag.
pub(crate) async fn poll_until_terminal(params: PollParams) -> PollOutcome {
    let PollParams {
        client,
        execution_id,
        interval,
        cancel,
    } = params;
    let mut attempt = 0u64;

    loop {
        tokio::time::sleep(interval).await;
        if cancel.load(Ordering::Relaxed) {
            return PollOutcome::Cancelled;
        }
        attempt += 1;

        match client.fetch_execution(&execution_id).await {
            Ok(ExecutionProbe::Running) => {
                tracing::debug!(%execution_id, attempt, "execution still running");
            }
            Ok(ExecutionProbe::Succeeded(outcome)) => return PollOutcome::Succeeded(outcome),
            Ok(ExecutionProbe::Failed(message)) => return PollOutcome::Failed(message),
            Err(err) => {
                tracing::warn!(%execution_id, attempt, error = %err, "status fetch failed, retrying");
            }
        }
    }
}
