//! Submission lifecycle controller.
//!
//! Owns the record list and all in-flight request/poll tasks, and emits
//! events for presentation layers. Every failure is converted into record
//! state plus a notice here; nothing propagates past this boundary.

use crate::engine::poll::{poll_until_terminal, PollOutcome, PollParams};
use crate::engine::workflow::WorkflowClient;
use crate::error::SubmitError;
use crate::model::{
    ExecutionLog, ExecutionRecord, NoticeEvent, RequestMode, SubmitConfig, SubmitEvent,
};
use crate::validate::parse_video_url;
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{AbortHandle, JoinHandle};

/// Commands emitted by presentation layers.
#[derive(Debug, Clone)]
pub(crate) enum ControllerCommand {
    /// Validate and submit one video link.
    Submit { video_url: String },
    /// Accept no further submissions; return once in-flight work finishes.
    Drain,
    /// Cancel in-flight polling and return immediately.
    Shutdown,
}

/// What a spawned request or poll task reports back.
#[derive(Debug)]
enum TaskReport {
    Triggered {
        record_id: String,
        execution_id: String,
    },
    Finished {
        record_id: String,
        result: Result<Option<crate::model::ClipOutcome>, SubmitError>,
    },
    PollCancelled {
        record_id: String,
    },
}

/// Cancellation handle for one execution's poll task, keyed by execution id
/// in the controller's map.
struct PollTask {
    cancel: Arc<AtomicBool>,
    abort: AbortHandle,
}

/// Submission ids are minted locally so a record exists (and keeps its id)
/// before the outbound request is issued.
fn mint_submission_id() -> String {
    let millis = (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
    format!("{}-{:04x}", millis, rand::thread_rng().next_u32() as u16)
}

/// Run the controller until the command side shuts it down or drains, then
/// return the final record list, newest first.
pub(crate) async fn run_controller(
    cfg: SubmitConfig,
    event_tx: UnboundedSender<SubmitEvent>,
    mut cmd_rx: UnboundedReceiver<ControllerCommand>,
) -> Result<Vec<ExecutionRecord>> {
    let client = WorkflowClient::new(&cfg)?;
    let mut log = ExecutionLog::default();
    let mut poll_tasks: HashMap<String, PollTask> = HashMap::new();
    let mut tasks: FuturesUnordered<JoinHandle<TaskReport>> = FuturesUnordered::new();
    let mut draining = false;
    let mut cmd_open = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if cmd_open => {
                match cmd {
                    Some(ControllerCommand::Submit { video_url }) => {
                        if draining {
                            let _ = event_tx.send(SubmitEvent::Info(NoticeEvent::Message(
                                "Ignoring submission: controller is shutting down".into(),
                            )));
                        } else {
                            submit(&cfg, &client, &mut log, &mut tasks, &event_tx, &video_url);
                        }
                    }
                    Some(ControllerCommand::Drain) => {
                        draining = true;
                    }
                    None => {
                        cmd_open = false;
                        draining = true;
                    }
                    Some(ControllerCommand::Shutdown) => {
                        // Stop local polling; the remote executions keep
                        // running on the backend regardless.
                        for task in poll_tasks.values() {
                            task.cancel.store(true, Ordering::Relaxed);
                            task.abort.abort();
                        }
                        break;
                    }
                }
            }
            Some(joined) = tasks.next() => {
                match joined {
                    Ok(TaskReport::Triggered { record_id, execution_id }) => {
                        start_polling(
                            &cfg,
                            &client,
                            &mut log,
                            &mut poll_tasks,
                            &mut tasks,
                            &event_tx,
                            record_id,
                            execution_id,
                        );
                    }
                    Ok(TaskReport::Finished { record_id, result }) => {
                        if let Some(execution_id) =
                            log.get(&record_id).and_then(|r| r.execution_id.clone())
                        {
                            if let Some(task) = poll_tasks.remove(&execution_id) {
                                task.cancel.store(true, Ordering::Relaxed);
                            }
                        }

                        let result = result.map_err(|err| err.user_message());
                        let notice = match &result {
                            Ok(outcome) => NoticeEvent::Completed {
                                record_id: record_id.clone(),
                                clips_generated: outcome
                                    .as_ref()
                                    .and_then(|o| o.clips_generated),
                            },
                            Err(message) => NoticeEvent::Failed {
                                record_id: record_id.clone(),
                                message: message.clone(),
                            },
                        };
                        if let Some(record) = log.finish(&record_id, result) {
                            let _ = event_tx.send(SubmitEvent::RecordFinished {
                                record: Box::new(record.clone()),
                            });
                            let _ = event_tx.send(SubmitEvent::Info(notice));
                        }
                    }
                    Ok(TaskReport::PollCancelled { record_id }) => {
                        if let Some(execution_id) =
                            log.get(&record_id).and_then(|r| r.execution_id.clone())
                        {
                            poll_tasks.remove(&execution_id);
                        }
                    }
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => {
                        let _ = event_tx.send(SubmitEvent::Info(NoticeEvent::Message(format!(
                            "Task join failed: {err}"
                        ))));
                    }
                }
            }
            else => break,
        }

        if draining && tasks.is_empty() {
            break;
        }
    }

    Ok(log.into_records())
}

/// Validate one link and, on acceptance, mint a record and fire the outbound
/// request. Rejections surface as a notice and leave no trace in the log.
fn submit(
    cfg: &SubmitConfig,
    client: &WorkflowClient,
    log: &mut ExecutionLog,
    tasks: &mut FuturesUnordered<JoinHandle<TaskReport>>,
    event_tx: &UnboundedSender<SubmitEvent>,
    raw_url: &str,
) {
    let video = match parse_video_url(raw_url, cfg.strict_validation) {
        Ok(video) => video,
        Err(err) => {
            let _ = event_tx.send(SubmitEvent::Info(NoticeEvent::Rejected {
                reason: err.user_message(),
            }));
            return;
        }
    };
    tracing::debug!(video_id = ?video.video_id, "accepted video link");

    let record = ExecutionRecord::new(mint_submission_id(), video.url.clone());
    let record_id = record.id.clone();
    let _ = event_tx.send(SubmitEvent::RecordAdded {
        record: record.clone(),
    });
    let _ = event_tx.send(SubmitEvent::Info(NoticeEvent::Submitted {
        record_id: record_id.clone(),
        video_url: video.url.clone(),
    }));
    log.push_front(record);

    let client = client.clone();
    let mode = cfg.mode;
    tasks.push(tokio::spawn(async move {
        match mode {
            RequestMode::Async => match client.trigger(&video.url).await {
                Ok(execution_id) => TaskReport::Triggered {
                    record_id,
                    execution_id,
                },
                Err(err) => TaskReport::Finished {
                    record_id,
                    result: Err(err),
                },
            },
            RequestMode::Sync => match client.submit_sync(&video.url).await {
                Ok(outcome) => TaskReport::Finished {
                    record_id,
                    result: Ok(Some(outcome)),
                },
                Err(err) => TaskReport::Finished {
                    record_id,
                    result: Err(err),
                },
            },
        }
    }));
}

/// Attach the backend's execution id to its record and spawn the poll task.
/// The cancel flag and abort handle stay with the controller so the loop can
/// be torn down deterministically.
#[allow(clippy::too_many_arguments)]
fn start_polling(
    cfg: &SubmitConfig,
    client: &WorkflowClient,
    log: &mut ExecutionLog,
    poll_tasks: &mut HashMap<String, PollTask>,
    tasks: &mut FuturesUnordered<JoinHandle<TaskReport>>,
    event_tx: &UnboundedSender<SubmitEvent>,
    record_id: String,
    execution_id: String,
) {
    log.attach_execution(&record_id, execution_id.clone());
    let _ = event_tx.send(SubmitEvent::ExecutionStarted {
        record_id: record_id.clone(),
        execution_id: execution_id.clone(),
    });

    let cancel = Arc::new(AtomicBool::new(false));
    let params = PollParams {
        client: client.clone(),
        execution_id: execution_id.clone(),
        interval: cfg.poll_interval,
        cancel: cancel.clone(),
    };
    let handle = tokio::spawn(async move {
        match poll_until_terminal(params).await {
            PollOutcome::Succeeded(outcome) => TaskReport::Finished {
                record_id,
                result: Ok(outcome),
            },
            PollOutcome::Failed(message) => TaskReport::Finished {
                record_id,
                result: Err(SubmitError::Workflow(message)),
            },
            PollOutcome::Cancelled => TaskReport::PollCancelled { record_id },
        }
    });
    poll_tasks.insert(
        execution_id,
        PollTask {
            cancel,
            abort: handle.abort_handle(),
        },
    );
    tasks.push(handle);
}
