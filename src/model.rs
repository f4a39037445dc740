use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// POST starts the workflow and returns an execution id to poll.
    Async,
    /// POST blocks until the workflow finishes and returns the result inline.
    Sync,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    pub base_url: String,
    pub workflow_id: String,
    pub webhook_path: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub mode: RequestMode,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub trigger_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub sync_timeout: Duration,
    pub strict_validation: bool,
    pub user_agent: String,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5678".into(),
            workflow_id: "video-clipper".into(),
            webhook_path: "webhook/video-submit".into(),
            api_key: None,
            mode: RequestMode::Async,
            poll_interval: Duration::from_secs(10),
            trigger_timeout: Duration::from_secs(30),
            sync_timeout: Duration::from_secs(300),
            strict_validation: true,
            user_agent: format!("viralclip-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Error,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

/// Result payload attached to a successful execution. Known fields are typed;
/// everything else the workflow returns lands in the flattened remainder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipOutcome {
    #[serde(default)]
    pub clips_generated: Option<u64>,
    #[serde(default)]
    pub video_title: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClipOutcome {
    /// Build an outcome from whatever JSON the workflow produced. Non-object
    /// payloads are kept opaque under a `raw` key rather than discarded.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<ClipOutcome>(value.clone()) {
            Ok(outcome) => outcome,
            Err(_) => {
                let mut extra = serde_json::Map::new();
                extra.insert("raw".into(), value);
                Self {
                    clips_generated: None,
                    video_title: None,
                    extra,
                }
            }
        }
    }
}

/// One user-initiated submission. `id` is minted locally at submission time
/// and never changes; the backend's execution id is attached separately once
/// the trigger call answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    #[serde(default)]
    pub execution_id: Option<String>,
    pub video_url: String,
    pub status: ExecutionStatus,
    pub started_at: String,
    #[serde(default)]
    pub outcome: Option<ClipOutcome>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionRecord {
    pub fn new(id: String, video_url: String) -> Self {
        Self {
            id,
            execution_id: None,
            video_url,
            status: ExecutionStatus::Running,
            started_at: now_rfc3339(),
            outcome: None,
            error: None,
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Ordered record list, newest first. Updates go through here so the
/// terminal-state invariant holds in exactly one place: once a record is
/// `success` or `error` it never mutates again.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    records: Vec<ExecutionRecord>,
}

impl ExecutionLog {
    pub fn push_front(&mut self, record: ExecutionRecord) {
        self.records.insert(0, record);
    }

    pub fn get(&self, record_id: &str) -> Option<&ExecutionRecord> {
        self.records.iter().find(|r| r.id == record_id)
    }

    /// Attach the backend's execution id to a running record. Happens at most
    /// once per record.
    pub fn attach_execution(&mut self, record_id: &str, execution_id: String) -> bool {
        match self.records.iter_mut().find(|r| r.id == record_id) {
            Some(r) if r.execution_id.is_none() && !r.status.is_terminal() => {
                r.execution_id = Some(execution_id);
                true
            }
            _ => false,
        }
    }

    /// Move a record to its terminal state. Returns `None` when the record is
    /// unknown or already terminal, in which case nothing changed.
    pub fn finish(
        &mut self,
        record_id: &str,
        result: Result<Option<ClipOutcome>, String>,
    ) -> Option<&ExecutionRecord> {
        let record = self.records.iter_mut().find(|r| r.id == record_id)?;
        if record.status.is_terminal() {
            return None;
        }
        match result {
            Ok(outcome) => {
                record.status = ExecutionStatus::Success;
                record.outcome = outcome;
            }
            Err(message) => {
                record.status = ExecutionStatus::Error;
                record.error = Some(message);
            }
        }
        Some(&*record)
    }

    pub fn into_records(self) -> Vec<ExecutionRecord> {
        self.records
    }
}

/// Events emitted by the controller and consumed by presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubmitEvent {
    RecordAdded {
        record: ExecutionRecord,
    },
    ExecutionStarted {
        record_id: String,
        execution_id: String,
    },
    RecordFinished {
        // Box to keep SubmitEvent size small.
        record: Box<ExecutionRecord>,
    },
    Info(NoticeEvent),
}

/// User-facing notifications, rendered by whatever surface is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NoticeEvent {
    Message(String),
    Rejected {
        reason: String,
    },
    Submitted {
        record_id: String,
        video_url: String,
    },
    Completed {
        record_id: String,
        clips_generated: Option<u64>,
    },
    Failed {
        record_id: String,
        message: String,
    },
}

impl NoticeEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            NoticeEvent::Message(msg) => msg.clone(),
            NoticeEvent::Rejected { reason } => format!("Submission rejected: {}", reason),
            NoticeEvent::Submitted {
                record_id,
                video_url,
            } => format!("Submitted {} (record {})", video_url, record_id),
            NoticeEvent::Completed {
                record_id,
                clips_generated,
            } => match clips_generated {
                Some(n) => format!(
                    "Processing finished: {} clip(s) generated (record {})",
                    n, record_id
                ),
                None => format!("Processing finished (record {})", record_id),
            },
            NoticeEvent::Failed { record_id, message } => {
                format!("Processing failed for record {}: {}", record_id, message)
            }
        }
    }
}
