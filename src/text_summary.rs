//! Text summary builder for CLI output.
//!
//! Formats the final record list as human-readable lines, newest first.

use crate::model::{ExecutionRecord, ExecutionStatus};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(records: &[ExecutionRecord]) -> TextSummary {
    let mut lines = Vec::new();
    if records.is_empty() {
        lines.push("No submissions.".to_string());
        return TextSummary { lines };
    }

    lines.push(format!("{} submission(s), newest first:", records.len()));
    for record in records {
        lines.push(record_line(record));
    }
    TextSummary { lines }
}

fn record_line(record: &ExecutionRecord) -> String {
    let status = match record.status {
        ExecutionStatus::Running => "running",
        ExecutionStatus::Success => "success",
        ExecutionStatus::Error => "error",
    };
    let mut line = format!(
        "[{}] {} started {}",
        status, record.video_url, record.started_at
    );
    if let Some(clips) = record.outcome.as_ref().and_then(|o| o.clips_generated) {
        line.push_str(&format!(", {} clip(s)", clips));
    }
    if let Some(execution_id) = record.execution_id.as_deref() {
        line.push_str(&format!(", execution {}", execution_id));
    }
    if let Some(error) = record.error.as_deref() {
        line.push_str(&format!(", {}", error));
    }
    line
}
