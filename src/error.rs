use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong between the user's input and a terminal
/// record state. Each variant maps to a distinct user-facing message; none of
/// them propagate past the controller boundary.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid video url: {0}")]
    InvalidUrl(String),

    #[error("automation backend unreachable")]
    Unreachable(#[source] reqwest::Error),

    #[error("endpoint not found: {0}")]
    NotFound(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Structured error reported by the workflow backend itself.
    #[error("workflow error: {0}")]
    Workflow(String),

    #[error("request failed")]
    Request(#[source] reqwest::Error),
}

impl SubmitError {
    /// Classify a transport-level failure. `budget` is the timeout that was
    /// in force for the call, kept for the user message.
    pub(crate) fn from_request(err: reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            SubmitError::Timeout(budget)
        } else if err.is_connect() {
            SubmitError::Unreachable(err)
        } else {
            SubmitError::Request(err)
        }
    }

    /// Classify a non-2xx response, pulling a structured `message` out of the
    /// body when the backend sent one.
    pub(crate) fn from_status(status: StatusCode, url: &str, body: &str) -> Self {
        if status == StatusCode::NOT_FOUND {
            return SubmitError::NotFound(url.to_string());
        }
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .and_then(|m| m.as_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| format!("backend returned {}", status));
        SubmitError::Workflow(message)
    }

    /// Human-readable text for notifications. A timeout reads differently
    /// from a dead host or a missing endpoint.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::InvalidUrl(reason) => format!("Invalid video link: {}", reason),
            SubmitError::Unreachable(_) => {
                "Could not reach the automation backend. Is it running?".to_string()
            }
            SubmitError::NotFound(url) => {
                format!("Endpoint not found ({}). Check the workflow configuration.", url)
            }
            SubmitError::Timeout(budget) => format!(
                "The workflow did not answer within {}.",
                humantime::format_duration(*budget)
            ),
            SubmitError::Workflow(message) => message.clone(),
            SubmitError::Request(_) => {
                "The request to the automation backend failed.".to_string()
            }
        }
    }
}
