//! HTTP client for the workflow automation backend.
//!
//! Two request contracts exist: the authenticated REST trigger that returns
//! an execution id to poll, and the public webhook that blocks until the
//! workflow finishes and answers with the result inline.

use crate::error::SubmitError;
use crate::model::{ClipOutcome, SubmitConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub(crate) struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
    workflow_id: String,
    webhook_path: String,
    api_key: Option<String>,
    trigger_timeout: Duration,
    sync_timeout: Duration,
}

/// Outcome of a single status fetch.
#[derive(Debug)]
pub(crate) enum ExecutionProbe {
    Running,
    Succeeded(Option<ClipOutcome>),
    Failed(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerBody<'a> {
    video_url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TriggerResponse {
    execution_id: Option<serde_json::Value>,
    id: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExecutionStatusBody {
    finished: bool,
    status: Option<String>,
    data: Option<serde_json::Value>,
    message: Option<String>,
}

/// Backends disagree on whether ids are strings or numbers.
fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl WorkflowClient {
    pub(crate) fn new(cfg: &SubmitConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            workflow_id: cfg.workflow_id.clone(),
            webhook_path: cfg.webhook_path.trim_start_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            trigger_timeout: cfg.trigger_timeout,
            sync_timeout: cfg.sync_timeout,
        })
    }

    fn trigger_url(&self) -> String {
        format!("{}/api/v1/workflows/{}/run", self.base_url, self.workflow_id)
    }

    fn webhook_url(&self) -> String {
        format!("{}/{}", self.base_url, self.webhook_path)
    }

    fn execution_url(&self, execution_id: &str) -> String {
        format!("{}/api/v1/executions/{}", self.base_url, execution_id)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Start a workflow run and return the execution id to poll.
    pub(crate) async fn trigger(&self, video_url: &str) -> Result<String, SubmitError> {
        let url = self.trigger_url();
        tracing::debug!(%url, "triggering workflow run");
        let resp = self
            .authorize(self.http.post(&url))
            .timeout(self.trigger_timeout)
            .json(&TriggerBody { video_url })
            .send()
            .await
            .map_err(|e| SubmitError::from_request(e, self.trigger_timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SubmitError::from_request(e, self.trigger_timeout))?;
        if !status.is_success() {
            return Err(SubmitError::from_status(status, &url, &body));
        }

        let parsed: TriggerResponse = serde_json::from_str(&body).unwrap_or_default();
        parsed
            .execution_id
            .as_ref()
            .and_then(id_string)
            .or_else(|| parsed.id.as_ref().and_then(id_string))
            .ok_or_else(|| {
                SubmitError::Workflow("trigger response carried no execution id".into())
            })
    }

    /// Run the workflow through the blocking webhook and return its final
    /// result. The wait budget is minutes-scale; the workflow does real work
    /// before answering.
    pub(crate) async fn submit_sync(&self, video_url: &str) -> Result<ClipOutcome, SubmitError> {
        let url = self.webhook_url();
        tracing::debug!(%url, "submitting through synchronous webhook");
        let resp = self
            .http
            .post(&url)
            .timeout(self.sync_timeout)
            .json(&TriggerBody { video_url })
            .send()
            .await
            .map_err(|e| SubmitError::from_request(e, self.sync_timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SubmitError::from_request(e, self.sync_timeout))?;
        if !status.is_success() {
            return Err(SubmitError::from_status(status, &url, &body));
        }

        let value = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
        Ok(ClipOutcome::from_value(value))
    }

    /// Fetch the current state of one execution.
    pub(crate) async fn fetch_execution(
        &self,
        execution_id: &str,
    ) -> Result<ExecutionProbe, SubmitError> {
        let url = self.execution_url(execution_id);
        let resp = self
            .authorize(self.http.get(&url))
            .timeout(self.trigger_timeout)
            .send()
            .await
            .map_err(|e| SubmitError::from_request(e, self.trigger_timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SubmitError::from_request(e, self.trigger_timeout))?;
        if !status.is_success() {
            return Err(SubmitError::from_status(status, &url, &body));
        }

        let parsed: ExecutionStatusBody = serde_json::from_str(&body).unwrap_or_default();
        Ok(classify_execution(parsed))
    }
}

fn classify_execution(body: ExecutionStatusBody) -> ExecutionProbe {
    match body.status.as_deref() {
        Some("success") => ExecutionProbe::Succeeded(body.data.map(ClipOutcome::from_value)),
        Some("error") | Some("failed") | Some("crashed") | Some("canceled") => {
            ExecutionProbe::Failed(
                body.message
                    .unwrap_or_else(|| "the workflow reported an error".into()),
            )
        }
        _ if body.finished => ExecutionProbe::Succeeded(body.data.map(ClipOutcome::from_value)),
        _ => ExecutionProbe::Running,
    }
}
