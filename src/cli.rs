use crate::model::{ExecutionStatus, RequestMode, SubmitConfig, SubmitEvent};
use crate::orchestrator::{run_controller, ControllerCommand};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "viralclip-cli",
    version,
    about = "Submit video links to the clipping workflow and track execution status"
)]
pub struct Cli {
    /// Video links to submit (one execution record per link)
    #[arg(required = true, value_name = "VIDEO_URL")]
    pub video_urls: Vec<String>,

    /// Base URL of the automation backend
    #[arg(long, default_value = "http://localhost:5678")]
    pub base_url: String,

    /// Workflow identifier used by the REST trigger endpoint
    #[arg(long, default_value = "video-clipper")]
    pub workflow: String,

    /// Webhook path used by the synchronous variant
    #[arg(long, default_value = "webhook/video-submit")]
    pub webhook_path: String,

    /// API key for bearer authentication against the REST API
    #[arg(long)]
    pub api_key: Option<String>,

    /// Block on the webhook until the workflow finishes instead of polling
    #[arg(long)]
    pub sync: bool,

    /// Delay between execution status polls
    #[arg(long, default_value = "10s")]
    pub poll_interval: humantime::Duration,

    /// Timeout for the trigger and status calls
    #[arg(long, default_value = "30s")]
    pub trigger_timeout: humantime::Duration,

    /// Wait budget for the synchronous webhook variant
    #[arg(long, default_value = "5m")]
    pub sync_timeout: humantime::Duration,

    /// Accept any non-empty link instead of requiring a known video host
    #[arg(long)]
    pub allow_any_url: bool,

    /// Print the final record list as JSON (no progress output)
    #[arg(long)]
    pub json: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,
}

/// Build a `SubmitConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> SubmitConfig {
    SubmitConfig {
        base_url: args.base_url.clone(),
        workflow_id: args.workflow.clone(),
        webhook_path: args.webhook_path.clone(),
        api_key: args.api_key.clone(),
        mode: if args.sync {
            RequestMode::Sync
        } else {
            RequestMode::Async
        },
        poll_interval: Duration::from(args.poll_interval),
        trigger_timeout: Duration::from(args.trigger_timeout),
        sync_timeout: Duration::from(args.sync_timeout),
        strict_validation: !args.allow_any_url,
        user_agent: format!("viralclip-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    let cfg = build_config(&args);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SubmitEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ControllerCommand>();
    let controller = tokio::spawn(run_controller(cfg, event_tx, cmd_rx));

    for url in &args.video_urls {
        let _ = cmd_tx.send(ControllerCommand::Submit {
            video_url: url.clone(),
        });
    }
    let _ = cmd_tx.send(ControllerCommand::Drain);

    // Ctrl-C stops local polling; the summary of whatever state was reached
    // still prints. The remote executions are not affected.
    let interrupt = tokio::spawn({
        let cmd_tx = cmd_tx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = cmd_tx.send(ControllerCommand::Shutdown);
            }
        }
    });
    drop(cmd_tx);

    let (out_tx, out_handle) = if args.silent {
        (None, None)
    } else {
        let (tx, handle) = spawn_output_writer();
        (Some(tx), Some(handle))
    };

    let progress = !args.json && !args.silent;
    while let Some(event) = event_rx.recv().await {
        if progress {
            if let Some(tx) = out_tx.as_ref() {
                render_event(tx, &event);
            }
        }
    }

    let records = controller
        .await
        .context("controller task failed")?
        .context("submission controller failed")?;
    interrupt.abort();

    if let Some(tx) = out_tx.as_ref() {
        if args.json {
            let out = serde_json::to_string_pretty(&records)?;
            let _ = tx.send(OutputLine::Stdout(out));
        } else {
            for line in crate::text_summary::build_text_summary(&records).lines {
                let _ = tx.send(OutputLine::Stdout(line));
            }
        }
    }

    if let Some(tx) = out_tx {
        drop(tx);
    }
    if let Some(handle) = out_handle {
        let _ = handle.await;
    }

    if records.is_empty() {
        return Err(anyhow::anyhow!("no submissions were accepted"));
    }
    if records.iter().all(|r| r.status == ExecutionStatus::Error) {
        return Err(anyhow::anyhow!("all submissions failed"));
    }
    Ok(())
}

fn render_event(out_tx: &mpsc::UnboundedSender<OutputLine>, event: &SubmitEvent) {
    match event {
        SubmitEvent::Info(notice) => {
            let _ = out_tx.send(OutputLine::Stderr(notice.to_message()));
        }
        SubmitEvent::ExecutionStarted {
            record_id,
            execution_id,
        } => {
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "Execution {} started (record {})",
                execution_id, record_id
            )));
        }
        // Record bookkeeping is already covered by the notices above.
        SubmitEvent::RecordAdded { .. } | SubmitEvent::RecordFinished { .. } => {}
    }
}
