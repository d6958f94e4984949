//! Background model-pull jobs with polled progress.
//!
//! A pull job decouples a multi-gigabyte model download from the HTTP
//! request/response cycle: `start_pull` returns a job id immediately and a
//! background task streams progress events from Ollama's `/api/pull`
//! endpoint into a shared registry that polling clients snapshot.
//!
//! State machine per job: `starting → downloading → {completed | failed}`.
//! There is no retry; a failed job is replaced by starting a new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{OllamaError, Result};
use crate::lifecycle::ServerLifecycleManager;

/// Generous upper bound on the whole pull request; there is no per-event
/// timeout, so a hung stream fails the job when this trips.
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

/// Snapshot of a pull job's state.
///
/// `progress` is a percentage in `[0, 100]` derived from the most recent
/// byte counters; once `done` is true the record never changes again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullJob {
    pub job_id: String,
    pub model: String,
    /// Free-text status from the most recent server event.
    pub status: String,
    pub completed: u64,
    pub total: u64,
    pub progress: u8,
    pub done: bool,
    /// Non-null iff the job ended abnormally.
    pub error: Option<String>,
}

impl PullJob {
    fn new(job_id: String, model: String) -> Self {
        Self {
            job_id,
            model,
            status: "starting".to_string(),
            completed: 0,
            total: 0,
            progress: 0,
            done: false,
            error: None,
        }
    }
}

/// A newline-delimited JSON event from the pull stream.
#[derive(Debug, Deserialize)]
struct PullEvent {
    status: Option<String>,
    completed: Option<u64>,
    total: Option<u64>,
    /// Ollama reports in-stream failures as 200 responses carrying an
    /// `error` field, so the event stream must be checked, not just the
    /// HTTP status.
    error: Option<String>,
}

type JobRegistry = Arc<Mutex<HashMap<String, PullJob>>>;

/// Creates, runs, and tracks long-running model download jobs.
///
/// Jobs live for the lifetime of the manager; there is no eviction. The
/// registry lock scopes every field read/write and is never held across
/// the network I/O that produces the next event.
pub struct PullJobManager {
    lifecycle: Arc<ServerLifecycleManager>,
    client: reqwest::Client,
    jobs: JobRegistry,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PullJobManager {
    #[must_use]
    pub fn new(lifecycle: Arc<ServerLifecycleManager>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PULL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            lifecycle,
            client,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register a job and launch its download task.
    ///
    /// Returns the fresh job id immediately, before any network activity;
    /// callers observe progress by polling [`get_status`](Self::get_status).
    pub fn start_pull(&self, model: &str) -> String {
        let mut job_id = Uuid::new_v4().simple().to_string();
        job_id.truncate(12);

        self.jobs
            .lock()
            .expect("job registry lock poisoned")
            .insert(
                job_id.clone(),
                PullJob::new(job_id.clone(), model.to_string()),
            );

        let lifecycle = Arc::clone(&self.lifecycle);
        let client = self.client.clone();
        let jobs = Arc::clone(&self.jobs);
        let id = job_id.clone();
        let model = model.to_string();

        let handle = tokio::spawn(async move {
            let result = run_pull(&lifecycle, &client, &jobs, &id, &model).await;
            finish_job(&jobs, &id, result);
        });
        self.tasks
            .lock()
            .expect("task list lock poisoned")
            .push(handle);

        job_id
    }

    /// Immutable snapshot of a job, or `None` for an unknown id.
    pub fn get_status(&self, job_id: &str) -> Option<PullJob> {
        self.jobs
            .lock()
            .expect("job registry lock poisoned")
            .get(job_id)
            .cloned()
    }

    /// Abandon any still-running download tasks.
    ///
    /// Shutdown must not hang on a multi-gigabyte download, so tasks are
    /// aborted rather than joined.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        for handle in tasks.drain(..) {
            handle.abort();
        }
    }
}

/// Drive one download: ensure the server is up, then stream and apply
/// progress events until the stream ends or fails.
async fn run_pull(
    lifecycle: &ServerLifecycleManager,
    client: &reqwest::Client,
    jobs: &JobRegistry,
    job_id: &str,
    model: &str,
) -> Result<()> {
    lifecycle
        .ensure_running()
        .await
        .map_err(|e| OllamaError::ServerUnavailable(e.to_string()))?;

    let url = format!("{}/api/pull", lifecycle.base_url().trim_end_matches('/'));
    let response = client
        .post(url)
        .json(&serde_json::json!({ "name": model }))
        .send()
        .await
        .map_err(|e| OllamaError::Stream(e.to_string()))?;

    if !response.status().is_success() {
        return Err(OllamaError::Stream(format!(
            "pull returned HTTP {}",
            response.status()
        )));
    }

    let mut stream = response.bytes_stream();
    let mut buf = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| OllamaError::Stream(e.to_string()))?;
        buf.extend_from_slice(&bytes);

        while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            let line = buf.split_to(pos + 1);
            apply_line(jobs, job_id, &line)?;
        }
    }

    // A final event without a trailing newline still counts.
    if !buf.is_empty() {
        let line = buf.split();
        apply_line(jobs, job_id, &line)?;
    }

    Ok(())
}

/// Parse one stream line and fold it into the job record.
///
/// Malformed lines are skipped, not fatal; an in-stream `error` field is
/// terminal for the job.
fn apply_line(jobs: &JobRegistry, job_id: &str, line: &[u8]) -> Result<()> {
    let Ok(text) = std::str::from_utf8(line) else {
        return Ok(());
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    let Ok(event) = serde_json::from_str::<PullEvent>(text) else {
        debug!(line = text, "skipping unparseable pull event");
        return Ok(());
    };

    if let Some(message) = event.error {
        return Err(OllamaError::Stream(message));
    }

    let mut jobs = jobs.lock().expect("job registry lock poisoned");
    let Some(job) = jobs.get_mut(job_id) else {
        return Ok(());
    };

    if let Some(status) = event.status.filter(|s| !s.is_empty()) {
        job.status = status;
    }
    if let Some(total) = event.total {
        job.total = total;
    }
    if let Some(completed) = event.completed {
        job.completed = completed;
    }
    // Last write wins, capped at 100; a server reporting completed > total
    // before a consistent pair is tolerated, not prevented.
    if job.total > 0 {
        job.progress = (job.completed.saturating_mul(100) / job.total).min(100) as u8;
    }

    Ok(())
}

/// Mark a job terminal exactly once.
fn finish_job(jobs: &JobRegistry, job_id: &str, result: Result<()>) {
    let mut jobs = jobs.lock().expect("job registry lock poisoned");
    let Some(job) = jobs.get_mut(job_id) else {
        return;
    };
    job.done = true;
    match result {
        Ok(()) => {
            job.progress = 100;
            job.error = None;
        }
        Err(e) => {
            warn!(job_id, error = %e, "pull job failed");
            job.error = Some(e.to_string());
        }
    }
}
