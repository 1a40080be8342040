//! Asynchronous job retriever
//!
//! For APIs that extract data through server-side jobs (Salesforce Bulk,
//! warehouse exports): submit a job for the slice, poll it to a terminal
//! status, download and decode its output.

use super::types::{send_with_policy, Retriever, RetrieverConfig};
use crate::cursor::Cursor;
use crate::decode::{extract_path, RecordDecoder};
use crate::error::{Error, Result};
use crate::http::{DefaultErrorHandler, ErrorHandler, HttpMethod, Requester, RequestSpec};
use crate::types::{JsonObject, JsonValue, Record, StreamSlice};
use futures::stream::{self, BoxStream};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Lifecycle of a server-side extraction job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Submitted, not yet seen running
    Created,
    /// Reported in progress by the server
    Running,
    /// Finished successfully; output is ready to download
    Completed,
    /// The server reported explicit failure
    Failed,
    /// No terminal status within the configured timeout
    TimedOut,
}

impl JobStatus {
    /// Whether the job has reached an end state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// Handle for one server-side job, owned for the duration of one slice
#[derive(Debug, Clone)]
pub struct AsyncJob {
    /// Job ID assigned by the API
    pub id: String,
    /// Current status
    pub status: JobStatus,
    /// When the job was submitted
    pub submitted_at: Instant,
}

impl AsyncJob {
    /// Create a handle for a freshly submitted job
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Created,
            submitted_at: Instant::now(),
        }
    }
}

/// Configuration for the job lifecycle.
///
/// Paths may contain a `{job_id}` placeholder that is substituted with the
/// id extracted from the creation response.
#[derive(Debug, Clone)]
pub struct AsyncJobConfig {
    /// Request that creates the job (slice window values are injected by
    /// the bound cursor's request options)
    pub create: RequestSpec,
    /// Dotted path to the job id in the creation response
    pub job_id_path: String,
    /// Path polled for job status
    pub poll_path: String,
    /// Dotted path to the status value in poll responses
    pub status_path: String,
    /// Status values meaning the job completed
    pub completed_values: Vec<String>,
    /// Status values meaning the job failed
    pub failed_values: Vec<String>,
    /// Delay between polls
    pub poll_interval: Duration,
    /// Total time allowed for the job to reach a terminal status
    pub poll_timeout: Duration,
    /// Path the job output is downloaded from
    pub download_path: String,
    /// Optional path for releasing the job afterwards (sent as DELETE)
    pub cleanup_path: Option<String>,
}

impl AsyncJobConfig {
    /// Create a config with common defaults (5s polls, 10min timeout)
    pub fn new(create: RequestSpec, poll_path: impl Into<String>, download_path: impl Into<String>) -> Self {
        Self {
            create,
            job_id_path: "id".to_string(),
            poll_path: poll_path.into(),
            status_path: "state".to_string(),
            completed_values: vec!["JobComplete".to_string(), "completed".to_string()],
            failed_values: vec!["Failed".to_string(), "Aborted".to_string()],
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(600),
            download_path: download_path.into(),
            cleanup_path: None,
        }
    }

    /// Set the job id extraction path
    #[must_use]
    pub fn with_job_id_path(mut self, path: impl Into<String>) -> Self {
        self.job_id_path = path.into();
        self
    }

    /// Set the status path and its terminal values
    #[must_use]
    pub fn with_status(
        mut self,
        path: impl Into<String>,
        completed: Vec<&str>,
        failed: Vec<&str>,
    ) -> Self {
        self.status_path = path.into();
        self.completed_values = completed.into_iter().map(String::from).collect();
        self.failed_values = failed.into_iter().map(String::from).collect();
        self
    }

    /// Set poll pacing
    #[must_use]
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// Release jobs through this path when done
    #[must_use]
    pub fn with_cleanup_path(mut self, path: impl Into<String>) -> Self {
        self.cleanup_path = Some(path.into());
        self
    }
}

/// Retriever for submit/poll/download extraction APIs.
///
/// One job per slice. A job that the server reports failed and a job that
/// never finishes inside the timeout are distinct failures (the first
/// asks for the request to be inspected, the second for a later retry),
/// and both surface as fatal slice errors. Whatever happens, a created
/// job is released through the cleanup path when one is configured.
///
/// Abandoning the record stream early does not cancel the remote job; it
/// keeps running server-side.
pub struct AsyncRetriever {
    stream_name: String,
    requester: Arc<dyn Requester>,
    job_config: AsyncJobConfig,
    decoder: Box<dyn RecordDecoder>,
    error_handler: Box<dyn ErrorHandler>,
    cursor: Option<Box<dyn Cursor>>,
    config: RetrieverConfig,
    records_read: usize,
}

impl AsyncRetriever {
    /// Create an async-job retriever for a stream
    pub fn new(
        stream_name: impl Into<String>,
        requester: Arc<dyn Requester>,
        job_config: AsyncJobConfig,
        decoder: Box<dyn RecordDecoder>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            requester,
            job_config,
            decoder,
            error_handler: Box::new(DefaultErrorHandler::new()),
            cursor: None,
            config: RetrieverConfig::default(),
            records_read: 0,
        }
    }

    /// Replace the error handler
    #[must_use]
    pub fn with_error_handler(mut self, handler: Box<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Bind an incremental cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: Box<dyn Cursor>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Set retriever configuration
    #[must_use]
    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    fn job_path(&self, template: &str, job_id: &str) -> String {
        template.replace("{job_id}", job_id)
    }

    async fn send(&self, request: &RequestSpec) -> Result<Option<crate::http::DecodedResponse>> {
        send_with_policy(
            self.requester.as_ref(),
            self.error_handler.as_ref(),
            &self.config,
            request,
        )
        .await
    }

    async fn create_job(&self, slice: &StreamSlice) -> Result<Option<AsyncJob>> {
        let mut request = self.job_config.create.clone();
        if let Some(cursor) = &self.cursor {
            request.apply_params(cursor.request_params(slice));
            request.apply_headers(cursor.request_headers(slice));
            request.apply_body_json(cursor.request_body_json(slice));
        }

        let Some(response) = self.send(&request).await? else {
            return Ok(None);
        };

        let job_id = extract_path(&response.body, &self.job_config.job_id_path)
            .and_then(|v| match v {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| {
                Error::decode(format!(
                    "no job id at '{}' in creation response",
                    self.job_config.job_id_path
                ))
            })?;

        debug!(stream = %self.stream_name, job_id, "created async extraction job");
        Ok(Some(AsyncJob::new(job_id)))
    }

    fn map_status(&self, status: Option<&str>) -> JobStatus {
        let Some(status) = status else {
            return JobStatus::Running;
        };
        if self.job_config.completed_values.iter().any(|v| v == status) {
            JobStatus::Completed
        } else if self.job_config.failed_values.iter().any(|v| v == status) {
            JobStatus::Failed
        } else {
            JobStatus::Running
        }
    }

    async fn poll_until_terminal(&self, job: &mut AsyncJob) -> Result<()> {
        let deadline = job.submitted_at + self.job_config.poll_timeout;
        let poll_request = RequestSpec::get(self.job_path(&self.job_config.poll_path, &job.id));

        loop {
            tokio::time::sleep(self.job_config.poll_interval).await;

            if Instant::now() >= deadline {
                job.status = JobStatus::TimedOut;
                warn!(
                    stream = %self.stream_name,
                    job_id = %job.id,
                    timeout_secs = self.job_config.poll_timeout.as_secs(),
                    "async job did not finish in time, giving up on this slice"
                );
                return Err(Error::JobTimedOut {
                    job_id: job.id.clone(),
                    timeout_secs: self.job_config.poll_timeout.as_secs(),
                });
            }

            let Some(response) = self.send(&poll_request).await? else {
                continue;
            };

            let status = extract_path(&response.body, &self.job_config.status_path)
                .and_then(JsonValue::as_str)
                .map(ToString::to_string);
            job.status = self.map_status(status.as_deref());
            debug!(job_id = %job.id, status = ?job.status, "polled async job");

            match job.status {
                JobStatus::Completed => return Ok(()),
                JobStatus::Failed => {
                    let message = status.unwrap_or_else(|| "unknown".to_string());
                    error!(
                        stream = %self.stream_name,
                        job_id = %job.id,
                        status = %message,
                        "server reported async job failure"
                    );
                    return Err(Error::JobFailed {
                        job_id: job.id.clone(),
                        message,
                    });
                }
                _ => {}
            }
        }
    }

    async fn download(&self, job: &AsyncJob) -> Result<Vec<Record>> {
        let request = RequestSpec::get(self.job_path(&self.job_config.download_path, &job.id));
        let Some(response) = self.send(&request).await? else {
            return Ok(Vec::new());
        };
        self.decoder.decode(&response.text)
    }

    /// Release the job with the remote service. Runs on success and on
    /// failure alike; release problems are logged, never propagated.
    async fn release_job(&self, job: &AsyncJob) {
        let Some(cleanup_path) = &self.job_config.cleanup_path else {
            return;
        };

        let request = RequestSpec {
            method: HttpMethod::Delete,
            url: self.job_path(cleanup_path, &job.id),
            ..Default::default()
        };
        match self.send(&request).await {
            Ok(_) => debug!(job_id = %job.id, "released async job"),
            Err(e) => warn!(job_id = %job.id, error = %e, "failed to release async job"),
        }
    }

    async fn run_job(&self, slice: &StreamSlice) -> Result<Vec<Record>> {
        let Some(mut job) = self.create_job(slice).await? else {
            return Ok(Vec::new());
        };

        let result = match self.poll_until_terminal(&mut job).await {
            Ok(()) => self.download(&job).await,
            Err(e) => Err(e),
        };

        self.release_job(&job).await;
        result
    }
}

struct AsyncReadState<'a> {
    r: &'a mut AsyncRetriever,
    slice: StreamSlice,
    buffer: Option<VecDeque<Record>>,
    failed: bool,
    closed: bool,
}

impl Retriever for AsyncRetriever {
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.stream_slices(),
            None => Ok(vec![StreamSlice::default()]),
        }
    }

    fn read_records<'a>(&'a mut self, slice: &StreamSlice) -> BoxStream<'a, Result<Record>> {
        let state = AsyncReadState {
            r: self,
            slice: slice.clone(),
            buffer: None,
            failed: false,
            closed: false,
        };

        Box::pin(stream::unfold(state, |mut st| async move {
            if st.buffer.is_none() {
                match st.r.run_job(&st.slice).await {
                    Ok(records) => st.buffer = Some(VecDeque::from(records)),
                    Err(e) => {
                        st.buffer = Some(VecDeque::new());
                        st.failed = true;
                        return Some((Err(e), st));
                    }
                }
            }

            if st.r.config.max_records.is_some_and(|max| st.r.records_read >= max) {
                if let Some(buffer) = st.buffer.as_mut() {
                    buffer.clear();
                }
            }

            if let Some(record) = st.buffer.as_mut().and_then(VecDeque::pop_front) {
                if let Some(cursor) = st.r.cursor.as_mut() {
                    cursor.observe(&st.slice, &record);
                }
                st.r.records_read += 1;
                return Some((Ok(record), st));
            }

            if !st.failed && !st.closed {
                st.closed = true;
                if let Some(cursor) = st.r.cursor.as_mut() {
                    cursor.close_slice(&st.slice);
                }
            }
            None
        }))
    }

    fn stream_state(&self) -> JsonValue {
        self.cursor
            .as_ref()
            .map_or_else(|| JsonValue::Object(JsonObject::new()), |c| c.stream_state())
    }

    fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }
}

impl std::fmt::Debug for AsyncRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRetriever")
            .field("stream_name", &self.stream_name)
            .field("has_cursor", &self.cursor.is_some())
            .field("poll_interval", &self.job_config.poll_interval)
            .field("poll_timeout", &self.job_config.poll_timeout)
            .finish_non_exhaustive()
    }
}
