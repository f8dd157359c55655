//! Upload job state machine
//!
//! [`UploadJob`] drives one multipart upload end to end: acquire a bearer
//! token, assemble the multipart body exactly once, POST it, and retry
//! classified failures on a fixed delay until the attempt budget runs out.
//! The terminal outcome is reported to the delegate exactly once.
//!
//! # Example
//!
//! ```no_run
//! use upload_job::{
//!     DataSegment, HttpTransport, JobConfig, UploadJob, UploadJobParams,
//! };
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # fn collaborators() -> (Arc<dyn upload_job::TokenProvider>, Arc<dyn upload_job::UploadDelegate>) { unimplemented!() }
//! # async fn example() {
//! let (token_provider, delegate) = collaborators();
//! let config = JobConfig::default();
//! let transport = Arc::new(HttpTransport::new(config.request_timeout).unwrap());
//!
//! let mut job = UploadJob::new(
//!     UploadJobParams {
//!         upload_url: "https://upload.example.com/ingest".to_owned(),
//!         account_id: "device-account".to_owned(),
//!         scopes: vec!["https://www.example.com/auth/upload".to_owned()],
//!         config,
//!     },
//!     token_provider,
//!     transport,
//!     delegate,
//! );
//! job.add_data_segment(DataSegment::new(
//!     "report",
//!     Some("report.json".to_owned()),
//!     BTreeMap::new(),
//!     b"{}".to_vec(),
//! ));
//! job.start();
//! job.wait().await;
//! # }
//! ```

use crate::config::JobConfig;
use crate::delegate::UploadDelegate;
use crate::error::ErrorKind;
use crate::multipart::{self, BoundaryGenerator, DataSegment, RandomBoundaryGenerator};
use crate::token::{AccessToken, TokenProvider};
use crate::transport::{UploadRequest, UploadTransport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use url::Url;

/// Number of upload attempts before the job gives up.
pub const MAX_ATTEMPTS: u32 = 4;

/// Lifecycle state of an upload job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Accepting data segments, not yet started
    Idle,
    /// Waiting for the token provider
    AcquiringToken,
    /// Assembling the multipart body
    PreparingContent,
    /// POST request in flight
    Uploading,
    /// Terminal: the server accepted the upload
    Success,
    /// Terminal: construction failed, segments were invalid, or the attempt
    /// budget was exhausted
    Error,
}

impl State {
    /// Whether the job has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Success | State::Error)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => State::Idle,
            1 => State::AcquiringToken,
            2 => State::PreparingContent,
            3 => State::Uploading,
            4 => State::Success,
            _ => State::Error,
        }
    }
}

/// Identity and configuration of an upload job
#[derive(Clone, Debug)]
pub struct UploadJobParams {
    /// Destination of the POST request
    pub upload_url: String,
    /// Account the bearer token is requested for
    pub account_id: String,
    /// OAuth scopes the token must cover
    pub scopes: Vec<String>,
    /// Retry and transport tuning
    pub config: JobConfig,
}

/// Progress shared between the job handle and its driver task.
struct Progress {
    state: AtomicU8,
    attempts: AtomicU32,
}

impl Progress {
    fn new(state: State) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
            attempts: AtomicU32::new(0),
        }
    }

    fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// One multipart upload with bounded, token-aware retries
///
/// Stage data with [`add_data_segment`](Self::add_data_segment), then call
/// [`start`](Self::start) once. The job runs on a background task; dropping
/// the handle cancels it, which guarantees no delegate callback fires after
/// the handle is gone.
pub struct UploadJob {
    upload_url: Option<Url>,
    account_id: String,
    scopes: Vec<String>,
    config: JobConfig,
    token_provider: Arc<dyn TokenProvider>,
    transport: Arc<dyn UploadTransport>,
    delegate: Arc<dyn UploadDelegate>,
    boundary_generator: Option<Box<dyn BoundaryGenerator>>,
    segments: Vec<DataSegment>,
    progress: Arc<Progress>,
    driver: Option<tokio::task::JoinHandle<()>>,
}

impl UploadJob {
    /// Create a job targeting `params.upload_url`.
    ///
    /// An upload URL that does not parse is a programmer error: the job is
    /// pinned in [`State::Error`], every subsequent call becomes a no-op, and
    /// the delegate is never invoked.
    pub fn new(
        params: UploadJobParams,
        token_provider: Arc<dyn TokenProvider>,
        transport: Arc<dyn UploadTransport>,
        delegate: Arc<dyn UploadDelegate>,
    ) -> Self {
        let UploadJobParams {
            upload_url,
            account_id,
            scopes,
            config,
        } = params;

        let (upload_url, initial_state) = match Url::parse(&upload_url) {
            Ok(url) => (Some(url), State::Idle),
            Err(e) => {
                tracing::error!(url = %upload_url, error = %e, "invalid upload URL, job is unusable");
                (None, State::Error)
            }
        };

        Self {
            upload_url,
            account_id,
            scopes,
            config,
            token_provider,
            transport,
            delegate,
            boundary_generator: Some(Box::new(RandomBoundaryGenerator)),
            segments: Vec::new(),
            progress: Arc::new(Progress::new(initial_state)),
            driver: None,
        }
    }

    /// Replace the boundary source, e.g. with a deterministic generator in
    /// tests. Only meaningful before [`start`](Self::start).
    #[must_use]
    pub fn with_boundary_generator(mut self, generator: Box<dyn BoundaryGenerator>) -> Self {
        self.boundary_generator = Some(generator);
        self
    }

    /// Stage one segment of the multipart message.
    ///
    /// Ignored with a warning once the job has left [`State::Idle`]; the
    /// in-flight upload is not altered.
    pub fn add_data_segment(&mut self, segment: DataSegment) {
        let state = self.state();
        if state != State::Idle {
            tracing::warn!(?state, name = segment.name(), "data segment ignored, job is not idle");
            return;
        }
        self.segments.push(segment);
    }

    /// Start the upload. Only legal from [`State::Idle`]; any other state is
    /// a logged no-op. A job cannot be restarted after reaching a terminal
    /// state.
    pub fn start(&mut self) {
        if self.state() != State::Idle {
            tracing::warn!(state = ?self.state(), "start ignored, job is not idle");
            return;
        }
        let (Some(upload_url), Some(boundary_generator)) =
            (self.upload_url.take(), self.boundary_generator.take())
        else {
            tracing::warn!("start ignored, job is missing its upload URL");
            return;
        };

        self.progress.set_state(State::AcquiringToken);
        tracing::info!(
            url = %upload_url,
            segments = self.segments.len(),
            "upload job started"
        );

        let driver = Driver {
            upload_url,
            account_id: std::mem::take(&mut self.account_id),
            scopes: std::mem::take(&mut self.scopes),
            config: self.config.clone(),
            token_provider: Arc::clone(&self.token_provider),
            transport: Arc::clone(&self.transport),
            delegate: Arc::clone(&self.delegate),
            boundary_generator,
            segments: std::mem::take(&mut self.segments),
            progress: Arc::clone(&self.progress),
            access_token: None,
            payload: None,
        };
        self.driver = Some(tokio::spawn(driver.run()));
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.progress.state()
    }

    /// Number of failed upload attempts so far. Capped at [`MAX_ATTEMPTS`].
    pub fn attempts(&self) -> u32 {
        self.progress.attempts.load(Ordering::SeqCst)
    }

    /// Wait until the job reaches a terminal state and return it.
    ///
    /// Returns immediately if the job was never started (or could not be
    /// constructed with a valid URL).
    pub async fn wait(&mut self) -> State {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "upload driver task failed");
                }
            }
        }
        self.state()
    }
}

impl Drop for UploadJob {
    fn drop(&mut self) {
        // Cancels any pending token request, in-flight POST, or retry timer.
        // The delegate can never be invoked after the handle is gone.
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// Classification of one failed attempt from the retry loop's point of view.
enum AttemptError {
    /// Counts against the attempt budget and may be retried
    Recoverable(ErrorKind),
    /// Terminal regardless of remaining budget
    Fatal(ErrorKind),
}

/// The assembled message, fixed for the remainder of the job's life.
struct Payload {
    content_type: String,
    body: Vec<u8>,
}

/// Owns the upload end of the job and runs on a spawned task.
struct Driver {
    upload_url: Url,
    account_id: String,
    scopes: Vec<String>,
    config: JobConfig,
    token_provider: Arc<dyn TokenProvider>,
    transport: Arc<dyn UploadTransport>,
    delegate: Arc<dyn UploadDelegate>,
    boundary_generator: Box<dyn BoundaryGenerator>,
    segments: Vec<DataSegment>,
    progress: Arc<Progress>,
    access_token: Option<AccessToken>,
    payload: Option<Payload>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            match self.attempt().await {
                Ok(()) => {
                    self.succeed();
                    return;
                }
                Err(AttemptError::Fatal(kind)) => {
                    self.fail(kind);
                    return;
                }
                Err(AttemptError::Recoverable(kind)) => {
                    if !self.handle_error(kind).await {
                        return;
                    }
                }
            }
        }
    }

    /// One full pass through the state machine: token, body, POST.
    async fn attempt(&mut self) -> Result<(), AttemptError> {
        self.set_state(State::AcquiringToken);
        let token = match self.access_token.clone() {
            Some(token) => token,
            None => {
                let token = self
                    .token_provider
                    .request_token(&self.account_id, &self.scopes)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, "access token request failed");
                        AttemptError::Recoverable(ErrorKind::Authentication)
                    })?;
                tracing::debug!("access token acquired");
                self.access_token = Some(token.clone());
                token
            }
        };

        self.set_state(State::PreparingContent);
        if self.payload.is_none() {
            self.payload = Some(self.assemble_payload()?);
        }
        let payload = match &self.payload {
            Some(payload) => payload,
            None => return Err(AttemptError::Fatal(ErrorKind::InvalidSegments)),
        };

        self.set_state(State::Uploading);
        let request = UploadRequest {
            url: &self.upload_url,
            body: &payload.body,
            content_type: &payload.content_type,
            access_token: token.secret(),
        };
        let response = self.transport.execute(request).await.map_err(|e| {
            tracing::error!(error = %e, "upload request failed to complete");
            AttemptError::Recoverable(ErrorKind::Network)
        })?;

        match response.status {
            200 => Ok(()),
            401 => {
                tracing::error!("upload rejected as unauthorized");
                Err(AttemptError::Recoverable(ErrorKind::Authentication))
            }
            status => {
                tracing::error!(status, "upload rejected by the server");
                Err(AttemptError::Recoverable(ErrorKind::Server))
            }
        }
    }

    /// Assemble the multipart body. Runs at most once per job; the segments
    /// are consumed and their memory is released before the upload begins.
    fn assemble_payload(&mut self) -> Result<Payload, AttemptError> {
        let boundary = self.boundary_generator.generate_boundary();
        let segments = std::mem::take(&mut self.segments);
        let body = multipart::assemble_multipart(&boundary, segments).map_err(|e| {
            tracing::error!(error = %e, "multipart message assembly failed");
            AttemptError::Fatal(ErrorKind::InvalidSegments)
        })?;
        tracing::debug!(bytes = body.len(), boundary = %boundary, "multipart body assembled");
        Ok(Payload {
            content_type: multipart::content_type(&boundary),
            body,
        })
    }

    /// Apply the retry policy to one failed attempt. Returns false when the
    /// job has reached its terminal failure.
    async fn handle_error(&mut self, kind: ErrorKind) -> bool {
        let attempt = self.progress.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::error!(%kind, attempt, "upload attempt failed");

        if attempt >= MAX_ATTEMPTS {
            tracing::error!(max_attempts = MAX_ATTEMPTS, "maximum number of attempts reached");
            self.fail(kind);
            return false;
        }

        let delay_ms = self.config.retry_delay.as_millis() as u64;
        if kind == ErrorKind::Authentication {
            if let Some(token) = self.access_token.take() {
                self.token_provider
                    .invalidate_token(&self.account_id, &self.scopes, token.secret())
                    .await;
            }
            tracing::warn!(delay_ms, "retrying upload with a new token");
        } else {
            tracing::warn!(delay_ms, "retrying upload with the same token");
        }

        tokio::time::sleep(self.config.retry_delay).await;
        true
    }

    fn succeed(&mut self) {
        tracing::info!(
            attempts = self.progress.attempts.load(Ordering::SeqCst),
            "upload completed"
        );
        self.access_token = None;
        self.payload = None;
        self.set_state(State::Success);
        self.delegate.on_success();
    }

    fn fail(&mut self, kind: ErrorKind) {
        tracing::error!(%kind, "upload job failed");
        self.access_token = None;
        self.payload = None;
        self.segments.clear();
        self.set_state(State::Error);
        self.delegate.on_failure(kind);
    }

    fn set_state(&self, state: State) {
        tracing::debug!(?state, "state transition");
        self.progress.set_state(state);
    }
}
