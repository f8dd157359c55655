//! Delegate notified of terminal upload outcomes

use crate::error::ErrorKind;

/// Sink for the final outcome of an upload job
///
/// Exactly one of the two callbacks fires per job lifetime, after the job has
/// reached its terminal state. Intermediate retries are not reported here;
/// they are visible through logging and the job's attempt counter.
pub trait UploadDelegate: Send + Sync {
    /// The server accepted the upload with HTTP 200.
    fn on_success(&self);

    /// The job gave up. `kind` classifies the last failed attempt.
    fn on_failure(&self, kind: ErrorKind);
}
