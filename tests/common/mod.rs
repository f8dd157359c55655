//! Common test utilities for upload-job end-to-end tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use upload_job::{AccessToken, Error, ErrorKind, TokenProvider, UploadDelegate};

/// Token provider that serves a scripted sequence of token secrets and then
/// fails further requests.
pub struct StaticTokenProvider {
    script: Mutex<VecDeque<String>>,
    requests: AtomicU32,
    invalidated: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StaticTokenProvider {
    pub fn with_tokens(secrets: &[&str]) -> Self {
        Self {
            script: Mutex::new(secrets.iter().map(|s| (*s).to_owned()).collect()),
            requests: AtomicU32::new(0),
            invalidated: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn invalidated_tokens(&self) -> Vec<String> {
        self.invalidated.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn request_token(
        &self,
        _account_id: &str,
        _scopes: &[String],
    ) -> upload_job::Result<AccessToken> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().expect("lock poisoned").pop_front() {
            Some(secret) => Ok(AccessToken::new(secret, None)),
            None => Err(Error::TokenRequest("token script exhausted".into())),
        }
    }

    async fn invalidate_token(&self, _account_id: &str, _scopes: &[String], token: &str) {
        self.invalidated
            .lock()
            .expect("lock poisoned")
            .push(token.to_owned());
    }
}

/// Delegate that records every terminal callback it receives.
#[derive(Default)]
pub struct RecordingDelegate {
    successes: AtomicU32,
    failures: Mutex<Vec<ErrorKind>>,
}

#[allow(dead_code)]
impl RecordingDelegate {
    pub fn success_count(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn failure_kinds(&self) -> Vec<ErrorKind> {
        self.failures.lock().expect("lock poisoned").clone()
    }
}

impl UploadDelegate for RecordingDelegate {
    fn on_success(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_failure(&self, kind: ErrorKind) {
        self.failures.lock().expect("lock poisoned").push(kind);
    }
}
