//! # upload-job
//!
//! Multipart/form-data upload job with OAuth bearer-token handling and
//! bounded retries.
//!
//! ## Design Philosophy
//!
//! upload-job is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Seam-driven** - Token acquisition, HTTP transport, and outcome
//!   delivery are traits the host implements or mocks
//! - **Predictable under failure** - Every failed attempt is classified and
//!   retried on a fixed delay within a hard attempt budget
//!
//! ## Quick Start
//!
//! ```no_run
//! use upload_job::{
//!     DataSegment, HttpTransport, JobConfig, UploadJob, UploadJobParams,
//! };
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # fn collaborators() -> (Arc<dyn upload_job::TokenProvider>, Arc<dyn upload_job::UploadDelegate>) { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (token_provider, delegate) = collaborators();
//!     let config = JobConfig::default();
//!     let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
//!
//!     let mut job = UploadJob::new(
//!         UploadJobParams {
//!             upload_url: "https://upload.example.com/ingest".to_owned(),
//!             account_id: "device-account".to_owned(),
//!             scopes: vec!["https://www.example.com/auth/upload".to_owned()],
//!             config,
//!         },
//!         token_provider,
//!         transport,
//!         delegate,
//!     );
//!
//!     job.add_data_segment(DataSegment::new(
//!         "report",
//!         Some("report.json".to_owned()),
//!         BTreeMap::new(),
//!         b"{\"status\":\"ok\"}".to_vec(),
//!     ));
//!     job.start();
//!     job.wait().await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Delegate notified of terminal outcomes
pub mod delegate;
/// Error types
pub mod error;
/// Upload job state machine
pub mod job;
/// Multipart/form-data message assembly
pub mod multipart;
/// OAuth2 token provider seam
pub mod token;
/// HTTP transport seam and production implementation
pub mod transport;

// Re-export commonly used types
pub use config::JobConfig;
pub use delegate::UploadDelegate;
pub use error::{Error, ErrorKind, Result};
pub use job::{MAX_ATTEMPTS, State, UploadJob, UploadJobParams};
pub use multipart::{
    BoundaryGenerator, DataSegment, FixedBoundaryGenerator, MAX_BOUNDARY_LEN,
    RandomBoundaryGenerator, assemble_multipart, content_type,
};
pub use token::{AccessToken, TokenProvider};
pub use transport::{HttpTransport, UploadRequest, UploadResponse, UploadTransport};
