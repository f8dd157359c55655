//! Multipart/form-data message assembly
//!
//! This module turns a list of named [`DataSegment`]s into a single
//! multipart/form-data byte buffer, delimited by a boundary token obtained
//! from a pluggable [`BoundaryGenerator`]. Assembly is pure and synchronous;
//! the upload job runs it exactly once per job and caches the result across
//! retries.
//!
//! # Example
//!
//! ```
//! use upload_job::{assemble_multipart, BoundaryGenerator, DataSegment, RandomBoundaryGenerator};
//! use std::collections::BTreeMap;
//!
//! let segment = DataSegment::new("status", None, BTreeMap::new(), b"ok".to_vec());
//! let boundary = RandomBoundaryGenerator.generate_boundary();
//! let body = assemble_multipart(&boundary, vec![segment]).unwrap();
//! assert!(body.starts_with(format!("--{boundary}\r\n").as_bytes()));
//! ```

use crate::error::{Error, Result};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::{BTreeMap, HashSet};

/// Max size of a MIME boundary token according to RFC 1341, section 7.2.1.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// Per-segment slack added to the size estimate to cover the constant
/// delimiters and control characters.
const SEGMENT_OVERHEAD: usize = 128;

/// Number of random characters in a generated boundary token.
const BOUNDARY_RANDOM_LEN: usize = 32;

/// Source of MIME boundary tokens
///
/// The production implementation is [`RandomBoundaryGenerator`]; tests inject
/// [`FixedBoundaryGenerator`] to get byte-exact assembly output.
pub trait BoundaryGenerator: Send + Sync {
    /// Produce one boundary token of at most [`MAX_BOUNDARY_LEN`] characters.
    fn generate_boundary(&self) -> String;
}

/// Boundary generator backed by the thread-local CSPRNG
///
/// Tokens are unpredictable, alphanumeric apart from the leading dashes, and
/// well under the RFC 1341 length cap.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomBoundaryGenerator;

impl BoundaryGenerator for RandomBoundaryGenerator {
    fn generate_boundary(&self) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BOUNDARY_RANDOM_LEN)
            .map(char::from)
            .collect();
        format!("----UploadJobBoundary{token}")
    }
}

/// Boundary generator that always returns the same token
///
/// Only useful for tests that need deterministic multipart output.
#[derive(Clone, Debug)]
pub struct FixedBoundaryGenerator {
    boundary: String,
}

impl FixedBoundaryGenerator {
    /// Create a generator that always yields `boundary`.
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }
}

impl BoundaryGenerator for FixedBoundaryGenerator {
    fn generate_boundary(&self) -> String {
        self.boundary.clone()
    }
}

/// One part of a multipart/form-data message
///
/// A segment corresponds to one `Content-Disposition` block in the assembled
/// message. The payload is owned by the segment and moved into the output
/// buffer during assembly; a segment cannot be read twice.
#[derive(Debug)]
pub struct DataSegment {
    name: String,
    filename: Option<String>,
    header_entries: BTreeMap<String, String>,
    data: Vec<u8>,
}

impl DataSegment {
    /// Create a new segment.
    ///
    /// `name` must be unique throughout the multipart message; uniqueness is
    /// enforced when the message is assembled. A `filename` of `None` (or an
    /// empty string) omits the `filename` field from the part header.
    pub fn new(
        name: impl Into<String>,
        filename: Option<String>,
        header_entries: BTreeMap<String, String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: filename.filter(|f| !f.is_empty()),
            header_entries,
            data,
        }
    }

    /// The value assigned to the `name` field in the part header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value assigned to the `filename` field, if any.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Extra header entries merged into the part's header block.
    pub fn header_entries(&self) -> &BTreeMap<String, String> {
        &self.header_entries
    }

    /// Size in bytes of the segment payload.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }
}

/// Build the `Content-Type` header value for a body assembled with `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Assemble `segments` into one multipart/form-data body delimited by
/// `boundary`.
///
/// Segments appear in input order, each introduced by `--boundary` and a
/// `Content-Disposition` header, followed by any custom header entries, a
/// blank line, and the raw payload bytes. The message ends with the
/// `--boundary--` terminal delimiter.
///
/// Fails with [`Error::DuplicateSegmentName`] if two segments share a name;
/// no partial output is produced in that case.
pub fn assemble_multipart(boundary: &str, segments: Vec<DataSegment>) -> Result<Vec<u8>> {
    let mut used_names = HashSet::new();
    for segment in &segments {
        if !used_names.insert(segment.name()) {
            return Err(Error::DuplicateSegmentName(segment.name().to_owned()));
        }
    }

    let estimate = estimated_size(&segments);
    let mut body = Vec::with_capacity(estimate);

    for segment in segments {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"", segment.name).as_bytes(),
        );
        if let Some(filename) = &segment.filename {
            body.extend_from_slice(format!("; filename=\"{filename}\"").as_bytes());
        }
        body.extend_from_slice(b"\r\n");

        for (key, value) in &segment.header_entries {
            body.extend_from_slice(format!("{key}: {value}\r\n").as_bytes());
        }

        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&segment.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    if body.len() > estimate {
        tracing::warn!(
            estimated = estimate,
            actual = body.len(),
            "post body exceeded the size estimate, buffer was reallocated"
        );
    }

    Ok(body)
}

/// Upper-bound estimate for the assembled message size, used to pre-reserve
/// the output buffer. Under-estimation only costs a reallocation.
fn estimated_size(segments: &[DataSegment]) -> usize {
    let mut size = 0;
    for segment in segments {
        for (key, value) in segment.header_entries() {
            size += key.len() + value.len();
        }
        size += MAX_BOUNDARY_LEN
            + segment.name().len()
            + segment.filename().map_or(0, str::len)
            + segment.data_len();
        size += SEGMENT_OVERHEAD;
    }
    // Terminal delimiter.
    size + MAX_BOUNDARY_LEN + 8
}
