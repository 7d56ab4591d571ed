//! Represents multipart upload sessions and their staged parts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Server-side state of one in-flight multipart upload.
///
/// Part bytes live on disk in the upload's staging directory; the session only
/// remembers what was acknowledged for each part.
#[derive(Clone, Debug)]
pub struct MultipartUpload {
    /// Final destination (normalized logical path, never a directory).
    pub file_path: String,

    /// Declared total size, fixed at initiation.
    pub file_size: u64,

    /// Size of every part except possibly the last.
    pub part_size: u64,

    /// Number of parts expected at completion.
    pub total_parts: u64,

    /// Acknowledged parts keyed by part number.
    pub parts: BTreeMap<u64, PartRecord>,

    /// When the upload was initiated.
    pub created_at: DateTime<Utc>,
}

impl MultipartUpload {
    pub fn new(file_path: String, file_size: u64, part_size: u64, total_parts: u64) -> Self {
        Self {
            file_path,
            file_size,
            part_size,
            total_parts,
            parts: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}

/// What the store recorded for a staged part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartRecord {
    pub etag: String,
    pub size: u64,
}

/// Read-only view of a session, for janitors and operators.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MultipartUploadSummary {
    pub upload_id: String,
    pub file_path: String,
    pub file_size: u64,
    pub total_parts: u64,
    pub uploaded_parts: u64,
    pub created_at: DateTime<Utc>,
}
