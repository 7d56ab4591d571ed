//! Represents a stored file or directory and the values exchanged during
//! multipart uploads.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file or directory addressed by a logical, slash-separated path.
///
/// Directories always carry a trailing `/` in `path` and report a size of 0.
/// `content` is only populated by a full read and is never serialized.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct File {
    /// Normalized logical path (forward slashes, no leading slash).
    pub path: String,

    /// Last path segment.
    pub name: String,

    /// Whether this entry is a directory.
    pub is_directory: bool,

    /// Byte length of the file (0 for directories).
    pub size: u64,

    /// MIME type inferred from the extension.
    pub mime_type: String,

    /// Filesystem modification time.
    pub updated_at: DateTime<Utc>,

    /// Raw bytes, present only after a full read or when creating a file.
    #[serde(skip)]
    pub content: Option<Bytes>,
}

impl File {
    /// A file creation request carrying `content`.
    pub fn with_content(path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len() as u64,
            content: Some(content),
            ..Self::default()
        }
    }

    /// A directory creation request.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            ..Self::default()
        }
    }

    /// A multipart upload request: only the destination and declared size matter.
    pub fn sized(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            ..Self::default()
        }
    }
}

/// One chunk of a multipart upload.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FilePart {
    /// 1-based sequence index, unique within an upload.
    pub part_number: u64,

    /// Raw bytes to upload; absent once acknowledged.
    #[serde(skip)]
    pub data: Option<Bytes>,

    /// MD5 hex fingerprint of the part data.
    #[serde(default)]
    pub etag: String,
}

impl FilePart {
    pub fn new(part_number: u64, data: impl Into<Bytes>) -> Self {
        Self {
            part_number,
            data: Some(data.into()),
            etag: String::new(),
        }
    }
}

/// Returned when a multipart upload is initiated; tells the caller how to
/// slice the source data.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileUploadInfo {
    pub upload_id: String,
    pub part_size: u64,
    pub total_parts: u64,
}
