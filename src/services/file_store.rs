//! The backend-agnostic file store contract.
//!
//! Every backend (local disk here, object storage elsewhere) implements
//! [`FileStore`] identically so callers never care where bytes live. Paths use
//! forward slashes; directories are addressed with a trailing `/` and files
//! never have one.

use crate::models::{File, FilePart, FileUploadInfo, MultipartUploadSummary};
use crate::services::part_size::PartSizeError;
use async_trait::async_trait;
use std::io;
use thiserror::Error;

/// Coarse classification of a [`FileStoreError`], shared by all backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    ResourceExhausted,
    Internal,
}

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("file not found at `{0}`")]
    FileNotFound(String),
    #[error("directory not found at `{0}`")]
    DirectoryNotFound(String),
    #[error("upload ID `{0}` not found")]
    UploadNotFound(String),
    #[error("a file already exists at `{0}`")]
    FileExists(String),
    #[error("a directory already exists at `{0}`")]
    DirectoryExists(String),
    #[error("path `{0}` is a directory, use the directory operations instead")]
    IsDirectory(String),
    #[error("path `{0}` is not a directory, use the file operations instead")]
    NotDirectory(String),
    #[error("path `{0}` is reserved for internal use")]
    ReservedPath(String),
    #[error("cannot move `{from}` to `{to}`: {reason}")]
    InvalidMove {
        from: String,
        to: String,
        reason: &'static str,
    },
    #[error("invalid part for upload `{upload_id}`: {reason}")]
    InvalidPart { upload_id: String, reason: String },
    #[error("unable to plan upload of `{path}`: {source}")]
    PartSize {
        path: String,
        #[source]
        source: PartSizeError,
    },
    #[error("unable to {action} `{path}`: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

pub type FileStoreResult<T> = Result<T, FileStoreError>;

impl FileStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) | Self::DirectoryNotFound(_) | Self::UploadNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::FileExists(_) | Self::DirectoryExists(_) => ErrorKind::Conflict,
            Self::IsDirectory(_)
            | Self::NotDirectory(_)
            | Self::ReservedPath(_)
            | Self::InvalidMove { .. }
            | Self::InvalidPart { .. } => ErrorKind::InvalidArgument,
            Self::PartSize { source, .. } => match source {
                PartSizeError::EmptyFile => ErrorKind::InvalidArgument,
                PartSizeError::TooLarge { .. } | PartSizeError::ExceedsMaxPartSize(_) => {
                    ErrorKind::ResourceExhausted
                }
            },
            Self::Io { .. } => ErrorKind::Internal,
        }
    }

    /// Adapter for `map_err` that wraps an I/O failure with its context.
    pub(crate) fn io(action: &'static str, path: &str) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_string();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    pub(crate) fn invalid_move(from: &str, to: &str, reason: &'static str) -> Self {
        Self::InvalidMove {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid_part(upload_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPart {
            upload_id: upload_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Capability contract for a file store backend.
///
/// All methods are safe to call concurrently. None of them retries
/// internally; retry policy belongs to the caller.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Metadata for a file or directory, without content.
    async fn stat_file(&self, path: &str) -> FileStoreResult<File>;

    /// Metadata plus full content. Directories are rejected.
    async fn get_file(&self, path: &str) -> FileStoreResult<File>;

    /// Direct children of a directory, internal bookkeeping entries hidden.
    async fn list_files(&self, path: &str) -> FileStoreResult<Vec<File>>;

    /// Creates a new file from `file.content`; parents are created as needed.
    async fn create_file(&self, file: File) -> FileStoreResult<File>;

    /// Creates a directory that persists even while empty.
    async fn create_directory(&self, file: File) -> FileStoreResult<File>;

    /// Renames a file or directory, returning the destination's metadata.
    async fn move_file(&self, old_path: &str, new_path: &str) -> FileStoreResult<File>;

    /// Removes a single file. `path` must not end in `/`.
    async fn delete_file(&self, path: &str) -> FileStoreResult<()>;

    /// Removes a directory and all its descendants. `path` must end in `/`.
    async fn delete_directory(&self, path: &str) -> FileStoreResult<()>;

    /// Opens a multipart upload for `file.path` of `file.size` bytes.
    async fn initiate_multipart_upload(&self, file: File) -> FileStoreResult<FileUploadInfo>;

    /// Stages one part and returns it acknowledged with its ETag.
    async fn upload_part(
        &self,
        path: &str,
        upload_id: &str,
        part: FilePart,
    ) -> FileStoreResult<FilePart>;

    /// Assembles the staged parts in part-number order into the destination.
    async fn complete_multipart_upload(
        &self,
        path: &str,
        upload_id: &str,
        parts: Vec<FilePart>,
    ) -> FileStoreResult<File>;

    /// Discards a multipart upload and everything staged for it.
    async fn abort_multipart_upload(&self, path: &str, upload_id: &str) -> FileStoreResult<()>;

    /// Snapshot of in-flight uploads, oldest first.
    fn list_multipart_uploads(&self) -> Vec<MultipartUploadSummary>;

    /// Write/read/delete probe against the backing storage.
    async fn health_check(&self) -> FileStoreResult<()>;
}
