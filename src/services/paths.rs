//! Mapping between logical store paths and physical filesystem paths.
//!
//! Resolution is purely lexical and performs no I/O. A `..` segment pops the
//! previous segment and is dropped at the root, so a cleaned path can never
//! climb above the store's base directory.

use crate::services::file_store::{FileStoreError, FileStoreResult};
use std::path::{Path, PathBuf};

/// Staging area for multipart uploads, directly under the base directory.
pub const MULTIPART_DIR: &str = ".multipart";

/// Hidden zero-byte file that keeps an otherwise empty directory alive.
pub const DIR_MARKER_FILE: &str = ".directory";

/// Lexically clean a logical path into its segments.
fn segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Normalized logical path: no leading or trailing slash, `.`/`..` resolved.
/// The store root cleans to the empty string.
pub fn clean_logical(path: &str) -> String {
    segments(path).join("/")
}

/// Whether the caller addressed a directory (trailing slash convention).
pub fn is_directory_path(path: &str) -> bool {
    path.ends_with('/')
}

/// Physical location of `path` under `base`.
pub fn resolve(base: &Path, path: &str) -> PathBuf {
    let mut physical = base.to_path_buf();
    for segment in segments(path) {
        physical.push(segment);
    }
    physical
}

/// Reject paths that would reach into the store's own bookkeeping.
pub fn ensure_not_reserved(path: &str) -> FileStoreResult<()> {
    let parts = segments(path);
    let touches_staging = parts.first() == Some(&MULTIPART_DIR);
    let is_marker = parts.last() == Some(&DIR_MARKER_FILE);
    if touches_staging || is_marker {
        return Err(FileStoreError::ReservedPath(path.to_string()));
    }
    Ok(())
}
