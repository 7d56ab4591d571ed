//! Converts filesystem metadata into [`File`] entities.

use crate::models::File;
use chrono::{DateTime, Utc};
use std::{fs::Metadata, path::Path, time::UNIX_EPOCH};

/// MIME type for `path` from a fixed extension table.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "txt" => "text/plain",
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Build the `File` for `physical`, a path located under `base`.
///
/// The logical path is relative to `base` with forward slashes; directories
/// get a trailing `/` and a size of 0.
pub fn to_file(base: &Path, physical: &Path, meta: &Metadata) -> File {
    let is_directory = meta.is_dir();

    let relative = physical.strip_prefix(base).unwrap_or(physical);
    let mut path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if is_directory && !path.ends_with('/') {
        path.push('/');
    }

    let name = physical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let updated_at = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(UNIX_EPOCH));

    File {
        path,
        name,
        is_directory,
        size: if is_directory { 0 } else { meta.len() },
        mime_type: mime_type_for(physical).to_string(),
        updated_at,
        content: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mime_table() {
        assert_eq!(mime_type_for(Path::new("a.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("dir/photo.JPEG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("archive.tar.gz")), "application/gzip");
        assert_eq!(mime_type_for(Path::new("README")), "application/octet-stream");
        assert_eq!(mime_type_for(Path::new("x.rs")), "application/octet-stream");
    }

    #[test]
    fn maps_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        std::fs::create_dir_all(base.join("d/e")).unwrap();
        std::fs::write(base.join("d/notes.json"), b"{}").unwrap();

        let file_path = base.join("d/notes.json");
        let file = to_file(base, &file_path, &std::fs::metadata(&file_path).unwrap());
        assert_eq!(file.path, "d/notes.json");
        assert_eq!(file.name, "notes.json");
        assert!(!file.is_directory);
        assert_eq!(file.size, 2);
        assert_eq!(file.mime_type, "application/json");
        assert!(file.content.is_none());

        let dir_path = base.join("d/e");
        let dir = to_file(base, &dir_path, &std::fs::metadata(&dir_path).unwrap());
        assert_eq!(dir.path, "d/e/");
        assert_eq!(dir.name, "e");
        assert!(dir.is_directory);
        assert_eq!(dir.size, 0);

        let root = to_file(base, base, &std::fs::metadata(base).unwrap());
        assert_eq!(root.path, "/");
    }
}
