//! src/services/disk_file_store.rs
//!
//! DiskFileStore emulates object-store semantics on a plain local directory:
//! directories are first-class entries kept alive by a hidden marker file,
//! and large files arrive through an S3-style multipart upload whose parts
//! are staged under `base_path/.multipart/{upload_id}/part-{n}` until
//! completion concatenates them in part order.

use crate::models::{
    File, FilePart, FileUploadInfo, MultipartUpload, MultipartUploadSummary, PartRecord,
};
use crate::services::{
    file_store::{FileStore, FileStoreError, FileStoreResult},
    metadata::to_file,
    part_size::compute_part_size,
    paths::{self, DIR_MARKER_FILE, MULTIPART_DIR},
    sessions::{MultipartSessions, UploadTarget},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::{
    fs::Metadata,
    io,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// File store rooted at a local directory.
///
/// Stateless apart from the multipart session table, which belongs to this
/// instance alone. Share it behind an `Arc`.
pub struct DiskFileStore {
    base_path: PathBuf,
    staging_path: PathBuf,
    sessions: MultipartSessions,
}

const COPY_BUFFER_SIZE: usize = 64 * 1024;

fn part_file_name(part_number: u64) -> String {
    format!("part-{}", part_number)
}

/// Metadata for `physical`, or `None` when nothing lives there.
async fn lookup(physical: &Path, path: &str) -> FileStoreResult<Option<Metadata>> {
    match fs::metadata(physical).await {
        Ok(meta) => Ok(Some(meta)),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            Ok(None)
        }
        Err(err) => Err(FileStoreError::io("stat", path)(err)),
    }
}

fn ensure_bound(path: &str, upload_id: &str, file_path: &str) -> FileStoreResult<()> {
    if paths::clean_logical(path) != file_path {
        debug!("upload {} targets {}, not {}", upload_id, file_path, path);
        return Err(FileStoreError::UploadNotFound(upload_id.to_string()));
    }
    Ok(())
}

/// Conflict error describing whatever already occupies `logical`.
fn occupied(logical: &str, meta: &Metadata) -> FileStoreError {
    if meta.is_dir() {
        FileStoreError::DirectoryExists(format!("{}/", logical))
    } else {
        FileStoreError::FileExists(logical.to_string())
    }
}

impl DiskFileStore {
    /// Open a store at `base_path`, creating it and its staging area if needed.
    pub async fn open(base_path: impl Into<PathBuf>) -> FileStoreResult<Self> {
        let base_path = base_path.into();
        let shown = base_path.display().to_string();
        fs::create_dir_all(&base_path)
            .await
            .map_err(FileStoreError::io("create base directory", &shown))?;

        let staging_path = base_path.join(MULTIPART_DIR);
        fs::create_dir_all(&staging_path)
            .await
            .map_err(FileStoreError::io("create multipart directory", &shown))?;

        debug!("opened disk file store at {}", shown);
        Ok(Self {
            base_path,
            staging_path,
            sessions: MultipartSessions::new(),
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        paths::resolve(&self.base_path, path)
    }

    fn upload_dir(&self, upload_id: &str) -> PathBuf {
        self.staging_path.join(upload_id)
    }

    fn describe(&self, physical: &Path, meta: &Metadata) -> File {
        to_file(&self.base_path, physical, meta)
    }

    /// Stat after a write; the entry is expected to exist.
    async fn stat_written(&self, physical: &Path, logical: &str) -> FileStoreResult<File> {
        let meta = fs::metadata(physical)
            .await
            .map_err(FileStoreError::io("verify", logical))?;
        Ok(self.describe(physical, &meta))
    }

    /// Create the parent chain of `physical`. A file sitting where a parent
    /// directory should be is a conflict.
    async fn create_parents(&self, physical: &Path, logical: &str) -> FileStoreResult<()> {
        let Some(parent) = physical.parent() else {
            return Ok(());
        };
        match fs::create_dir_all(parent).await {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory
                ) =>
            {
                let parent_logical = logical.rsplit_once('/').map_or("", |(p, _)| p);
                Err(FileStoreError::FileExists(parent_logical.to_string()))
            }
            Err(err) => Err(FileStoreError::io("create parent directory for", logical)(err)),
        }
    }

    /// Lowercase MD5 hex of the path and the current time in nanoseconds.
    fn generate_upload_id(path: &str) -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{:x}", md5::compute(format!("{}-{}", path, nanos)))
    }

    /// Shape of the session behind `upload_id`, which must belong to `path`.
    /// A session for a different destination is reported as unknown.
    fn target_for(&self, path: &str, upload_id: &str) -> FileStoreResult<UploadTarget> {
        let target = self
            .sessions
            .target(upload_id)
            .ok_or_else(|| FileStoreError::UploadNotFound(upload_id.to_string()))?;
        ensure_bound(path, upload_id, &target.file_path)?;
        Ok(target)
    }

    /// Full snapshot of a session, parts included. Same binding rule as
    /// [`Self::target_for`].
    fn session_for(&self, path: &str, upload_id: &str) -> FileStoreResult<MultipartUpload> {
        let session = self
            .sessions
            .get(upload_id)
            .ok_or_else(|| FileStoreError::UploadNotFound(upload_id.to_string()))?;
        ensure_bound(path, upload_id, &session.file_path)?;
        Ok(session)
    }

    /// Concatenate the staged parts in order into `target`, returning the byte
    /// count. Each part is hashed as it is copied and must still match the
    /// ETag recorded in `session`; a part replaced after validation fails the
    /// assembly.
    async fn assemble(
        &self,
        upload_id: &str,
        session: &MultipartUpload,
        target: &Path,
    ) -> FileStoreResult<u64> {
        let upload_dir = self.upload_dir(upload_id);
        let mut out = fs::File::create(target)
            .await
            .map_err(FileStoreError::io("create assembly file for upload", upload_id))?;

        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut written = 0u64;
        for (part_number, record) in &session.parts {
            let label = format!("{}/{}", upload_id, part_file_name(*part_number));
            let mut part = fs::File::open(upload_dir.join(part_file_name(*part_number)))
                .await
                .map_err(FileStoreError::io("read part", &label))?;

            let mut digest = md5::Context::new();
            loop {
                let n = part
                    .read(&mut buf)
                    .await
                    .map_err(FileStoreError::io("read part", &label))?;
                if n == 0 {
                    break;
                }
                digest.consume(&buf[..n]);
                out.write_all(&buf[..n])
                    .await
                    .map_err(FileStoreError::io("append part", &label))?;
                written += n as u64;
            }

            if format!("{:x}", digest.compute()) != record.etag {
                return Err(FileStoreError::invalid_part(
                    upload_id,
                    format!("part {} changed after it was validated", part_number),
                ));
            }
        }

        out.flush()
            .await
            .map_err(FileStoreError::io("flush assembly file for upload", upload_id))?;
        out.sync_all()
            .await
            .map_err(FileStoreError::io("sync assembly file for upload", upload_id))?;
        Ok(written)
    }

    /// Check the caller's part list against what was staged.
    fn validate_completion(
        upload_id: &str,
        session: &MultipartUpload,
        parts: &mut [FilePart],
    ) -> FileStoreResult<()> {
        if parts.len() as u64 != session.total_parts {
            return Err(FileStoreError::invalid_part(
                upload_id,
                format!(
                    "expected {} parts, got {}",
                    session.total_parts,
                    parts.len()
                ),
            ));
        }

        parts.sort_by_key(|p| p.part_number);
        for (expected, part) in (1u64..).zip(parts.iter()) {
            if part.part_number != expected {
                return Err(FileStoreError::invalid_part(
                    upload_id,
                    format!("part {} is missing from the part list", expected),
                ));
            }
            let Some(record) = session.parts.get(&expected) else {
                return Err(FileStoreError::invalid_part(
                    upload_id,
                    format!("part {} was never uploaded", expected),
                ));
            };
            let etag = part.etag.trim_matches('"');
            if !etag.is_empty() && etag != record.etag {
                return Err(FileStoreError::invalid_part(
                    upload_id,
                    format!("etag mismatch for part {}", expected),
                ));
            }
        }

        let staged: u64 = session.parts.values().map(|r| r.size).sum();
        if staged != session.file_size {
            return Err(FileStoreError::invalid_part(
                upload_id,
                format!(
                    "staged {} bytes but the upload declared {}",
                    staged, session.file_size
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn stat_file(&self, path: &str) -> FileStoreResult<File> {
        paths::ensure_not_reserved(path)?;
        let physical = self.resolve(path);
        let meta = lookup(&physical, path)
            .await?
            .ok_or_else(|| FileStoreError::FileNotFound(path.to_string()))?;

        debug!("fetched metadata for {}", path);
        Ok(self.describe(&physical, &meta))
    }

    async fn get_file(&self, path: &str) -> FileStoreResult<File> {
        paths::ensure_not_reserved(path)?;
        let physical = self.resolve(path);
        let meta = lookup(&physical, path)
            .await?
            .ok_or_else(|| FileStoreError::FileNotFound(path.to_string()))?;
        if meta.is_dir() {
            return Err(FileStoreError::IsDirectory(path.to_string()));
        }

        let content = fs::read(&physical)
            .await
            .map_err(FileStoreError::io("read file", path))?;

        let mut file = self.describe(&physical, &meta);
        file.size = content.len() as u64;
        file.content = Some(Bytes::from(content));

        info!(path, size = file.size, "downloaded file");
        Ok(file)
    }

    async fn list_files(&self, path: &str) -> FileStoreResult<Vec<File>> {
        paths::ensure_not_reserved(path)?;
        let physical = self.resolve(path);
        let meta = lookup(&physical, path)
            .await?
            .ok_or_else(|| FileStoreError::DirectoryNotFound(path.to_string()))?;
        if !meta.is_dir() {
            return Err(FileStoreError::NotDirectory(path.to_string()));
        }

        let at_root = physical == self.base_path;
        let mut entries = fs::read_dir(&physical)
            .await
            .map_err(FileStoreError::io("list files at", path))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(FileStoreError::io("list files at", path))?
        {
            let name = entry.file_name();
            if name == DIR_MARKER_FILE || (at_root && name == MULTIPART_DIR) {
                continue;
            }

            // entries can disappear between readdir and stat
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(err) => {
                    debug!("skipping {}: {}", entry.path().display(), err);
                    continue;
                }
            };
            files.push(self.describe(&entry.path(), &meta));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        info!(path, count = files.len(), "listed files");
        Ok(files)
    }

    async fn create_file(&self, file: File) -> FileStoreResult<File> {
        if file.is_directory {
            return Err(FileStoreError::IsDirectory(file.path));
        }
        paths::ensure_not_reserved(&file.path)?;

        let logical = paths::clean_logical(&file.path);
        let physical = self.resolve(&logical);
        self.create_parents(&physical, &logical).await?;

        let mut out = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&physical)
            .await
        {
            Ok(out) => out,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let meta = fs::metadata(&physical)
                    .await
                    .map_err(FileStoreError::io("stat", &logical))?;
                return Err(occupied(&logical, &meta));
            }
            Err(err) => return Err(FileStoreError::io("create file", &logical)(err)),
        };

        let content = file.content.unwrap_or_default();
        let written = async {
            out.write_all(&content).await?;
            out.flush().await?;
            out.sync_all().await
        }
        .await;
        if let Err(err) = written {
            drop(out);
            let _ = fs::remove_file(&physical).await;
            return Err(FileStoreError::io("write file", &logical)(err));
        }

        let created = self.stat_written(&physical, &logical).await?;
        info!(path = %logical, size = created.size, "created file");
        Ok(created)
    }

    async fn create_directory(&self, file: File) -> FileStoreResult<File> {
        if !file.is_directory {
            return Err(FileStoreError::NotDirectory(file.path));
        }
        paths::ensure_not_reserved(&file.path)?;

        let logical = paths::clean_logical(&file.path);
        if logical.is_empty() {
            return Err(FileStoreError::DirectoryExists("/".into()));
        }
        let physical = self.resolve(&logical);
        self.create_parents(&physical, &logical).await?;

        match fs::create_dir(&physical).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let meta = fs::metadata(&physical)
                    .await
                    .map_err(FileStoreError::io("stat", &logical))?;
                return Err(occupied(&logical, &meta));
            }
            Err(err) => return Err(FileStoreError::io("create directory", &logical)(err)),
        }

        if let Err(err) = fs::write(physical.join(DIR_MARKER_FILE), b"").await {
            let _ = fs::remove_dir(&physical).await;
            return Err(FileStoreError::io("create directory marker in", &logical)(err));
        }

        let created = self.stat_written(&physical, &logical).await?;
        info!(path = %created.path, "created directory");
        Ok(created)
    }

    async fn move_file(&self, old_path: &str, new_path: &str) -> FileStoreResult<File> {
        paths::ensure_not_reserved(old_path)?;
        paths::ensure_not_reserved(new_path)?;

        let directory = paths::is_directory_path(old_path);
        if directory != paths::is_directory_path(new_path) {
            return Err(FileStoreError::invalid_move(
                old_path,
                new_path,
                "a directory must move to a path ending in `/` and a file to one that does not",
            ));
        }

        let old_logical = paths::clean_logical(old_path);
        let new_logical = paths::clean_logical(new_path);
        for logical in [&old_logical, &new_logical] {
            if logical.is_empty() {
                return Err(FileStoreError::ReservedPath("/".into()));
            }
        }

        let old_physical = self.resolve(&old_logical);
        let new_physical = self.resolve(&new_logical);
        let Some(source) = lookup(&old_physical, old_path).await? else {
            return Err(if directory {
                FileStoreError::DirectoryNotFound(old_path.to_string())
            } else {
                FileStoreError::FileNotFound(old_path.to_string())
            });
        };
        match (source.is_dir(), directory) {
            (true, false) => return Err(FileStoreError::IsDirectory(old_path.to_string())),
            (false, true) => return Err(FileStoreError::NotDirectory(old_path.to_string())),
            _ => {}
        }
        if old_physical == new_physical {
            return self.stat_written(&new_physical, &new_logical).await;
        }
        if new_logical.starts_with(&format!("{}/", old_logical)) {
            return Err(FileStoreError::invalid_move(
                old_path,
                new_path,
                "a directory cannot move inside itself",
            ));
        }
        if let Some(meta) = lookup(&new_physical, new_path).await? {
            return Err(occupied(&new_logical, &meta));
        }

        self.create_parents(&new_physical, &new_logical).await?;
        fs::rename(&old_physical, &new_physical).await.map_err(|source| {
            FileStoreError::Io {
                action: "move",
                path: format!("{} to {}", old_logical, new_logical),
                source,
            }
        })?;

        let moved = self.stat_written(&new_physical, &new_logical).await?;
        info!("moved {} to {}", old_logical, moved.path);
        Ok(moved)
    }

    async fn delete_file(&self, path: &str) -> FileStoreResult<()> {
        if paths::is_directory_path(path) {
            return Err(FileStoreError::IsDirectory(path.to_string()));
        }
        paths::ensure_not_reserved(path)?;

        let physical = self.resolve(path);
        let meta = lookup(&physical, path)
            .await?
            .ok_or_else(|| FileStoreError::FileNotFound(path.to_string()))?;
        if meta.is_dir() {
            return Err(FileStoreError::IsDirectory(path.to_string()));
        }

        fs::remove_file(&physical)
            .await
            .map_err(FileStoreError::io("delete file", path))?;

        info!(path, "deleted file");
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> FileStoreResult<()> {
        if !paths::is_directory_path(path) {
            return Err(FileStoreError::NotDirectory(path.to_string()));
        }
        paths::ensure_not_reserved(path)?;
        if paths::clean_logical(path).is_empty() {
            return Err(FileStoreError::ReservedPath(path.to_string()));
        }

        let physical = self.resolve(path);
        let meta = lookup(&physical, path)
            .await?
            .ok_or_else(|| FileStoreError::DirectoryNotFound(path.to_string()))?;
        if !meta.is_dir() {
            return Err(FileStoreError::NotDirectory(path.to_string()));
        }

        fs::remove_dir_all(&physical)
            .await
            .map_err(FileStoreError::io("delete directory", path))?;

        info!(path, "deleted directory");
        Ok(())
    }

    async fn initiate_multipart_upload(&self, file: File) -> FileStoreResult<FileUploadInfo> {
        if file.is_directory {
            return Err(FileStoreError::IsDirectory(file.path));
        }
        paths::ensure_not_reserved(&file.path)?;

        let logical = paths::clean_logical(&file.path);
        if logical.is_empty() {
            return Err(FileStoreError::DirectoryExists("/".into()));
        }
        if let Some(meta) = lookup(&self.resolve(&logical), &logical).await? {
            return Err(occupied(&logical, &meta));
        }

        let plan = compute_part_size(file.size).map_err(|source| FileStoreError::PartSize {
            path: logical.clone(),
            source,
        })?;

        let mut session =
            MultipartUpload::new(logical.clone(), file.size, plan.part_size, plan.total_parts);
        let upload_id = loop {
            let candidate = Self::generate_upload_id(&logical);
            match self.sessions.insert(&candidate, session) {
                Ok(()) => break candidate,
                Err(taken) => session = taken,
            }
        };

        if let Err(err) = fs::create_dir_all(self.upload_dir(&upload_id)).await {
            self.sessions.remove(&upload_id);
            return Err(FileStoreError::io("create upload directory for", &logical)(err));
        }

        info!(
            "initiated multipart upload for {} with upload ID {} ({} parts of size {})",
            logical, upload_id, plan.total_parts, plan.part_size
        );
        Ok(FileUploadInfo {
            upload_id,
            part_size: plan.part_size,
            total_parts: plan.total_parts,
        })
    }

    async fn upload_part(
        &self,
        path: &str,
        upload_id: &str,
        part: FilePart,
    ) -> FileStoreResult<FilePart> {
        let session = self.target_for(path, upload_id)?;

        let part_number = part.part_number;
        if part_number == 0 || part_number > session.total_parts {
            return Err(FileStoreError::invalid_part(
                upload_id,
                format!(
                    "part number {} outside 1..={}",
                    part_number, session.total_parts
                ),
            ));
        }
        let data = part.data.unwrap_or_default();
        if data.is_empty() || data.len() as u64 > session.part_size {
            return Err(FileStoreError::invalid_part(
                upload_id,
                format!(
                    "part {} is {} bytes, expected 1..={}",
                    part_number,
                    data.len(),
                    session.part_size
                ),
            ));
        }

        // stage under a unique name, then swap in, so a retried part never
        // exposes a half-written file to a concurrent completion
        let upload_dir = self.upload_dir(upload_id);
        let label = format!("{}/{}", upload_id, part_file_name(part_number));
        let tmp_path = upload_dir.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = fs::write(&tmp_path, &data).await {
            if err.kind() == io::ErrorKind::NotFound {
                // staging directory removed by a concurrent abort
                return Err(FileStoreError::UploadNotFound(upload_id.to_string()));
            }
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileStoreError::io("write part", &label)(err));
        }
        if let Err(err) = fs::rename(&tmp_path, upload_dir.join(part_file_name(part_number))).await
        {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileStoreError::io("stage part", &label)(err));
        }

        let etag = format!("{:x}", md5::compute(&data));
        let record = PartRecord {
            etag: etag.clone(),
            size: data.len() as u64,
        };
        if !self.sessions.record_part(upload_id, part_number, record) {
            return Err(FileStoreError::UploadNotFound(upload_id.to_string()));
        }

        info!("uploaded part {} for upload ID {}", part_number, upload_id);
        Ok(FilePart {
            part_number,
            data: None,
            etag,
        })
    }

    async fn complete_multipart_upload(
        &self,
        path: &str,
        upload_id: &str,
        mut parts: Vec<FilePart>,
    ) -> FileStoreResult<File> {
        let session = self.session_for(path, upload_id)?;
        Self::validate_completion(upload_id, &session, &mut parts)?;

        let logical = session.file_path.clone();
        let physical = self.resolve(&logical);
        let upload_dir = self.upload_dir(upload_id);
        let assembled = upload_dir.join(format!(".assembled-{}", Uuid::new_v4()));

        let outcome = async {
            let written = self
                .assemble(upload_id, &session, &assembled)
                .await?;
            if written != session.file_size {
                return Err(FileStoreError::invalid_part(
                    upload_id,
                    format!(
                        "assembled {} bytes but the upload declared {}",
                        written, session.file_size
                    ),
                ));
            }
            if let Some(meta) = lookup(&physical, &logical).await? {
                if meta.is_dir() {
                    return Err(occupied(&logical, &meta));
                }
            }
            self.create_parents(&physical, &logical).await?;
            fs::rename(&assembled, &physical)
                .await
                .map_err(FileStoreError::io("finalize upload to", &logical))
        }
        .await;

        if let Err(err) = outcome {
            // the destination is untouched; the session stays for a retry or abort
            let _ = fs::remove_file(&assembled).await;
            return Err(err);
        }

        let completed = self.stat_written(&physical, &logical).await?;

        if let Err(err) = fs::remove_dir_all(&upload_dir).await {
            warn!(
                "unable to clean up upload directory {}: {}",
                upload_dir.display(),
                err
            );
        }
        self.sessions.remove(upload_id);

        info!(
            "completed multipart upload {} into {} ({} bytes)",
            upload_id, completed.path, completed.size
        );
        Ok(completed)
    }

    async fn abort_multipart_upload(&self, path: &str, upload_id: &str) -> FileStoreResult<()> {
        self.target_for(path, upload_id)?;

        match fs::remove_dir_all(self.upload_dir(upload_id)).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(FileStoreError::io("remove upload directory for", upload_id)(err)),
        }
        self.sessions.remove(upload_id);

        info!("aborted multipart upload {}", upload_id);
        Ok(())
    }

    fn list_multipart_uploads(&self) -> Vec<MultipartUploadSummary> {
        self.sessions.summaries()
    }

    async fn health_check(&self) -> FileStoreResult<()> {
        let probe = self.staging_path.join(format!(".probe-{}", Uuid::new_v4()));
        let label = probe.display().to_string();
        fs::write(&probe, b"probe")
            .await
            .map_err(FileStoreError::io("write probe", &label))?;
        let read = fs::read(&probe).await;
        let _ = fs::remove_file(&probe).await;
        let bytes = read.map_err(FileStoreError::io("read probe", &label))?;
        if bytes != b"probe" {
            return Err(FileStoreError::Io {
                action: "verify probe",
                path: label,
                source: io::Error::new(io::ErrorKind::InvalidData, "probe content mismatch"),
            });
        }
        Ok(())
    }
}
