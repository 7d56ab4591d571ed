//! In-flight multipart upload bookkeeping.
//!
//! One table per store instance, guarded by a single reader/writer lock. The
//! lock covers map access only; callers do their disk I/O outside of it.

use crate::models::{MultipartUpload, MultipartUploadSummary, PartRecord};
use parking_lot::RwLock;
use std::collections::{HashMap, hash_map::Entry};

/// What an upload writes to, without its part records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadTarget {
    pub file_path: String,
    pub file_size: u64,
    pub part_size: u64,
    pub total_parts: u64,
}

#[derive(Default)]
pub struct MultipartSessions {
    uploads: RwLock<HashMap<String, MultipartUpload>>,
}

impl MultipartSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under `upload_id`. Returns the session back if the
    /// id is already taken.
    pub fn insert(
        &self,
        upload_id: &str,
        upload: MultipartUpload,
    ) -> Result<(), MultipartUpload> {
        match self.uploads.write().entry(upload_id.to_string()) {
            Entry::Occupied(_) => Err(upload),
            Entry::Vacant(slot) => {
                slot.insert(upload);
                Ok(())
            }
        }
    }

    /// Snapshot of a session, part records included. Completion needs these;
    /// per-part lookups should use [`Self::target`].
    pub fn get(&self, upload_id: &str) -> Option<MultipartUpload> {
        self.uploads.read().get(upload_id).cloned()
    }

    pub fn target(&self, upload_id: &str) -> Option<UploadTarget> {
        self.uploads.read().get(upload_id).map(|upload| UploadTarget {
            file_path: upload.file_path.clone(),
            file_size: upload.file_size,
            part_size: upload.part_size,
            total_parts: upload.total_parts,
        })
    }

    /// Record an acknowledged part. Returns false if the session vanished in
    /// the meantime (completed or aborted concurrently).
    pub fn record_part(&self, upload_id: &str, part_number: u64, record: PartRecord) -> bool {
        match self.uploads.write().get_mut(upload_id) {
            Some(upload) => {
                upload.parts.insert(part_number, record);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, upload_id: &str) -> Option<MultipartUpload> {
        self.uploads.write().remove(upload_id)
    }

    /// Summaries of every session, oldest first.
    pub fn summaries(&self) -> Vec<MultipartUploadSummary> {
        let mut out: Vec<_> = self
            .uploads
            .read()
            .iter()
            .map(|(id, upload)| MultipartUploadSummary {
                upload_id: id.clone(),
                file_path: upload.file_path.clone(),
                file_size: upload.file_size,
                total_parts: upload.total_parts,
                uploaded_parts: upload.parts.len() as u64,
                created_at: upload.created_at,
            })
            .collect();
        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.upload_id.cmp(&b.upload_id))
        });
        out
    }
}
