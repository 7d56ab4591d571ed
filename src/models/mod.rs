//! Core data models for the file store.
//!
//! `File` is the entity every backend hands back; the multipart types describe
//! the chunked upload protocol and the server-side sessions that track it.

pub mod file;
pub mod multipart;

pub use file::{File, FilePart, FileUploadInfo};
pub use multipart::{MultipartUpload, MultipartUploadSummary, PartRecord};
