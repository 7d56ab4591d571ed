//! Disk-backed file store with chunked multipart uploads, served over HTTP.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
