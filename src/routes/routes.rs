//! Routes for file, directory and multipart upload operations.
//!
//! ## Structure
//! - **Store-level endpoints**
//!   - `GET    /{store}` and `/{store}/`: list the store root (`?uploads` lists uploads)
//!
//! - **Path-level endpoints**
//!   - `GET    /{store}/{*path}`: download a file, list a directory (trailing `/`)
//!   - `HEAD   /{store}/{*path}`: metadata only
//!   - `PUT    /{store}/{*path}`: create a file or directory, or upload a part
//!   - `POST   /{store}/{*path}`: initiate or complete an upload, or move
//!   - `DELETE /{store}/{*path}`: delete a file or directory, or abort an upload
//!
//! The wildcard `*path` allows nested paths like `photos/2025/img.jpg`.

use crate::{
    handlers::{
        file_handlers::{delete_file, get_file, head_file, list_root, post_file, put_file},
        health_handlers::{healthz, readyz},
    },
    services::registry::FileStoreRegistry,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, put},
};

/// Build the router for all file store routes.
pub fn routes() -> Router<FileStoreRegistry> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Path-level routes
        .route(
            "/{store}/{*path}",
            put(put_file)
                .get(get_file)
                .head(head_file)
                .post(post_file)
                .delete(delete_file),
        )
        // Store-level routes
        .route("/{store}", get(list_root))
        .route("/{store}/", get(list_root))
}

/// The complete application: routes, shared state and the request body limit.
pub fn app(stores: FileStoreRegistry, max_body_bytes: usize) -> Router {
    routes()
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(stores)
}
