//! HTTP handlers for file, directory and multipart upload operations.
//! Each handler resolves the named store and delegates to its `FileStore`;
//! a trailing `/` on the path selects the directory form of an operation.

use crate::{
    errors::AppError,
    models::{File, FilePart},
    services::{file_store::FileStore, paths, registry::FileStoreRegistry},
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters shared by the file routes.
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    /// Present (`?uploads`) to initiate an upload or list in-flight uploads.
    pub uploads: Option<String>,
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "partNumber")]
    pub part_number: Option<u64>,
    /// Declared total size when initiating an upload.
    pub size: Option<u64>,
    #[serde(rename = "moveTo")]
    pub move_to: Option<String>,
}

/// Body of a completion request.
#[derive(Debug, Deserialize)]
pub struct CompleteUploadReq {
    pub parts: Vec<FilePart>,
}

fn resolve_store(stores: &FileStoreRegistry, name: &str) -> Result<Arc<dyn FileStore>, AppError> {
    stores
        .get(name)
        .ok_or_else(|| AppError::not_found(format!("file store `{}` not found", name)))
}

/// Directory listing, or in-flight uploads under it when `?uploads` is set.
async fn list(store: &dyn FileStore, path: &str, q: &FileQuery) -> Result<Response, AppError> {
    if q.uploads.is_some() {
        let prefix = match paths::clean_logical(path) {
            p if p.is_empty() => p,
            p => format!("{}/", p),
        };
        let uploads: Vec<_> = store
            .list_multipart_uploads()
            .into_iter()
            .filter(|u| u.file_path.starts_with(&prefix))
            .collect();
        return Ok(Json(uploads).into_response());
    }

    let files = store.list_files(path).await?;
    Ok(Json(files).into_response())
}

/// `GET /{store}` and `GET /{store}/`: list the store root.
pub async fn list_root(
    State(stores): State<FileStoreRegistry>,
    Path(store): Path<String>,
    Query(q): Query<FileQuery>,
) -> Result<Response, AppError> {
    let store = resolve_store(&stores, &store)?;
    list(store.as_ref(), "/", &q).await
}

/// `GET /{store}/{*path}`: download a file, or list a directory.
pub async fn get_file(
    State(stores): State<FileStoreRegistry>,
    Path((store, path)): Path<(String, String)>,
    Query(q): Query<FileQuery>,
) -> Result<Response, AppError> {
    let store = resolve_store(&stores, &store)?;
    if paths::is_directory_path(&path) {
        return list(store.as_ref(), &path, &q).await;
    }

    let file = store.get_file(&path).await?;
    let content = file.content.clone().unwrap_or_default();
    let mut response = Response::new(Body::from(content));
    set_file_headers(response.headers_mut(), &file);
    Ok(response)
}

/// `HEAD /{store}/{*path}`: metadata as headers, no body.
pub async fn head_file(
    State(stores): State<FileStoreRegistry>,
    Path((store, path)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let store = resolve_store(&stores, &store)?;
    let file = store.stat_file(&path).await?;

    let mut response = Response::new(Body::empty());
    set_file_headers(response.headers_mut(), &file);
    Ok(response)
}

/// `PUT /{store}/{*path}`: create a file or directory, or upload one part
/// when `?uploadId=&partNumber=` is given.
pub async fn put_file(
    State(stores): State<FileStoreRegistry>,
    Path((store, path)): Path<(String, String)>,
    Query(q): Query<FileQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    let store = resolve_store(&stores, &store)?;

    if let Some(upload_id) = q.upload_id {
        let part_number = q
            .part_number
            .ok_or_else(|| AppError::bad_request("partNumber is required with uploadId"))?;
        let part = store
            .upload_part(&path, &upload_id, FilePart::new(part_number, body))
            .await?;

        let mut response = Json(&part).into_response();
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", part.etag)) {
            response.headers_mut().insert(header::ETAG, value);
        }
        return Ok(response);
    }

    let created = if paths::is_directory_path(&path) {
        store.create_directory(File::directory(path)).await?
    } else {
        store.create_file(File::with_content(path, body)).await?
    };
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// `POST /{store}/{*path}`: `?uploads&size=N` initiates an upload,
/// `?uploadId=` completes one, `?moveTo=` renames.
pub async fn post_file(
    State(stores): State<FileStoreRegistry>,
    Path((store, path)): Path<(String, String)>,
    Query(q): Query<FileQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    let store = resolve_store(&stores, &store)?;

    if q.uploads.is_some() {
        let size = q
            .size
            .ok_or_else(|| AppError::bad_request("size is required to initiate an upload"))?;
        let info = store
            .initiate_multipart_upload(File::sized(path, size))
            .await?;
        return Ok(Json(info).into_response());
    }

    if let Some(upload_id) = q.upload_id {
        let req: CompleteUploadReq = serde_json::from_slice(&body)
            .map_err(|err| AppError::bad_request(format!("invalid completion body: {}", err)))?;
        let file = store
            .complete_multipart_upload(&path, &upload_id, req.parts)
            .await?;
        return Ok(Json(file).into_response());
    }

    if let Some(destination) = q.move_to {
        let file = store.move_file(&path, &destination).await?;
        return Ok(Json(file).into_response());
    }

    Err(AppError::bad_request(
        "expected one of ?uploads, ?uploadId or ?moveTo",
    ))
}

/// `DELETE /{store}/{*path}`: delete a file or directory, or abort an
/// upload when `?uploadId=` is given.
pub async fn delete_file(
    State(stores): State<FileStoreRegistry>,
    Path((store, path)): Path<(String, String)>,
    Query(q): Query<FileQuery>,
) -> Result<StatusCode, AppError> {
    let store = resolve_store(&stores, &store)?;

    if let Some(upload_id) = q.upload_id {
        store.abort_multipart_upload(&path, &upload_id).await?;
    } else if paths::is_directory_path(&path) {
        store.delete_directory(&path).await?;
    } else {
        store.delete_file(&path).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

fn set_file_headers(headers: &mut HeaderMap, file: &File) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&file.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.size));

    let last_modified = file
        .updated_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
