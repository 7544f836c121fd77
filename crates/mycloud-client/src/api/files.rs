//! File storage endpoints under `/storage/`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;

use mycloud_shared::constants::UPLOAD_CHUNK_SIZE;
use mycloud_shared::types::{FileId, FilePatch, ShareLink, ShareRequest, StoredFile, UserId};

use super::ApiClient;
use crate::error::ApiError;

/// Called with `(bytes_sent, bytes_total)` as the upload body is consumed.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// One file to send to `POST /storage/files/`.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: String,
    pub comment: String,
    pub data: Bytes,
}

impl ApiClient {
    /// List files. Administrators may pass `user` to list another account's files.
    pub async fn list_files(
        &self,
        user: Option<UserId>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredFile>, ApiError> {
        let query: Vec<(&str, String)> = user
            .map(|id| vec![("user_id", id.to_string())])
            .unwrap_or_default();
        self.get("/storage/files/", &query, cancel).await
    }

    /// Upload a file as `multipart/form-data`, streaming the body in
    /// fixed-size chunks so `progress` sees byte-level advancement.
    pub async fn upload_file(
        &self,
        payload: UploadPayload,
        progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> Result<StoredFile, ApiError> {
        let total = payload.data.len() as u64;
        let sent = Arc::new(AtomicU64::new(0));

        let chunks: Vec<Bytes> = payload
            .data
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(|chunk| payload.data.slice_ref(chunk))
            .collect();

        let body = stream::iter(chunks.into_iter().map(move |chunk| {
            let now = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            if let Some(ref report) = progress {
                report(now, total);
            }
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(payload.file_name);
        let form = Form::new()
            .part("file", part)
            .text("comment", payload.comment);

        self.post_multipart("/storage/files/", form, cancel).await
    }

    pub async fn update_file(
        &self,
        id: FileId,
        patch: &FilePatch,
        cancel: &CancellationToken,
    ) -> Result<StoredFile, ApiError> {
        self.patch(&format!("/storage/files/{id}/"), patch, cancel).await
    }

    pub async fn delete_file(&self, id: FileId, cancel: &CancellationToken) -> Result<(), ApiError> {
        self.delete(&format!("/storage/files/{id}/"), cancel).await
    }

    pub async fn download_file(
        &self,
        id: FileId,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ApiError> {
        self.get_bytes(&format!("/storage/files/{id}/download/"), cancel)
            .await
    }

    /// Create or refresh the public link. The server picks the token and
    /// computes the expiry (7 days unless `expiry_days` is given).
    pub async fn share_file(
        &self,
        id: FileId,
        request: &ShareRequest,
        cancel: &CancellationToken,
    ) -> Result<ShareLink, ApiError> {
        self.patch(&format!("/storage/files/{id}/share/"), request, cancel)
            .await
    }

    pub async fn unshare_file(&self, id: FileId, cancel: &CancellationToken) -> Result<(), ApiError> {
        self.delete(&format!("/storage/files/{id}/share/"), cancel).await
    }

    /// Public download URL for a share token.
    pub fn shared_url(&self, token: &str) -> String {
        mycloud_shared::types::shared_download_url(self.base_url(), token)
    }
}
