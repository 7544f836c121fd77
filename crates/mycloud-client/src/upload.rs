//! Client-side upload queue.
//!
//! Files are queued with an optional comment and committed together. The
//! commit sends every upload at once and waits for all of them. Uploads that
//! made it stay on the server even when a sibling fails; there is no rollback.
//! Afterwards the file list is always refetched.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use mycloud_shared::types::StoredFile;

use crate::api::files::{ProgressFn, UploadPayload};
use crate::error::{ApiError, ClientError, UploadError};
use crate::state::{FilesAction, Tracked};
use crate::store::Store;

/// A file waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct QueuedUpload {
    /// Short random id, only meaningful inside this queue.
    pub local_id: String,
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub comment: String,
    progress: Arc<AtomicU8>,
}

impl QueuedUpload {
    /// Percent of the body sent so far.
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct UploadQueue {
    entries: Vec<QueuedUpload>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueuedUpload] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue a local file. Returns its local id.
    pub async fn enqueue(&mut self, path: impl AsRef<Path>, comment: &str) -> Result<String, UploadError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|source| UploadError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let local_id = Uuid::new_v4().simple().to_string()[..8].to_string();

        self.entries.push(QueuedUpload {
            local_id: local_id.clone(),
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            comment: comment.trim().to_string(),
            progress: Arc::new(AtomicU8::new(0)),
        });
        Ok(local_id)
    }

    /// Returns false when `local_id` is not queued.
    pub fn set_comment(&mut self, local_id: &str, comment: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.local_id == local_id) {
            Some(entry) => {
                entry.comment = comment.trim().to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, local_id: &str) -> Option<QueuedUpload> {
        let index = self.entries.iter().position(|e| e.local_id == local_id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Upload everything queued, concurrently.
    ///
    /// Succeeded entries leave the queue. When any upload fails a single
    /// [`UploadError::Partial`] is returned and the failed entries remain
    /// queued so they can be retried.
    pub async fn commit(
        &mut self,
        store: &Store,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredFile>, UploadError> {
        if self.entries.is_empty() {
            return Err(UploadError::EmptyQueue);
        }

        let seq = store.next_seq();
        store.dispatch(|s| s.files.reduce(FilesAction::Upload(Tracked::pending(seq))));

        let results = join_all(self.entries.iter().map(|entry| upload_one(store, entry, cancel))).await;

        let total = results.len();
        let mut uploaded = Vec::new();
        let mut done = Vec::new();
        let mut failures = Vec::new();

        for (entry, result) in self.entries.iter().zip(results) {
            match result {
                Ok(file) => {
                    info!(file_id = %file.id, name = %file.original_name, "Uploaded");
                    store.dispatch(|s| {
                        s.files
                            .reduce(FilesAction::Upload(Tracked::fulfilled(seq, file.clone())))
                    });
                    done.push(entry.local_id.clone());
                    uploaded.push(file);
                }
                Err(e) => {
                    warn!(name = %entry.name, error = %e, "Upload failed");
                    failures.push(e);
                }
            }
        }
        self.entries.retain(|e| !done.contains(&e.local_id));

        let outcome = if cancel.is_cancelled() {
            store.dispatch(|s| s.files.reduce(FilesAction::Upload(Tracked::cancelled(seq))));
            Err(UploadError::Client(ApiError::Cancelled.into()))
        } else if let Some(first) = failures.first() {
            Err(UploadError::Partial {
                failed: failures.len(),
                total,
                message: first.to_string(),
            })
        } else {
            Ok(uploaded)
        };
        store.dispatch(|s| s.files.finish_upload());

        // the server's view replaces whatever was appended above
        let refreshed = store.list_files(None, cancel).await;

        // the refetch clears the slice error, so the batch failure lands after it
        if let Err(UploadError::Partial { message, .. }) = &outcome {
            store.dispatch(|s| {
                s.files
                    .reduce(FilesAction::Upload(Tracked::rejected(seq, message.clone())))
            });
        }
        match (outcome, refreshed) {
            (Ok(uploaded), Ok(_)) => Ok(uploaded),
            (Ok(_), Err(e)) => Err(UploadError::Client(e)),
            (Err(e), Err(refresh)) => {
                warn!(error = %refresh, "File list refresh after upload failed");
                Err(e)
            }
            (Err(e), Ok(_)) => Err(e),
        }
    }
}

async fn upload_one(
    store: &Store,
    entry: &QueuedUpload,
    cancel: &CancellationToken,
) -> Result<StoredFile, ClientError> {
    let data = tokio::fs::read(&entry.path).await?;

    let progress = entry.progress.clone();
    let report: ProgressFn = Arc::new(move |sent, total| {
        let percent = if total == 0 { 100 } else { sent * 100 / total };
        progress.store(percent.min(100) as u8, Ordering::Relaxed);
    });

    let payload = UploadPayload {
        file_name: entry.name.clone(),
        comment: entry.comment.clone(),
        data: Bytes::from(data),
    };
    Ok(store.api().upload_file(payload, Some(report), cancel).await?)
}
