//! Public share links and where they get copied to.

use std::io::Write;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::info;

use mycloud_shared::types::FileId;

use crate::error::{ApiError, ClientError};
use crate::store::Store;

/// Receives a freshly generated share URL (a clipboard in a desktop shell).
pub trait LinkSink: Send + Sync {
    fn copy(&self, url: &str) -> std::io::Result<()>;
}

/// Fallback sink: print the URL on its own line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LinkSink for StdoutSink {
    fn copy(&self, url: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{url}")?;
        out.flush()
    }
}

/// Keeps every URL it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    urls: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LinkSink for MemorySink {
    fn copy(&self, url: &str) -> std::io::Result<()> {
        self.urls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        Ok(())
    }
}

/// Regenerate the link for `id` and hand its public URL to `sink`.
pub async fn copy_share_link(
    store: &Store,
    id: FileId,
    expiry_days: Option<u32>,
    sink: &dyn LinkSink,
    cancel: &CancellationToken,
) -> Result<String, ClientError> {
    let link = store.share_file(id, expiry_days, cancel).await?;
    let token = link
        .shared_link
        .ok_or_else(|| ApiError::Decode("share response carried no link".into()))?;

    let url = store.api().shared_url(&token);
    sink.copy(&url)?;
    info!(file_id = %id, "Share link copied");
    Ok(url)
}
