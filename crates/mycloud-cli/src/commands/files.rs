use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing::info;

use mycloud_client::share::{self, StdoutSink};
use mycloud_client::upload::UploadQueue;
use mycloud_client::{Store, UploadError};
use mycloud_shared::quota::format_megabytes;
use mycloud_shared::types::{FileId, StoredFile, UserId};

use crate::cli::FilesCommand;
use crate::prompt;

pub async fn run(command: FilesCommand, store: &Store, cancel: &CancellationToken) -> anyhow::Result<()> {
    match command {
        FilesCommand::List { user } => {
            let files = store.list_files(user.map(UserId), cancel).await?;
            print_files(store, &files);
        }
        FilesCommand::Upload { paths, comment } => upload(store, paths, &comment, cancel).await?,
        FilesCommand::Download { id, output } => {
            let id = FileId(id);
            let data = store.download_file(id, cancel).await?;
            let target = match output {
                Some(path) => path,
                None => store
                    .list_files(None, cancel)
                    .await?
                    .into_iter()
                    .find(|f| f.id == id)
                    // never let a server-side name escape the working directory
                    .and_then(|f| Path::new(&f.original_name).file_name().map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from(format!("file-{id}"))),
            };
            tokio::fs::write(&target, &data)
                .await
                .with_context(|| format!("Failed to write {}", target.display()))?;
            println!("Saved {} ({})", target.display(), format_megabytes(data.len() as u64));
        }
        FilesCommand::Comment { id, text } => {
            let file = store.update_comment(FileId(id), text.trim(), cancel).await?;
            println!("Comment on {} updated", file.original_name);
        }
        FilesCommand::Delete { id, yes } => {
            if !yes && !prompt::confirm(&format!("Delete file {id}?")).await? {
                println!("Nothing deleted");
                return Ok(());
            }
            store.delete_file(FileId(id), cancel).await?;
            println!("Deleted file {id}");
        }
        FilesCommand::Share { id, days } => {
            share::copy_share_link(store, FileId(id), days, &StdoutSink, cancel).await?;
        }
        FilesCommand::Unshare { id } => {
            store.unshare_file(FileId(id), cancel).await?;
            println!("Link for file {id} revoked");
        }
    }
    Ok(())
}

async fn upload(
    store: &Store,
    paths: Vec<PathBuf>,
    comment: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut queue = UploadQueue::new();
    for path in &paths {
        queue.enqueue(path, comment).await?;
    }
    info!(count = queue.len(), "Uploading");

    match queue.commit(store, cancel).await {
        Ok(files) => {
            for file in &files {
                println!("Uploaded {} ({})", file.original_name, format_megabytes(file.size));
            }
            Ok(())
        }
        Err(UploadError::Partial { message, .. }) => {
            for entry in queue.entries() {
                eprintln!("  not uploaded: {}", entry.path.display());
            }
            bail!("Failed to upload files: {message}")
        }
        Err(e) => Err(e.into()),
    }
}

fn print_files(store: &Store, files: &[StoredFile]) {
    if files.is_empty() {
        println!("No files");
        return;
    }
    println!("{:>6}  {:<32}  {:>12}  {:<16}  COMMENT", "ID", "NAME", "SIZE", "UPLOADED");
    for file in files {
        let uploaded = file
            .upload_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:>6}  {:<32}  {:>12}  {:<16}  {}",
            file.id,
            file.original_name,
            format_megabytes(file.size),
            uploaded,
            file.comment
        );
        if let Some(token) = &file.shared_link {
            let state = if file.is_shared_expired { " (expired)" } else { "" };
            println!("        link: {}{state}", store.api().shared_url(token));
        }
    }
}
